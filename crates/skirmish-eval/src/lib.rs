//! Evaluation-server link and relay for the Skirmish combat engine.
//!
//! The evaluation server keeps its own count of both players' vitals and is
//! the final word on them. For every action the engine resolves, the relay
//! sends the acting player, the action and both players' vitals over an
//! encrypted TCP link, waits for the server's answer and hands it back to the
//! engine as an update.
//!
//! # Modules
//!
//! - [`crypto`] -- [`Cipher`]: AES-128-CBC frame encryption
//! - [`frame`] -- length-prefixed framing and the resumable [`FrameReader`]
//! - [`link`] -- [`EvalServerLink`]: one request/response cycle at a time,
//!   with desync recovery after timeouts and reconnects through a
//!   [`Connector`]
//! - [`relay`] -- [`EvalRelay`]: eval-outbound queue to link to inbound queue
//! - [`config`] -- [`EvalConfig`] loaded from the environment
//! - [`error`] -- [`LinkError`], [`EvalError`]

pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod link;
pub mod relay;

pub use config::EvalConfig;
pub use crypto::Cipher;
pub use error::{EvalError, LinkError};
pub use frame::{FrameReader, encode_frame, parse_frame};
pub use link::{Connector, EvalServerLink, HELLO, LinkStats, TcpConnector};
pub use relay::{EvalRelay, RelayOutcome, RelayStats};
