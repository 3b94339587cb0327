//! Encrypted request/response link to the evaluation server.
//!
//! The server answers every request with exactly one frame, but it may answer
//! late. When a reply misses the read timeout the link does not give up on
//! it: the missing reply is counted as *desync debt*, and before the next
//! request the link reads and throws away that many frames so the next frame
//! it reads is the answer to the request it just sent.
//!
//! If the server hangs up, the connection is dropped together with its debt.
//! The next cycle dials again through the link's [`Connector`] and repeats the
//! handshake before sending anything.
//!
//! The whole drain/send/receive cycle runs under one async mutex, so only one
//! cycle is ever in flight.

use core::future::Future;
use std::time::Duration;

use skirmish_types::{EvalRequest, MatchVitals};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::crypto::Cipher;
use crate::error::LinkError;
use crate::frame::{FrameReader, encode_frame};

/// Plaintext of the handshake frame sent on every new connection.
pub const HELLO: &str = "hello";

/// Opens byte streams to the evaluation server.
pub trait Connector: Send + Sync {
    /// The connected stream.
    type Stream: AsyncRead + AsyncWrite + Send;

    /// Open a new connection.
    fn connect(&self) -> impl Future<Output = Result<Self::Stream, LinkError>> + Send;
}

/// Dials the evaluation server over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Connect to `host:port`, giving up after `connect_timeout`.
    pub const fn new(host: String, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host,
            port,
            connect_timeout,
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<TcpStream, LinkError> {
        info!(host = %self.host, port = self.port, "connecting to evaluation server");
        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_elapsed| LinkError::Timeout(self.connect_timeout))?
        .map_err(|e| {
            LinkError::Io(format!(
                "failed to connect to {}:{}: {e}",
                self.host, self.port
            ))
        })?;
        stream
            .set_nodelay(true)
            .map_err(|e| LinkError::Io(format!("failed to set TCP_NODELAY: {e}")))?;
        info!("evaluation server connection established");
        Ok(stream)
    }
}

/// Counters describing the link, for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// A connection is currently open.
    pub connected: bool,
    /// Connections opened after the first one.
    pub reconnects: u64,
    /// Replies still owed by the server on the current connection.
    pub desync_debt: u32,
    /// Frames read from the server over every connection, drained ones
    /// included.
    pub frames_read: u64,
}

struct Session<S> {
    reader: FrameReader<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
    desync_debt: u32,
}

struct LinkState<S> {
    session: Option<Session<S>>,
    /// Frames read on connections that have since been dropped.
    retired_frames: u64,
    reconnects: u64,
}

/// Connection to the evaluation server, reopened on demand.
pub struct EvalServerLink<C: Connector> {
    connector: C,
    state: Mutex<LinkState<C::Stream>>,
    cipher: Cipher,
    read_timeout: Duration,
}

impl<C: Connector> EvalServerLink<C> {
    /// Open the first connection and send the handshake.
    ///
    /// # Errors
    ///
    /// Returns the connector's error, or [`LinkError::Io`] if the handshake
    /// cannot be written.
    pub async fn connect(
        connector: C,
        cipher: Cipher,
        read_timeout: Duration,
    ) -> Result<Self, LinkError> {
        let mut link = Self {
            connector,
            state: Mutex::new(LinkState {
                session: None,
                retired_frames: 0,
                reconnects: 0,
            }),
            cipher,
            read_timeout,
        };
        let session = link.open().await?;
        link.state.get_mut().session = Some(session);
        Ok(link)
    }

    /// Run one request/response cycle.
    ///
    /// Reconnects if the previous connection was lost, drains any owed
    /// frames, sends `request` and waits for the server's vitals.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Timeout`] if draining or the reply timed out. A
    ///   timed-out reply adds one to the desync debt; a timed-out drain
    ///   returns before sending and keeps what is left of the debt.
    /// - [`LinkError::Payload`] if the reply is not valid vitals JSON. The
    ///   frame was consumed, so the stream is still aligned.
    /// - [`LinkError::Closed`] or [`LinkError::Io`] if the connection could
    ///   not be opened or was lost. A lost connection is dropped and the next
    ///   cycle opens a new one.
    /// - [`LinkError::Framing`] if the server's bytes no longer line up with
    ///   frame boundaries.
    pub async fn adjudicate(&self, request: &EvalRequest) -> Result<MatchVitals, LinkError> {
        let mut state = self.state.lock().await;

        if state.session.is_none() {
            let session = self.open().await?;
            state.reconnects = state.reconnects.saturating_add(1);
            info!(reconnects = state.reconnects, "reconnected to evaluation server");
            state.session = Some(session);
        }
        let Some(session) = state.session.as_mut() else {
            return Err(LinkError::Closed);
        };

        let result = self.cycle(session, request).await;
        match &result {
            Err(e) if e.is_disconnect() => {
                warn!(error = %e, "evaluation server connection lost, reconnecting next cycle");
                Self::retire(&mut state);
            }
            _ => {}
        }
        result
    }

    /// Current counters.
    pub async fn stats(&self) -> LinkStats {
        let state = self.state.lock().await;
        let (connected, desync_debt, current_frames) = state
            .session
            .as_ref()
            .map_or((false, 0, 0), |session| {
                (true, session.desync_debt, session.reader.frames_read())
            });
        LinkStats {
            connected,
            reconnects: state.reconnects,
            desync_debt,
            frames_read: state.retired_frames.saturating_add(current_frames),
        }
    }

    async fn open(&self) -> Result<Session<C::Stream>, LinkError> {
        let stream = self.connector.connect().await?;
        let (read, write) = tokio::io::split(stream);
        let mut session = Session {
            reader: FrameReader::new(BufReader::new(read)),
            writer: write,
            desync_debt: 0,
        };
        self.send(&mut session, HELLO).await?;
        info!("sent handshake to evaluation server");
        Ok(session)
    }

    fn retire(state: &mut LinkState<C::Stream>) {
        if let Some(session) = state.session.take() {
            state.retired_frames = state
                .retired_frames
                .saturating_add(session.reader.frames_read());
            if session.desync_debt > 0 {
                debug!(
                    desync_debt = session.desync_debt,
                    "owed replies dropped with the connection"
                );
            }
        }
    }

    async fn cycle(
        &self,
        session: &mut Session<C::Stream>,
        request: &EvalRequest,
    ) -> Result<MatchVitals, LinkError> {
        self.drain(session).await?;

        let plaintext =
            serde_json::to_string(request).map_err(|e| LinkError::Payload(e.to_string()))?;
        self.send(session, &plaintext).await?;
        debug!(player = %request.player_id, action = %request.action, "sent request");

        let frame = match timeout(self.read_timeout, session.reader.next_frame()).await {
            Ok(frame) => frame?,
            Err(_elapsed) => {
                session.desync_debt = session.desync_debt.saturating_add(1);
                warn!(
                    desync_debt = session.desync_debt,
                    timeout_ms = self.read_timeout.as_millis(),
                    "evaluation server reply timed out"
                );
                return Err(LinkError::Timeout(self.read_timeout));
            }
        };

        serde_json::from_slice(&frame).map_err(|e| {
            LinkError::Payload(format!(
                "reply is not match vitals ({e}): {}",
                String::from_utf8_lossy(&frame)
            ))
        })
    }

    async fn drain(&self, session: &mut Session<C::Stream>) -> Result<(), LinkError> {
        while session.desync_debt > 0 {
            match timeout(self.read_timeout, session.reader.next_frame()).await {
                Ok(frame) => {
                    let frame = frame?;
                    session.desync_debt = session.desync_debt.saturating_sub(1);
                    debug!(
                        bytes = frame.len(),
                        desync_debt = session.desync_debt,
                        "drained stale reply"
                    );
                }
                Err(_elapsed) => {
                    warn!(
                        desync_debt = session.desync_debt,
                        "stale reply still missing, skipping this cycle"
                    );
                    return Err(LinkError::Timeout(self.read_timeout));
                }
            }
        }
        Ok(())
    }

    async fn send(
        &self,
        session: &mut Session<C::Stream>,
        plaintext: &str,
    ) -> Result<(), LinkError> {
        let frame = encode_frame(&self.cipher.encrypt(plaintext));
        session
            .writer
            .write_all(&frame)
            .await
            .map_err(|e| LinkError::Io(format!("failed to send frame: {e}")))?;
        session
            .writer
            .flush()
            .await
            .map_err(|e| LinkError::Io(format!("failed to flush frame: {e}")))
    }
}

impl<C: Connector> std::fmt::Debug for EvalServerLink<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalServerLink")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

/// In-memory connections for tests.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use tokio::io::DuplexStream;

    use super::Connector;
    use crate::error::LinkError;

    /// Hands out one queued in-memory stream per connection attempt and
    /// refuses when none is queued.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct QueuedStreams {
        streams: Arc<Mutex<VecDeque<DuplexStream>>>,
    }

    impl QueuedStreams {
        /// Queue the next connection and return its server end.
        pub(crate) fn accept_next(&self) -> DuplexStream {
            let (client, server) = tokio::io::duplex(64 * 1024);
            self.streams.lock().unwrap().push_back(client);
            server
        }
    }

    impl Connector for QueuedStreams {
        type Stream = DuplexStream;

        async fn connect(&self) -> Result<DuplexStream, LinkError> {
            self.streams
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LinkError::Io("connection refused".to_owned()))
        }
    }
}
