//! Evaluation relay binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from the environment
//! 3. Connect to the evaluation server and send the handshake
//! 4. Connect to NATS
//! 5. Relay resolved actions until the queue closes, the stream desyncs or Ctrl-C

use skirmish_broker::NatsBroker;
use skirmish_eval::{EvalConfig, EvalRelay, EvalServerLink, TcpConnector};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the evaluation relay.
///
/// # Errors
///
/// Returns an error if configuration, either initial connection or the relay
/// fails. A lost evaluation-server connection is reopened by the link; only a
/// stream whose frames no longer line up ends the process.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("skirmish-eval starting");

    // 2. Load configuration.
    let config = EvalConfig::from_env()?;
    info!(
        nats_url = config.nats_url,
        eval_host = config.eval_host,
        eval_port = config.eval_port,
        read_timeout_ms = config.read_timeout.as_millis(),
        eval_outbound = config.channels.update_eval_server,
        inbound = config.channels.update_ge,
        "Configuration loaded"
    );

    // 3. Connect to the evaluation server.
    let connector = TcpConnector::new(
        config.eval_host.clone(),
        config.eval_port,
        config.connect_timeout,
    );
    let link = EvalServerLink::connect(connector, config.cipher()?, config.read_timeout).await?;

    // 4. Connect to the broker.
    let broker = NatsBroker::connect(&config.nats_url).await?;

    // 5. Relay until the queue closes, the stream desyncs or we are interrupted.
    let mut relay = EvalRelay::new(broker, config.channels, link);
    tokio::select! {
        result = relay.run() => {
            let stats = result?;
            info!(corrected = stats.corrected, "skirmish-eval stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("skirmish-eval stopped by user");
        }
    }

    Ok(())
}
