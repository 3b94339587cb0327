//! Game engine binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from the environment
//! 3. Connect to NATS
//! 4. Purge stale messages from the durable queues
//! 5. Route inbound messages until the queue closes or Ctrl-C

use skirmish_broker::{NatsBroker, QueuePurgeBootstrap};
use skirmish_engine::{EngineConfig, MessageRouter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point for the game engine.
///
/// # Errors
///
/// Returns an error if configuration, the broker connection, the queue purge
/// or the router fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("skirmish-engine starting");

    // 2. Load configuration.
    let config = EngineConfig::from_env()?;
    info!(
        nats_url = config.nats_url,
        inbound = config.channels.update_ge,
        eval_outbound = config.channels.update_eval_server,
        everyone = config.channels.update_everyone,
        purge_on_start = config.purge_on_start,
        "Configuration loaded"
    );

    // 3. Connect to the broker.
    let broker = NatsBroker::connect(&config.nats_url).await?;

    // 4. Drop anything left over from a previous run.
    if config.purge_on_start {
        let report = QueuePurgeBootstrap::new(&broker, &config.channels)
            .run()
            .await?;
        info!(purged = report.total(), "Stale messages purged");
    } else {
        warn!("Skipping queue purge; stale messages may be replayed");
    }

    // 5. Route until the inbound queue closes or we are interrupted.
    let mut router = MessageRouter::new(broker, config.channels);
    tokio::select! {
        result = router.run() => {
            let stats = result?;
            info!(handled = stats.handled, "skirmish-engine stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!(state = ?router.engine().snapshot(), "skirmish-engine stopped by user");
        }
    }

    Ok(())
}
