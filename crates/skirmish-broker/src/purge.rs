//! Start-of-match queue purge.
//!
//! A crashed run can leave actions, resolved states and classifier output
//! sitting in the durable queues. Replaying them into a fresh match would
//! corrupt it, so the engine empties those queues before it starts
//! consuming. Purging declares each queue first, so running the bootstrap
//! against a fresh broker (or twice in a row) succeeds.

use tracing::info;

use crate::Broker;
use crate::channels::ChannelNames;
use crate::error::BrokerError;

/// How many stale messages were dropped from each queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// `(queue, purged)` in purge order.
    pub queues: Vec<(String, u64)>,
}

impl PurgeReport {
    /// Total number of messages dropped.
    pub fn total(&self) -> u64 {
        self.queues
            .iter()
            .fold(0_u64, |total, (_, purged)| total.saturating_add(*purged))
    }
}

/// Empties the durable queues before consumption begins.
#[derive(Debug)]
pub struct QueuePurgeBootstrap<'a, B> {
    broker: &'a B,
    queues: Vec<String>,
}

impl<'a, B: Broker> QueuePurgeBootstrap<'a, B> {
    /// Purge the inbound, eval-outbound and classifier queues of `channels`.
    pub fn new(broker: &'a B, channels: &ChannelNames) -> Self {
        Self {
            broker,
            queues: channels
                .purge_targets()
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Purge every queue, stopping at the first failure.
    pub async fn run(&self) -> Result<PurgeReport, BrokerError> {
        let mut report = PurgeReport::default();
        for queue in &self.queues {
            let purged = self.broker.purge(queue).await?;
            info!(queue = %queue, purged = purged, "purged queue");
            report.queues.push((queue.clone(), purged));
        }
        Ok(report)
    }
}
