//! Evaluation relay.
//!
//! Consumes resolved actions from the eval-outbound queue, has the evaluation
//! server adjudicate each one, and feeds the server's vitals back to the
//! engine as an update on the inbound queue.
//!
//! | case | log | republish | ack |
//! |---|---|---|---|
//! | not a resolved action | `warn` | no | yes |
//! | adjudicated | `debug` | correction | yes |
//! | correction publish failed | `error` | no | yes |
//! | timeout / bad reply | `warn` | no | yes |
//! | connection lost | `warn` | no | yes, link reconnects next cycle |
//! | frames out of line | `error` | no | no, relay stops |
//!
//! A failed receive from the queue is logged and counted; the relay keeps
//! consuming until the subscription itself ends.

use skirmish_broker::{Broker, ChannelNames, Delivery, Inbound};
use skirmish_types::{EvalRequest, InboundMessage, MatchVitals};
use tracing::{debug, error, info, warn};

use crate::error::{EvalError, LinkError};
use crate::link::{Connector, EvalServerLink};

/// What the relay did with one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The server answered and its vitals were republished.
    Corrected(MatchVitals),
    /// The delivery was not a resolved action.
    Invalid,
    /// The link failed recoverably; no correction this time.
    Skipped,
    /// The connection dropped; the link reopens it on the next cycle.
    Disconnected,
    /// The server answered but the correction could not be republished.
    PublishFailed,
}

/// Running totals, logged when the relay stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Corrections republished to the engine.
    pub corrected: u64,
    /// Deliveries that were not resolved actions.
    pub invalid: u64,
    /// Cycles lost to timeouts or bad replies.
    pub skipped: u64,
    /// Corrections that could not be republished.
    pub publish_failed: u64,
    /// Cycles lost to a dropped connection.
    pub disconnects: u64,
    /// Failed receives from the eval-outbound queue.
    pub receive_errors: u64,
}

impl RelayStats {
    fn record(&mut self, outcome: &RelayOutcome) {
        let counter = match outcome {
            RelayOutcome::Corrected(_) => &mut self.corrected,
            RelayOutcome::Invalid => &mut self.invalid,
            RelayOutcome::Skipped => &mut self.skipped,
            RelayOutcome::PublishFailed => &mut self.publish_failed,
            RelayOutcome::Disconnected => &mut self.disconnects,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Bridges the eval-outbound queue and the evaluation server.
#[derive(Debug)]
pub struct EvalRelay<B, C: Connector> {
    broker: B,
    channels: ChannelNames,
    link: EvalServerLink<C>,
    stats: RelayStats,
}

impl<B, C> EvalRelay<B, C>
where
    B: Broker,
    C: Connector,
{
    /// Relay between `broker` and a connected `link`.
    pub const fn new(broker: B, channels: ChannelNames, link: EvalServerLink<C>) -> Self {
        Self {
            broker,
            channels,
            link,
            stats: RelayStats {
                corrected: 0,
                invalid: 0,
                skipped: 0,
                publish_failed: 0,
                disconnects: 0,
                receive_errors: 0,
            },
        }
    }

    /// The link to the evaluation server.
    pub const fn link(&self) -> &EvalServerLink<C> {
        &self.link
    }

    /// Totals so far.
    pub const fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Relay until the eval-outbound subscription ends.
    ///
    /// # Errors
    ///
    /// - [`EvalError::Broker`] if the subscription cannot be set up
    /// - [`EvalError::Link`] if the server's frames stop lining up; the
    ///   delivery being handled is left unacknowledged
    pub async fn run(&mut self) -> Result<RelayStats, EvalError> {
        let mut inbound = self
            .broker
            .subscribe(&self.channels.update_eval_server)
            .await?;
        info!(queue = %self.channels.update_eval_server, "relaying resolved actions");

        while let Some(delivery) = inbound.next().await {
            match delivery {
                Ok(delivery) => {
                    let outcome = self.handle(delivery).await?;
                    self.stats.record(&outcome);
                }
                Err(e) => {
                    self.stats.receive_errors = self.stats.receive_errors.saturating_add(1);
                    warn!(
                        error = %e,
                        receive_errors = self.stats.receive_errors,
                        "eval-outbound receive failed, waiting for the next delivery"
                    );
                }
            }
        }

        info!(
            corrected = self.stats.corrected,
            invalid = self.stats.invalid,
            skipped = self.stats.skipped,
            publish_failed = self.stats.publish_failed,
            disconnects = self.stats.disconnects,
            receive_errors = self.stats.receive_errors,
            "eval-outbound queue closed"
        );
        Ok(self.stats)
    }

    /// Adjudicate one delivery and republish the result.
    ///
    /// # Errors
    ///
    /// Returns the [`LinkError`] if the server's frames no longer line up.
    /// The delivery is dropped unacknowledged so the broker redelivers it once
    /// the relay is back.
    pub async fn handle<D: Delivery>(&self, delivery: D) -> Result<RelayOutcome, LinkError> {
        let request: EvalRequest = match serde_json::from_slice(delivery.payload()) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "dropping message that is not a resolved action");
                ack(delivery).await;
                return Ok(RelayOutcome::Invalid);
            }
        };

        let vitals = match self.link.adjudicate(&request).await {
            Ok(vitals) => vitals,
            Err(e) if e.is_fatal() => {
                error!(error = %e, "evaluation server stream is out of line");
                return Err(e);
            }
            Err(e) if e.is_disconnect() => {
                warn!(
                    error = %e,
                    player = %request.player_id,
                    action = %request.action,
                    "evaluation server unreachable, action not adjudicated"
                );
                ack(delivery).await;
                return Ok(RelayOutcome::Disconnected);
            }
            Err(e) => {
                let stats = self.link.stats().await;
                warn!(
                    error = %e,
                    player = %request.player_id,
                    action = %request.action,
                    desync_debt = stats.desync_debt,
                    "no adjudication for this action"
                );
                ack(delivery).await;
                return Ok(RelayOutcome::Skipped);
            }
        };

        let outcome = match self.republish(vitals).await {
            Ok(()) => {
                debug!(
                    player = %request.player_id,
                    action = %request.action,
                    p1_hp = vitals.p1.hp,
                    p2_hp = vitals.p2.hp,
                    "correction republished"
                );
                RelayOutcome::Corrected(vitals)
            }
            Err(e) => {
                error!(error = %e, action = %request.action, "failed to republish correction");
                RelayOutcome::PublishFailed
            }
        };
        ack(delivery).await;
        Ok(outcome)
    }

    async fn republish(&self, vitals: MatchVitals) -> Result<(), EvalError> {
        let payload = serde_json::to_vec(&InboundMessage::correction(vitals))?;
        self.broker
            .publish(&self.channels.engine_inbound(), payload)
            .await?;
        Ok(())
    }
}

async fn ack<D: Delivery>(delivery: D) {
    if let Err(e) = delivery.ack().await {
        warn!(error = %e, "failed to acknowledge message");
    }
}
