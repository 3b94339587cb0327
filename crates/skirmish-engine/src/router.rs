//! Inbound queue consumer.
//!
//! [`MessageRouter`] is the engine's only consumer. It takes one delivery at a
//! time from the inbound queue and runs it to completion (parse, apply,
//! publish, ack) before asking for the next, so no two events ever see the
//! match state at the same time.
//!
//! Per-delivery outcomes:
//!
//! | case | log | publishes | ack |
//! |---|---|---|---|
//! | invalid envelope | `warn` | nothing | yes |
//! | guard rejection | `debug` | nothing | yes |
//! | handled | `debug` | eval, then fan-out | yes, after publishing |
//! | publication failed | `error` | partial | no (redelivered) |
//!
//! A receive error reported by the subscription is logged and counted, and
//! the router keeps consuming; the broker client reconnects on its own. Only
//! the end of the subscription stops the router.

use skirmish_broker::{Broker, ChannelNames, Delivery, Inbound};
use skirmish_types::{InboundMessage, ValidationError};
use tracing::{debug, error, info, warn};

use crate::engine::{GameStateEngine, Publications};
use crate::error::EngineError;

/// What the router did with one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Applied; `published` messages went out and the delivery was acked.
    Handled {
        /// Number of messages published.
        published: usize,
    },
    /// The envelope was malformed; acked and dropped.
    Invalid,
    /// The resolver rejected the action; acked and dropped.
    Rejected,
    /// A publication failed; the delivery was left for redelivery.
    Unacked,
}

/// Running totals, logged when the router stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Deliveries applied and acked.
    pub handled: u64,
    /// Malformed envelopes dropped.
    pub invalid: u64,
    /// Actions rejected by a guard.
    pub rejected: u64,
    /// Deliveries left unacked after a failed publication.
    pub unacked: u64,
    /// Receive errors reported by the subscription.
    pub receive_errors: u64,
}

impl RouterStats {
    fn record(&mut self, outcome: RouteOutcome) {
        let counter = match outcome {
            RouteOutcome::Handled { .. } => &mut self.handled,
            RouteOutcome::Invalid => &mut self.invalid,
            RouteOutcome::Rejected => &mut self.rejected,
            RouteOutcome::Unacked => &mut self.unacked,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Consumes the inbound queue and drives the [`GameStateEngine`].
#[derive(Debug)]
pub struct MessageRouter<B> {
    broker: B,
    channels: ChannelNames,
    engine: GameStateEngine,
    stats: RouterStats,
}

impl<B: Broker> MessageRouter<B> {
    /// Route messages for a fresh match.
    pub fn new(broker: B, channels: ChannelNames) -> Self {
        Self::with_engine(broker, channels, GameStateEngine::new())
    }

    /// Route messages into an existing engine.
    pub fn with_engine(broker: B, channels: ChannelNames, engine: GameStateEngine) -> Self {
        Self {
            broker,
            channels,
            engine,
            stats: RouterStats::default(),
        }
    }

    /// The engine being driven.
    pub const fn engine(&self) -> &GameStateEngine {
        &self.engine
    }

    /// Totals so far.
    pub const fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Consume the inbound queue until the subscription ends.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Broker`] if the subscription cannot be set up.
    pub async fn run(&mut self) -> Result<RouterStats, EngineError> {
        let mut inbound = self.broker.subscribe(&self.channels.update_ge).await?;
        info!(queue = %self.channels.update_ge, "consuming inbound queue");

        while let Some(delivery) = inbound.next().await {
            match delivery {
                Ok(delivery) => {
                    let outcome = self.handle(delivery).await;
                    self.stats.record(outcome);
                }
                Err(e) => {
                    self.stats.receive_errors = self.stats.receive_errors.saturating_add(1);
                    warn!(
                        error = %e,
                        receive_errors = self.stats.receive_errors,
                        "inbound receive failed, waiting for the next delivery"
                    );
                }
            }
        }

        info!(
            handled = self.stats.handled,
            invalid = self.stats.invalid,
            rejected = self.stats.rejected,
            unacked = self.stats.unacked,
            receive_errors = self.stats.receive_errors,
            "inbound queue closed"
        );
        Ok(self.stats)
    }

    /// Parse, apply, publish and acknowledge one delivery.
    pub async fn handle<D: Delivery>(&mut self, delivery: D) -> RouteOutcome {
        let event = match InboundMessage::from_slice(delivery.payload())
            .and_then(InboundMessage::into_event)
        {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, kind = validation_kind(&e), "dropping invalid message");
                ack(delivery).await;
                return RouteOutcome::Invalid;
            }
        };

        let kind = event.kind();
        let publications = match self.engine.apply(event) {
            Ok(publications) => publications,
            Err(rejection) => {
                debug!(event = kind, reason = %rejection, "action rejected");
                ack(delivery).await;
                return RouteOutcome::Rejected;
            }
        };

        if let Err(e) = self.publish(&publications).await {
            error!(event = kind, error = %e, "publication failed, leaving message for redelivery");
            return RouteOutcome::Unacked;
        }

        debug!(event = kind, published = publications.len(), "message handled");
        ack(delivery).await;
        RouteOutcome::Handled {
            published: publications.len(),
        }
    }

    async fn publish(&self, publications: &Publications) -> Result<(), EngineError> {
        if let Some(resolved) = &publications.eval {
            let payload = serde_json::to_vec(resolved)?;
            self.broker
                .publish(&self.channels.eval_outbound(), payload)
                .await?;
        }
        if let Some(broadcast) = &publications.broadcast {
            let payload = serde_json::to_vec(broadcast)?;
            self.broker.publish(&self.channels.everyone(), payload).await?;
        }
        Ok(())
    }
}

async fn ack<D: Delivery>(delivery: D) {
    if let Err(e) = delivery.ack().await {
        warn!(error = %e, "failed to acknowledge message");
    }
}

const fn validation_kind(error: &ValidationError) -> &'static str {
    match error {
        ValidationError::Malformed(_) => "malformed",
        ValidationError::MissingField(_) => "missing_field",
        ValidationError::InvalidPlayer(_) => "invalid_player",
        ValidationError::UnknownAction(_) => "unknown_action",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skirmish_broker::MemoryBroker;

    use super::*;

    async fn route_one(broker: &MemoryBroker, payload: &str) -> RouteOutcome {
        let channels = ChannelNames::default();
        broker.inject(&channels.update_ge, payload);
        let mut inbound = broker.subscribe(&channels.update_ge).await.unwrap();
        let delivery = inbound.next().await.unwrap().unwrap();
        MessageRouter::new(broker.clone(), channels).handle(delivery).await
    }

    #[tokio::test]
    async fn invalid_envelope_is_acked_and_dropped() {
        let broker = MemoryBroker::new();
        let outcome = route_one(&broker, r#"{"action":true,"player_id":7}"#).await;

        assert_eq!(outcome, RouteOutcome::Invalid);
        assert_eq!(broker.acked("update_ge_queue"), 1);
        assert!(broker.fanout_messages("update_everyone_exchange").is_empty());
    }

    #[tokio::test]
    async fn rejected_action_is_acked_without_publishing() {
        let broker = MemoryBroker::new();
        let outcome = route_one(
            &broker,
            r#"{"action":true,"player_id":1,"action_type":"gun","game_state":{"p2":{"login":false}}}"#,
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Rejected);
        assert_eq!(broker.acked("update_ge_queue"), 1);
        assert!(broker.pending("update_eval_server_queue").is_empty());
        assert!(broker.fanout_messages("update_everyone_exchange").is_empty());
    }

    #[tokio::test]
    async fn failed_publication_leaves_delivery_unacked() {
        let broker = MemoryBroker::new();
        broker.reject_publishes(true);
        let outcome = route_one(&broker, r#"{"update":true}"#).await;

        assert_eq!(outcome, RouteOutcome::Unacked);
        assert_eq!(broker.delivered("update_ge_queue"), 1);
        assert_eq!(broker.acked("update_ge_queue"), 0);
    }

    #[tokio::test]
    async fn receive_error_is_counted_and_consumption_continues() {
        let broker = MemoryBroker::new();
        let channels = ChannelNames::default();
        let gun = r#"{"action":true,"player_id":1,"action_type":"gun","hit":true}"#;
        broker.inject(&channels.update_ge, gun);
        broker.inject_receive_error(&channels.update_ge, "missed idle heartbeat");
        broker.inject(&channels.update_ge, gun);
        broker.close(&channels.update_ge);

        let mut router = MessageRouter::new(broker.clone(), channels);
        let stats = router.run().await.unwrap();

        assert_eq!(stats.handled, 2);
        assert_eq!(stats.receive_errors, 1);
        assert_eq!(router.engine().snapshot().p2.hp, 90);
        assert_eq!(broker.acked("update_ge_queue"), 2);
    }

    #[test]
    fn stats_count_each_outcome() {
        let mut stats = RouterStats::default();
        stats.record(RouteOutcome::Handled { published: 2 });
        stats.record(RouteOutcome::Handled { published: 0 });
        stats.record(RouteOutcome::Rejected);
        stats.record(RouteOutcome::Unacked);
        assert_eq!(
            stats,
            RouterStats {
                handled: 2,
                invalid: 0,
                rejected: 1,
                unacked: 1,
                receive_errors: 0
            }
        );
    }
}
