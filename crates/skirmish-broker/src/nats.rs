//! NATS implementation of the [`Broker`] trait.
//!
//! Durable queues map onto JetStream streams with work-queue retention whose
//! only subject is the queue name. Each queue is consumed through a durable
//! pull consumer with explicit acks and at most one unacknowledged message,
//! which gives strict in-order, one-at-a-time delivery. Fan-out exchanges are
//! plain core NATS subjects: every subscriber gets every message and nothing
//! is stored.

use std::collections::HashSet;
use std::pin::Pin;

use async_nats::jetstream;
use async_nats::jetstream::consumer::{AckPolicy, pull};
use async_nats::jetstream::stream::{self, RetentionPolicy};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::BrokerError;
use crate::{Broker, Delivery, Inbound, Route};

/// Broker backed by a NATS server with JetStream enabled.
pub struct NatsBroker {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    declared: Mutex<HashSet<String>>,
}

impl NatsBroker {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Connect`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BrokerError::Connect(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        let jetstream = jetstream::new(client.clone());
        Ok(Self {
            client,
            jetstream,
            declared: Mutex::new(HashSet::new()),
        })
    }

    /// Create the work-queue stream backing `queue`, or look it up if it
    /// already exists.
    async fn declare(&self, queue: &str) -> Result<stream::Stream, BrokerError> {
        let stream = self
            .jetstream
            .get_or_create_stream(stream::Config {
                name: queue.to_owned(),
                subjects: vec![queue.to_owned()],
                retention: RetentionPolicy::WorkQueue,
                ..Default::default()
            })
            .await
            .map_err(|e| BrokerError::Subscribe(format!("failed to declare {queue}: {e}")))?;
        self.declared.lock().await.insert(queue.to_owned());
        Ok(stream)
    }

    async fn ensure_declared(&self, queue: &str) -> Result<(), BrokerError> {
        if self.declared.lock().await.contains(queue) {
            return Ok(());
        }
        self.declare(queue).await.map(drop)
    }
}

impl Broker for NatsBroker {
    type Inbound = NatsInbound;

    async fn subscribe(&self, queue: &str) -> Result<NatsInbound, BrokerError> {
        let stream = self.declare(queue).await?;
        let durable = format!("{queue}_consumer");
        let consumer = stream
            .get_or_create_consumer(
                &durable,
                pull::Config {
                    durable_name: Some(durable.clone()),
                    ack_policy: AckPolicy::Explicit,
                    max_ack_pending: 1,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| {
                BrokerError::Subscribe(format!("failed to create consumer on {queue}: {e}"))
            })?;
        let messages = consumer
            .messages()
            .await
            .map_err(|e| BrokerError::Subscribe(format!("failed to consume {queue}: {e}")))?;
        info!(queue = queue, consumer = durable, "subscribed to queue");
        Ok(NatsInbound {
            queue: queue.to_owned(),
            messages: Box::pin(messages),
        })
    }

    async fn publish(&self, route: &Route, payload: Vec<u8>) -> Result<(), BrokerError> {
        debug!(route = %route, bytes = payload.len(), "publishing");
        match route {
            Route::Queue(queue) => {
                self.ensure_declared(queue).await?;
                self.jetstream
                    .publish(queue.clone(), payload.into())
                    .await
                    .map_err(|e| BrokerError::Publish(format!("failed to publish to {queue}: {e}")))?
                    .await
                    .map_err(|e| {
                        BrokerError::Publish(format!("{queue} did not confirm publication: {e}"))
                    })?;
            }
            Route::Fanout(exchange) => {
                self.client
                    .publish(exchange.clone(), payload.into())
                    .await
                    .map_err(|e| {
                        BrokerError::Publish(format!("failed to publish to {exchange}: {e}"))
                    })?;
            }
        }
        Ok(())
    }

    async fn purge(&self, queue: &str) -> Result<u64, BrokerError> {
        let stream = self.declare(queue).await?;
        let response = stream
            .purge()
            .await
            .map_err(|e| BrokerError::Purge(format!("failed to purge {queue}: {e}")))?;
        Ok(response.purged)
    }
}

impl std::fmt::Debug for NatsBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBroker")
            .field("connected", &true)
            .finish_non_exhaustive()
    }
}

/// Deliveries from one JetStream work queue.
pub struct NatsInbound {
    queue: String,
    messages: Pin<Box<pull::Stream>>,
}

impl Inbound for NatsInbound {
    type Delivery = NatsDelivery;

    async fn next(&mut self) -> Option<Result<NatsDelivery, BrokerError>> {
        let item = self.messages.next().await?;
        Some(
            item.map(|message| NatsDelivery { message })
                .map_err(|e| BrokerError::Receive(format!("{}: {e}", self.queue))),
        )
    }
}

impl std::fmt::Debug for NatsInbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsInbound")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// One JetStream message awaiting acknowledgement.
#[derive(Debug)]
pub struct NatsDelivery {
    message: jetstream::Message,
}

impl Delivery for NatsDelivery {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    async fn ack(self) -> Result<(), BrokerError> {
        self.message
            .ack()
            .await
            .map_err(|e| BrokerError::Ack(format!("{}: {e}", self.message.subject)))
    }
}
