//! RabbitMQ consumer loop feeding analytics deliveries to a handler.

use super::amqp_broker::declare_exchange;
use super::service::{BrokerError, BrokerResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    Connection, ConnectionProperties, Consumer,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const CONSUMER_TAG: &str = "linkrelay-analytics";

/// Default number of unacknowledged deliveries a consumer may hold.
pub const DEFAULT_PREFETCH: u16 = 32;

/// Receives the body of every delivery taken off the analytics queue.
///
/// The subscriber acknowledges each delivery after the handler returns,
/// whatever the handler decided to do with it.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle_delivery(&self, payload: &[u8]);
}

/// Where the subscriber attaches to the broker.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub uri: String,
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
    pub reconnect_delay: Duration,
    /// Caps in-flight deliveries so a drained backlog arrives in batches.
    pub prefetch: u16,
}

/// Long-running consumer bound to the analytics queue.
pub struct AmqpSubscriber {
    config: SubscriptionConfig,
    handler: Arc<dyn DeliveryHandler>,
}

impl AmqpSubscriber {
    pub fn new(config: SubscriptionConfig, handler: Arc<dyn DeliveryHandler>) -> Self {
        Self { config, handler }
    }

    /// Consumes forever, reconnecting after `reconnect_delay` whenever the
    /// connection or the consumer stream fails.
    pub async fn run(self) {
        loop {
            match self.consume().await {
                Ok(()) => warn!(queue = %self.config.queue, "Consumer stream ended"),
                Err(e) => error!(queue = %self.config.queue, error = %e, "Consumer failed"),
            }
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    async fn consume(&self) -> BrokerResult<()> {
        let conn = Connection::connect(&self.config.uri, ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

        let mut consumer = self.subscribe(&conn).await?;
        info!(
            queue = %self.config.queue,
            routing_key = %self.config.routing_key,
            "Analytics consumer started"
        );

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery.map_err(|e| BrokerError::Unavailable(e.to_string()))?;

            self.handler.handle_delivery(&delivery.data).await;

            delivery
                .ack(BasicAckOptions::default())
                .await
                .map_err(|e| BrokerError::Protocol(e.to_string()))?;
        }

        Ok(())
    }

    async fn subscribe(&self, conn: &Connection) -> BrokerResult<Consumer> {
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

        channel
            .basic_qos(self.config.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| BrokerError::Protocol(e.to_string()))?;

        declare_exchange(&channel, &self.config.exchange).await?;

        channel
            .queue_declare(
                &self.config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Protocol(e.to_string()))?;

        channel
            .queue_bind(
                &self.config.queue,
                &self.config.exchange,
                &self.config.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Protocol(e.to_string()))?;

        channel
            .basic_consume(
                &self.config.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Protocol(e.to_string()))
    }
}
