//! RabbitMQ publisher built on lapin.

use super::service::{BrokerError, BrokerResult, EventBroker};
use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
    options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions},
    types::FieldTable,
};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const PERSISTENT_DELIVERY: u8 = 2;
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Open connection together with its confirm-mode channel.
struct Session {
    _connection: Connection,
    channel: Channel,
}

/// Publishes analytics events to a durable topic exchange.
///
/// The connection is opened lazily and re-opened on the next publish after
/// it drops, so a broker outage at startup does not prevent the service
/// from starting.
pub struct AmqpBroker {
    uri: String,
    exchange: String,
    session: Mutex<Option<Session>>,
}

impl AmqpBroker {
    pub fn new(uri: impl Into<String>, exchange: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            exchange: exchange.into(),
            session: Mutex::new(None),
        }
    }

    /// Opens the connection eagerly. Failure is logged; the next publish retries.
    pub async fn warm_up(&self) {
        let mut slot = self.session.lock().await;
        match open_session(&self.uri, &self.exchange).await {
            Ok(session) => {
                info!(exchange = %self.exchange, "Connected to RabbitMQ");
                *slot = Some(session);
            }
            Err(e) => warn!(error = %e, "RabbitMQ not reachable at startup, will retry on publish"),
        }
    }

    async fn channel(&self) -> BrokerResult<Channel> {
        let mut slot = self.session.lock().await;

        if let Some(session) = slot.as_ref()
            && session.channel.status().connected()
        {
            return Ok(session.channel.clone());
        }

        debug!("Opening RabbitMQ channel");
        let session = open_session(&self.uri, &self.exchange).await?;
        let channel = session.channel.clone();
        *slot = Some(session);
        Ok(channel)
    }

    async fn reset(&self) {
        *self.session.lock().await = None;
    }
}

async fn open_session(uri: &str, exchange: &str) -> BrokerResult<Session> {
    let conn = Connection::connect(uri, ConnectionProperties::default())
        .await
        .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

    let channel = conn
        .create_channel()
        .await
        .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await
        .map_err(|e| BrokerError::Protocol(e.to_string()))?;

    declare_exchange(&channel, exchange).await?;

    Ok(Session {
        _connection: conn,
        channel,
    })
}

/// Declares the durable topic exchange both sides agree on.
pub(super) async fn declare_exchange(channel: &Channel, exchange: &str) -> BrokerResult<()> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| BrokerError::Protocol(e.to_string()))
}

#[async_trait]
impl EventBroker for AmqpBroker {
    async fn publish(&self, topic: &str, routing_key: &str, payload: &[u8]) -> BrokerResult<()> {
        let channel = self.channel().await?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT_DELIVERY);

        let confirm = match channel
            .basic_publish(
                topic,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
        {
            Ok(confirm) => confirm,
            Err(e) => {
                self.reset().await;
                return Err(BrokerError::Unavailable(e.to_string()));
            }
        };

        let confirmation = confirm
            .await
            .map_err(|e| BrokerError::Protocol(e.to_string()))?;

        if confirmation.is_nack() {
            return Err(BrokerError::Nacked);
        }

        debug!(topic, routing_key, "Event confirmed by broker");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        matches!(
            tokio::time::timeout(HEALTH_PROBE_TIMEOUT, self.channel()).await,
            Ok(Ok(_))
        )
    }
}
