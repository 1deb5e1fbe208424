//! Message broker integration (RabbitMQ over AMQP 0.9.1).
//!
//! - [`AmqpBroker`] - Publishes access events with publisher confirms
//! - [`AmqpSubscriber`] - Consumes the analytics queue and hands deliveries to a [`DeliveryHandler`]

mod amqp_broker;
mod amqp_subscriber;
mod service;

pub use amqp_broker::AmqpBroker;
pub use amqp_subscriber::{AmqpSubscriber, DEFAULT_PREFETCH, DeliveryHandler, SubscriptionConfig};
pub use service::{BrokerError, BrokerResult, EventBroker, publish_with_deadline};

#[cfg(test)]
pub use service::MockEventBroker;
