//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for persistence, caching and messaging.
//!
//! # Modules
//!
//! - [`broker`] - RabbitMQ publisher and analytics subscriber
//! - [`cache`] - Caching abstractions (Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`queue`] - Fallback queue for events the broker did not accept

pub mod broker;
pub mod cache;
pub mod persistence;
pub mod queue;
