//! Application layer orchestrating domain operations.
//!
//! Services consume repository and infrastructure traits and expose a small
//! API to HTTP handlers. Workers run in the background for the lifetime of
//! the server.
//!
//! # Services
//!
//! - [`services::LinkService`] - Short link registration and management
//! - [`services::RedirectResolver`] - Cache-aside resolution on the redirect path
//! - [`services::EventPublisher`] - Broker / fallback queue / direct increment cascade
//!
//! # Workers
//!
//! - [`workers::BacklogReconciler`] - Re-publishes queued events to the broker
//! - [`workers::AnalyticsConsumer`] - Turns broker deliveries into counter increments

pub mod services;
pub mod workers;
