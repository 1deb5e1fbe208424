//! Domain layer containing business entities and repository contracts.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`access_event`] - The "url accessed" analytics event and its wire format
//!
//! # Access Event Flow
//!
//! 1. [`crate::application::services::RedirectResolver`] resolves a short code
//! 2. An [`access_event::AccessEvent`] is handed to the
//!    [`crate::application::services::EventPublisher`] cascade
//!    (broker → fallback queue → direct counter increment)
//! 3. Queued events are re-published by
//!    [`crate::application::workers::BacklogReconciler`]
//! 4. [`crate::application::workers::AnalyticsConsumer`] turns broker
//!    deliveries into counter increments

pub mod access_event;
pub mod entities;
pub mod repositories;
