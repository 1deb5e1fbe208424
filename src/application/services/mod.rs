//! Business logic services for the application layer.

pub mod event_publisher;
pub mod link_service;
pub mod redirect_resolver;

pub use event_publisher::{EventPublisher, PublishOutcome};
pub use link_service::{LinkListing, LinkService, ListParams};
pub use redirect_resolver::RedirectResolver;
