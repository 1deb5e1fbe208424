//! Background workers started by the server.

pub mod analytics_consumer;
pub mod backlog_reconciler;

pub use analytics_consumer::{AnalyticsConsumer, ConsumeOutcome, DropReason};
pub use backlog_reconciler::{BacklogReconciler, DrainReport, DrainStatus, SkipReason};
