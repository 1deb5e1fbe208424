//! HTTP middleware and extractors for request processing.
//!
//! Provides caller identity extraction and request tracing.

pub mod identity;
pub mod tracing;
