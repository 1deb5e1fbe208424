//! Utility functions for code generation, URL validation, and request handling.
//!
//! - [`code_generator`] - Content-derived short code generation
//! - [`origin`] - Destination URL validation
//! - [`client_info`] - Client IP and user agent extraction from HTTP requests

pub mod client_info;
pub mod code_generator;
pub mod origin;
