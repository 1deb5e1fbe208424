//! Core domain entities.
//!
//! Entities follow the "New Type" pattern with separate structs for creation
//! and partial updates:
//!
//! - [`ShortLink`] - a persisted short code to destination mapping
//! - [`NewShortLink`] - input for creating a link
//! - [`ShortLinkPatch`] - partial update

pub mod short_link;

pub use short_link::{NewShortLink, ShortLink, ShortLinkPatch};
