//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx.
//!
//! # Repositories
//!
//! - [`PgShortLinkRepository`] - Short link storage, lookups and atomic counter updates

pub mod pg_short_link_repository;

pub use pg_short_link_repository::PgShortLinkRepository;
