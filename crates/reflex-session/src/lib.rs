//! In-memory session for the Reflex metamodel.
//!
//! [`InMemorySession`] is the loaded-document arena: one identifier-indexed
//! store holding user documents and class documents alike, seeded with the
//! self-describing core model. It implements
//! [`reflex_model::Session`].
//!
//! # Design Rules
//!
//! 1. All documents, classes included, live in one arena; class-ness is a
//!    role decided by `_class`.
//! 2. Loading a document whose identifier is already present replaces it.
//! 3. Every write clears the schema cache.
//! 4. No lock is held while calling back into the session.

pub mod config;
pub mod error;
pub mod memory;

pub use config::{FindErrorPolicy, SessionConfig};
pub use error::{ConfigError, ConfigResult};
pub use memory::InMemorySession;
