//! Foundation types for Reflex.
//!
//! This crate provides the identity and value types used throughout the
//! Reflex metamodel. Every other Reflex crate depends on `reflex-types`.
//!
//! # Key Types
//!
//! - [`Ref`] -- Opaque, typed identifier naming a document
//! - [`SessionId`] -- UUID v7 identity of a live session
//! - [`Value`] / [`Bag`] -- Storage form of attribute values

pub mod error;
pub mod id;
pub mod session;
pub mod value;

pub use error::TypeError;
pub use id::Ref;
pub use session::SessionId;
pub use value::{present, Bag, Value};
