//! Reflective object/document metamodel for Reflex.
//!
//! Every runtime value is an [`Obj`] carrying a reference to the [`Class`]
//! that describes it; top-level objects are [`Doc`]s with stable identifiers.
//! Classes are themselves documents, so schemas can be loaded, queried and
//! read like any other data.
//!
//! # Key Types
//!
//! - [`Type`] -- Per-attribute storage/exertion contract (`RefTo`,
//!   `InstanceOf`, `ArrayOf`, `BagOf`, native)
//! - [`Class`] / [`Schema`] -- Class documents and their resolved attributes
//! - [`Instance`] -- A live object read through its schema
//! - [`Exerted`], [`ArrayView`], [`BagView`] -- Exerted values and lazy views
//! - [`Session`] -- The runtime contract backends implement
//! - [`Query`] -- Conjunctive equality filter used by `find`

pub mod bootstrap;
pub mod class;
pub mod error;
pub mod instance;
pub mod object;
pub mod query;
pub mod schema;
pub mod traits;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

pub use bootstrap::{core_model, ids};
pub use class::{Class, ClassRole};
pub use error::{ModelError, ModelResult};
pub use instance::Instance;
pub use object::{ClassRef, Doc, DocRef, Obj};
pub use query::Query;
pub use schema::Schema;
pub use traits::{Exertion, Session, DEFAULT_EMBEDDING_LIMIT};
pub use types::{Type, TypeKind};
pub use view::{ArrayView, BagView, Exerted};
