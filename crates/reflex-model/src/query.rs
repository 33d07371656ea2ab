//! Conjunctive equality filters over documents.
//!
//! A [`Query`] is a partial document: every field it names must equal the
//! document's stored value; fields it does not name are unconstrained. This is
//! not a predicate language.

use serde::{Deserialize, Serialize};

use reflex_types::{Bag, Value};

use crate::object::Doc;

/// A partial-match filter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    fields: Bag,
}

impl Query {
    /// The empty query, matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a query from a stored partial document.
    pub fn from_fields(fields: Bag) -> Self {
        Self { fields }
    }

    /// Builder-style equality constraint.
    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn fields(&self) -> &Bag {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if `doc` satisfies every constraint.
    ///
    /// Constraints compare against stored values, before exertion: a field
    /// left absent does not match its type's default. `_id` and `_class`
    /// compare against the document's identity. A `null` constraint matches
    /// a missing field.
    pub fn matches(&self, doc: &Doc) -> bool {
        self.fields.iter().all(|(field, expected)| {
            let actual = match field.as_str() {
                "_id" => Some(Value::String(doc.id().to_string())),
                "_class" => Some(Value::String(doc.class().to_string())),
                _ => doc.attribute(field).cloned(),
            };
            match actual {
                Some(actual) => &actual == expected,
                None => expected.is_null(),
            }
        })
    }
}
