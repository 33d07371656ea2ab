//! Error types for metamodel operations.

use thiserror::Error;

/// Errors that can occur while resolving, instantiating or reading objects.
///
/// Absence is not an error: a missing stored value reads as
/// [`Exerted::Absent`](crate::Exerted::Absent) and a query without matches
/// returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A session-dependent operation was invoked on an object that is not
    /// attached to that session.
    #[error("detached object: {0}")]
    Detached(String),

    /// The identifier is not present in the loaded model.
    #[error("not found: {0}")]
    NotFound(String),

    /// The `extends` chain of a class revisits a class already seen.
    #[error("schema cycle at {class}: {}", chain.join(" -> "))]
    SchemaCycle {
        /// The class whose resolution was requested.
        class: String,
        /// The chain walked so far, ending with the revisited class.
        chain: Vec<String>,
    },

    /// The document exists but its `_class` does not make it a class.
    #[error("not a class: {0}")]
    NotAClass(String),

    /// A resolved object does not satisfy the class its slot declares.
    #[error("class mismatch for {object}: expected {expected}, found {found}")]
    ClassMismatch {
        object: String,
        expected: String,
        found: String,
    },

    /// A mixin-qualified view was requested for a mixin the document lacks.
    #[error("mixin {mixin} is not applied to {doc}")]
    MixinNotApplied { doc: String, mixin: String },

    /// The attribute is not declared by the object's schema.
    #[error("unknown attribute {attribute} on {class}")]
    UnknownAttribute { class: String, attribute: String },

    /// A stored value does not have the shape its type requires.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// Embedded instantiation went deeper than the configured limit.
    #[error("embedding deeper than {limit} levels at {class}")]
    EmbeddingTooDeep { class: String, limit: usize },

    /// The object or type data cannot be decoded.
    #[error("malformed object: {0}")]
    Malformed(String),

    /// Internal failure (e.g. a poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ModelError {
    /// Build a [`ModelError::TypeMismatch`] describing the JSON kind found.
    pub(crate) fn mismatch(expected: &'static str, found: &serde_json::Value) -> Self {
        let found = match found {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        };
        Self::TypeMismatch {
            expected,
            found: found.to_string(),
        }
    }

    /// Returns `true` if this is a lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience alias for metamodel results.
pub type ModelResult<T> = Result<T, ModelError>;
