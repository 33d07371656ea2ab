use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Opaque, typed identifier naming a document.
///
/// A `Ref<T>` names a document described by `T` without holding an in-memory
/// handle to it. The type parameter is a phantom marker only: equality,
/// ordering and hashing look at the identifier string and nothing else, so
/// two refs with the same text name the same document whatever their marker.
///
/// On the wire a `Ref` is a bare string.
pub struct Ref<T: ?Sized> {
    id: String,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized> Ref<T> {
    /// Create a ref from an identifier string.
    ///
    /// No validation is performed; use [`Ref::parse`] for untrusted input.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _marker: PhantomData,
        }
    }

    /// Parse an identifier, rejecting the empty string.
    pub fn parse(id: &str) -> Result<Self, TypeError> {
        if id.is_empty() {
            return Err(TypeError::EmptyIdentifier);
        }
        Ok(Self::new(id))
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Re-type the ref. The identifier is unchanged.
    pub fn cast<U: ?Sized>(&self) -> Ref<U> {
        Ref::new(self.id.clone())
    }
}

impl<T: ?Sized> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self::new(self.id.clone())
    }
}

impl<T: ?Sized> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ?Sized> Eq for Ref<T> {}

impl<T: ?Sized> PartialOrd for Ref<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for Ref<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T: ?Sized> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.id)
    }
}

impl<T: ?Sized> fmt::Display for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl<T: ?Sized> From<&str> for Ref<T> {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<T: ?Sized> From<String> for Ref<T> {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl<T: ?Sized> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

impl<'de, T: ?Sized> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Self::parse(&id).map_err(serde::de::Error::custom)
    }
}
