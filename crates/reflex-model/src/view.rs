//! Exerted values and the lazy collection views.
//!
//! [`ArrayView`] and [`BagView`] hold the backing container, the element
//! [`Type`] and the session. Reading an element exerts that element and no
//! other; the backing container is borrowed, never copied or mutated.

use std::borrow::Cow;
use std::fmt;

use reflex_types::{Bag, Value};

use crate::error::ModelResult;
use crate::instance::Instance;
use crate::object::{ClassRef, Doc, DocRef};
use crate::traits::Session;
use crate::types::Type;

/// The externally-visible value of an attribute.
#[derive(Debug)]
pub enum Exerted<'a> {
    /// No stored value and no default.
    Absent,
    /// A stored or default value, borrowed.
    Value(&'a Value),
    /// A value computed by a native exertion.
    Owned(Value),
    /// An unresolved document identifier and the class it must satisfy.
    Ref { id: DocRef, to: &'a ClassRef },
    /// A live embedded object.
    Instance(Cow<'a, Instance>),
    /// A lazily exerted sequence.
    Array(ArrayView<'a>),
    /// A lazily exerted keyed mapping.
    Bag(BagView<'a>),
}

impl<'a> Exerted<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The plain value, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Owned(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doc_ref(&self) -> Option<&DocRef> {
        match self {
            Self::Ref { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(&**instance),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayView<'a>> {
        match self {
            Self::Array(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&BagView<'a>> {
        match self {
            Self::Bag(view) => Some(view),
            _ => None,
        }
    }

    /// Resolve a reference through the session, checking the target class.
    ///
    /// Returns `Ok(None)` for anything that is not a reference.
    pub fn resolve(&self, session: &dyn Session) -> ModelResult<Option<Doc>> {
        match self {
            Self::Ref { id, to } => session.get_instance_of(id, to).map(Some),
            _ => Ok(None),
        }
    }

    /// Materialize back to storage form.
    ///
    /// Collections are exerted element by element, so this pays the full
    /// cost the views otherwise avoid.
    pub fn to_value(&self) -> ModelResult<Value> {
        match self {
            Self::Absent => Ok(Value::Null),
            Self::Value(v) => Ok((*v).clone()),
            Self::Owned(v) => Ok(v.clone()),
            Self::Ref { id, .. } => Ok(Value::String(id.to_string())),
            Self::Instance(instance) => Ok(instance.to_value()),
            Self::Array(view) => view
                .iter()
                .map(|element| element?.to_value())
                .collect::<ModelResult<Vec<_>>>()
                .map(Value::Array),
            Self::Bag(view) => {
                let mut map = Bag::new();
                for (key, element) in view.iter() {
                    map.insert(key.to_string(), element?.to_value()?);
                }
                Ok(Value::Object(map))
            }
        }
    }
}

/// Read-only, lazily exerted view over a stored sequence.
#[derive(Clone, Copy)]
pub struct ArrayView<'a> {
    session: &'a dyn Session,
    of: &'a Type,
    items: &'a [Value],
}

impl<'a> ArrayView<'a> {
    pub fn new(session: &'a dyn Session, of: &'a Type, items: &'a [Value]) -> Self {
        Self { session, of, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The element type.
    pub fn element_type(&self) -> &'a Type {
        self.of
    }

    /// The backing sequence, unexerted.
    pub fn raw(&self) -> &'a [Value] {
        self.items
    }

    /// Exert the element at `index`. `Ok(None)` when out of bounds.
    pub fn get(&self, index: usize) -> ModelResult<Option<Exerted<'a>>> {
        match self.items.get(index) {
            Some(item) => self.of.exert(self.session, Some(item)).map(Some),
            None => Ok(None),
        }
    }

    /// Exert elements in order as the iterator advances.
    pub fn iter(&self) -> impl Iterator<Item = ModelResult<Exerted<'a>>> + 'a {
        let (session, of) = (self.session, self.of);
        self.items.iter().map(move |item| of.exert(session, Some(item)))
    }
}

impl fmt::Debug for ArrayView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayView")
            .field("of", self.of.class())
            .field("len", &self.items.len())
            .finish()
    }
}

/// Read-only, lazily exerted view over a stored keyed mapping.
#[derive(Clone, Copy)]
pub struct BagView<'a> {
    session: &'a dyn Session,
    of: &'a Type,
    entries: &'a Bag,
}

impl<'a> BagView<'a> {
    pub fn new(session: &'a dyn Session, of: &'a Type, entries: &'a Bag) -> Self {
        Self {
            session,
            of,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.keys().map(String::as_str)
    }

    /// The element type.
    pub fn element_type(&self) -> &'a Type {
        self.of
    }

    /// The backing mapping, unexerted.
    pub fn raw(&self) -> &'a Bag {
        self.entries
    }

    /// Exert the value under `key`. `Ok(None)` when the key is missing.
    pub fn get(&self, key: &str) -> ModelResult<Option<Exerted<'a>>> {
        match self.entries.get(key) {
            Some(item) => self.of.exert(self.session, Some(item)).map(Some),
            None => Ok(None),
        }
    }

    /// Exert values as the iterator advances.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, ModelResult<Exerted<'a>>)> + 'a {
        let (session, of) = (self.session, self.of);
        self.entries
            .iter()
            .map(move |(key, item)| (key.as_str(), of.exert(session, Some(item))))
    }
}

impl fmt::Debug for BagView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BagView")
            .field("of", self.of.class())
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counting_type, StubSession};
    use serde_json::json;

    // -----------------------------------------------------------------------
    // ArrayView
    // -----------------------------------------------------------------------

    #[test]
    fn array_element_equals_element_exert() {
        let session = StubSession::new();
        let element = Type::plain().with_default(json!("none"));
        let ty = Type::array_of(element.clone());
        let stored = json!(["a", null, "c"]);
        let exerted = ty.exert(&session, Some(&stored)).unwrap();
        let view = exerted.as_array().unwrap();

        assert_eq!(view.len(), 3);
        for (i, item) in stored.as_array().unwrap().iter().enumerate() {
            let direct = element.exert(&session, Some(item)).unwrap().to_value().unwrap();
            let via_view = view.get(i).unwrap().unwrap().to_value().unwrap();
            assert_eq!(direct, via_view);
        }
        assert!(view.get(3).unwrap().is_none());
    }

    #[test]
    fn unread_array_elements_are_never_exerted() {
        let (session, counter) = StubSession::with_counting();
        let ty = Type::array_of(counting_type());
        let stored = json!([1, 2, 3, 4, 5]);

        let exerted = ty.exert(&session, Some(&stored)).unwrap();
        assert_eq!(counter.get(), 0);

        let view = exerted.as_array().unwrap();
        assert_eq!(view.get(3).unwrap().unwrap().as_value(), Some(&json!(4)));
        assert_eq!(counter.get(), 1);

        let first_two: Vec<_> = view.iter().take(2).collect();
        assert_eq!(first_two.len(), 2);
        assert_eq!(counter.get(), 3);
    }

    #[test]
    fn array_view_does_not_copy_backing_sequence() {
        let session = StubSession::new();
        let ty = Type::array_of(Type::plain());
        let stored = json!([1, 2]);
        let exerted = ty.exert(&session, Some(&stored)).unwrap();
        let view = exerted.as_array().unwrap();
        assert!(std::ptr::eq(view.raw(), stored.as_array().unwrap().as_slice()));
    }

    // -----------------------------------------------------------------------
    // BagView
    // -----------------------------------------------------------------------

    #[test]
    fn bag_value_equals_element_exert() {
        let session = StubSession::new();
        let element = Type::ref_to(ClassRef::new("class:app.Person"));
        let ty = Type::bag_of(element);
        let stored = json!({"owner": "p1", "editor": "p2"});
        let exerted = ty.exert(&session, Some(&stored)).unwrap();
        let view = exerted.as_bag().unwrap();

        assert_eq!(view.len(), 2);
        assert!(view.contains_key("owner"));
        assert_eq!(
            view.get("editor").unwrap().unwrap().as_doc_ref(),
            Some(&DocRef::new("p2"))
        );
        assert!(view.get("viewer").unwrap().is_none());
    }

    #[test]
    fn unread_bag_values_are_never_exerted() {
        let (session, counter) = StubSession::with_counting();
        let ty = Type::bag_of(counting_type());
        let stored = json!({"a": 1, "b": 2, "c": 3});

        let exerted = ty.exert(&session, Some(&stored)).unwrap();
        let view = exerted.as_bag().unwrap();
        assert_eq!(view.keys().count(), 3);
        assert_eq!(counter.get(), 0);

        assert_eq!(view.get("b").unwrap().unwrap().as_value(), Some(&json!(2)));
        assert_eq!(counter.get(), 1);
    }

    // -----------------------------------------------------------------------
    // Materialization
    // -----------------------------------------------------------------------

    #[test]
    fn nested_collections_materialize_and_are_idempotent() {
        let session = StubSession::new();
        let ty = Type::bag_of(Type::array_of(Type::plain().with_default(json!(0))));
        let stored = json!({"x": [1, null], "y": []});

        let once = ty.exert(&session, Some(&stored)).unwrap().to_value().unwrap();
        assert_eq!(once, json!({"x": [1, 0], "y": []}));

        let twice = ty.exert(&session, Some(&once)).unwrap().to_value().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_materializes_to_null() {
        assert_eq!(Exerted::Absent.to_value().unwrap(), Value::Null);
    }

    #[test]
    fn resolve_ignores_non_refs() {
        let session = StubSession::new();
        let v = json!(1);
        assert!(Exerted::Value(&v).resolve(&session).unwrap().is_none());
    }
}
