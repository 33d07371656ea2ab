//! Runtime objects and documents.
//!
//! - [`Obj`] is the root of every runtime value. It knows its class and holds
//!   its attributes in storage form. An `Obj` without an identifier is an
//!   *embedded* object: it lives only inside the attribute slot that holds it.
//! - [`Doc`] is an `Obj` with a stable identifier and optional mixins.
//!
//! Both carry an assignable owner ([`SessionId`]) set when they pass through a
//! session. Methods that need the session take it explicitly and refuse to
//! run against a session that does not own the object.

use serde::{Deserialize, Deserializer, Serialize};

use reflex_types::{Bag, Ref, SessionId, Value};

use crate::class::Class;
use crate::error::{ModelError, ModelResult};
use crate::traits::Session;

/// Identifier of a class (or mixin) document.
pub type ClassRef = Ref<Class>;

/// Identifier of any document.
pub type DocRef = Ref<Doc>;

/// A runtime object: a class reference plus stored attributes.
///
/// Serialized as a JSON object with a `_class` key and one key per attribute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Obj {
    #[serde(rename = "_class")]
    class: ClassRef,
    #[serde(flatten)]
    attributes: Bag,
    #[serde(skip)]
    owner: Option<SessionId>,
}

impl Obj {
    /// Create a detached object of the given class with no attributes.
    pub fn new(class: ClassRef) -> Self {
        Self::with_attributes(class, Bag::new())
    }

    /// Create a detached object with the given stored attributes.
    pub fn with_attributes(class: ClassRef, attributes: Bag) -> Self {
        Self {
            class,
            attributes,
            owner: None,
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Decode an object from its stored JSON form.
    pub fn from_value(value: Value) -> ModelResult<Self> {
        serde_json::from_value(value).map_err(|e| ModelError::Malformed(e.to_string()))
    }

    /// Encode the object to its stored JSON form.
    pub fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        map.insert("_class".into(), Value::String(self.class.to_string()));
        Value::Object(map)
    }

    /// The class describing this object.
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// All stored attributes.
    pub fn attributes(&self) -> &Bag {
        &self.attributes
    }

    /// A single stored attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Write a stored attribute, returning the previous value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.attributes.insert(name.into(), value)
    }

    /// The session this object is attached to, if any.
    pub fn owner(&self) -> Option<SessionId> {
        self.owner
    }

    /// Attach the object to a session.
    pub fn attach(&mut self, session: SessionId) {
        self.owner = Some(session);
    }

    /// Detach the object from its session.
    pub fn detach(&mut self) {
        self.owner = None;
    }

    /// Fail with [`ModelError::Detached`] unless `session` owns this object.
    pub fn ensure_attached(&self, session: SessionId) -> ModelResult<()> {
        match self.owner {
            Some(owner) if owner == session => Ok(()),
            Some(owner) => Err(ModelError::Detached(format!(
                "object of {} belongs to session {}, not {}",
                self.class,
                owner.short_id(),
                session.short_id()
            ))),
            None => Err(ModelError::Detached(format!(
                "object of {} is not attached to any session",
                self.class
            ))),
        }
    }

    /// Resolve this object's class through the owning session.
    pub fn get_class(&self, session: &dyn Session) -> ModelResult<Class> {
        self.ensure_attached(session.id())?;
        session.get_class(&self.class)
    }

    /// Human-readable label of this object's class.
    pub fn to_intl_string(&self, session: &dyn Session, plural: Option<u64>) -> ModelResult<String> {
        Ok(self.get_class(session)?.to_intl_string(plural))
    }
}

impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.attributes == other.attributes
    }
}

/// A document: an identified object that participates in the model.
///
/// Serialized like [`Obj`] plus `_id` and, when non-empty, `_mixins`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    #[serde(rename = "_id")]
    id: DocRef,
    #[serde(
        rename = "_mixins",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    mixins: Vec<ClassRef>,
    #[serde(flatten)]
    obj: Obj,
}

/// A stored `null` reads like a missing key.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ClassRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ClassRef>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Doc {
    /// Create a detached document with no attributes.
    pub fn new(id: DocRef, class: ClassRef) -> Self {
        Self::from_obj(id, Obj::new(class))
    }

    /// Give an object an identity.
    pub fn from_obj(id: DocRef, obj: Obj) -> Self {
        Self {
            id,
            mixins: Vec::new(),
            obj,
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.obj.set_attribute(name, value);
        self
    }

    /// Builder-style mixin setter.
    pub fn with_mixin(mut self, mixin: ClassRef) -> Self {
        self.add_mixin(mixin);
        self
    }

    /// Decode a document from its stored JSON form.
    pub fn from_value(value: Value) -> ModelResult<Self> {
        serde_json::from_value(value).map_err(|e| ModelError::Malformed(e.to_string()))
    }

    /// Encode the document to its stored JSON form.
    pub fn to_value(&self) -> Value {
        let mut value = self.obj.to_value();
        if let Value::Object(map) = &mut value {
            map.insert("_id".into(), Value::String(self.id.to_string()));
            if !self.mixins.is_empty() {
                let mixins = self
                    .mixins
                    .iter()
                    .map(|m| Value::String(m.to_string()))
                    .collect();
                map.insert("_mixins".into(), Value::Array(mixins));
            }
        }
        value
    }

    pub fn id(&self) -> &DocRef {
        &self.id
    }

    pub fn class(&self) -> &ClassRef {
        self.obj.class()
    }

    /// Mixins this document carries in addition to its class.
    pub fn mixins(&self) -> &[ClassRef] {
        &self.mixins
    }

    pub fn has_mixin(&self, mixin: &ClassRef) -> bool {
        self.mixins.contains(mixin)
    }

    /// Add a mixin. Returns `false` if it was already present.
    pub fn add_mixin(&mut self, mixin: ClassRef) -> bool {
        if self.has_mixin(&mixin) {
            return false;
        }
        self.mixins.push(mixin);
        true
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.obj.attribute(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.obj.set_attribute(name, value)
    }

    pub fn as_obj(&self) -> &Obj {
        &self.obj
    }

    pub fn as_obj_mut(&mut self) -> &mut Obj {
        &mut self.obj
    }

    pub fn into_obj(self) -> Obj {
        self.obj
    }

    pub fn owner(&self) -> Option<SessionId> {
        self.obj.owner()
    }

    pub fn attach(&mut self, session: SessionId) {
        self.obj.attach(session);
    }

    /// Resolve this document's class through the owning session.
    pub fn get_class(&self, session: &dyn Session) -> ModelResult<Class> {
        self.obj.get_class(session)
    }

    /// Human-readable label of this document's class.
    pub fn to_intl_string(&self, session: &dyn Session, plural: Option<u64>) -> ModelResult<String> {
        self.obj.to_intl_string(session, plural)
    }
}
