//! The type algebra.
//!
//! A [`Type`] describes how one attribute is stored and how its stored value
//! is *exerted* (turned into the value a reader sees). Types are themselves
//! embedded objects: their `_class` selects the specialization and their
//! remaining attributes carry its parameters.
//!
//! | class                   | exerted value                                   |
//! |-------------------------|-------------------------------------------------|
//! | `class:core.Type`       | the stored value, or the default                |
//! | `class:core.RefTo`      | the stored identifier, unresolved               |
//! | `class:core.InstanceOf` | the embedded object, instantiated by the session |
//! | `class:core.ArrayOf`    | a lazy [`ArrayView`] over the stored sequence    |
//! | `class:core.BagOf`      | a lazy [`BagView`] over the stored mapping       |
//! | anything else           | the session's native [`Exertion`], if bound      |
//!
//! [`Exertion`]: crate::traits::Exertion

use serde::{Deserialize, Serialize};

use reflex_types::{present, Bag, Value};

use crate::bootstrap::ids;
use crate::error::{ModelError, ModelResult};
use crate::object::{ClassRef, DocRef, Obj};
use crate::traits::Session;
use crate::view::{ArrayView, BagView, Exerted};

/// Specialization of a [`Type`].
#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
    /// Identity substitution.
    Plain,
    /// Identifier of a document of class `to`.
    RefTo { to: ClassRef },
    /// Embedded object of class `of`.
    InstanceOf { of: ClassRef },
    /// Sequence of values of the element type.
    ArrayOf { of: Box<Type> },
    /// Keyed mapping of values of the element type.
    BagOf { of: Box<Type> },
    /// Host-implemented type; `params` are the type object's own attributes.
    Native { params: Bag },
}

/// One attribute's storage/exertion contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Obj", into = "Obj")]
pub struct Type {
    class: ClassRef,
    default: Option<Value>,
    kind: TypeKind,
}

impl Type {
    fn builtin(class: &str, kind: TypeKind) -> Self {
        Self {
            class: ClassRef::new(class),
            default: None,
            kind,
        }
    }

    /// A plain value type.
    pub fn plain() -> Self {
        Self::builtin(ids::TYPE, TypeKind::Plain)
    }

    /// A reference to a document of class `to`.
    pub fn ref_to(to: ClassRef) -> Self {
        Self::builtin(ids::REF_TO, TypeKind::RefTo { to })
    }

    /// An embedded object of class `of`.
    pub fn instance_of(of: ClassRef) -> Self {
        Self::builtin(ids::INSTANCE_OF, TypeKind::InstanceOf { of })
    }

    /// A sequence of `of` values.
    pub fn array_of(of: Type) -> Self {
        Self::builtin(ids::ARRAY_OF, TypeKind::ArrayOf { of: Box::new(of) })
    }

    /// A keyed mapping of `of` values.
    pub fn bag_of(of: Type) -> Self {
        Self::builtin(ids::BAG_OF, TypeKind::BagOf { of: Box::new(of) })
    }

    /// A host-implemented type described by `class`.
    pub fn native(class: ClassRef) -> Self {
        Self {
            class,
            default: None,
            kind: TypeKind::Native { params: Bag::new() },
        }
    }

    /// Builder-style default setter.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Builder-style parameter setter for native types. Ignored otherwise.
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        if let TypeKind::Native { params } = &mut self.kind {
            params.insert(name.into(), value);
        }
        self
    }

    /// The class of this type object.
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// A native type's parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        match &self.kind {
            TypeKind::Native { params } => params.get(name),
            _ => None,
        }
    }

    /// The stored value if present (not missing, not null), else the default.
    pub fn effective<'a>(&'a self, stored: Option<&'a Value>) -> Option<&'a Value> {
        present(stored).or_else(|| present(self.default.as_ref()))
    }

    /// Compute the externally-visible value of a stored value.
    ///
    /// Never resolves references and never exerts collection elements: those
    /// are exerted one at a time when read through the returned view.
    pub fn exert<'a>(
        &'a self,
        session: &'a dyn Session,
        stored: Option<&'a Value>,
    ) -> ModelResult<Exerted<'a>> {
        if let TypeKind::Native { .. } = self.kind {
            if let Some(exertion) = session.exertion_for(&self.class)? {
                return exertion.exert(session, self, stored);
            }
        }

        let Some(value) = self.effective(stored) else {
            return Ok(Exerted::Absent);
        };

        match &self.kind {
            TypeKind::Plain | TypeKind::Native { .. } => Ok(Exerted::Value(value)),
            TypeKind::RefTo { to } => match value {
                Value::String(id) => Ok(Exerted::Ref {
                    id: DocRef::new(id.as_str()),
                    to,
                }),
                other => Err(ModelError::mismatch("identifier string", other)),
            },
            TypeKind::InstanceOf { of } => {
                let obj = Obj::from_value(value.clone())?;
                let instance = session.instantiate(&obj)?;
                if !instance.is_a(of) {
                    return Err(ModelError::ClassMismatch {
                        object: "embedded object".into(),
                        expected: of.to_string(),
                        found: obj.class().to_string(),
                    });
                }
                Ok(Exerted::Instance(std::borrow::Cow::Owned(instance)))
            }
            TypeKind::ArrayOf { of } => match value {
                Value::Array(items) => Ok(Exerted::Array(ArrayView::new(session, of, items))),
                other => Err(ModelError::mismatch("array", other)),
            },
            TypeKind::BagOf { of } => match value {
                Value::Object(entries) => Ok(Exerted::Bag(BagView::new(session, of, entries))),
                other => Err(ModelError::mismatch("object", other)),
            },
        }
    }

    /// Compute the storage form of an externally-visible value.
    ///
    /// Identity at this layer.
    pub fn hibernate(&self, value: Value) -> Value {
        value
    }

    /// Encode this type as an embedded object.
    pub fn to_obj(&self) -> Obj {
        let mut obj = Obj::new(self.class.clone());
        if let Some(default) = &self.default {
            obj.set_attribute("_default", default.clone());
        }
        match &self.kind {
            TypeKind::Plain => {}
            TypeKind::RefTo { to } => {
                obj.set_attribute("to", Value::String(to.to_string()));
            }
            TypeKind::InstanceOf { of } => {
                obj.set_attribute("of", Value::String(of.to_string()));
            }
            TypeKind::ArrayOf { of } | TypeKind::BagOf { of } => {
                obj.set_attribute("of", of.to_obj().to_value());
            }
            TypeKind::Native { params } => {
                for (name, value) in params {
                    obj.set_attribute(name.clone(), value.clone());
                }
            }
        }
        obj
    }

    /// Decode a type from its embedded object form.
    pub fn from_obj(obj: &Obj) -> ModelResult<Self> {
        let default = present(obj.attribute("_default")).cloned();
        let kind = match obj.class().as_str() {
            ids::TYPE => TypeKind::Plain,
            ids::REF_TO => TypeKind::RefTo {
                to: class_param(obj, "to")?,
            },
            ids::INSTANCE_OF => TypeKind::InstanceOf {
                of: class_param(obj, "of")?,
            },
            ids::ARRAY_OF => TypeKind::ArrayOf {
                of: Box::new(type_param(obj, "of")?),
            },
            ids::BAG_OF => TypeKind::BagOf {
                of: Box::new(type_param(obj, "of")?),
            },
            _ => {
                let mut params = obj.attributes().clone();
                params.remove("_default");
                TypeKind::Native { params }
            }
        };
        Ok(Self {
            class: obj.class().clone(),
            default,
            kind,
        })
    }

    /// Decode a type from its stored JSON form.
    pub fn from_value(value: &Value) -> ModelResult<Self> {
        Self::from_obj(&Obj::from_value(value.clone())?)
    }
}

fn class_param(obj: &Obj, name: &str) -> ModelResult<ClassRef> {
    match obj.attribute(name) {
        Some(Value::String(id)) if !id.is_empty() => Ok(ClassRef::new(id.as_str())),
        Some(other) => Err(ModelError::Malformed(format!(
            "{} parameter `{name}` must be a class identifier, found {other}",
            obj.class()
        ))),
        None => Err(ModelError::Malformed(format!(
            "{} is missing parameter `{name}`",
            obj.class()
        ))),
    }
}

fn type_param(obj: &Obj, name: &str) -> ModelResult<Type> {
    match obj.attribute(name) {
        Some(value) => Type::from_value(value),
        None => Err(ModelError::Malformed(format!(
            "{} is missing parameter `{name}`",
            obj.class()
        ))),
    }
}

impl TryFrom<Obj> for Type {
    type Error = ModelError;

    fn try_from(obj: Obj) -> Result<Self, Self::Error> {
        Self::from_obj(&obj)
    }
}

impl From<Type> for Obj {
    fn from(ty: Type) -> Self {
        ty.to_obj()
    }
}
