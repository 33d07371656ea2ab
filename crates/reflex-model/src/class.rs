//! Classes and mixins.
//!
//! A [`Class`] is both data and metadata: it is stored as an ordinary
//! [`Doc`] in the session's arena, and its `attributes` mapping governs how
//! documents of that class are read. Whether a document *is* a class is a
//! role decided by its `_class`: `class:core.Class` for classes,
//! `class:core.Mixin` for mixins. Both roles share one structure.

use std::collections::BTreeMap;

use reflex_types::{present, Bag, SessionId, Value};

use crate::bootstrap::ids;
use crate::error::{ModelError, ModelResult};
use crate::object::{ClassRef, Doc};
use crate::types::Type;

/// The role a class document plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassRole {
    /// A primary class, named by a document's `_class`.
    Class,
    /// A secondary class, listed in a document's `_mixins`.
    Mixin,
}

impl ClassRole {
    /// The class a document must have to play this role.
    pub fn class_id(self) -> &'static str {
        match self {
            Self::Class => ids::CLASS,
            Self::Mixin => ids::MIXIN,
        }
    }

    /// The role played by a document of class `class`, if any.
    pub fn of(class: &ClassRef) -> Option<Self> {
        match class.as_str() {
            ids::CLASS => Some(Self::Class),
            ids::MIXIN => Some(Self::Mixin),
            _ => None,
        }
    }
}

/// A decoded class (or mixin) document.
#[derive(Clone, Debug, PartialEq)]
pub struct Class {
    id: ClassRef,
    role: ClassRole,
    attributes: BTreeMap<String, Type>,
    extends: Option<ClassRef>,
    native: Option<String>,
    label: Option<String>,
    plural_label: Option<String>,
    owner: Option<SessionId>,
}

impl Class {
    /// A class with no attributes and no parent.
    pub fn new(id: ClassRef) -> Self {
        Self::with_role(id, ClassRole::Class)
    }

    /// A mixin with no attributes and no parent.
    pub fn mixin(id: ClassRef) -> Self {
        Self::with_role(id, ClassRole::Mixin)
    }

    fn with_role(id: ClassRef, role: ClassRole) -> Self {
        Self {
            id,
            role,
            attributes: BTreeMap::new(),
            extends: None,
            native: None,
            label: None,
            plural_label: None,
            owner: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.attributes.insert(name.into(), ty);
        self
    }

    pub fn with_extends(mut self, parent: ClassRef) -> Self {
        self.extends = Some(parent);
        self
    }

    pub fn with_native(mut self, token: impl Into<String>) -> Self {
        self.native = Some(token.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_plural_label(mut self, label: impl Into<String>) -> Self {
        self.plural_label = Some(label.into());
        self
    }

    pub fn id(&self) -> &ClassRef {
        &self.id
    }

    pub fn role(&self) -> ClassRole {
        self.role
    }

    pub fn is_mixin(&self) -> bool {
        self.role == ClassRole::Mixin
    }

    /// Own attributes, without ancestors.
    pub fn attributes(&self) -> &BTreeMap<String, Type> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Type> {
        self.attributes.get(name)
    }

    /// The parent class, if any.
    pub fn extends(&self) -> Option<&ClassRef> {
        self.extends.as_ref()
    }

    /// The native binding token, if any.
    pub fn native(&self) -> Option<&str> {
        self.native.as_deref()
    }

    /// The session the class document was read from, if any.
    pub fn owner(&self) -> Option<SessionId> {
        self.owner
    }

    /// Human-readable label.
    ///
    /// With a plural hint other than 1 the plural label is preferred. Falls
    /// back to the singular label, then to the identifier.
    pub fn to_intl_string(&self, plural: Option<u64>) -> String {
        match (plural, &self.plural_label) {
            (Some(n), Some(label)) if n != 1 => label.clone(),
            _ => self
                .label
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
        }
    }

    /// Encode as a document.
    pub fn to_doc(&self) -> Doc {
        let mut attributes = Bag::new();
        for (name, ty) in &self.attributes {
            attributes.insert(name.clone(), ty.to_obj().to_value());
        }
        let mut doc = Doc::new(self.id.cast(), ClassRef::new(self.role.class_id()))
            .with("attributes", Value::Object(attributes));
        if let Some(parent) = &self.extends {
            doc.set_attribute("extends", Value::String(parent.to_string()));
        }
        if let Some(native) = &self.native {
            doc.set_attribute("native", Value::String(native.clone()));
        }
        if let Some(label) = &self.label {
            doc.set_attribute("label", Value::String(label.clone()));
        }
        if let Some(label) = &self.plural_label {
            doc.set_attribute("plural_label", Value::String(label.clone()));
        }
        doc
    }

    /// Decode a class document.
    ///
    /// Fails with [`ModelError::NotAClass`] when the document's `_class`
    /// gives it no class role.
    pub fn from_doc(doc: &Doc) -> ModelResult<Self> {
        let role = ClassRole::of(doc.class())
            .ok_or_else(|| ModelError::NotAClass(doc.id().to_string()))?;

        let mut attributes = BTreeMap::new();
        match present(doc.attribute("attributes")) {
            None => {}
            Some(Value::Object(entries)) => {
                for (name, value) in entries {
                    let ty = Type::from_value(value).map_err(|e| {
                        ModelError::Malformed(format!("{} attribute `{name}`: {e}", doc.id()))
                    })?;
                    attributes.insert(name.clone(), ty);
                }
            }
            Some(other) => {
                return Err(ModelError::Malformed(format!(
                    "{} attributes must be an object, found {other}",
                    doc.id()
                )))
            }
        }

        Ok(Self {
            id: doc.id().cast(),
            role,
            attributes,
            extends: string_attribute(doc, "extends")?.map(ClassRef::new),
            native: string_attribute(doc, "native")?,
            label: string_attribute(doc, "label")?,
            plural_label: string_attribute(doc, "plural_label")?,
            owner: doc.owner(),
        })
    }
}

fn string_attribute(doc: &Doc, name: &str) -> ModelResult<Option<String>> {
    match present(doc.attribute(name)) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ModelError::Malformed(format!(
            "{} `{name}` must be a string, found {other}",
            doc.id()
        ))),
    }
}

impl TryFrom<&Doc> for Class {
    type Error = ModelError;

    fn try_from(doc: &Doc) -> Result<Self, Self::Error> {
        Self::from_doc(doc)
    }
}

impl From<&Class> for Doc {
    fn from(class: &Class) -> Self {
        class.to_doc()
    }
}
