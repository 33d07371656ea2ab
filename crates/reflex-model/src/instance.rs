//! Live objects.
//!
//! An [`Instance`] is a raw object attached to a session together with its
//! resolved [`Schema`]. Embedded (`InstanceOf`) attributes are instantiated
//! when the instance is built; every other attribute is exerted when read.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use reflex_types::Value;

use crate::error::{ModelError, ModelResult};
use crate::object::{ClassRef, DocRef, Obj};
use crate::schema::Schema;
use crate::traits::Session;
use crate::types::TypeKind;
use crate::view::Exerted;

/// A live object: raw storage, resolved schema, instantiated embeddings.
#[derive(Clone, Debug)]
pub struct Instance {
    id: Option<DocRef>,
    obj: Obj,
    schema: Arc<Schema>,
    embedded: BTreeMap<String, Instance>,
}

impl Instance {
    /// Build a live object from `obj` read through `schema`.
    ///
    /// Embedded attributes are instantiated recursively, each checked against
    /// the class its slot declares. Depth is bounded by the session's
    /// embedding limit.
    pub fn build<S: Session + ?Sized>(
        session: &S,
        obj: &Obj,
        id: Option<DocRef>,
        schema: Arc<Schema>,
    ) -> ModelResult<Self> {
        Self::build_at(session, obj, id, schema, 0)
    }

    fn build_at<S: Session + ?Sized>(
        session: &S,
        obj: &Obj,
        id: Option<DocRef>,
        schema: Arc<Schema>,
        depth: usize,
    ) -> ModelResult<Self> {
        let limit = session.embedding_limit();
        if depth > limit {
            return Err(ModelError::EmbeddingTooDeep {
                class: obj.class().to_string(),
                limit,
            });
        }

        let mut obj = obj.clone();
        obj.attach(session.id());

        let mut embedded = BTreeMap::new();
        for (name, ty) in schema.attributes() {
            let TypeKind::InstanceOf { of } = ty.kind() else {
                continue;
            };
            let Some(value) = ty.effective(obj.attribute(name)) else {
                continue;
            };
            let child = Obj::from_value(value.clone())?;
            let child_schema = session.resolve_schema(child.class())?;
            if !child_schema.is_a(of) {
                return Err(ModelError::ClassMismatch {
                    object: format!("{}.{name}", schema.class()),
                    expected: of.to_string(),
                    found: child.class().to_string(),
                });
            }
            let instance = Self::build_at(session, &child, None, child_schema, depth + 1)?;
            embedded.insert(name.clone(), instance);
        }

        Ok(Self {
            id,
            obj,
            schema,
            embedded,
        })
    }

    /// The document identifier, for instances built from documents.
    pub fn id(&self) -> Option<&DocRef> {
        self.id.as_ref()
    }

    /// The object's own class.
    pub fn class(&self) -> &ClassRef {
        self.obj.class()
    }

    /// The schema reads go through: the class's, or a mixin's.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The raw, unexerted object.
    pub fn raw(&self) -> &Obj {
        &self.obj
    }

    /// Returns `true` if the schema's class is `class` or derives from it.
    pub fn is_a(&self, class: &ClassRef) -> bool {
        self.schema.is_a(class)
    }

    /// Declared attribute names, own and inherited.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.schema.attributes().keys().map(String::as_str)
    }

    /// The instantiated embedded object under `name`, if any.
    pub fn embedded(&self, name: &str) -> Option<&Instance> {
        self.embedded.get(name)
    }

    /// Read a declared attribute, exerting it now.
    ///
    /// Fails with [`ModelError::Detached`] when `session` does not own this
    /// instance and with [`ModelError::UnknownAttribute`] for undeclared
    /// names.
    pub fn get<'a>(&'a self, session: &'a dyn Session, name: &str) -> ModelResult<Exerted<'a>> {
        self.obj.ensure_attached(session.id())?;
        let ty = self
            .schema
            .attribute(name)
            .ok_or_else(|| ModelError::UnknownAttribute {
                class: self.schema.class().to_string(),
                attribute: name.to_string(),
            })?;
        if let Some(instance) = self.embedded.get(name) {
            return Ok(Exerted::Instance(Cow::Borrowed(instance)));
        }
        ty.exert(session, self.obj.attribute(name))
    }

    /// Storage form of the underlying object.
    pub fn to_value(&self) -> Value {
        let mut value = self.obj.to_value();
        if let (Some(id), Value::Object(map)) = (&self.id, &mut value) {
            map.insert("_id".into(), Value::String(id.to_string()));
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::object::Doc;
    use crate::testing::StubSession;
    use crate::types::Type;
    use serde_json::json;

    fn r(id: &str) -> ClassRef {
        ClassRef::new(id)
    }

    fn person_model() -> Vec<Doc> {
        vec![
            Class::new(r("class:app.Person"))
                .with_attribute("name", Type::plain())
                .with_attribute("age", Type::plain().with_default(json!(0)))
                .with_attribute("address", Type::instance_of(r("class:app.Address")))
                .with_attribute("friends", Type::array_of(Type::ref_to(r("class:app.Person"))))
                .to_doc(),
            Class::new(r("class:app.Address"))
                .with_attribute("city", Type::plain())
                .to_doc(),
            Class::new(r("class:app.PostalAddress"))
                .with_extends(r("class:app.Address"))
                .with_attribute("zip", Type::plain())
                .to_doc(),
            Class::new(r("class:app.Pet")).to_doc(),
        ]
    }

    // -----------------------------------------------------------------------
    // Reading attributes
    // -----------------------------------------------------------------------

    #[test]
    fn person_scenario_reads_default_and_stored() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ada = Doc::new(DocRef::new("p1"), r("class:app.Person")).with("name", json!("Ada"));

        let instance = session.instantiate_doc(&ada).unwrap();
        assert_eq!(instance.id(), Some(&DocRef::new("p1")));
        assert_eq!(instance.get(&session, "age").unwrap().as_value(), Some(&json!(0)));
        assert_eq!(instance.get(&session, "name").unwrap().as_value(), Some(&json!("Ada")));
        assert!(instance.get(&session, "address").unwrap().is_absent());
    }

    #[test]
    fn reading_back_equals_direct_exert() {
        let session = StubSession::new();
        session.load_model(vec![Class::new(r("class:app.Note"))
            .with_attribute("title", Type::plain())
            .with_attribute("body", Type::plain().with_default(json!("")))
            .with_attribute("tags", Type::plain())
            .to_doc()])
            .unwrap();
        let note = Doc::new(DocRef::new("n1"), r("class:app.Note"))
            .with("title", json!("hello"))
            .with("tags", json!(["a", "b"]));

        let instance = session.instantiate_doc(&note).unwrap();
        for name in instance.attribute_names() {
            let ty = instance.schema().attribute(name).unwrap();
            let direct = ty.exert(&session, note.attribute(name)).unwrap().to_value().unwrap();
            let read = instance.get(&session, name).unwrap().to_value().unwrap();
            assert_eq!(direct, read, "attribute {name}");
        }
    }

    #[test]
    fn refs_are_not_resolved_by_instantiation() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ada = Doc::new(DocRef::new("p1"), r("class:app.Person"))
            .with("friends", json!(["ghost-1", "ghost-2"]));

        let instance = session.instantiate_doc(&ada).unwrap();
        let friends = instance.get(&session, "friends").unwrap();
        let view = friends.as_array().unwrap();
        let first = view.get(0).unwrap().unwrap();
        assert_eq!(first.as_doc_ref(), Some(&DocRef::new("ghost-1")));
        assert!(first.resolve(&session).unwrap_err().is_not_found());
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ada = Doc::new(DocRef::new("p1"), r("class:app.Person"));
        let instance = session.instantiate_doc(&ada).unwrap();
        assert!(matches!(
            instance.get(&session, "salary"),
            Err(ModelError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn other_session_sees_detached_instance() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ada = Doc::new(DocRef::new("p1"), r("class:app.Person"));
        let instance = session.instantiate_doc(&ada).unwrap();

        let other = StubSession::new();
        assert!(matches!(
            instance.get(&other, "name"),
            Err(ModelError::Detached(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Embedding
    // -----------------------------------------------------------------------

    #[test]
    fn embedded_attributes_are_instantiated() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ada = Doc::new(DocRef::new("p1"), r("class:app.Person")).with(
            "address",
            json!({"_class": "class:app.PostalAddress", "city": "London", "zip": "N1"}),
        );

        let instance = session.instantiate_doc(&ada).unwrap();
        let address = instance.embedded("address").unwrap();
        assert!(address.id().is_none());
        assert!(address.is_a(&r("class:app.Address")));
        assert_eq!(address.get(&session, "zip").unwrap().as_value(), Some(&json!("N1")));

        let exerted = instance.get(&session, "address").unwrap();
        let via_get = exerted.as_instance().unwrap();
        assert_eq!(via_get.get(&session, "city").unwrap().as_value(), Some(&json!("London")));
    }

    #[test]
    fn embedded_class_must_match_slot() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ada = Doc::new(DocRef::new("p1"), r("class:app.Person"))
            .with("address", json!({"_class": "class:app.Pet"}));

        let err = session.instantiate_doc(&ada).unwrap_err();
        assert!(matches!(err, ModelError::ClassMismatch { .. }));
    }

    #[test]
    fn instance_of_exert_builds_fresh_graphs() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ty = Type::instance_of(r("class:app.Address"));
        let stored = json!({"_class": "class:app.Address", "city": "Oslo"});

        let first = ty.exert(&session, Some(&stored)).unwrap();
        let second = ty.exert(&session, Some(&stored)).unwrap();
        let (a, b) = (first.as_instance().unwrap(), second.as_instance().unwrap());
        assert!(!std::ptr::eq(a, b));
        assert_eq!(a.to_value(), b.to_value());
    }

    #[test]
    fn self_embedding_data_is_bounded() {
        let session = StubSession::new().with_embedding_limit(3);
        session
            .load_model(vec![Class::new(r("class:app.Node"))
                .with_attribute("next", Type::instance_of(r("class:app.Node")))
                .to_doc()])
            .unwrap();

        let mut value = json!({"_class": "class:app.Node"});
        for _ in 0..5 {
            value = json!({"_class": "class:app.Node", "next": value});
        }
        let obj = Obj::from_value(value).unwrap();
        let err = session.instantiate(&obj).unwrap_err();
        assert!(matches!(err, ModelError::EmbeddingTooDeep { limit: 3, .. }));
    }

    #[test]
    fn to_value_includes_identifier() {
        let session = StubSession::new();
        session.load_model(person_model()).unwrap();
        let ada = Doc::new(DocRef::new("p1"), r("class:app.Person")).with("name", json!("Ada"));
        let instance = session.instantiate_doc(&ada).unwrap();
        assert_eq!(instance.to_value(), ada.to_value());
    }
}
