//! The core model.
//!
//! Reflex describes itself: the classes every session starts with are
//! ordinary class documents, so `Class`, `Type` and the type
//! specializations can be found, read and instantiated like user data.

use crate::class::Class;
use crate::object::{ClassRef, Doc};
use crate::types::Type;

/// Identifiers of the core classes.
pub mod ids {
    pub const OBJ: &str = "class:core.Obj";
    pub const DOC: &str = "class:core.Doc";
    pub const EMBEDDED: &str = "class:core.Embedded";
    pub const TYPE: &str = "class:core.Type";
    pub const REF_TO: &str = "class:core.RefTo";
    pub const INSTANCE_OF: &str = "class:core.InstanceOf";
    pub const ARRAY_OF: &str = "class:core.ArrayOf";
    pub const BAG_OF: &str = "class:core.BagOf";
    pub const CLASS: &str = "class:core.Class";
    pub const MIXIN: &str = "class:core.Mixin";
}

fn r(id: &str) -> ClassRef {
    ClassRef::new(id)
}

/// The self-describing core class documents, in dependency order.
pub fn core_model() -> Vec<Doc> {
    let type_object = || Type::instance_of(r(ids::TYPE));
    let class_ref = || Type::ref_to(r(ids::CLASS));

    vec![
        Class::new(r(ids::OBJ)).with_label("Object").with_plural_label("Objects"),
        Class::new(r(ids::DOC))
            .with_extends(r(ids::OBJ))
            .with_label("Document")
            .with_plural_label("Documents"),
        Class::new(r(ids::EMBEDDED)).with_extends(r(ids::OBJ)),
        Class::new(r(ids::TYPE))
            .with_extends(r(ids::EMBEDDED))
            .with_attribute("_default", Type::plain())
            .with_label("Type")
            .with_plural_label("Types"),
        Class::new(r(ids::REF_TO))
            .with_extends(r(ids::TYPE))
            .with_attribute("to", class_ref()),
        Class::new(r(ids::INSTANCE_OF))
            .with_extends(r(ids::TYPE))
            .with_attribute("of", class_ref()),
        Class::new(r(ids::ARRAY_OF))
            .with_extends(r(ids::TYPE))
            .with_attribute("of", type_object()),
        Class::new(r(ids::BAG_OF))
            .with_extends(r(ids::TYPE))
            .with_attribute("of", type_object()),
        Class::new(r(ids::CLASS))
            .with_extends(r(ids::DOC))
            .with_attribute("attributes", Type::bag_of(type_object()))
            .with_attribute("extends", class_ref())
            .with_attribute("native", Type::plain())
            .with_attribute("label", Type::plain())
            .with_attribute("plural_label", Type::plain())
            .with_label("Class")
            .with_plural_label("Classes"),
        Class::new(r(ids::MIXIN))
            .with_extends(r(ids::CLASS))
            .with_label("Mixin")
            .with_plural_label("Mixins"),
    ]
    .iter()
    .map(Class::to_doc)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::error::ModelError;
    use std::collections::HashMap;

    fn classes() -> HashMap<ClassRef, Class> {
        core_model()
            .iter()
            .map(|doc| {
                let class = Class::from_doc(doc).unwrap();
                (class.id().clone(), class)
            })
            .collect()
    }

    #[test]
    fn every_core_document_is_a_class() {
        let docs = core_model();
        assert_eq!(docs.len(), 10);
        for doc in &docs {
            assert_eq!(doc.class().as_str(), ids::CLASS);
        }
    }

    #[test]
    fn core_schemas_resolve_without_cycles() {
        let classes = classes();
        for id in classes.keys() {
            Schema::resolve(id, |c| {
                classes
                    .get(c)
                    .cloned()
                    .ok_or_else(|| ModelError::NotFound(c.to_string()))
            })
            .unwrap();
        }
    }

    #[test]
    fn mixin_inherits_class_attributes() {
        let classes = classes();
        let schema = Schema::resolve(&r(ids::MIXIN), |c| {
            classes
                .get(c)
                .cloned()
                .ok_or_else(|| ModelError::NotFound(c.to_string()))
        })
        .unwrap();
        assert!(schema.is_a(&r(ids::CLASS)));
        assert!(schema.is_a(&r(ids::DOC)));
        assert!(schema.attribute("attributes").is_some());
        assert_eq!(
            schema.chain(),
            &[r(ids::MIXIN), r(ids::CLASS), r(ids::DOC), r(ids::OBJ)]
        );
    }

    #[test]
    fn class_describes_its_own_attributes() {
        let classes = classes();
        let class = &classes[&r(ids::CLASS)];
        assert_eq!(
            class.attribute("attributes"),
            Some(&Type::bag_of(Type::instance_of(r(ids::TYPE))))
        );
        assert_eq!(class.attribute("extends"), Some(&Type::ref_to(r(ids::CLASS))));
    }
}
