//! Attribute resolution along the `extends` chain.
//!
//! # Invariants
//!
//! - The chain is walked leaf first; a class seen twice is a schema cycle.
//! - Ancestor attributes are merged first so that a child's declaration of
//!   the same name shadows its ancestors'.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::class::Class;
use crate::error::{ModelError, ModelResult};
use crate::object::ClassRef;
use crate::types::Type;

/// The resolved attribute schema of a class.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    class: ClassRef,
    chain: Vec<ClassRef>,
    attributes: BTreeMap<String, Type>,
    native: Option<String>,
}

impl Schema {
    /// Resolve the schema of `class`, looking classes up with `lookup`.
    ///
    /// Fails with [`ModelError::SchemaCycle`] if the `extends` chain revisits
    /// a class, and propagates lookup failures for missing ancestors.
    pub fn resolve<F>(class: &ClassRef, mut lookup: F) -> ModelResult<Self>
    where
        F: FnMut(&ClassRef) -> ModelResult<Class>,
    {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut classes = Vec::new();
        let mut next = Some(class.clone());

        while let Some(current) = next {
            if !seen.insert(current.clone()) {
                chain.push(current);
                return Err(ModelError::SchemaCycle {
                    class: class.to_string(),
                    chain: chain.iter().map(ToString::to_string).collect(),
                });
            }
            let resolved = lookup(&current)?;
            next = resolved.extends().cloned();
            chain.push(current);
            classes.push(resolved);
        }

        let mut attributes = BTreeMap::new();
        for ancestor in classes.iter().rev() {
            for (name, ty) in ancestor.attributes() {
                attributes.insert(name.clone(), ty.clone());
            }
        }
        let native = classes
            .iter()
            .find_map(|c| c.native().map(str::to_string));

        debug!(class = %class, depth = chain.len(), attributes = attributes.len(), "resolved schema");
        Ok(Self {
            class: class.clone(),
            chain,
            attributes,
            native,
        })
    }

    /// The class this schema was resolved for.
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// The class followed by its ancestors, nearest first.
    pub fn chain(&self) -> &[ClassRef] {
        &self.chain
    }

    /// Own and inherited attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Type> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Type> {
        self.attributes.get(name)
    }

    /// Returns `true` if `class` is this schema's class or one of its ancestors.
    pub fn is_a(&self, class: &ClassRef) -> bool {
        self.chain.contains(class)
    }

    /// The nearest native binding token along the chain.
    pub fn native(&self) -> Option<&str> {
        self.native.as_deref()
    }
}
