//! The [`Session`] contract and the [`Exertion`] extension point.
//!
//! A session is the runtime authority over one loaded-document arena: it
//! resolves identifiers, instantiates embedded graphs and answers class-shaped
//! queries. Backends implement the required methods; everything expressible
//! in terms of them is provided.

use std::sync::Arc;

use reflex_types::{SessionId, Value};

use crate::class::Class;
use crate::error::{ModelError, ModelResult};
use crate::instance::Instance;
use crate::object::{ClassRef, Doc, DocRef, Obj};
use crate::query::Query;
use crate::schema::Schema;
use crate::types::Type;
use crate::view::Exerted;

/// Default bound on embedded instantiation depth.
pub const DEFAULT_EMBEDDING_LIMIT: usize = 64;

/// Host implementation of a native type.
///
/// Registered on a session under a `native` token; used for type objects
/// whose class (or nearest ancestor with a token) carries that token.
pub trait Exertion: Send + Sync {
    /// Compute the externally-visible value of `stored` for `ty`.
    ///
    /// `stored` is passed as-is; call [`Type::effective`] for default
    /// substitution.
    fn exert<'a>(
        &self,
        session: &'a dyn Session,
        ty: &'a Type,
        stored: Option<&'a Value>,
    ) -> ModelResult<Exerted<'a>>;
}

/// The typed-access contract over a loaded-document arena.
///
/// Implementations must be thread-safe (`Send + Sync`). Reads observe a
/// stable snapshot between writes; the contract assumes a single logical
/// writer.
pub trait Session: Send + Sync {
    /// Identity of this session; objects it hands out are attached to it.
    fn id(&self) -> SessionId;

    /// Resolve an identifier to its document.
    ///
    /// Fails with [`ModelError::NotFound`] if the identifier is not loaded.
    fn get_instance(&self, id: &DocRef) -> ModelResult<Doc>;

    /// Construct a fresh document of `class` with defaults populated.
    ///
    /// The document is attached but not inserted into the model.
    fn new_instance(&self, class: &ClassRef) -> ModelResult<Doc>;

    /// Produce a live object from a raw one.
    ///
    /// Walks the object's class schema and instantiates embedded attributes.
    /// References are never resolved and collections stay lazy.
    fn instantiate(&self, obj: &Obj) -> ModelResult<Instance>;

    /// All loaded documents of `class` (or a subclass, or carrying it as a
    /// mixin) that satisfy `query`, in load order.
    fn find(&self, class: &ClassRef, query: &Query) -> ModelResult<Vec<Doc>>;

    /// Register documents, classes included, in any order.
    ///
    /// Forward references are legal. A document whose identifier is already
    /// loaded is replaced as a whole.
    fn load_model(&self, docs: Vec<Doc>) -> ModelResult<()>;

    /// Add a mixin to a loaded document and return the updated document.
    fn mixin(&self, doc: &DocRef, mixin: &ClassRef) -> ModelResult<Doc>;

    /// Write one attribute of a loaded document through its declared type.
    fn set_attribute(&self, doc: &DocRef, name: &str, value: Value) -> ModelResult<Doc>;

    /// The native exertion bound to a type class, if any.
    fn exertion_for(&self, class: &ClassRef) -> ModelResult<Option<Arc<dyn Exertion>>>;

    // ---------------------------------------------------------------
    // Provided
    // ---------------------------------------------------------------

    /// First match of [`Session::find`] or explicit absence.
    fn find_one(&self, class: &ClassRef, query: &Query) -> ModelResult<Option<Doc>> {
        Ok(self.find(class, query)?.into_iter().next())
    }

    /// Resolve a class (or mixin) document.
    fn get_class(&self, id: &ClassRef) -> ModelResult<Class> {
        Class::from_doc(&self.get_instance(&id.cast())?)
    }

    /// Resolve the merged attribute schema of a class.
    fn resolve_schema(&self, class: &ClassRef) -> ModelResult<Arc<Schema>> {
        Schema::resolve(class, |c| self.get_class(c)).map(Arc::new)
    }

    /// Bound on embedded instantiation depth.
    fn embedding_limit(&self) -> usize {
        DEFAULT_EMBEDDING_LIMIT
    }

    /// Returns `true` if `doc` carries `mixin` or a mixin derived from it.
    fn carries_mixin(&self, doc: &Doc, mixin: &ClassRef) -> ModelResult<bool> {
        for carried in doc.mixins() {
            if carried == mixin || self.resolve_schema(carried)?.is_a(mixin) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if `doc` is of `class`, a subclass, or carries it as a
    /// mixin.
    fn satisfies(&self, doc: &Doc, class: &ClassRef) -> ModelResult<bool> {
        if self.resolve_schema(doc.class())?.is_a(class) {
            return Ok(true);
        }
        self.carries_mixin(doc, class)
    }

    /// Resolve an identifier and check that the document satisfies `class`.
    fn get_instance_of(&self, id: &DocRef, class: &ClassRef) -> ModelResult<Doc> {
        let doc = self.get_instance(id)?;
        if self.satisfies(&doc, class)? {
            Ok(doc)
        } else {
            Err(ModelError::ClassMismatch {
                object: id.to_string(),
                expected: class.to_string(),
                found: doc.class().to_string(),
            })
        }
    }

    /// Instantiate a document, keeping its identifier.
    fn instantiate_doc(&self, doc: &Doc) -> ModelResult<Instance> {
        let schema = self.resolve_schema(doc.class())?;
        Instance::build(self, doc.as_obj(), Some(doc.id().clone()), schema)
    }

    /// Instantiate a mixin-qualified view of a document.
    ///
    /// Attribute reads use the mixin's schema, not the primary class's.
    fn instantiate_as(&self, doc: &Doc, mixin: &ClassRef) -> ModelResult<Instance> {
        if !self.carries_mixin(doc, mixin)? {
            return Err(ModelError::MixinNotApplied {
                doc: doc.id().to_string(),
                mixin: mixin.to_string(),
            });
        }
        let schema = self.resolve_schema(mixin)?;
        Instance::build(self, doc.as_obj(), Some(doc.id().clone()), schema)
    }
}
