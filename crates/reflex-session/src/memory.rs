use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use reflex_model::{
    core_model, ids, ClassRef, Doc, DocRef, Exertion, Instance, ModelError, ModelResult, Obj,
    Query, Schema, Session, Type,
};
use reflex_types::{SessionId, Value};

use crate::config::{FindErrorPolicy, SessionConfig};

/// Loaded documents in load order.
#[derive(Default)]
struct Arena {
    docs: HashMap<DocRef, Doc>,
    order: Vec<DocRef>,
}

impl Arena {
    fn insert(&mut self, doc: Doc) -> bool {
        let id = doc.id().clone();
        let replaced = self.docs.insert(id.clone(), doc).is_some();
        if !replaced {
            self.order.push(id);
        }
        replaced
    }

    fn in_order(&self) -> impl Iterator<Item = &Doc> {
        self.order.iter().filter_map(|id| self.docs.get(id))
    }
}

/// In-memory, `HashMap`-based session.
///
/// Holds every loaded document behind a `RwLock`. Documents are cloned on
/// read and attached to this session on the way out. A new session already
/// contains the core model.
pub struct InMemorySession {
    id: SessionId,
    arena: RwLock<Arena>,
    schemas: RwLock<HashMap<ClassRef, Arc<Schema>>>,
    natives: RwLock<HashMap<String, Arc<dyn Exertion>>>,
    config: SessionConfig,
}

impl InMemorySession {
    /// Create a session with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a session with the given configuration.
    pub fn with_config(config: SessionConfig) -> Self {
        let mut arena = Arena::default();
        for doc in core_model() {
            arena.insert(doc);
        }
        let session = Self {
            id: SessionId::new(),
            arena: RwLock::new(arena),
            schemas: RwLock::new(HashMap::new()),
            natives: RwLock::new(HashMap::new()),
            config,
        };
        debug!(session = %session.id.short_id(), "session created");
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of loaded documents, core model included.
    pub fn len(&self) -> ModelResult<usize> {
        Ok(self.read_arena()?.order.len())
    }

    /// Returns `true` if no documents are loaded.
    pub fn is_empty(&self) -> ModelResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Identifiers of all loaded documents, in load order.
    pub fn ids(&self) -> ModelResult<Vec<DocRef>> {
        Ok(self.read_arena()?.order.clone())
    }

    /// Bind a native token to its host implementation.
    ///
    /// Types whose class (or nearest ancestor carrying a `native` token)
    /// names `token` are exerted by `exertion`. Rebinding replaces.
    pub fn register_native(
        &self,
        token: impl Into<String>,
        exertion: Arc<dyn Exertion>,
    ) -> ModelResult<()> {
        let token = token.into();
        debug!(token = %token, "native registered");
        self.natives
            .write()
            .map_err(|_| poisoned("natives"))?
            .insert(token, exertion);
        Ok(())
    }

    fn read_arena(&self) -> ModelResult<RwLockReadGuard<'_, Arena>> {
        self.arena.read().map_err(|_| poisoned("arena"))
    }

    fn write_arena(&self) -> ModelResult<RwLockWriteGuard<'_, Arena>> {
        self.arena.write().map_err(|_| poisoned("arena"))
    }

    fn invalidate_schemas(&self) -> ModelResult<()> {
        self.schemas
            .write()
            .map_err(|_| poisoned("schema cache"))?
            .clear();
        Ok(())
    }

    fn attached(&self, mut doc: Doc) -> Doc {
        doc.attach(self.id);
        doc
    }

    /// Apply `f` to a loaded document and return the updated copy.
    fn update<F>(&self, id: &DocRef, f: F) -> ModelResult<Doc>
    where
        F: FnOnce(&mut Doc),
    {
        let updated = {
            let mut arena = self.write_arena()?;
            let doc = arena
                .docs
                .get_mut(id)
                .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
            f(doc);
            doc.clone()
        };
        self.invalidate_schemas()?;
        Ok(self.attached(updated))
    }

    /// The declared type of `name` on `doc`, from its class or its mixins.
    fn declared_type(&self, doc: &Doc, name: &str) -> ModelResult<Type> {
        let schema = self.resolve_schema(doc.class())?;
        if let Some(ty) = schema.attribute(name) {
            return Ok(ty.clone());
        }
        for mixin in doc.mixins() {
            if let Some(ty) = self.resolve_schema(mixin)?.attribute(name) {
                return Ok(ty.clone());
            }
        }
        Err(ModelError::UnknownAttribute {
            class: doc.class().to_string(),
            attribute: name.to_string(),
        })
    }
}

fn poisoned(what: &str) -> ModelError {
    ModelError::Internal(format!("{what} lock poisoned"))
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for InMemorySession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn get_instance(&self, id: &DocRef) -> ModelResult<Doc> {
        let doc = self
            .read_arena()?
            .docs
            .get(id)
            .cloned()
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        Ok(self.attached(doc))
    }

    fn new_instance(&self, class: &ClassRef) -> ModelResult<Doc> {
        let schema = self.resolve_schema(class)?;
        let id = DocRef::new(uuid::Uuid::now_v7().to_string());
        let mut doc = Doc::new(id, class.clone());
        for (name, ty) in schema.attributes() {
            if let Some(default) = ty.default_value() {
                doc.set_attribute(name.clone(), ty.hibernate(default.clone()));
            }
        }
        debug!(id = %doc.id(), class = %class, "new instance");
        Ok(self.attached(doc))
    }

    fn instantiate(&self, obj: &Obj) -> ModelResult<Instance> {
        let schema = self.resolve_schema(obj.class())?;
        Instance::build(self, obj, None, schema)
    }

    fn find(&self, class: &ClassRef, query: &Query) -> ModelResult<Vec<Doc>> {
        let candidates: Vec<Doc> = self
            .read_arena()?
            .in_order()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();

        let mut found = Vec::new();
        for doc in candidates {
            match self.satisfies(&doc, class) {
                Ok(true) => found.push(self.attached(doc)),
                Ok(false) => {}
                Err(e) => match self.config.find_errors {
                    FindErrorPolicy::Skip => {
                        warn!(doc = %doc.id(), class = %class, error = %e, "skipping document in find");
                    }
                    FindErrorPolicy::Abort => return Err(e),
                },
            }
        }
        debug!(class = %class, matched = found.len(), "find");
        Ok(found)
    }

    fn load_model(&self, docs: Vec<Doc>) -> ModelResult<()> {
        let count = docs.len();
        let mut replaced = 0;
        {
            let mut arena = self.write_arena()?;
            for mut doc in docs {
                doc.as_obj_mut().detach();
                debug!(id = %doc.id(), class = %doc.class(), "loading document");
                if arena.insert(doc) {
                    replaced += 1;
                }
            }
        }
        self.invalidate_schemas()?;
        info!(documents = count, replaced, session = %self.id.short_id(), "model loaded");
        Ok(())
    }

    fn mixin(&self, doc: &DocRef, mixin: &ClassRef) -> ModelResult<Doc> {
        let class = self.get_class(mixin)?;
        if !class.is_mixin() {
            return Err(ModelError::ClassMismatch {
                object: mixin.to_string(),
                expected: ids::MIXIN.to_string(),
                found: ids::CLASS.to_string(),
            });
        }
        let updated = self.update(doc, |d| {
            d.add_mixin(mixin.clone());
        })?;
        debug!(id = %doc, mixin = %mixin, "mixin applied");
        Ok(updated)
    }

    fn set_attribute(&self, doc: &DocRef, name: &str, value: Value) -> ModelResult<Doc> {
        let current = self.get_instance(doc)?;
        let stored = self.declared_type(&current, name)?.hibernate(value);
        self.update(doc, |d| {
            d.set_attribute(name, stored);
        })
    }

    fn exertion_for(&self, class: &ClassRef) -> ModelResult<Option<Arc<dyn Exertion>>> {
        let schema = match self.resolve_schema(class) {
            Ok(schema) => schema,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(token) = schema.native() else {
            return Ok(None);
        };
        let natives = self.natives.read().map_err(|_| poisoned("natives"))?;
        Ok(natives.get(token).cloned())
    }

    fn resolve_schema(&self, class: &ClassRef) -> ModelResult<Arc<Schema>> {
        if self.config.cache_schemas {
            let cache = self.schemas.read().map_err(|_| poisoned("schema cache"))?;
            if let Some(schema) = cache.get(class) {
                return Ok(Arc::clone(schema));
            }
        }
        let schema = Arc::new(Schema::resolve(class, |c| self.get_class(c))?);
        if self.config.cache_schemas {
            self.schemas
                .write()
                .map_err(|_| poisoned("schema cache"))?
                .insert(class.clone(), Arc::clone(&schema));
        }
        Ok(schema)
    }

    fn embedding_limit(&self) -> usize {
        self.config.embedding_limit
    }
}

impl std::fmt::Debug for InMemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySession")
            .field("id", &self.id)
            .field("document_count", &self.len().ok())
            .field("config", &self.config)
            .finish()
    }
}
