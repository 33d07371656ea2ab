//! A minimal in-crate session for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use reflex_types::{SessionId, Value};

use crate::error::{ModelError, ModelResult};
use crate::instance::Instance;
use crate::object::{ClassRef, Doc, DocRef, Obj};
use crate::query::Query;
use crate::traits::{Exertion, Session, DEFAULT_EMBEDDING_LIMIT};
use crate::types::Type;
use crate::view::Exerted;

pub const COUNTING: &str = "class:test.Counting";

/// Counts exertions performed by [`counting_type`].
#[derive(Debug, Default)]
pub struct Counter(AtomicUsize);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

struct CountingExertion(Arc<Counter>);

impl Exertion for CountingExertion {
    fn exert<'a>(
        &self,
        _session: &'a dyn Session,
        ty: &'a Type,
        stored: Option<&'a Value>,
    ) -> ModelResult<Exerted<'a>> {
        self.0 .0.fetch_add(1, Ordering::SeqCst);
        Ok(match ty.effective(stored) {
            Some(value) => Exerted::Value(value),
            None => Exerted::Absent,
        })
    }
}

/// A native type whose exertions are counted.
pub fn counting_type() -> Type {
    Type::native(ClassRef::new(COUNTING))
}

pub struct StubSession {
    id: SessionId,
    docs: RwLock<Vec<Doc>>,
    natives: HashMap<ClassRef, Arc<dyn Exertion>>,
    embedding_limit: usize,
}

impl StubSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            docs: RwLock::new(Vec::new()),
            natives: HashMap::new(),
            embedding_limit: DEFAULT_EMBEDDING_LIMIT,
        }
    }

    pub fn with_counting() -> (Self, Arc<Counter>) {
        let counter = Arc::new(Counter::default());
        let mut session = Self::new();
        session.natives.insert(
            ClassRef::new(COUNTING),
            Arc::new(CountingExertion(Arc::clone(&counter))),
        );
        (session, counter)
    }

    pub fn with_embedding_limit(mut self, limit: usize) -> Self {
        self.embedding_limit = limit;
        self
    }

    fn update(&self, id: &DocRef, f: impl FnOnce(&mut Doc)) -> ModelResult<Doc> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        f(doc);
        let mut doc = doc.clone();
        doc.attach(self.id);
        Ok(doc)
    }
}

impl Session for StubSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn get_instance(&self, id: &DocRef) -> ModelResult<Doc> {
        let docs = self.docs.read().unwrap();
        let mut doc = docs
            .iter()
            .find(|d| d.id() == id)
            .cloned()
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        doc.attach(self.id);
        Ok(doc)
    }

    fn new_instance(&self, class: &ClassRef) -> ModelResult<Doc> {
        let schema = self.resolve_schema(class)?;
        let count = self.docs.read().unwrap().len();
        let mut doc = Doc::new(DocRef::new(format!("stub-{count}")), class.clone());
        for (name, ty) in schema.attributes() {
            if let Some(default) = ty.default_value() {
                doc.set_attribute(name.clone(), ty.hibernate(default.clone()));
            }
        }
        doc.attach(self.id);
        Ok(doc)
    }

    fn instantiate(&self, obj: &Obj) -> ModelResult<Instance> {
        let schema = self.resolve_schema(obj.class())?;
        Instance::build(self, obj, None, schema)
    }

    fn find(&self, class: &ClassRef, query: &Query) -> ModelResult<Vec<Doc>> {
        let snapshot = self.docs.read().unwrap().clone();
        let mut found = Vec::new();
        for mut doc in snapshot {
            if query.matches(&doc) && self.satisfies(&doc, class)? {
                doc.attach(self.id);
                found.push(doc);
            }
        }
        Ok(found)
    }

    fn load_model(&self, docs: Vec<Doc>) -> ModelResult<()> {
        let mut stored = self.docs.write().unwrap();
        for doc in docs {
            match stored.iter_mut().find(|d| d.id() == doc.id()) {
                Some(existing) => *existing = doc,
                None => stored.push(doc),
            }
        }
        Ok(())
    }

    fn mixin(&self, doc: &DocRef, mixin: &ClassRef) -> ModelResult<Doc> {
        self.update(doc, |d| {
            d.add_mixin(mixin.clone());
        })
    }

    fn set_attribute(&self, doc: &DocRef, name: &str, value: Value) -> ModelResult<Doc> {
        self.update(doc, |d| {
            d.set_attribute(name, value);
        })
    }

    fn exertion_for(&self, class: &ClassRef) -> ModelResult<Option<Arc<dyn Exertion>>> {
        Ok(self.natives.get(class).cloned())
    }

    fn embedding_limit(&self) -> usize {
        self.embedding_limit
    }
}
