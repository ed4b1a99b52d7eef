use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{self, Cursor, FilterExpression, FindOptions};
use crate::store::DocumentStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory document store keyed by collection name.
#[derive(Debug, Default)]
pub struct Engine {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named collection, creating it when missing.
    pub fn create_collection(&self, name: impl Into<String>) -> Arc<Collection> {
        let name = name.into();
        self.collections
            .write()
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Collection::new(name)))
            .clone()
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl DocumentStore for Engine {
    fn find(
        &self,
        collection: &str,
        filter: &FilterExpression,
        opts: &FindOptions,
    ) -> Result<Cursor, DbError> {
        let compiled = query::compile_filter(filter)?;
        match self.get_collection(collection) {
            Some(col) => query::find_docs(&col, &compiled, opts),
            // Mongo semantics: an absent collection is simply empty.
            None => Ok(Cursor::default()),
        }
    }
}
