use crate::document::{Document, DocumentId};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Slots {
    docs: Vec<Document>,
    by_id: HashMap<DocumentId, usize>,
}

/// A named, insertion-ordered set of documents held in memory.
#[derive(Debug)]
pub struct Collection {
    name: String,
    slots: RwLock<Slots>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), slots: RwLock::new(Slots::default()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts `document`, replacing any existing document with the same `_id`
    /// in place so its scan position is kept.
    pub fn insert_document(&self, document: Document) -> DocumentId {
        let id = document.id.clone();
        let mut slots = self.slots.write();
        if let Some(&pos) = slots.by_id.get(&id) {
            slots.docs[pos] = document;
        } else {
            let pos = slots.docs.len();
            slots.docs.push(document);
            slots.by_id.insert(id.clone(), pos);
        }
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the current contents so a scan never holds the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Document> {
        self.slots.read().docs.clone()
    }
}
