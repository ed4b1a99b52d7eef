use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

/// Field every stored document is keyed by.
pub const ID_FIELD: &str = "_id";

pub type DocumentId = String;

/// A stored document. `data` always carries the `_id` field mirrored in `id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
}

impl Document {
    /// Wraps `data`, assigning a fresh `_id` when the body has none.
    #[must_use]
    pub fn new(mut data: BsonDocument) -> Self {
        let id = match data.get(ID_FIELD) {
            Some(Bson::String(s)) => s.clone(),
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(other) => other.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                data.insert(ID_FIELD, id.clone());
                id
            }
        };
        Self { id, data }
    }

    #[must_use]
    pub fn into_inner(self) -> BsonDocument {
        self.data
    }
}
