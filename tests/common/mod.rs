// Shared fixtures: an in-memory store seeded with a few kinds and a gateway over it.
#![allow(dead_code)]

use bson::{Document as BsonDocument, doc};
use mongo_search::document::Document;
use mongo_search::engine::Engine;
use mongo_search::{AllowListStore, CollectionRegistry, SearchGateway, Settings};
use std::sync::Arc;

pub struct Fixture {
    pub engine: Arc<Engine>,
    pub settings: Settings,
    pub gateway: SearchGateway,
}

pub fn fixture() -> Fixture {
    fixture_with(Settings::in_memory())
}

pub fn fixture_with(settings: Settings) -> Fixture {
    let engine = Arc::new(Engine::new());
    let allow_list =
        Arc::new(AllowListStore::open(settings.clone(), Arc::new(CollectionRegistry::standard())).unwrap());
    let gateway = SearchGateway::new(allow_list, engine.clone());
    Fixture { engine, settings, gateway }
}

/// `count` items named `item-000`.. with `size == index`, plus an unlisted `secret`.
pub fn seed_items(engine: &Engine, count: usize) {
    let col = engine.create_collection("item");
    for i in 0..count {
        col.insert_document(Document::new(doc! {
            "name": format!("item-{i:03}"),
            "size": i64::try_from(i).unwrap(),
            "description": "d",
            "folderId": "f1",
            "secret": "hunter2",
        }));
    }
}

/// A folder with the given visibility; `readers` get READ access by user id.
pub fn folder(name: &str, public: bool, readers: &[&str], groups: &[&str]) -> BsonDocument {
    let users: Vec<BsonDocument> = readers.iter().map(|u| doc! {"id": *u, "level": 0}).collect();
    let groups: Vec<BsonDocument> = groups.iter().map(|g| doc! {"id": *g, "level": 0}).collect();
    doc! {
        "name": name,
        "description": format!("{name} folder"),
        "public": public,
        "access": {"users": users, "groups": groups},
        "creatorId": "u0",
    }
}

pub fn seed_folders(engine: &Engine, folders: impl IntoIterator<Item = BsonDocument>) {
    let col = engine.create_collection("folder");
    for f in folders {
        col.insert_document(Document::new(f));
    }
}
