//! The closed set of searchable collection kinds and their adapters.
//!
//! Each kind is described by a [`CollectionAdapter`] chosen when the
//! [`CollectionRegistry`] is built: it names the fields a READ-level caller may
//! ever receive and says whether the kind carries per-document permissions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::access::{AccessPolicy, PermissionFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    User,
    Collection,
    Folder,
    Item,
}

impl CollectionKind {
    pub const ALL: [Self; 4] = [Self::User, Self::Collection, Self::Folder, Self::Item];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Collection => "collection",
            Self::Folder => "folder",
            Self::Item => "item",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown collection kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for CollectionKind {
    type Err = UnknownKind;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Schema and capability descriptor for one collection kind.
pub trait CollectionAdapter: Send + Sync {
    fn kind(&self) -> CollectionKind;

    /// Fields a READ-level caller may ever be shown.
    fn readable_fields(&self) -> &[&'static str];

    /// The kind's permission model, or `None` when only the field allow-list applies.
    fn permissions(&self) -> Option<&dyn PermissionFilter> {
        None
    }

    fn is_readable(&self, field: &str) -> bool {
        self.readable_fields().iter().any(|f| *f == field)
    }
}

const USER_FIELDS: &[&str] = &["_id", "login", "public", "firstName", "lastName", "admin", "created"];
const COLLECTION_FIELDS: &[&str] =
    &["_id", "name", "description", "public", "created", "updated", "size"];
const FOLDER_FIELDS: &[&str] = &[
    "_id",
    "name",
    "public",
    "description",
    "created",
    "updated",
    "size",
    "meta",
    "parentId",
    "parentCollection",
    "creatorId",
    "baseParentType",
    "baseParentId",
];
const ITEM_FIELDS: &[&str] = &[
    "_id",
    "size",
    "updated",
    "description",
    "created",
    "meta",
    "creatorId",
    "folderId",
    "name",
    "baseParentType",
    "baseParentId",
    "copyOfItem",
];

/// Adapter for kinds whose documents carry `public`/`access` fields.
pub struct AccessControlledKind {
    kind: CollectionKind,
    fields: &'static [&'static str],
    policy: AccessPolicy,
}

impl CollectionAdapter for AccessControlledKind {
    fn kind(&self) -> CollectionKind {
        self.kind
    }
    fn readable_fields(&self) -> &[&'static str] {
        self.fields
    }
    fn permissions(&self) -> Option<&dyn PermissionFilter> {
        Some(&self.policy)
    }
}

/// Adapter for kinds protected only by the field allow-list.
pub struct PlainKind {
    kind: CollectionKind,
    fields: &'static [&'static str],
}

impl CollectionAdapter for PlainKind {
    fn kind(&self) -> CollectionKind {
        self.kind
    }
    fn readable_fields(&self) -> &[&'static str] {
        self.fields
    }
}

/// Adapters for every recognized kind, fixed at composition time.
#[derive(Clone)]
pub struct CollectionRegistry {
    adapters: BTreeMap<CollectionKind, Arc<dyn CollectionAdapter>>,
}

impl CollectionRegistry {
    /// `user`, `collection` and `folder` are access controlled; `item` is not.
    #[must_use]
    pub fn standard() -> Self {
        let controlled = |kind: CollectionKind, fields: &'static [&'static str]| -> Arc<dyn CollectionAdapter> {
            Arc::new(AccessControlledKind { kind, fields, policy: AccessPolicy })
        };
        Self::from_adapters([
            controlled(CollectionKind::User, USER_FIELDS),
            controlled(CollectionKind::Collection, COLLECTION_FIELDS),
            controlled(CollectionKind::Folder, FOLDER_FIELDS),
            Arc::new(PlainKind { kind: CollectionKind::Item, fields: ITEM_FIELDS })
                as Arc<dyn CollectionAdapter>,
        ])
    }

    /// Builds a registry from explicit adapters; a later adapter for the same kind wins.
    pub fn from_adapters(adapters: impl IntoIterator<Item = Arc<dyn CollectionAdapter>>) -> Self {
        Self { adapters: adapters.into_iter().map(|a| (a.kind(), a)).collect() }
    }

    #[must_use]
    pub fn get(&self, kind: CollectionKind) -> Option<&Arc<dyn CollectionAdapter>> {
        self.adapters.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = CollectionKind> + '_ {
        self.adapters.keys().copied()
    }
}

impl Default for CollectionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for CollectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionRegistry").field("kinds", &self.adapters.keys()).finish()
    }
}
