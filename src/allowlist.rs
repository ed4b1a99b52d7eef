//! Per-kind field allow-list, persisted under [`ALLOWED_FIELDS_KEY`].

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::SearchError;
use crate::kinds::{CollectionKind, CollectionRegistry};
use crate::logger::AUDIT_TARGET;
use crate::settings::Settings;

pub const ALLOWED_FIELDS_KEY: &str = "mongo_search.allowed";

/// Collection kind → field names a caller may ever retrieve.
///
/// Field lists keep their first-seen order and never contain duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList(BTreeMap<CollectionKind, Vec<String>>);

impl AllowList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The mapping used when nothing valid has been configured.
    #[must_use]
    pub fn builtin_default() -> Self {
        let mut list = Self::new();
        list.insert(CollectionKind::Collection, ["_id", "name", "description"]);
        list.insert(CollectionKind::Folder, ["_id", "name", "description"]);
        list.insert(CollectionKind::Item, ["_id", "name", "description", "folderId"]);
        list.insert(CollectionKind::User, ["_id", "firstName", "lastName", "login"]);
        list
    }

    /// Replaces the entry for `kind`, dropping duplicate field names.
    pub fn insert<I, S>(&mut self, kind: CollectionKind, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for f in fields {
            let f = f.into();
            if !out.contains(&f) {
                out.push(f);
            }
        }
        self.0.insert(kind, out);
    }

    pub fn remove(&mut self, kind: CollectionKind) -> Option<Vec<String>> {
        self.0.remove(&kind)
    }

    #[must_use]
    pub fn get(&self, kind: CollectionKind) -> Option<&[String]> {
        self.0.get(&kind).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, kind: CollectionKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = CollectionKind> + '_ {
        self.0.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let map = self
            .0
            .iter()
            .map(|(k, fields)| (k.as_str().to_string(), Value::from(fields.clone())))
            .collect();
        Value::Object(map)
    }

    /// Validates an untyped setting value against `registry`.
    ///
    /// # Errors
    /// Returns `SearchError::Validation` when `value` is not an object, names a
    /// kind outside the recognized set, holds anything but lists of strings, or
    /// lists a field that is not readable for its kind.
    pub fn from_value(value: &Value, registry: &CollectionRegistry) -> Result<Self, SearchError> {
        let Value::Object(map) = value else {
            return Err(SearchError::validation("Allowed fields setting must be an object."));
        };
        let mut list = Self::new();
        for (name, fields) in map {
            let adapter = name.parse::<CollectionKind>().ok().and_then(|k| registry.get(k)).ok_or_else(|| {
                let known: Vec<&str> = registry.kinds().map(CollectionKind::as_str).collect();
                SearchError::validation(format!("Only {known:?} are valid keywords, got \"{name}\"."))
            })?;
            let Value::Array(items) = fields else {
                return Err(SearchError::validation("Allowed fields values must be lists."));
            };
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                let Value::String(field) = item else {
                    return Err(SearchError::validation(format!(
                        "Allowed fields for \"{name}\" must be strings."
                    )));
                };
                if !adapter.is_readable(field) {
                    return Err(SearchError::validation(format!(
                        "Invalid key \"{field}\" for \"{name}\"."
                    )));
                }
                names.push(field.clone());
            }
            list.insert(adapter.kind(), names);
        }
        Ok(list)
    }
}

/// Holds the current allow-list snapshot and writes it through [`Settings`].
///
/// Readers clone an `Arc` snapshot; writers validate, persist, and then swap the
/// whole snapshot, so a reader never sees a half-applied update.
pub struct AllowListStore {
    settings: Settings,
    registry: Arc<CollectionRegistry>,
    current: RwLock<Arc<AllowList>>,
    default: Arc<AllowList>,
    write_lock: Mutex<()>,
}

impl AllowListStore {
    /// Registers the allow-list validator on `settings` and loads the persisted value.
    ///
    /// A missing or invalid persisted value falls back to the built-in default.
    ///
    /// # Errors
    /// Returns `SearchError::Store` when the settings backend cannot be read.
    pub fn open(settings: Settings, registry: Arc<CollectionRegistry>) -> Result<Self, SearchError> {
        Self::open_with_default(settings, registry, AllowList::builtin_default())
    }

    /// Like [`AllowListStore::open`] with a caller-chosen fallback mapping.
    ///
    /// # Errors
    /// See [`AllowListStore::open`].
    pub fn open_with_default(
        settings: Settings,
        registry: Arc<CollectionRegistry>,
        default: AllowList,
    ) -> Result<Self, SearchError> {
        let hook_registry = registry.clone();
        settings.register_validator(
            ALLOWED_FIELDS_KEY,
            Arc::new(move |v: &Value| AllowList::from_value(v, &hook_registry).map(|_| ())),
        );
        let current = match settings.get(ALLOWED_FIELDS_KEY)? {
            Some(v) => AllowList::from_value(&v, &registry).unwrap_or_else(|e| {
                log::warn!("ignoring persisted {ALLOWED_FIELDS_KEY}: {e}");
                default.clone()
            }),
            None => default.clone(),
        };
        Ok(Self {
            settings,
            registry,
            current: RwLock::new(Arc::new(current)),
            default: Arc::new(default),
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn get(&self) -> Arc<AllowList> {
        self.current.read().clone()
    }

    #[must_use]
    pub fn get_default(&self) -> Arc<AllowList> {
        self.default.clone()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<CollectionRegistry> {
        &self.registry
    }

    /// Validates, persists and publishes a new mapping.
    ///
    /// # Errors
    /// Returns `SearchError::Validation` for an invalid mapping and
    /// `SearchError::Store` when persisting fails; either way the previous
    /// mapping stays in effect.
    pub fn set(&self, value: &Value) -> Result<Arc<AllowList>, SearchError> {
        let next = Arc::new(AllowList::from_value(value, &self.registry)?);
        // Serialize writers so the persisted value and the snapshot agree.
        let _w = self.write_lock.lock();
        self.settings.set(ALLOWED_FIELDS_KEY, next.to_value())?;
        *self.current.write() = next.clone();
        log::info!(target: AUDIT_TARGET, "allow-list updated: {}", next.to_value());
        Ok(next)
    }

    /// Re-reads the persisted value, e.g. after another process changed the file.
    ///
    /// # Errors
    /// Returns `SearchError::Store` on read failure and `SearchError::Validation`
    /// when the persisted value is invalid; the snapshot is kept in both cases.
    pub fn reload(&self) -> Result<Arc<AllowList>, SearchError> {
        let _w = self.write_lock.lock();
        let next = match self.settings.get(ALLOWED_FIELDS_KEY)? {
            Some(v) => Arc::new(AllowList::from_value(&v, &self.registry)?),
            None => self.default.clone(),
        };
        *self.current.write() = next.clone();
        Ok(next)
    }
}

impl std::fmt::Debug for AllowListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowListStore").field("current", &self.get()).finish_non_exhaustive()
    }
}
