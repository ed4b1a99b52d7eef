//! Read-only search over one collection kind.
//!
//! A request moves through these stages, failing out of any of them:
//!
//! 1. policy overrides rewrite a per-request copy of the allow-list
//! 2. the requested kind must be present in that allow-list
//! 3. the query text is parsed into a filter document
//! 4. the projection is the allow-listed fields plus `public`/`access`
//! 5. the store runs the find; kinds without a permission model are paginated here
//! 6. kinds with a permission model are filtered and paginated on the permitted stream
//! 7. `public`/`access` are stripped, whether or not they were allow-listed

use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::access::{ACCESS_FIELD, AccessLevel, CallerContext, PUBLIC_FIELD};
use crate::allowlist::{AllowList, AllowListStore};
use crate::errors::SearchError;
use crate::kinds::{CollectionKind, CollectionRegistry};
use crate::query::{FindOptions, Order, SortSpec, parse_query};
use crate::store::DocumentStore;

pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_SORT: &str = "name";

/// One search call as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub kind: String,
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    pub sort: String,
    pub sort_dir: Order,
}

impl SearchRequest {
    pub fn new(kind: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            query: query.into(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: DEFAULT_SORT.to_string(),
            sort_dir: Order::Asc,
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, dir: Order) -> Self {
        self.sort = field.into();
        self.sort_dir = dir;
        self
    }
}

/// Request-scoped policy hook run before the collection kind is checked.
///
/// It receives the allow-list as left by earlier overrides and returns the one
/// to use for this request. The persisted allow-list is never touched.
pub trait AllowListOverride: Send + Sync {
    fn apply(&self, request: &SearchRequest, caller: &CallerContext, allowed: AllowList) -> AllowList;
}

impl<F> AllowListOverride for F
where
    F: Fn(&SearchRequest, &CallerContext, AllowList) -> AllowList + Send + Sync,
{
    fn apply(&self, request: &SearchRequest, caller: &CallerContext, allowed: AllowList) -> AllowList {
        self(request, caller, allowed)
    }
}

pub struct SearchGateway {
    allow_list: Arc<AllowListStore>,
    registry: Arc<CollectionRegistry>,
    store: Arc<dyn DocumentStore>,
    overrides: Vec<Arc<dyn AllowListOverride>>,
    timeout_ms: Option<u64>,
}

impl SearchGateway {
    pub fn new(allow_list: Arc<AllowListStore>, store: Arc<dyn DocumentStore>) -> Self {
        let registry = allow_list.registry().clone();
        Self { allow_list, registry, store, overrides: Vec::new(), timeout_ms: None }
    }

    /// Appends an override; overrides run in registration order.
    #[must_use]
    pub fn with_override(mut self, hook: Arc<dyn AllowListOverride>) -> Self {
        self.overrides.push(hook);
        self
    }

    /// Deadline handed to the store for every find.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn allow_list(&self) -> &Arc<AllowListStore> {
        &self.allow_list
    }

    fn effective_allow_list(&self, req: &SearchRequest, caller: &CallerContext) -> Arc<AllowList> {
        let snapshot = self.allow_list.get();
        if self.overrides.is_empty() {
            return snapshot;
        }
        let mut allowed = (*snapshot).clone();
        for hook in &self.overrides {
            allowed = hook.apply(req, caller, allowed);
        }
        Arc::new(allowed)
    }

    /// Runs `req` on behalf of `caller`.
    ///
    /// # Errors
    /// - `UnknownCollection` when the kind is not in the effective allow-list
    /// - `MalformedQuery` when `req.query` is not a JSON object
    /// - `Store` when the document store fails; no partial results are returned
    pub fn search(&self, caller: &CallerContext, req: &SearchRequest) -> Result<Vec<BsonDocument>, SearchError> {
        let started = Instant::now();
        let allowed = self.effective_allow_list(req, caller);

        let unknown = || SearchError::UnknownCollection(req.kind.clone());
        let kind: CollectionKind = req.kind.parse().map_err(|_| unknown())?;
        let fields = allowed.get(kind).ok_or_else(unknown)?;
        let adapter = self.registry.get(kind).ok_or_else(unknown)?;

        let filter = parse_query(&req.query)?;

        // Permission fields are always fetched for the filter and never returned.
        let hide_keys: Vec<String> = vec![PUBLIC_FIELD.to_string(), ACCESS_FIELD.to_string()];
        let mut projection: Vec<String> = fields.to_vec();
        for implicit in &hide_keys {
            if !projection.contains(implicit) {
                projection.push(implicit.clone());
            }
        }

        let permissions = adapter.permissions();
        let mut opts = FindOptions {
            projection: Some(projection),
            sort: Some(vec![SortSpec { field: req.sort.clone(), order: req.sort_dir }]),
            limit: None,
            skip: None,
            timeout_ms: self.timeout_ms,
        };
        if permissions.is_none() {
            opts.limit = Some(req.limit);
            opts.skip = Some(req.offset);
        }
        log::debug!(
            "search {kind}: filter={filter} projection={:?} limit={} offset={}",
            opts.projection,
            req.limit,
            req.offset
        );

        let cursor = self.store.find(kind.as_str(), &filter, &opts).map_err(|e| {
            log::warn!("search {kind} failed in store: {e}");
            SearchError::from(e)
        })?;

        let results = match permissions {
            Some(policy) => policy.filter_by_permission(
                cursor,
                caller,
                AccessLevel::Read,
                req.limit,
                req.offset,
                &hide_keys,
            ),
            None => cursor
                .map(|d| {
                    let mut data = d.into_inner();
                    for key in &hide_keys {
                        data.remove(key);
                    }
                    data
                })
                .collect(),
        };

        crate::dev6!(
            "{{\"bench\":\"gateway\",\"op\":\"search\",\"kind\":\"{}\",\"duration_ms\":{},\"result_count\":{},\"limit\":{},\"offset\":{}}}",
            kind,
            started.elapsed().as_millis(),
            results.len(),
            req.limit,
            req.offset
        );
        Ok(results)
    }
}

impl std::fmt::Debug for SearchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchGateway")
            .field("allow_list", &self.allow_list)
            .field("overrides", &self.overrides.len())
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}
