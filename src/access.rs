//! Caller identity and per-document access evaluation.
//!
//! Access-controlled documents carry two fields:
//!
//! ```json
//! { "public": false,
//!   "access": { "users":  [ { "id": "u1", "level": 2 } ],
//!               "groups": [ { "id": "g1", "level": 0 } ] } }
//! ```
//!
//! Administrators see everything. A public document grants `Read` to every
//! caller, anonymous ones included. Otherwise the caller gets the highest level
//! granted to its own id or to any of its groups.

use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

use crate::query::Cursor;

pub const PUBLIC_FIELD: &str = "public";
pub const ACCESS_FIELD: &str = "access";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read = 0,
    Write = 1,
    Admin = 2,
}

impl AccessLevel {
    #[must_use]
    pub fn from_bson(v: &Bson) -> Option<Self> {
        let n = match v {
            Bson::Int32(i) => i64::from(*i),
            Bson::Int64(i) => *i,
            #[allow(clippy::cast_possible_truncation)]
            Bson::Double(d) if d.fract() == 0.0 => *d as i64,
            _ => return None,
        };
        match n {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            2 => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The requesting principal as resolved by the authentication layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub user_id: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub admin: bool,
}

impl CallerContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self { user_id: Some(id.into()), ..Self::default() }
    }

    #[must_use]
    pub fn administrator(id: impl Into<String>) -> Self {
        Self { user_id: Some(id.into()), admin: true, ..Self::default() }
    }

    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Permission-aware result filtering for collection kinds that carry per-document access.
pub trait PermissionFilter: Send + Sync {
    /// Highest level `caller` holds on `doc`, or `None` for no access at all.
    fn level_for(&self, doc: &BsonDocument, caller: &CallerContext) -> Option<AccessLevel>;

    fn has_access(&self, doc: &BsonDocument, caller: &CallerContext, level: AccessLevel) -> bool {
        self.level_for(doc, caller).is_some_and(|granted| granted >= level)
    }

    /// Drains `cursor`, keeping documents `caller` may see at `level`.
    ///
    /// `offset` skips that many *permitted* documents; `limit` caps the output
    /// (`0` means no cap). `hide_keys` are removed from every returned document.
    fn filter_by_permission(
        &self,
        cursor: Cursor,
        caller: &CallerContext,
        level: AccessLevel,
        limit: usize,
        offset: usize,
        hide_keys: &[String],
    ) -> Vec<BsonDocument> {
        let limit = if limit == 0 { usize::MAX } else { limit };
        cursor
            .filter(|d| self.has_access(&d.data, caller, level))
            .skip(offset)
            .take(limit)
            .map(|d| {
                let mut data = d.into_inner();
                for key in hide_keys {
                    data.remove(key);
                }
                data
            })
            .collect()
    }
}

/// Evaluates the `public`/`access` fields described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    fn grants(list: Option<&Bson>, principal: &str) -> Option<AccessLevel> {
        let Some(Bson::Array(entries)) = list else { return None };
        entries
            .iter()
            .filter_map(|e| match e {
                Bson::Document(entry) => Some(entry),
                _ => None,
            })
            .filter(|entry| entry.get("id").and_then(id_string).as_deref() == Some(principal))
            .filter_map(|entry| entry.get("level").and_then(AccessLevel::from_bson))
            .max()
    }
}

fn id_string(v: &Bson) -> Option<String> {
    match v {
        Bson::String(s) => Some(s.clone()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        _ => None,
    }
}

impl PermissionFilter for AccessPolicy {
    fn level_for(&self, doc: &BsonDocument, caller: &CallerContext) -> Option<AccessLevel> {
        if caller.admin {
            return Some(AccessLevel::Admin);
        }
        let public = matches!(doc.get(PUBLIC_FIELD), Some(Bson::Boolean(true)));
        let mut best = public.then_some(AccessLevel::Read);
        let Some(Bson::Document(access)) = doc.get(ACCESS_FIELD) else { return best };
        if let Some(uid) = &caller.user_id {
            best = best.max(Self::grants(access.get("users"), uid));
        }
        for group in &caller.groups {
            best = best.max(Self::grants(access.get("groups"), group));
        }
        best
    }
}
