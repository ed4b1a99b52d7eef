//! Administrator-only access to the allow-list.

use serde_json::Value;
use std::sync::Arc;

use crate::access::CallerContext;
use crate::allowlist::{AllowList, AllowListStore};
use crate::errors::SearchError;
use crate::logger::AUDIT_TARGET;

#[derive(Debug, Clone)]
pub struct AdminConfig {
    store: Arc<AllowListStore>,
}

fn require_admin(caller: &CallerContext) -> Result<(), SearchError> {
    if caller.admin {
        return Ok(());
    }
    log::warn!(
        target: AUDIT_TARGET,
        "denied allow-list access to {}",
        caller.user_id.as_deref().unwrap_or("anonymous")
    );
    Err(SearchError::Authorization(if caller.is_anonymous() {
        "You must be logged in.".to_string()
    } else {
        "Administrator access required.".to_string()
    }))
}

impl AdminConfig {
    #[must_use]
    pub const fn new(store: Arc<AllowListStore>) -> Self {
        Self { store }
    }

    /// Current allow-list, or the built-in default when `default` is set.
    ///
    /// # Errors
    /// `SearchError::Authorization` for non-administrators.
    pub fn get_allowed(&self, caller: &CallerContext, default: bool) -> Result<Arc<AllowList>, SearchError> {
        require_admin(caller)?;
        Ok(if default { self.store.get_default() } else { self.store.get() })
    }

    /// # Errors
    /// `SearchError::Authorization` for non-administrators, otherwise whatever
    /// [`AllowListStore::set`] returns.
    pub fn set_allowed(&self, caller: &CallerContext, value: &Value) -> Result<Arc<AllowList>, SearchError> {
        require_admin(caller)?;
        log::info!(
            target: AUDIT_TARGET,
            "allow-list update requested by {}",
            caller.user_id.as_deref().unwrap_or("-")
        );
        self.store.set(value)
    }
}
