//! Resolves request credentials into a [`CallerContext`].

use std::collections::HashMap;

use crate::access::CallerContext;
use crate::config::Principal;

pub trait Authenticator: Send + Sync {
    /// Maps a bearer token to a caller; `None` or an unknown token is anonymous.
    fn authenticate(&self, token: Option<&str>) -> CallerContext;
}

/// Fixed token table, usually built from the `[[principals]]` config entries.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    callers: HashMap<String, CallerContext>,
}

impl StaticTokens {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_principals(principals: &[Principal]) -> Self {
        let mut tokens = Self::new();
        for p in principals {
            let mut caller = CallerContext::user(&p.id).with_groups(p.groups.iter().cloned());
            caller.admin = p.admin;
            tokens.insert(&p.token, caller);
        }
        tokens
    }

    pub fn insert(&mut self, token: impl Into<String>, caller: CallerContext) {
        self.callers.insert(token.into(), caller);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}

impl Authenticator for StaticTokens {
    fn authenticate(&self, token: Option<&str>) -> CallerContext {
        match token.and_then(|t| self.callers.get(t)) {
            Some(c) => c.clone(),
            None => {
                if token.is_some() {
                    log::debug!("unknown bearer token; treating caller as anonymous");
                }
                CallerContext::anonymous()
            }
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
