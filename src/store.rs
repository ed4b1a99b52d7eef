//! Driver interface the gateway issues its single query through.

use crate::errors::DbError;
use crate::query::{Cursor, FilterExpression, FindOptions};

/// A document store able to run one filtered, projected, paginated find.
///
/// Implementations enforce `opts.timeout_ms` themselves; the gateway never
/// retries a failed find.
pub trait DocumentStore: Send + Sync {
    /// # Errors
    /// Returns a `DbError` when the store rejects the filter or the scan fails.
    fn find(
        &self,
        collection: &str,
        filter: &FilterExpression,
        opts: &FindOptions,
    ) -> Result<Cursor, DbError>;
}
