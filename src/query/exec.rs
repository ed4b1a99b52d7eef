use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use std::time::{Duration, Instant};

use super::cursor::Cursor;
use super::eval::{compare_docs, eval_filter, project_fields};
use super::types::{Filter, FindOptions, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS};

/// Scans `col`, keeping documents matching `filter`, then sorts, slices and projects them.
///
/// # Errors
/// Returns `DbError::Timeout` when the scan outlives `opts.timeout_ms`.
pub fn find_docs(col: &Collection, filter: &Filter, opts: &FindOptions) -> Result<Cursor, DbError> {
    let bench_start = Instant::now();
    let deadline = opts.timeout_ms.map(|ms| bench_start + Duration::from_millis(ms));

    let mut docs: Vec<Document> = Vec::new();
    for d in col.snapshot() {
        if let Some(dl) = deadline
            && Instant::now() > dl
        {
            log::warn!("find on {} exceeded {} ms", col.name(), opts.timeout_ms.unwrap_or(0));
            return Err(DbError::Timeout { timeout_ms: opts.timeout_ms.unwrap_or(0) });
        }
        if eval_filter(&d.data, filter) {
            docs.push(d);
        }
    }

    if let Some(sort) = &opts.sort {
        if sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec too long: {}", sort.len());
        }
        // Stable sort keeps insertion order among equal keys, so pages never overlap.
        docs.sort_by(|a, b| compare_docs(&a.data, &b.data, sort));
    }

    let skip = opts.skip.unwrap_or(0);
    let limit = match opts.limit {
        Some(0) | None => usize::MAX,
        Some(n) => n,
    };
    let mut docs: Vec<Document> = docs.into_iter().skip(skip).take(limit).collect();

    if let Some(fields) = &opts.projection {
        let fields: Vec<String> = fields.iter().take(MAX_PROJECTION_FIELDS).cloned().collect();
        for d in &mut docs {
            d.data = project_fields(&d.data, &fields);
        }
    }

    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"find\",\"collection\":\"{}\",\"duration_ms\":{},\"result_count\":{},\"limit\":{},\"skip\":{}}}",
        col.name(),
        bench_start.elapsed().as_millis(),
        docs.len(),
        opts.limit.unwrap_or(0),
        skip
    );
    Ok(Cursor::new(docs))
}
