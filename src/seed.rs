//! Startup seeding of the in-memory store from NDJSON files.
//!
//! A seed directory holds one `<kind>.ndjson` file per collection kind, one JSON
//! object per line. Extended JSON values such as `{"$oid": ..}` are decoded.

use bson::Bson;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::collection::Collection;
use crate::document::Document;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::kinds::CollectionKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Inserts every object line of `reader` into `collection`.
///
/// Blank lines are ignored. With `skip_errors` a bad line is counted and
/// skipped; otherwise it aborts the load, leaving earlier lines inserted.
///
/// # Errors
/// I/O failures, and malformed lines when `skip_errors` is off.
pub fn load_ndjson<R: Read>(collection: &Collection, reader: R, skip_errors: bool) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();
    let mut reader = BufReader::new(reader);
    let mut buf = String::with_capacity(8 * 1024);
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        match decode_line(line) {
            Ok(data) => {
                collection.insert_document(Document::new(data));
                report.inserted += 1;
            }
            Err(e) if skip_errors => {
                log::warn!("{}: skipping line {line_no}: {e}", collection.name());
                report.skipped += 1;
            }
            Err(e) => return Err(DbError::Bson(format!("{}: line {line_no}: {e}", collection.name()))),
        }
    }
    Ok(report)
}

fn decode_line(line: &str) -> Result<bson::Document, String> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    match Bson::try_from(value).map_err(|e| e.to_string())? {
        Bson::Document(d) => Ok(d),
        other => Err(format!("expected an object, got {:?}", other.element_type())),
    }
}

/// Loads `<kind>.ndjson` for each kind found in `dir`; absent files are skipped.
///
/// # Errors
/// Returns the first file that cannot be read or, without `skip_errors`, parsed.
pub fn seed_dir(engine: &Engine, dir: &Path, skip_errors: bool) -> Result<SeedReport, DbError> {
    let mut total = SeedReport::default();
    for kind in CollectionKind::ALL {
        let path = dir.join(format!("{kind}.ndjson"));
        if !path.is_file() {
            continue;
        }
        let col = engine.create_collection(kind.as_str());
        let report = load_ndjson(&col, std::fs::File::open(&path)?, skip_errors)?;
        log::info!("seeded {kind}: {} inserted, {} skipped", report.inserted, report.skipped);
        total.inserted += report.inserted;
        total.skipped += report.skipped;
    }
    Ok(total)
}
