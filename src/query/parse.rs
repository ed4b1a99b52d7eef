use bson::{Bson, Document as BsonDocument};

use super::types::{CmpOp, Filter, MAX_FILTER_DEPTH, MAX_IN_SET};
use crate::errors::{DbError, SearchError};

/// A decoded query document, handed to the store without semantic checks.
pub type FilterExpression = BsonDocument;

/// Decodes caller-supplied query text into a filter document.
///
/// The text must be a single JSON object. Extended JSON (`{"$oid": ..}`,
/// `{"$date": ..}`) is decoded into typed values; operators are not inspected.
///
/// # Errors
/// Returns `SearchError::MalformedQuery` when the text is not a JSON object.
pub fn parse_query(text: &str) -> Result<FilterExpression, SearchError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| SearchError::MalformedQuery(e.to_string()))?;
    if !value.is_object() {
        return Err(SearchError::MalformedQuery("expected a JSON object".into()));
    }
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(SearchError::MalformedQuery(format!(
            "expected a JSON object, got a {:?} value",
            other.element_type()
        ))),
        Err(e) => Err(SearchError::MalformedQuery(e.to_string())),
    }
}

/// Compiles a Mongo-style query document into a `Filter` the in-memory store can evaluate.
///
/// # Errors
/// Returns `DbError::UnsupportedOperator` for operators this store does not implement and
/// `DbError::QueryError` for operators given the wrong kind of argument.
pub fn compile_filter(query: &BsonDocument) -> Result<Filter, DbError> {
    compile_doc(query, 0)
}

fn compile_doc(query: &BsonDocument, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_FILTER_DEPTH {
        return Err(DbError::QueryError("query nested too deeply".into()));
    }
    let mut clauses = Vec::with_capacity(query.len());
    for (key, value) in query {
        let clause = match key.as_str() {
            "$and" => Filter::And(compile_list(key, value, depth)?),
            "$or" => Filter::Or(compile_list(key, value, depth)?),
            "$nor" => Filter::Not(Box::new(Filter::Or(compile_list(key, value, depth)?))),
            op if op.starts_with('$') => return Err(DbError::UnsupportedOperator(op.to_string())),
            path => compile_field(path, value)?,
        };
        clauses.push(clause);
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn compile_list(op: &str, value: &Bson, depth: usize) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(DbError::QueryError(format!("{op} requires an array")));
    };
    if items.is_empty() {
        return Err(DbError::QueryError(format!("{op} requires a nonempty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => compile_doc(d, depth + 1),
            _ => Err(DbError::QueryError(format!("{op} entries must be objects"))),
        })
        .collect()
}

fn is_operator_doc(d: &BsonDocument) -> bool {
    !d.is_empty() && d.keys().all(|k| k.starts_with('$'))
}

fn compile_field(path: &str, value: &Bson) -> Result<Filter, DbError> {
    match value {
        Bson::Document(ops) if is_operator_doc(ops) => compile_ops(path, ops),
        #[cfg(feature = "regex")]
        Bson::RegularExpression(re) => Ok(Filter::Regex {
            path: path.to_string(),
            pattern: re.pattern.to_string(),
            case_insensitive: re.options.to_string().contains('i'),
        }),
        _ => Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: value.clone() }),
    }
}

fn compile_ops(path: &str, ops: &BsonDocument) -> Result<Filter, DbError> {
    let mut out = Vec::with_capacity(ops.len());
    for (op, arg) in ops {
        let cmp = |op: CmpOp| Filter::Cmp { path: path.to_string(), op, value: arg.clone() };
        let f = match op.as_str() {
            "$eq" => cmp(CmpOp::Eq),
            "$ne" => Filter::Not(Box::new(cmp(CmpOp::Eq))),
            "$gt" => cmp(CmpOp::Gt),
            "$gte" => cmp(CmpOp::Gte),
            "$lt" => cmp(CmpOp::Lt),
            "$lte" => cmp(CmpOp::Lte),
            "$in" => Filter::In { path: path.to_string(), values: set_arg(op, arg)? },
            "$nin" => Filter::Nin { path: path.to_string(), values: set_arg(op, arg)? },
            "$exists" => Filter::Exists { path: path.to_string(), exists: truthy(arg) },
            "$not" => match arg {
                Bson::Document(inner) if is_operator_doc(inner) => {
                    Filter::Not(Box::new(compile_ops(path, inner)?))
                }
                #[cfg(feature = "regex")]
                Bson::RegularExpression(_) => Filter::Not(Box::new(compile_field(path, arg)?)),
                _ => return Err(DbError::QueryError("$not needs an operator object".into())),
            },
            #[cfg(feature = "regex")]
            "$regex" => {
                let pattern = match arg {
                    Bson::String(s) => s.clone(),
                    Bson::RegularExpression(re) => re.pattern.to_string(),
                    _ => return Err(DbError::QueryError("$regex needs a string".into())),
                };
                let options = ops.get_str("$options").unwrap_or_default();
                Filter::Regex { path: path.to_string(), pattern, case_insensitive: options.contains('i') }
            }
            #[cfg(feature = "regex")]
            "$options" => continue,
            other => return Err(DbError::UnsupportedOperator(other.to_string())),
        };
        out.push(f);
    }
    Ok(if out.len() == 1 { out.remove(0) } else { Filter::And(out) })
}

fn set_arg(op: &str, arg: &Bson) -> Result<Vec<Bson>, DbError> {
    match arg {
        Bson::Array(values) if values.len() <= MAX_IN_SET => Ok(values.clone()),
        Bson::Array(values) => {
            Err(DbError::QueryError(format!("{op} accepts at most {MAX_IN_SET} values, got {}", values.len())))
        }
        _ => Err(DbError::QueryError(format!("{op} requires an array"))),
    }
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}
