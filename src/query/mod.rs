// Submodules for separation of concerns
mod cursor;
mod eval;
mod exec;
mod parse;
mod types;

pub use cursor::Cursor;
pub use eval::{compare_bson, eval_filter, project_fields};
pub use exec::find_docs;
pub use parse::{FilterExpression, compile_filter, parse_query};
pub use types::{CmpOp, Filter, FindOptions, Order, SortSpec};
