mod placeholder;
mod values_clause;
mod where_clause;

pub use placeholder::ParamCursor;
pub use values_clause::{
    resolve_insert, resolve_update_changes, resolve_update_record, WriteSet, DEFAULT_TOKEN,
};
pub use where_clause::{render_where, Combinator, Predicate, MARKER};
