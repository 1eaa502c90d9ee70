mod accumulator;
mod statement;
mod table;

pub use accumulator::{Accumulator, SortDirection, ALL_FIELDS};
pub use statement::{
    assemble, assemble_insert, assemble_step, assemble_update, quote_ident, OperationKind,
    Statement,
};
pub use table::TableQuery;
