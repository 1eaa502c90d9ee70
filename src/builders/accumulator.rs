use std::fmt;

use crate::clauses::Predicate;

/// Projection used until `select` is called.
pub const ALL_FIELDS: &str = "*";

/// Direction of an ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// Per-statement state collected by the fluent builder.
///
/// Owned by exactly one `TableQuery`; a terminal call consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub(crate) table: String,
    pub(crate) fields: String,
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) sort: Option<(String, SortDirection)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) group: Option<String>,
}

impl Accumulator {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: ALL_FIELDS.to_string(),
            predicates: Vec::new(),
            sort: None,
            limit: None,
            offset: None,
            group: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &str {
        &self.fields
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether `select` replaced the default `*` projection.
    pub fn has_projection(&self) -> bool {
        let fields = self.fields.trim();
        !fields.is_empty() && fields != ALL_FIELDS
    }
}
