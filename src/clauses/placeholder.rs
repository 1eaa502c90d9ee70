use crate::types::SqlValue;

/// Statement-local placeholder cursor and the argument list it numbers.
///
/// Every `$n` emitted for a statement comes from one cursor, so the number of
/// placeholders always equals `params().len()`.
#[derive(Debug, Default)]
pub struct ParamCursor {
    params: Vec<SqlValue>,
}

impl ParamCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a value and returns its placeholder, e.g. `$3`.
    pub fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    /// Number of placeholders handed out so far.
    pub fn position(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_params(self) -> Vec<SqlValue> {
        self.params
    }
}
