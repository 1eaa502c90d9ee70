use crate::builders::OperationKind;
use crate::clauses::ParamCursor;
use crate::error::{PgFluentError, Result};
use crate::types::SqlValue;

/// Positional marker callers write in predicate templates.
/// `??` stands for a literal `?` (e.g. the jsonb `?`, `?|` and `?&` operators),
/// and a `?` inside a single-quoted literal is never a marker.
pub const MARKER: char = '?';

/// How a predicate joins the predicates before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    fn separator(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

/// One accumulated WHERE condition: a raw SQL template with `?` markers
/// and the arguments that fill them, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    combinator: Combinator,
    template: String,
    args: Vec<SqlValue>,
}

impl Predicate {
    pub fn new(combinator: Combinator, template: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            combinator,
            template: template.into(),
            args,
        }
    }

    pub fn and(template: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self::new(Combinator::And, template, args)
    }

    pub fn or(template: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self::new(Combinator::Or, template, args)
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }

    pub fn marker_count(&self) -> usize {
        let mut count = 0;
        expand(&self.template, |_| count += 1);
        count
    }

    /// Substitutes each marker with the next placeholder from `cursor`.
    /// Callers check `marker_count() == args().len()` first.
    fn render(&self, cursor: &mut ParamCursor) -> String {
        let mut args = self.args.iter();
        expand(&self.template, |sql| {
            if let Some(value) = args.next() {
                sql.push_str(&cursor.bind(value.clone()));
            }
        })
    }
}

/// Copies `template`, calling `marker` at each marker position.
fn expand(template: &str, mut marker: impl FnMut(&mut String)) -> String {
    let mut sql = String::with_capacity(template.len() + 4);
    let mut chars = template.chars().peekable();
    let mut quoted = false;
    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                quoted = !quoted;
                sql.push(ch);
            }
            MARKER if !quoted => {
                if chars.peek() == Some(&MARKER) {
                    chars.next();
                    sql.push(MARKER);
                } else {
                    marker(&mut sql);
                }
            }
            _ => sql.push(ch),
        }
    }
    sql
}

/// Renders the predicate list into the body of a WHERE clause.
///
/// Predicates are joined left to right with their own combinator and no
/// grouping, so `a OR b AND c` keeps SQL's precedence (`a OR (b AND c)`).
/// Returns `None` when there is nothing to render.
pub fn render_where(
    predicates: &[Predicate],
    cursor: &mut ParamCursor,
    operation: OperationKind,
) -> Result<Option<String>> {
    if predicates.is_empty() {
        return Ok(None);
    }

    for predicate in predicates {
        if predicate.marker_count() != predicate.args.len() {
            return Err(PgFluentError::usage(
                operation,
                format!(
                    "condition '{}' has {} marker(s) but {} argument(s)",
                    predicate.template,
                    predicate.marker_count(),
                    predicate.args.len()
                ),
            ));
        }
    }

    let mut sql = String::with_capacity(64);
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            sql.push_str(predicate.combinator.separator());
        }
        sql.push_str(&predicate.render(cursor));
    }
    Ok(Some(sql))
}
