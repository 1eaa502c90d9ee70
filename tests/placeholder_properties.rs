use pgfluent::builders::OperationKind;
use pgfluent::clauses::{
    render_where, resolve_insert, resolve_update_changes, Combinator, ParamCursor, Predicate,
};
use pgfluent::SqlValue;
use proptest::prelude::*;

pgfluent::record! {
    #[derive(Debug, Clone)]
    struct Part {
        #[generated]
        id: i64,
        name: String,
        qty: i32,
    }
}

/// Placeholder numbers in the order they appear in `sql`.
fn placeholders(sql: &str) -> Vec<usize> {
    sql.split('$')
        .skip(1)
        .filter_map(|tail| {
            let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect()
}

/// One predicate per entry: its combinator and how many markers it carries.
fn predicate_chain() -> impl Strategy<Value = Vec<(bool, usize)>> {
    prop::collection::vec((any::<bool>(), 0usize..4), 1..12)
}

fn build_predicates(chain: &[(bool, usize)]) -> Vec<Predicate> {
    let mut next = 0i64;
    chain
        .iter()
        .map(|&(or, markers)| {
            let template = if markers == 0 {
                "archived IS NULL".to_string()
            } else {
                vec!["c = ?"; markers].join(" OR ")
            };
            let args = (0..markers)
                .map(|_| {
                    next += 1;
                    SqlValue::Int64(next)
                })
                .collect();
            let combinator = if or { Combinator::Or } else { Combinator::And };
            Predicate::new(combinator, template, args)
        })
        .collect()
}

fn part_strategy() -> impl Strategy<Value = Part> {
    ("[a-z]{0,8}", any::<i32>()).prop_map(|(name, qty)| Part { id: 0, name, qty })
}

proptest! {
    /// Property: N markers across any AND/OR chain render $1..$N in order with N arguments
    #[test]
    fn where_placeholders_are_sequential(chain in predicate_chain()) {
        let predicates = build_predicates(&chain);
        let total: usize = chain.iter().map(|(_, markers)| markers).sum();

        let mut cursor = ParamCursor::new();
        let sql = render_where(&predicates, &mut cursor, OperationKind::Find)
            .unwrap()
            .unwrap_or_default();

        prop_assert_eq!(placeholders(&sql), (1..=total).collect::<Vec<_>>());
        let expected: Vec<SqlValue> = (1..=total as i64).map(SqlValue::Int64).collect();
        prop_assert_eq!(cursor.params(), expected.as_slice());

        let separators = sql.matches(" AND ").count() + sql.matches(" OR ").count();
        let inner: usize = chain.iter().map(|(_, m)| m.saturating_sub(1)).sum();
        prop_assert_eq!(separators, chain.len() - 1 + inner);
    }

    /// Property: M records of K writable fields plus one generated field give
    /// M groups of K placeholders and one DEFAULT each, M*K arguments in order
    #[test]
    fn bulk_insert_numbers_every_group(parts in prop::collection::vec(part_strategy(), 1..20)) {
        let mut cursor = ParamCursor::new();
        let set = resolve_insert(&parts, &mut cursor).unwrap();

        prop_assert_eq!(set.rows().len(), parts.len());
        for (i, row) in set.rows().iter().enumerate() {
            prop_assert_eq!(row.len(), 3);
            prop_assert_eq!(row[0].as_str(), "DEFAULT");
            prop_assert_eq!(&row[1], &format!("${}", 2 * i + 1));
            prop_assert_eq!(&row[2], &format!("${}", 2 * i + 2));
        }

        let values = set.values_list();
        prop_assert_eq!(values.matches("DEFAULT").count(), parts.len());
        prop_assert_eq!(placeholders(&values), (1..=2 * parts.len()).collect::<Vec<_>>());

        let expected: Vec<SqlValue> = parts
            .iter()
            .flat_map(|p| [SqlValue::Text(p.name.clone()), SqlValue::Int32(p.qty)])
            .collect();
        prop_assert_eq!(cursor.params(), expected.as_slice());
    }

    /// Property: SET placeholders continue after the WHERE placeholders
    #[test]
    fn update_values_follow_conditions(
        chain in predicate_chain(),
        columns in prop::collection::vec("[a-z]{1,6}", 1..6)
    ) {
        let predicates = build_predicates(&chain);
        let conditions: usize = chain.iter().map(|(_, markers)| markers).sum();

        let mut cursor = ParamCursor::new();
        render_where(&predicates, &mut cursor, OperationKind::Update).unwrap();
        let changes = columns
            .iter()
            .map(|c| (c.clone(), SqlValue::from(c.as_str())))
            .collect();
        let set = resolve_update_changes(changes, &mut cursor).unwrap();

        let first = conditions + 1;
        prop_assert_eq!(
            placeholders(&set.values_list()),
            (first..first + columns.len()).collect::<Vec<_>>()
        );
        prop_assert_eq!(cursor.position(), conditions + columns.len());
    }
}
