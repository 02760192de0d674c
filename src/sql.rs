//! Translation of a grid block-fetch request into SQL.
//!
//! The grid asks for "rows N..M, sorted thus, filtered thus"; this module
//! turns that into a bounded SELECT plus a matching COUNT so the total row
//! count stays in step with the active filters.

use std::collections::BTreeMap;

/// Operators available for filters on string columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFilterOp {
    Contains,
    NotContains,
    Equals,
    NotEqual,
    StartsWith,
    EndsWith,
}

/// Operators available for filters on numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFilterOp {
    Equals,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// A single column filter as produced by the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    Text { op: TextFilterOp, value: String },
    Number { op: NumberFilterOp, value: f64 },
}

/// One sort entry from the grid. `sort` is kept as the raw string the grid
/// produced; only exactly "asc" or "desc" survive into the ORDER BY clause,
/// anything else is dropped rather than defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub col_id: String,
    pub sort: String,
}

impl SortSpec {
    pub fn asc(col_id: impl Into<String>) -> Self {
        Self {
            col_id: col_id.into(),
            sort: "asc".to_string(),
        }
    }

    pub fn desc(col_id: impl Into<String>) -> Self {
        Self {
            col_id: col_id.into(),
            sort: "desc".to_string(),
        }
    }
}

/// One block-fetch request from the grid: a half-open row range plus the
/// grid's current sort and filter state. Filters are keyed by column id in a
/// BTreeMap so emitted clause order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct RowFetchRequest {
    pub start_row: usize,
    pub end_row: usize,
    pub sort_model: Vec<SortSpec>,
    pub filter_model: BTreeMap<String, FilterSpec>,
}

impl RowFetchRequest {
    pub fn range(start_row: usize, end_row: usize) -> Self {
        Self {
            start_row,
            end_row,
            ..Default::default()
        }
    }
}

/// The SQL pair answering one block fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltSql {
    pub query: String,
    pub count_query: String,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

fn escape_str(value: &str) -> String {
    value.replace('\'', "''")
}

fn filter_clause(col_id: &str, spec: &FilterSpec) -> String {
    let col = quote_ident(col_id);
    match spec {
        FilterSpec::Text { op, value } => {
            let val = escape_str(value);
            match op {
                TextFilterOp::Contains => format!("{col} ILIKE '%{val}%'"),
                TextFilterOp::NotContains => format!("{col} NOT ILIKE '%{val}%'"),
                TextFilterOp::Equals => format!("{col} = '{val}'"),
                TextFilterOp::NotEqual => format!("{col} != '{val}'"),
                TextFilterOp::StartsWith => format!("{col} ILIKE '{val}%'"),
                TextFilterOp::EndsWith => format!("{col} ILIKE '%{val}'"),
            }
        }
        FilterSpec::Number { op, value } => match op {
            NumberFilterOp::Equals => format!("{col} = {value}"),
            NumberFilterOp::NotEqual => format!("{col} != {value}"),
            NumberFilterOp::GreaterThan => format!("{col} > {value}"),
            NumberFilterOp::LessThan => format!("{col} < {value}"),
            NumberFilterOp::GreaterThanOrEqual => format!("{col} >= {value}"),
            NumberFilterOp::LessThanOrEqual => format!("{col} <= {value}"),
        },
    }
}

/// Build the bounded SELECT and matching COUNT for one block fetch against
/// `view`. The COUNT query shares the WHERE clause but carries no ORDER BY,
/// LIMIT, or OFFSET. Column ids and string values come straight from the
/// grid; the only escaping is identifier double-quoting and doubling of
/// single quotes inside string literals.
pub fn build_sql(view: &str, request: &RowFetchRequest) -> BuiltSql {
    let clauses: Vec<String> = request
        .filter_model
        .iter()
        .map(|(col_id, spec)| filter_clause(col_id, spec))
        .collect();

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let order_terms: Vec<String> = request
        .sort_model
        .iter()
        .filter(|s| s.sort == "asc" || s.sort == "desc")
        .map(|s| format!("{} {}", quote_ident(&s.col_id), s.sort.to_uppercase()))
        .collect();

    let order_sql = if order_terms.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", order_terms.join(", "))
    };

    let limit = request.end_row.saturating_sub(request.start_row);
    let offset = request.start_row;

    BuiltSql {
        query: format!("SELECT * FROM {view}{where_sql}{order_sql} LIMIT {limit} OFFSET {offset}"),
        count_query: format!("SELECT COUNT(*) AS total FROM {view}{where_sql}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(op: TextFilterOp, value: &str) -> FilterSpec {
        FilterSpec::Text {
            op,
            value: value.to_string(),
        }
    }

    fn number(op: NumberFilterOp, value: f64) -> FilterSpec {
        FilterSpec::Number { op, value }
    }

    #[test]
    fn empty_request_has_no_where_or_order_by() {
        let built = build_sql("parquet_file", &RowFetchRequest::range(0, 100));
        assert_eq!(
            built.query,
            "SELECT * FROM parquet_file LIMIT 100 OFFSET 0"
        );
        assert_eq!(
            built.count_query,
            "SELECT COUNT(*) AS total FROM parquet_file"
        );
    }

    #[test]
    fn limit_is_row_range_and_offset_is_start() {
        let built = build_sql("v", &RowFetchRequest::range(200, 350));
        assert!(built.query.ends_with("LIMIT 150 OFFSET 200"));
        assert!(!built.count_query.contains("LIMIT"));
        assert!(!built.count_query.contains("OFFSET"));
    }

    #[test]
    fn one_clause_per_filter_entry_with_quoted_columns() {
        let mut request = RowFetchRequest::range(0, 50);
        request
            .filter_model
            .insert("name".to_string(), text(TextFilterOp::Contains, "ann"));
        request
            .filter_model
            .insert("id".to_string(), number(NumberFilterOp::GreaterThan, 10.0));
        let built = build_sql("parquet_file", &request);
        // BTreeMap order: "id" before "name"
        assert!(built
            .query
            .contains("WHERE \"id\" > 10 AND \"name\" ILIKE '%ann%'"));
        assert_eq!(built.query.matches(" AND ").count(), 1);
    }

    #[test]
    fn text_operator_table() {
        let cases = [
            (TextFilterOp::Contains, "\"c\" ILIKE '%v%'"),
            (TextFilterOp::NotContains, "\"c\" NOT ILIKE '%v%'"),
            (TextFilterOp::Equals, "\"c\" = 'v'"),
            (TextFilterOp::NotEqual, "\"c\" != 'v'"),
            (TextFilterOp::StartsWith, "\"c\" ILIKE 'v%'"),
            (TextFilterOp::EndsWith, "\"c\" ILIKE '%v'"),
        ];
        for (op, expected) in cases {
            assert_eq!(filter_clause("c", &text(op, "v")), expected);
        }
    }

    #[test]
    fn number_operator_table() {
        let cases = [
            (NumberFilterOp::Equals, "\"c\" = 5"),
            (NumberFilterOp::NotEqual, "\"c\" != 5"),
            (NumberFilterOp::GreaterThan, "\"c\" > 5"),
            (NumberFilterOp::LessThan, "\"c\" < 5"),
            (NumberFilterOp::GreaterThanOrEqual, "\"c\" >= 5"),
            (NumberFilterOp::LessThanOrEqual, "\"c\" <= 5"),
        ];
        for (op, expected) in cases {
            assert_eq!(filter_clause("c", &number(op, 5.0)), expected);
        }
    }

    #[test]
    fn single_quotes_in_text_values_are_doubled() {
        let built_clause = filter_clause("name", &text(TextFilterOp::Contains, "O'Brien"));
        assert_eq!(built_clause, "\"name\" ILIKE '%O''Brien%'");
    }

    #[test]
    fn invalid_sort_entries_are_dropped_not_defaulted() {
        let mut request = RowFetchRequest::range(0, 10);
        request.sort_model = vec![
            SortSpec::asc("a"),
            SortSpec {
                col_id: "b".to_string(),
                sort: "ASC".to_string(),
            },
            SortSpec {
                col_id: "c".to_string(),
                sort: "ascending".to_string(),
            },
            SortSpec::desc("d"),
        ];
        let built = build_sql("v", &request);
        assert!(built.query.contains("ORDER BY \"a\" ASC, \"d\" DESC"));
        assert!(!built.query.contains("\"b\""));
        assert!(!built.query.contains("\"c\""));
    }

    #[test]
    fn all_invalid_sorts_yield_no_order_by() {
        let mut request = RowFetchRequest::range(0, 10);
        request.sort_model = vec![SortSpec {
            col_id: "a".to_string(),
            sort: "Desc".to_string(),
        }];
        let built = build_sql("v", &request);
        assert!(!built.query.contains("ORDER BY"));
    }

    #[test]
    fn count_query_shares_where_clause() {
        let mut request = RowFetchRequest::range(10, 20);
        request
            .filter_model
            .insert("x".to_string(), number(NumberFilterOp::LessThan, 3.5));
        request.sort_model = vec![SortSpec::desc("x")];
        let built = build_sql("v", &request);
        assert!(built.query.contains("WHERE \"x\" < 3.5"));
        assert_eq!(
            built.count_query,
            "SELECT COUNT(*) AS total FROM v WHERE \"x\" < 3.5"
        );
        assert!(!built.count_query.contains("ORDER BY"));
    }
}
