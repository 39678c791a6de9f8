//! Query-string driven filtering, sorting and paging over any read result.
//!
//! Reserved control keys start with `_`: `_sort`, `_order` (`desc` for descending),
//! `_limit` and `_page` (zero-based). Every other key is a case-insensitive equality
//! filter against the column of the same name; keys that are not columns are ignored.

use crate::value::{Row, SortKey, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSpec {
    pub sort: Option<String>,
    pub descending: bool,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub filters: Vec<(String, String)>,
}

impl FilterSpec {
    /// Build from raw query pairs. The first occurrence of a repeated key wins; unparsable numbers count as unset.
    pub fn from_query(pairs: &[(String, String)]) -> Self {
        let mut spec = FilterSpec::default();
        let mut seen: Vec<&str> = Vec::new();
        for (k, v) in pairs {
            if seen.contains(&k.as_str()) {
                continue;
            }
            seen.push(k);
            match k.as_str() {
                "_sort" => spec.sort = Some(v.clone()),
                "_order" => spec.descending = v == "desc",
                "_limit" => spec.limit = v.trim().parse().ok(),
                "_page" => spec.page = v.trim().parse().ok(),
                _ if k.starts_with('_') => {}
                _ => spec.filters.push((k.clone(), v.clone())),
            }
        }
        spec
    }
}

/// Filter, then sort, then paginate.
pub fn shape(rows: Vec<Row>, spec: &FilterSpec) -> Vec<Row> {
    let mut rows = filter_rows(rows, &spec.filters);
    if let Some(column) = &spec.sort {
        sort_rows(&mut rows, column, spec.descending);
    }
    paginate(rows, spec.limit, spec.page)
}

/// Numeric cells also match a query value that parses to the same number (`1.0` matches `1`).
fn cell_matches(cell: &Value, wanted: &str) -> bool {
    let number = match cell {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    if let (Some(n), Ok(w)) = (number, wanted.trim().parse::<f64>()) {
        if n == w {
            return true;
        }
    }
    cell.as_text().to_lowercase() == wanted.to_lowercase()
}

fn matches_filters(row: &Row, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, wanted)| match row.get(column) {
        None => true,
        Some(v) => cell_matches(v, wanted),
    })
}

pub fn filter_rows(rows: Vec<Row>, filters: &[(String, String)]) -> Vec<Row> {
    if filters.is_empty() {
        return rows;
    }
    rows.into_iter().filter(|r| matches_filters(r, filters)).collect()
}

/// Stable sort by `column`; null and missing cells are the minimum. Skipped when no row has the column.
pub fn sort_rows(rows: &mut [Row], column: &str, descending: bool) {
    if !rows.iter().any(|r| r.contains(column)) {
        return;
    }
    rows.sort_by(|a, b| {
        let ord = SortKey(a.get(column)).cmp(&SortKey(b.get(column)));
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// `[limit * page, limit * page + limit)`, clamped. No limit (or zero) keeps every row.
pub fn paginate(rows: Vec<Row>, limit: Option<usize>, page: Option<usize>) -> Vec<Row> {
    let Some(limit) = limit.filter(|l| *l > 0) else {
        return rows;
    };
    let offset = limit.saturating_mul(page.unwrap_or(0));
    rows.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> FilterSpec {
        let pairs: Vec<(String, String)> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        FilterSpec::from_query(&pairs)
    }

    fn v_rows(values: &[Value]) -> Vec<Row> {
        values.iter().map(|v| [("v", v.clone())].into_iter().collect()).collect()
    }

    fn v_column(rows: &[Row]) -> Vec<Value> {
        rows.iter().map(|r| r.get("v").cloned().unwrap_or(Value::Null)).collect()
    }

    fn numbered(n: i64) -> Vec<Row> {
        (0..n).map(|i| [("n", Value::Int(i))].into_iter().collect()).collect()
    }

    #[test]
    fn parses_controls_and_filters() {
        let spec = q(&[("_sort", "age"), ("_order", "desc"), ("_limit", "3"), ("_page", "x"), ("name", "bob"), ("_other", "1")]);
        assert_eq!(spec.sort.as_deref(), Some("age"));
        assert!(spec.descending);
        assert_eq!(spec.limit, Some(3));
        assert_eq!(spec.page, None);
        assert_eq!(spec.filters, vec![("name".to_string(), "bob".to_string())]);
    }

    #[test]
    fn first_occurrence_wins() {
        let spec = q(&[("name", "a"), ("name", "b"), ("_limit", "2"), ("_limit", "9")]);
        assert_eq!(spec.filters.len(), 1);
        assert_eq!(spec.filters[0].1, "a");
        assert_eq!(spec.limit, Some(2));
    }

    #[test]
    fn nulls_sort_low_in_both_directions() {
        let rows = v_rows(&[Value::Null, Value::Int(5), Value::Int(2)]);
        let asc = shape(rows.clone(), &q(&[("_sort", "v")]));
        assert_eq!(v_column(&asc), vec![Value::Null, Value::Int(2), Value::Int(5)]);
        let desc = shape(rows, &q(&[("_sort", "v"), ("_order", "desc")]));
        assert_eq!(v_column(&desc), vec![Value::Int(5), Value::Int(2), Value::Null]);
    }

    #[test]
    fn unknown_sort_column_keeps_order() {
        let rows = v_rows(&[Value::Int(3), Value::Int(1), Value::Int(2)]);
        let out = shape(rows, &q(&[("_sort", "missing")]));
        assert_eq!(v_column(&out), vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn order_other_than_desc_is_ascending() {
        let rows = v_rows(&[Value::Int(2), Value::Int(1)]);
        let out = shape(rows, &q(&[("_sort", "v"), ("_order", "DESC")]));
        assert_eq!(v_column(&out), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn paginates_by_limit_and_page() {
        let page = shape(numbered(10), &q(&[("_limit", "3"), ("_page", "1")]));
        assert_eq!(page, numbered(10)[3..6].to_vec());
        let first = shape(numbered(10), &q(&[("_limit", "3")]));
        assert_eq!(first, numbered(10)[0..3].to_vec());
        assert_eq!(shape(numbered(10), &q(&[])).len(), 10);
        assert_eq!(shape(numbered(10), &q(&[("_page", "2")])).len(), 10);
        assert_eq!(shape(numbered(10), &q(&[("_limit", "0")])).len(), 10);
        assert!(shape(numbered(10), &q(&[("_limit", "5"), ("_page", "7")])).is_empty());
        assert_eq!(shape(numbered(10), &q(&[("_limit", "abc"), ("_page", "1")])).len(), 10);
    }

    #[test]
    fn filters_are_case_insensitive_and_tolerant() {
        let rows: Vec<Row> = vec![
            [("name", Value::from("Bob")), ("age", Value::Int(30))].into_iter().collect(),
            [("name", Value::from("alice")), ("age", Value::Int(30))].into_iter().collect(),
        ];
        let bob = shape(rows.clone(), &q(&[("name", "bob")]));
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].get("name"), Some(&Value::from("Bob")));

        assert_eq!(shape(rows.clone(), &q(&[("nickname", "x")])).len(), 2);
        assert_eq!(shape(rows.clone(), &q(&[("age", "30")])).len(), 2);
        assert!(shape(rows, &q(&[("name", "bob"), ("age", "31")])).is_empty());
    }

    #[test]
    fn numeric_filters_compare_by_value() {
        let rows: Vec<Row> = vec![
            [("price", Value::Float(1.0))].into_iter().collect(),
            [("price", Value::Float(9.99))].into_iter().collect(),
            [("price", Value::Int(10))].into_iter().collect(),
        ];
        assert_eq!(shape(rows.clone(), &q(&[("price", "1.0")])).len(), 1);
        assert_eq!(shape(rows.clone(), &q(&[("price", "1")])).len(), 1);
        assert_eq!(shape(rows.clone(), &q(&[("price", "10.00")])).len(), 1);
        assert_eq!(shape(rows.clone(), &q(&[("price", "9.99")])).len(), 1);
        assert!(shape(rows, &q(&[("price", "2")])).is_empty());
    }

    #[test]
    fn filter_then_sort_then_page() {
        let rows: Vec<Row> = (0..6)
            .map(|i| {
                [("kind", Value::from(if i % 2 == 0 { "even" } else { "odd" })), ("n", Value::Int(i))]
                    .into_iter()
                    .collect()
            })
            .collect();
        let out = shape(rows, &q(&[("kind", "EVEN"), ("_sort", "n"), ("_order", "desc"), ("_limit", "2")]));
        let ns: Vec<_> = out.iter().map(|r| r.get("n").cloned().unwrap()).collect();
        assert_eq!(ns, vec![Value::Int(4), Value::Int(2)]);
    }
}
