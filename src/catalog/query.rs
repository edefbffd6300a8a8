/// Declarative list queries
///
/// Endpoints describe which query parameters they filter on and which fields
/// can be ordered by; this module turns the raw query string into a WHERE /
/// ORDER BY / LIMIT clause. Values that do not parse are logged and the
/// filter is skipped, the request itself never fails because of them.

use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Sqlite};
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 1000;

/// A table-backed entity that can be listed generically
pub trait Record: Sized + Send + Unpin {
    const TABLE: &'static str;
    /// Column list used in SELECT, in the order `from_row` expects
    const COLUMNS: &'static str;
    /// API field name → column, for the `ordering` parameter
    const ORDERING: &'static [(&'static str, &'static str)];
    const DEFAULT_ORDER: &'static str;

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self>;
}

/// How a filter value is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    /// Comma separated integers, matches any of them
    IntegerList,
    Boolean,
    Text,
    Uuid,
    Date,
}

/// What a filter compares against
#[derive(Debug, Clone, Copy)]
pub enum FilterTarget {
    Column(&'static str),
    /// `owner IN (SELECT key FROM table WHERE value IN (...))`
    Related {
        owner: &'static str,
        table: &'static str,
        key: &'static str,
        value: &'static str,
    },
}

/// One entry of an endpoint's filter set
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub param: &'static str,
    pub kind: FieldKind,
    pub target: FilterTarget,
}

impl FilterField {
    pub const fn column(param: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            param,
            kind,
            target: FilterTarget::Column(column),
        }
    }

    pub const fn related(
        param: &'static str,
        kind: FieldKind,
        owner: &'static str,
        table: &'static str,
        key: &'static str,
        value: &'static str,
    ) -> Self {
        Self {
            param,
            kind,
            target: FilterTarget::Related { owner, table, key, value },
        }
    }
}

/// A parsed filter value
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Integer(i64),
    IntegerList(Vec<i64>),
    Boolean(bool),
    Text(String),
}

impl FilterValue {
    /// Parse a raw query value, `None` if it does not fit the kind
    pub fn parse(kind: FieldKind, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            FieldKind::Integer => raw.parse().ok().map(FilterValue::Integer),
            FieldKind::IntegerList => raw
                .split(',')
                .map(|part| part.trim().parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
                .ok()
                .map(FilterValue::IntegerList),
            FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(FilterValue::Boolean(true)),
                "false" | "0" => Some(FilterValue::Boolean(false)),
                _ => None,
            },
            FieldKind::Text => Some(FilterValue::Text(raw.to_string())),
            FieldKind::Uuid => Uuid::parse_str(raw)
                .ok()
                .map(|uuid| FilterValue::Text(uuid.to_string())),
            FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| FilterValue::Text(date.to_string())),
        }
    }

    fn push_bind(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            FilterValue::Integer(v) => {
                qb.push_bind(*v);
            }
            FilterValue::Boolean(v) => {
                qb.push_bind(*v);
            }
            FilterValue::Text(v) => {
                qb.push_bind(v.clone());
            }
            FilterValue::IntegerList(values) => {
                let mut separated = qb.separated(", ");
                for v in values {
                    separated.push_bind(*v);
                }
            }
        }
    }

    fn is_list(&self) -> bool {
        matches!(self, FilterValue::IntegerList(_))
    }
}

#[derive(Debug, Clone)]
struct Condition {
    target: FilterTarget,
    value: FilterValue,
}

/// A fully parsed list request
#[derive(Debug, Clone)]
pub struct ListQuery {
    conditions: Vec<Condition>,
    order: Vec<(&'static str, bool)>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            order: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ListQuery {
    /// Build a query from request parameters using the endpoint's filter set
    /// and the record's orderable fields
    pub fn from_params(
        params: &HashMap<String, String>,
        filters: &[FilterField],
        ordering: &[(&'static str, &'static str)],
    ) -> Self {
        let mut query = Self::default();

        for field in filters {
            let Some(raw) = params.get(field.param) else { continue };
            if raw.is_empty() {
                continue;
            }
            match FilterValue::parse(field.kind, raw) {
                Some(value) => query.conditions.push(Condition {
                    target: field.target,
                    value,
                }),
                None => {
                    tracing::info!("Got '{}' as {} filter value, ignoring it", raw, field.param);
                }
            }
        }

        if let Some(raw) = params.get("ordering") {
            for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let (name, descending) = match name.strip_prefix('-') {
                    Some(stripped) => (stripped, true),
                    None => (name, false),
                };
                match ordering.iter().find(|(field, _)| *field == name) {
                    Some((_, column)) => query.order.push((column, descending)),
                    None => tracing::debug!("Ignoring unknown ordering field '{}'", name),
                }
            }
        }

        if let Some(limit) = params.get("limit").and_then(|l| l.parse::<i64>().ok()) {
            query.limit = limit.clamp(1, MAX_LIMIT);
        }
        if let Some(offset) = params.get("offset").and_then(|o| o.parse::<i64>().ok()) {
            query.offset = offset.max(0);
        }

        query
    }

    /// Add a condition that does not come from the query string
    pub fn with_filter(mut self, field: &FilterField, value: FilterValue) -> Self {
        self.conditions.push(Condition {
            target: field.target,
            value,
        });
        self
    }

    /// Number of filters that made it through parsing
    pub fn filter_count(&self) -> usize {
        self.conditions.len()
    }

    /// Append ` WHERE ...` (or nothing) to the builder
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match condition.target {
                FilterTarget::Column(column) => {
                    qb.push(column);
                }
                FilterTarget::Related { owner, table, key, value } => {
                    qb.push(format!("{} IN (SELECT {} FROM {} WHERE {}", owner, key, table, value));
                }
            }
            if condition.value.is_list() {
                qb.push(" IN (");
                condition.value.push_bind(qb);
                qb.push(")");
            } else {
                qb.push(" = ");
                condition.value.push_bind(qb);
            }
            if matches!(condition.target, FilterTarget::Related { .. }) {
                qb.push(")");
            }
        }
    }

    /// Append ` ORDER BY ... LIMIT ? OFFSET ?`
    pub fn push_order_and_page(&self, qb: &mut QueryBuilder<'_, Sqlite>, default_order: &str) {
        qb.push(" ORDER BY ");
        if self.order.is_empty() {
            qb.push(default_order);
        } else {
            let clauses: Vec<String> = self
                .order
                .iter()
                .map(|(column, desc)| format!("{} {}", column, if *desc { "DESC" } else { "ASC" }))
                .collect();
            qb.push(clauses.join(", "));
            // Stable paging when the requested fields tie
            qb.push(", id ASC");
        }
        qb.push(" LIMIT ");
        qb.push_bind(self.limit);
        qb.push(" OFFSET ");
        qb.push_bind(self.offset);
    }
}

/// One page of results plus the total number of matches
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub count: i64,
    pub results: Vec<T>,
}

impl<T> Listing<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            count: self.count,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const FILTERS: &[FilterField] = &[
        FilterField::column("exercise_base", "exercise_base_id", FieldKind::Integer),
        FilterField::column("name", "name", FieldKind::Text),
        FilterField::column("is_main", "is_main", FieldKind::Boolean),
        FilterField::related(
            "muscles",
            FieldKind::IntegerList,
            "exercise_base_id",
            "exercise_base_muscles",
            "exercise_base_id",
            "muscle_id",
        ),
    ];

    const ORDERING: &[(&str, &str)] = &[("name", "name"), ("id", "id")];

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn sql(query: &ListQuery) -> String {
        let mut qb = QueryBuilder::new("SELECT id FROM t");
        query.push_where(&mut qb);
        query.push_order_and_page(&mut qb, "id");
        qb.sql().to_string()
    }

    #[rstest]
    #[case(FieldKind::Integer, "12", Some(FilterValue::Integer(12)))]
    #[case(FieldKind::Integer, "abc", None)]
    #[case(FieldKind::Integer, "1.5", None)]
    #[case(FieldKind::IntegerList, "1,2, 3", Some(FilterValue::IntegerList(vec![1, 2, 3])))]
    #[case(FieldKind::IntegerList, "1,x", None)]
    #[case(FieldKind::Boolean, "True", Some(FilterValue::Boolean(true)))]
    #[case(FieldKind::Boolean, "0", Some(FilterValue::Boolean(false)))]
    #[case(FieldKind::Boolean, "maybe", None)]
    #[case(FieldKind::Date, "2021-03-01", Some(FilterValue::Text("2021-03-01".into())))]
    #[case(FieldKind::Date, "yesterday", None)]
    #[case(FieldKind::Uuid, "not-a-uuid", None)]
    fn parses_filter_values(
        #[case] kind: FieldKind,
        #[case] raw: &str,
        #[case] expected: Option<FilterValue>,
    ) {
        assert_eq!(FilterValue::parse(kind, raw), expected);
    }

    #[rstest]
    #[case("exercise_base", "one")]
    #[case("muscles", "1,two")]
    #[case("is_main", "perhaps")]
    fn invalid_values_drop_the_filter(#[case] param: &str, #[case] value: &str) {
        let query = ListQuery::from_params(&params(&[(param, value)]), FILTERS, ORDERING);
        assert_eq!(query.filter_count(), 0);
        assert_eq!(sql(&query), "SELECT id FROM t ORDER BY id LIMIT ? OFFSET ?");
    }

    #[test]
    fn valid_values_build_where_clause() {
        let query = ListQuery::from_params(
            &params(&[("exercise_base", "3"), ("muscles", "1,2"), ("name", "Curl")]),
            FILTERS,
            ORDERING,
        );
        assert_eq!(query.filter_count(), 3);
        assert_eq!(
            sql(&query),
            "SELECT id FROM t WHERE exercise_base_id = ? \
             AND name = ? \
             AND exercise_base_id IN (SELECT exercise_base_id FROM exercise_base_muscles WHERE muscle_id IN (?, ?)) \
             ORDER BY id LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn ordering_ignores_unknown_fields() {
        let query = ListQuery::from_params(
            &params(&[("ordering", "-name,password,id")]),
            FILTERS,
            ORDERING,
        );
        assert_eq!(
            sql(&query),
            "SELECT id FROM t ORDER BY name DESC, id ASC, id ASC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn paging_is_clamped() {
        let query = ListQuery::from_params(
            &params(&[("limit", "100000"), ("offset", "-4")]),
            FILTERS,
            ORDERING,
        );
        assert_eq!(query.limit, MAX_LIMIT);
        assert_eq!(query.offset, 0);

        let query = ListQuery::from_params(&params(&[("limit", "ten")]), FILTERS, ORDERING);
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }
}
