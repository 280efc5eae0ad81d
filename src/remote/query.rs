use serde_json::Value;
use std::fmt;

/// A single predicate on a row column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    /// Case-insensitive substring match on a text column.
    ILike(String, String),
    In(String, Vec<Value>),
}

impl Predicate {
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Predicate::Eq(column, expected) => row.get(column) == Some(expected),
            Predicate::ILike(column, needle) => row
                .get(column)
                .and_then(Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            Predicate::In(column, values) => row
                .get(column)
                .is_some_and(|value| values.contains(value)),
        }
    }
}

/// Conjunction of predicates. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    predicates: Vec<Predicate>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates
            .push(Predicate::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        self.predicates
            .push(Predicate::ILike(column.to_string(), needle.to_string()));
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.predicates.push(Predicate::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Select request: filter, optional ordering and a page window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowQuery {
    pub filter: RowFilter,
    pub order: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl RowQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: RowFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets limit/offset for a zero-based page index.
    pub fn page(self, page: usize, page_size: usize) -> Self {
        self.limit(page_size).offset(page.saturating_mul(page_size))
    }
}
