//! Store-agnostic query model

use std::cmp::Ordering;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored row: a JSON object keyed by field name
pub type Record = serde_json::Map<String, Value>;

/// A single predicate over a record field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the given value
    Eq(String, Value),
    /// Field is absent or null
    IsNull(String),
    /// Field is present and not null
    NotNull(String),
    /// Array field contains the given value
    Contains(String, Value),
    /// Case-insensitive substring match over any of the fields
    Search(Vec<String>, String),
}

impl Condition {
    /// Field names this condition constrains
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Eq(f, _) | Self::IsNull(f) | Self::NotNull(f) | Self::Contains(f, _) => {
                vec![f.as_str()]
            }
            Self::Search(fields, _) => fields.iter().map(String::as_str).collect(),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq(field, expected) => record.get(field) == Some(expected),
            Self::IsNull(field) => record.get(field).is_none_or(Value::is_null),
            Self::NotNull(field) => record.get(field).is_some_and(|v| !v.is_null()),
            Self::Contains(field, expected) => match record.get(field) {
                Some(Value::Array(items)) => items.contains(expected),
                _ => false,
            },
            Self::Search(fields, term) => {
                let needle = term.to_lowercase();
                fields.iter().any(|field| {
                    record
                        .get(field)
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            }
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a filter on the primary identifier
    pub fn by_id(id: Uuid) -> Self {
        Self::new().eq("id", id.to_string())
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn is_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull(field.into()));
        self
    }

    pub fn not_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::NotNull(field.into()));
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Contains(field.into(), value.into()));
        self
    }

    pub fn search<I, S>(mut self, fields: I, term: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions.push(Condition::Search(
            fields.into_iter().map(Into::into).collect(),
            term.into(),
        ));
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether any condition constrains the given field
    pub fn mentions(&self, field: &str) -> bool {
        self.conditions
            .iter()
            .any(|c| c.fields().contains(&field))
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// A multi-record read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub order_by: Option<(String, SortOrder)>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn paginate(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Orders two JSON values; nulls sort first, mismatched types compare equal
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => {
            // Timestamps carry a variable number of fractional digits
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// One page of a list query, the unit stored under list cache keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit)) as u32
        };

        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}
