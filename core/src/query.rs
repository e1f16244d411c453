//! Property queries against a record store.
//!
//! A [`Query`] selects records of one kind, optionally scoped to an ancestor key, filtered
//! by property comparisons and ordered by property sort orders.
//!
//! # The single-inequality rule
//!
//! Record stores serve property queries from composite indexes, and an index can only be
//! range-scanned on one property at a time. A query may therefore use inequality operators
//! (anything but `=`) on at most one property, and when it does, that property must be the
//! first sort order. [`Query::validate`] enforces both rules and every store implementation
//! calls it before executing a query.
//!
//! # Comparison semantics
//!
//! Property values are JSON values. A list-valued property matches a filter when any of its
//! elements matches. Values of different JSON types order as
//! `null < string < number < boolean < array < object`, the same ordering `PostgreSQL` uses
//! for `jsonb`. A record that lacks a filtered property never matches that filter.

use crate::key::Key;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors raised by [`Query::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Inequality filters were applied to two different properties.
    #[error("Inequality filters on more than one property: {first} and {second}")]
    MultipleInequalityProperties {
        /// The property that carried the first inequality.
        first: String,
        /// The second, conflicting property.
        second: String,
    },

    /// An inequality filter is present but the first sort order is another property.
    #[error("First sort order must be the inequality property {inequality}, found {first_sort}")]
    InequalityNotFirstSort {
        /// The inequality property.
        inequality: String,
        /// The property the query sorts by first.
        first_sort: String,
    },
}

/// Comparison operator of a property filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

impl Operator {
    /// Every operator except `=` constrains an index range.
    #[must_use]
    pub const fn is_inequality(self) -> bool {
        !matches!(self, Self::Equal)
    }

    /// SQL-style symbol for the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        }
    }

    /// Whether `lhs.cmp(rhs) == ordering` satisfies this operator.
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => matches!(ordering, Ordering::Equal),
            Self::NotEqual => !matches!(ordering, Ordering::Equal),
            Self::LessThan => matches!(ordering, Ordering::Less),
            Self::LessThanOrEqual => !matches!(ordering, Ordering::Greater),
            Self::GreaterThan => matches!(ordering, Ordering::Greater),
            Self::GreaterThanOrEqual => !matches!(ordering, Ordering::Less),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single `property <op> value` comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    /// Stored property name.
    pub property: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Right-hand operand.
    pub value: Value,
}

impl PropertyFilter {
    /// Create a filter.
    #[must_use]
    pub fn new(property: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluate the filter against a record's properties.
    #[must_use]
    pub fn matches(&self, properties: &Value) -> bool {
        let Some(stored) = properties.get(&self.property) else {
            return false;
        };
        match stored {
            Value::Array(elements) => elements
                .iter()
                .any(|element| self.operator.accepts(compare_values(element, &self.value))),
            scalar => self.operator.accepts(compare_values(scalar, &self.value)),
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Sort by one property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Stored property name.
    pub property: String,
    /// Direction.
    pub direction: Direction,
}

impl SortOrder {
    /// Ascending sort on `property`.
    #[must_use]
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Ascending,
        }
    }

    /// Descending sort on `property`.
    #[must_use]
    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Descending,
        }
    }
}

/// A property query over one kind of record.
///
/// # Examples
///
/// ```
/// use conference_central_core::query::{Operator, Query, SortOrder};
///
/// let query = Query::new("Conference")
///     .filter("city", Operator::Equal, "London")
///     .filter("maxAttendees", Operator::GreaterThan, 10)
///     .order(SortOrder::ascending("maxAttendees"))
///     .order(SortOrder::ascending("name"));
///
/// assert!(query.validate().is_ok());
/// assert_eq!(query.inequality_property(), Some("maxAttendees"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Record kind to select.
    pub kind: String,
    /// Restrict results to descendants of this key.
    pub ancestor: Option<Key>,
    /// Filters, all of which must match.
    pub filters: Vec<PropertyFilter>,
    /// Sort orders, most significant first.
    pub orders: Vec<SortOrder>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl Query {
    /// Query every record of `kind`.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
        }
    }

    /// Scope the query to descendants of `ancestor`.
    #[must_use]
    pub fn ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(
        mut self,
        property: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(PropertyFilter::new(property, operator, value));
        self
    }

    /// Add an already-built filter.
    #[must_use]
    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort order.
    #[must_use]
    pub fn order(mut self, order: SortOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The property carrying inequality filters, if any.
    ///
    /// Only meaningful for validated queries.
    #[must_use]
    pub fn inequality_property(&self) -> Option<&str> {
        self.filters
            .iter()
            .find(|filter| filter.operator.is_inequality())
            .map(|filter| filter.property.as_str())
    }

    /// Check the single-inequality rule.
    ///
    /// # Errors
    ///
    /// - [`QueryError::MultipleInequalityProperties`] if inequality filters touch more than
    ///   one property.
    /// - [`QueryError::InequalityNotFirstSort`] if the query sorts, but not first by the
    ///   inequality property.
    pub fn validate(&self) -> Result<(), QueryError> {
        let mut inequality: Option<&str> = None;
        for filter in self.filters.iter().filter(|f| f.operator.is_inequality()) {
            match inequality {
                Some(first) if first != filter.property => {
                    return Err(QueryError::MultipleInequalityProperties {
                        first: first.to_string(),
                        second: filter.property.clone(),
                    });
                }
                _ => inequality = Some(&filter.property),
            }
        }

        if let (Some(property), Some(first_sort)) = (inequality, self.orders.first()) {
            if first_sort.property != property {
                return Err(QueryError::InequalityNotFirstSort {
                    inequality: property.to_string(),
                    first_sort: first_sort.property.clone(),
                });
            }
        }
        Ok(())
    }

    /// Whether a record's key and properties satisfy the ancestor scope and every filter.
    #[must_use]
    pub fn matches(&self, key: &Key, properties: &Value) -> bool {
        key.kind() == self.kind
            && self
                .ancestor
                .as_ref()
                .is_none_or(|ancestor| ancestor.is_ancestor_of(key))
            && self.filters.iter().all(|filter| filter.matches(properties))
    }

    /// Order two records' properties by this query's sort orders.
    #[must_use]
    pub fn compare(&self, lhs: &Value, rhs: &Value) -> Ordering {
        for order in &self.orders {
            let ordering = compare_values(
                &sort_value(lhs.get(&order.property), order.direction),
                &sort_value(rhs.get(&order.property), order.direction),
            );
            let ordering = match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// A list sorts by its smallest element ascending and its largest descending.
fn sort_value(value: Option<&Value>, direction: Direction) -> Value {
    match value {
        None => Value::Null,
        Some(Value::Array(elements)) => {
            let pick = match direction {
                Direction::Ascending => elements.iter().min_by(|a, b| compare_values(a, b)),
                Direction::Descending => elements.iter().max_by(|a, b| compare_values(a, b)),
            };
            pick.cloned().unwrap_or(Value::Null)
        }
        Some(scalar) => scalar.clone(),
    }
}

const fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON property values.
///
/// Numbers compare numerically, strings lexicographically and values of different types
/// by type rank (`null < string < number < boolean < array < object`).
#[must_use]
pub fn compare_values(lhs: &Value, rhs: &Value) -> Ordering {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
        },
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ordering = compare_values(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()),
        _ => type_rank(lhs).cmp(&type_rank(rhs)),
    }
}
