//! Conference query filter compiler.
//!
//! Clients filter conferences with `(field, operator, value)` triples drawn from fixed
//! allow-lists:
//!
//! | Field token     | Property       |   | Operator token | Comparator |
//! |-----------------|----------------|---|----------------|------------|
//! | `CITY`          | `city`         |   | `EQ`           | `=`        |
//! | `TOPIC`         | `topics`       |   | `GT`           | `>`        |
//! | `MONTH`         | `month`        |   | `GTEQ`         | `>=`       |
//! | `MAX_ATTENDEES` | `maxAttendees` |   | `LT`           | `<`        |
//! |                 |                |   | `LTEQ`         | `<=`       |
//! |                 |                |   | `NE`           | `!=`       |
//!
//! [`compile`] turns a filter set into a [`QueryPlan`] the record store can execute:
//!
//! 1. Every token is resolved before anything else is looked at; an unknown token fails
//!    the whole set.
//! 2. Only one field may carry inequality comparators, since a range scan covers a single
//!    indexed property.
//! 3. `month` and `maxAttendees` operands are coerced to integers.
//! 4. Results sort by the inequality field (if any), then by name.
//!
//! Compilation is all-or-nothing: a malformed triple never yields a partial plan.
//!
//! # Example
//!
//! ```
//! use conference_central::filters::{FilterTriple, compile};
//!
//! let plan = compile(&[
//!     FilterTriple::new("CITY", "EQ", "London"),
//!     FilterTriple::new("MONTH", "GT", "3"),
//! ])
//! .unwrap();
//!
//! assert_eq!(plan.primary_sort(), "month");
//! ```

use crate::types::CONFERENCE_KIND;
use conference_central_core::query::{Operator, PropertyFilter, Query, SortOrder};
use conference_central_runtime::metrics::FilterMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Property every plan sorts by last.
pub const NAME_PROPERTY: &str = "name";

/// Errors from [`compile`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A field or operator token is not on the allow-list.
    #[error("invalid field or operator: {field} {operator}")]
    InvalidToken {
        /// Field token as supplied.
        field: String,
        /// Operator token as supplied.
        operator: String,
    },

    /// Inequality comparators appear on two different fields.
    #[error("inequality filter allowed on only one field (found {first} and {second})")]
    MultipleInequalityFields {
        /// Field that carried the first inequality.
        first: String,
        /// Second field carrying an inequality.
        second: String,
    },

    /// A numeric field was given a non-integer operand.
    #[error("{field} requires an integer value, got {value:?}")]
    NonNumericValue {
        /// Property name.
        field: String,
        /// Operand as supplied.
        value: String,
    },
}

/// Filterable conference fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterField {
    /// `CITY` → `city`
    City,
    /// `TOPIC` → `topics`
    Topic,
    /// `MONTH` → `month`
    Month,
    /// `MAX_ATTENDEES` → `maxAttendees`
    MaxAttendees,
}

impl FilterField {
    /// Every field, in allow-list order.
    pub const ALL: [Self; 4] = [Self::City, Self::Topic, Self::Month, Self::MaxAttendees];

    /// Resolve a client token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "CITY" => Some(Self::City),
            "TOPIC" => Some(Self::Topic),
            "MONTH" => Some(Self::Month),
            "MAX_ATTENDEES" => Some(Self::MaxAttendees),
            _ => None,
        }
    }

    /// Client token for this field.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::City => "CITY",
            Self::Topic => "TOPIC",
            Self::Month => "MONTH",
            Self::MaxAttendees => "MAX_ATTENDEES",
        }
    }

    /// Stored property name.
    #[must_use]
    pub const fn property(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Topic => "topics",
            Self::Month => "month",
            Self::MaxAttendees => "maxAttendees",
        }
    }

    /// Whether operands are coerced to integers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Month | Self::MaxAttendees)
    }
}

/// Allowed comparators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `EQ`
    Eq,
    /// `GT`
    Gt,
    /// `GTEQ`
    GtEq,
    /// `LT`
    Lt,
    /// `LTEQ`
    LtEq,
    /// `NE`
    Ne,
}

impl FilterOperator {
    /// Every operator, in allow-list order.
    pub const ALL: [Self; 6] = [Self::Eq, Self::Gt, Self::GtEq, Self::Lt, Self::LtEq, Self::Ne];

    /// Resolve a client token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "EQ" => Some(Self::Eq),
            "GT" => Some(Self::Gt),
            "GTEQ" => Some(Self::GtEq),
            "LT" => Some(Self::Lt),
            "LTEQ" => Some(Self::LtEq),
            "NE" => Some(Self::Ne),
            _ => None,
        }
    }

    /// Client token for this operator.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Gt => "GT",
            Self::GtEq => "GTEQ",
            Self::Lt => "LT",
            Self::LtEq => "LTEQ",
            Self::Ne => "NE",
        }
    }

    /// Store comparator.
    #[must_use]
    pub const fn operator(self) -> Operator {
        match self {
            Self::Eq => Operator::Equal,
            Self::Gt => Operator::GreaterThan,
            Self::GtEq => Operator::GreaterThanOrEqual,
            Self::Lt => Operator::LessThan,
            Self::LtEq => Operator::LessThanOrEqual,
            Self::Ne => Operator::NotEqual,
        }
    }

    /// Everything except `EQ` is an inequality.
    #[must_use]
    pub const fn is_inequality(self) -> bool {
        !matches!(self, Self::Eq)
    }
}

/// One raw filter as sent by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTriple {
    /// Field token, e.g. `CITY`.
    pub field: String,
    /// Operator token, e.g. `EQ`.
    pub operator: String,
    /// Operand, always sent as a string.
    pub value: String,
}

impl FilterTriple {
    /// Create a triple.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// A compiled, executable conference query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    /// Filters in input order.
    pub filters: Vec<PropertyFilter>,
    /// Sort orders: the inequality property if any, then name.
    pub orders: Vec<SortOrder>,
    /// Property carrying inequality filters.
    pub inequality_property: Option<&'static str>,
}

impl QueryPlan {
    /// Property of the first sort order.
    #[must_use]
    pub fn primary_sort(&self) -> &str {
        self.orders
            .first()
            .map_or(NAME_PROPERTY, |order| order.property.as_str())
    }

    /// Conference query executing this plan.
    #[must_use]
    pub fn into_query(self) -> Query {
        let query = self
            .filters
            .into_iter()
            .fold(Query::new(CONFERENCE_KIND), Query::with_filter);
        self.orders.into_iter().fold(query, Query::order)
    }
}

fn coerce(field: FilterField, raw: &str) -> Result<Value, FilterError> {
    if !field.is_numeric() {
        return Ok(Value::from(raw));
    }
    raw.trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|_| FilterError::NonNumericValue {
            field: field.property().to_string(),
            value: raw.to_string(),
        })
}

fn compile_resolved(
    raw: &[FilterTriple],
    resolved: Vec<(FilterField, FilterOperator)>,
) -> Result<QueryPlan, FilterError> {
    let mut inequality: Option<FilterField> = None;
    let mut filters = Vec::with_capacity(raw.len());

    for (triple, (field, operator)) in raw.iter().zip(resolved) {
        if operator.is_inequality() {
            match inequality {
                Some(first) if first != field => {
                    return Err(FilterError::MultipleInequalityFields {
                        first: first.property().to_string(),
                        second: field.property().to_string(),
                    });
                }
                _ => inequality = Some(field),
            }
        }
        filters.push(PropertyFilter::new(
            field.property(),
            operator.operator(),
            coerce(field, &triple.value)?,
        ));
    }

    let mut orders = Vec::with_capacity(2);
    if let Some(field) = inequality {
        orders.push(SortOrder::ascending(field.property()));
    }
    orders.push(SortOrder::ascending(NAME_PROPERTY));

    Ok(QueryPlan {
        filters,
        orders,
        inequality_property: inequality.map(FilterField::property),
    })
}

/// Compile a filter set.
///
/// # Errors
///
/// - [`FilterError::InvalidToken`] if any triple has an unknown field or operator token,
///   checked across the whole set first
/// - [`FilterError::MultipleInequalityFields`] if inequalities touch two fields
/// - [`FilterError::NonNumericValue`] if a numeric field gets a non-integer operand
pub fn compile(raw: &[FilterTriple]) -> Result<QueryPlan, FilterError> {
    let resolved: Result<Vec<_>, FilterError> = raw
        .iter()
        .map(|triple| {
            FilterField::from_token(&triple.field)
                .zip(FilterOperator::from_token(&triple.operator))
                .ok_or_else(|| FilterError::InvalidToken {
                    field: triple.field.clone(),
                    operator: triple.operator.clone(),
                })
        })
        .collect();

    let result = resolved.and_then(|resolved| compile_resolved(raw, resolved));
    match &result {
        Ok(plan) => {
            FilterMetrics::record_compile("ok");
            tracing::debug!(
                filters = plan.filters.len(),
                inequality = ?plan.inequality_property,
                "Compiled conference filters"
            );
        }
        Err(error) => {
            FilterMetrics::record_compile("invalid");
            tracing::debug!(%error, "Rejected conference filters");
        }
    }
    result
}
