//! Rendering of [`Query`] values as SQL over the `records` table.
//!
//! Filters compare `jsonb` values directly, so cross-type ordering follows `PostgreSQL`'s
//! `jsonb` rules (`null < string < number < boolean < array < object`). A list-valued
//! property is unnested with `jsonb_array_elements` and matches when any element does.

use conference_central_core::query::{Direction, Operator, Query};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

const fn operator_sql(operator: Operator) -> &'static str {
    match operator {
        Operator::Equal => "=",
        Operator::NotEqual => "<>",
        Operator::LessThan => "<",
        Operator::LessThanOrEqual => "<=",
        Operator::GreaterThan => ">",
        Operator::GreaterThanOrEqual => ">=",
    }
}

// Scalars are wrapped in a one-element array so both shapes unnest the same way.
fn push_elements(builder: &mut QueryBuilder<'_, Postgres>, property: &str) {
    builder.push("jsonb_array_elements(CASE jsonb_typeof(data -> ");
    builder.push_bind(property.to_string());
    builder.push(") WHEN 'array' THEN data -> ");
    builder.push_bind(property.to_string());
    builder.push(" ELSE jsonb_build_array(data -> ");
    builder.push_bind(property.to_string());
    builder.push(") END)");
}

/// Build `SELECT key, data FROM records ...` for a validated query.
#[must_use]
pub fn select_records(query: &Query) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT key, data FROM records WHERE kind = ");
    builder.push_bind(query.kind.clone());

    if let Some(ancestor) = &query.ancestor {
        builder.push(" AND ");
        builder.push_bind(ancestor.to_urlsafe());
        builder.push(" = ANY(lineage)");
    }

    for filter in &query.filters {
        builder.push(" AND data ? ");
        builder.push_bind(filter.property.clone());
        builder.push(" AND EXISTS (SELECT 1 FROM ");
        push_elements(&mut builder, &filter.property);
        builder.push(" AS e(v) WHERE e.v ");
        builder.push(operator_sql(filter.operator));
        builder.push(" ");
        builder.push_bind(Json(filter.value.clone()));
        builder.push(")");
    }

    builder.push(" ORDER BY ");
    for order in &query.orders {
        let (direction, pick) = match order.direction {
            Direction::Ascending => ("ASC NULLS FIRST", "ASC"),
            Direction::Descending => ("DESC NULLS LAST", "DESC"),
        };
        builder.push("(SELECT s.v FROM ");
        push_elements(&mut builder, &order.property);
        builder.push(" AS s(v) ORDER BY s.v ");
        builder.push(pick);
        builder.push(" LIMIT 1) ");
        builder.push(direction);
        builder.push(", ");
    }
    builder.push("key ASC");

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    builder
}
