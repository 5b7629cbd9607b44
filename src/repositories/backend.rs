//! Table primitives of the hosted data service.
//!
//! The service is treated as an opaque store of JSON rows addressed by table
//! name, plus named remote procedures. [`Query`] carries the small filter
//! vocabulary the portal needs (`eq`, `gte`, one ordering column).

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(column, expected) => row
                .get(column)
                .map(|actual| loosely_equal(actual, expected))
                .unwrap_or(false),
            Filter::Gte(column, bound) => row
                .get(column)
                .and_then(|actual| compare_values(actual, bound))
                .map(|ordering| ordering != Ordering::Less)
                .unwrap_or(false),
        })
    }
}

/// Renders a filter value the way it appears in a URL or a text column.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    a == b || (!a.is_null() && !b.is_null() && value_text(a) == value_text(b))
}

/// Orders numbers numerically, RFC 3339 timestamps chronologically and
/// everything else by text.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::<FixedOffset>::parse_from_rfc3339(x),
                DateTime::<FixedOffset>::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (x, y) => Some(value_text(x).cmp(&value_text(y))),
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, anyhow::Error>;

    /// Inserts one row without reading it back.
    async fn insert(&self, table: &str, row: Value) -> Result<(), anyhow::Error>;

    /// Inserts one row and returns the stored representation, with the
    /// generated id and timestamps filled in.
    async fn insert_returning(&self, table: &str, row: Value) -> Result<Value, anyhow::Error>;

    async fn update(&self, table: &str, query: &Query, changes: Value)
        -> Result<(), anyhow::Error>;

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, anyhow::Error>;
}

pub async fn select_as<T: DeserializeOwned>(
    backend: &dyn Backend,
    table: &str,
    query: &Query,
) -> Result<Vec<T>, anyhow::Error> {
    backend
        .select(table, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(anyhow::Error::from))
        .collect()
}

pub async fn insert_as<T: DeserializeOwned, R: Serialize>(
    backend: &dyn Backend,
    table: &str,
    row: &R,
) -> Result<T, anyhow::Error> {
    let stored = backend
        .insert_returning(table, serde_json::to_value(row)?)
        .await?;
    Ok(serde_json::from_value(stored)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eq_matches_across_number_and_text_ids() {
        let query = Query::new().eq("event_id", "12");
        assert!(query.matches(&json!({"event_id": 12})));
        assert!(!query.matches(&json!({"event_id": 13})));
        assert!(!query.matches(&json!({"other": 12})));
    }

    #[test]
    fn gte_compares_timestamps_chronologically() {
        let query = Query::new().gte("event_date", "2026-10-16T12:00:00Z");
        assert!(query.matches(&json!({"event_date": "2026-10-16T13:00:00+00:00"})));
        assert!(query.matches(&json!({"event_date": "2026-10-16T12:00:00+00:00"})));
        assert!(!query.matches(&json!({"event_date": "2026-10-16T17:00:00+09:00"})));
    }

    #[test]
    fn null_never_satisfies_a_filter() {
        let query = Query::new().gte("points", 0);
        assert!(!query.matches(&json!({"points": null})));
        assert!(!Query::new().eq("avatar_url", "x").matches(&json!({"avatar_url": null})));
    }
}
