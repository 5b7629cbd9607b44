use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::auth::{Session, SessionExpired};
use super::backend::{value_text, Backend, Filter, Query};

mod auth;

const PREFER: &str = "Prefer";
/// Writes whose response body nobody reads.
const RETURN_MINIMAL: &str = "return=minimal";
const RETURN_REPRESENTATION: &str = "return=representation";
/// Access tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

/// PostgREST + GoTrue client for the hosted backend.
///
/// Table calls are authorized with the signed-in user's access token when one
/// exists, otherwise with the anonymous key. A token about to expire is traded
/// for a fresh one first.
#[derive(Clone)]
pub struct SupabaseClient {
    url: String,
    anon_key: String,
    client: reqwest::Client,
    session: Arc<RwLock<Option<Session>>>,
    refreshing: Arc<Mutex<()>>,
}

impl SupabaseClient {
    pub fn new(url: String, anon_key: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            client: reqwest::Client::new(),
            session: Arc::new(RwLock::new(None)),
            refreshing: Arc::new(Mutex::new(())),
        }
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.url, path)
    }

    /// The bearer token for the next call, refreshing the session if needed.
    async fn access_token(&self) -> Result<String, anyhow::Error> {
        let fresh = |session: &Session| {
            !session.expires_within(Utc::now().timestamp(), REFRESH_MARGIN_SECS)
        };

        match self.session.read().await.as_ref() {
            None => return Ok(self.anon_key.clone()),
            Some(session) if fresh(session) => return Ok(session.access_token.clone()),
            Some(_) => {}
        }

        let _refreshing = self.refreshing.lock().await;
        // Another call may have refreshed while this one waited.
        let stale = match self.session.read().await.clone() {
            None => return Err(SessionExpired.into()),
            Some(session) if fresh(&session) => return Ok(session.access_token),
            Some(session) => session,
        };
        Ok(self.refresh_session(&stale).await?.access_token)
    }

    async fn headers(&self) -> Result<HeaderMap, anyhow::Error> {
        let token = self.access_token().await?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        Ok(headers)
    }

    async fn insert_request(
        &self,
        table: &str,
        row: &Value,
        prefer: &str,
    ) -> Result<reqwest::Request, anyhow::Error> {
        Ok(self
            .client
            .post(self.rest_url(table))
            .headers(self.headers().await?)
            .header(PREFER, prefer)
            .json(row)
            .build()?)
    }
}

/// Translates a [`Query`] into PostgREST query-string parameters.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for filter in &query.filters {
        match filter {
            Filter::Eq(column, value) => {
                params.push((column.clone(), format!("eq.{}", value_text(value))))
            }
            Filter::Gte(column, value) => {
                params.push((column.clone(), format!("gte.{}", value_text(value))))
            }
        }
    }

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    params
}

/// Turns a non-2xx response into an error carrying the service's message. A
/// rejected token becomes [`SessionExpired`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, anyhow::Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        log::warn!("Request rejected: {}", error_message(&body));
        return Err(SessionExpired.into());
    }
    bail!("{}: {}", status, error_message(&body))
}

pub(crate) fn error_message(body: &str) -> String {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return body.to_string(),
    };

    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, anyhow::Error> {
        let response = self
            .client
            .get(self.rest_url(table))
            .headers(self.headers().await?)
            .query(&query_params(query))
            .send()
            .await?;

        let rows: Vec<Value> = check(response).await?.json().await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), anyhow::Error> {
        let request = self.insert_request(table, &row, RETURN_MINIMAL).await?;
        check(self.client.execute(request).await?).await?;
        Ok(())
    }

    async fn insert_returning(&self, table: &str, row: Value) -> Result<Value, anyhow::Error> {
        let request = self
            .insert_request(table, &row, RETURN_REPRESENTATION)
            .await?;

        let mut rows: Vec<Value> = check(self.client.execute(request).await?)
            .await?
            .json()
            .await?;
        if rows.is_empty() {
            return Err(anyhow!("{}: insert returned no row", table));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        changes: Value,
    ) -> Result<(), anyhow::Error> {
        let params: Vec<(String, String)> = query_params(query)
            .into_iter()
            .filter(|(key, _)| key != "select" && key != "order")
            .collect();

        let response = self
            .client
            .patch(self.rest_url(table))
            .headers(self.headers().await?)
            .header(PREFER, RETURN_MINIMAL)
            .query(&params)
            .json(&changes)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, anyhow::Error> {
        let response = self
            .client
            .post(self.rest_url(&format!("rpc/{}", function)))
            .headers(self.headers().await?)
            .json(&args)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_follow_postgrest_syntax() {
        let query = Query::new()
            .eq("student_id", "21BCS001")
            .gte("event_date", "2026-10-16T00:00:00+00:00")
            .order("created_at", false);

        assert_eq!(
            query_params(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("student_id".to_string(), "eq.21BCS001".to_string()),
                (
                    "event_date".to_string(),
                    "gte.2026-10-16T00:00:00+00:00".to_string()
                ),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn numeric_filters_render_without_quotes() {
        let params = query_params(&Query::new().eq("id", 42));
        assert_eq!(params[1], ("id".to_string(), "eq.42".to_string()));
    }

    #[test]
    fn error_message_prefers_service_text() {
        assert_eq!(
            error_message(r#"{"code":400,"msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[tokio::test]
    async fn plain_inserts_do_not_ask_for_the_row_back() {
        let client = SupabaseClient::new("https://demo.supabase.co".to_string(), "key".to_string());
        let row = serde_json::json!({ "student_id": "S100" });

        let plain = client
            .insert_request("points_history", &row, RETURN_MINIMAL)
            .await
            .unwrap();
        let returning = client
            .insert_request("user_rewards", &row, RETURN_REPRESENTATION)
            .await
            .unwrap();

        assert_eq!(plain.headers()[PREFER], "return=minimal");
        assert_eq!(returning.headers()[PREFER], "return=representation");
        assert_eq!(
            plain.url().as_str(),
            "https://demo.supabase.co/rest/v1/points_history"
        );
    }

    fn session(expires_at: i64, refresh_token: Option<&str>) -> Session {
        Session {
            access_token: "current".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: Some(expires_at),
            user: crate::repositories::auth::AuthUser {
                id: "auth-1".to_string(),
                email: None,
            },
        }
    }

    #[tokio::test]
    async fn fresh_token_is_used_as_is() {
        let client = SupabaseClient::new("https://demo.supabase.co".to_string(), "key".to_string());
        assert_eq!(client.access_token().await.unwrap(), "key");

        let later = Utc::now().timestamp() + 3_600;
        *client.session.write().await = Some(session(later, Some("refresh")));
        assert_eq!(client.access_token().await.unwrap(), "current");
    }

    #[tokio::test]
    async fn stale_token_without_refresh_token_signs_out() {
        let client = SupabaseClient::new("https://demo.supabase.co".to_string(), "key".to_string());
        let earlier = Utc::now().timestamp() - 10;
        *client.session.write().await = Some(session(earlier, None));

        let err = client.access_token().await.unwrap_err();

        assert!(crate::repositories::auth::is_session_expired(&err));
        assert!(client.session.read().await.is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = SupabaseClient::new("https://demo.supabase.co/".to_string(), "key".to_string());
        assert_eq!(client.rest_url("levels"), "https://demo.supabase.co/rest/v1/levels");
    }
}
