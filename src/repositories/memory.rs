//! In-process stand-ins for the hosted collaborators.
//!
//! [`MemoryBackend`] keeps each table as a list of JSON rows and answers the
//! same [`Query`] vocabulary the hosted service does. It also plays the auth
//! service and counts every write attempt per table, and individual tables can
//! be told to fail their next write or every read.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dashmap::{DashMap, DashSet};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::auth::{AuthProvider, AuthUser, Session, SessionExpired, INVALID_CREDENTIALS};
use super::backend::{compare_values, Backend, Query};
use super::media::ImageHost;

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct Inner {
    tables: DashMap<String, Vec<Value>>,
    rpc_results: DashMap<String, Value>,
    writes: DashMap<String, usize>,
    returned_rows: DashMap<String, usize>,
    failing_writes: DashSet<String>,
    failing_reads: DashSet<String>,
    accounts: DashMap<String, Account>,
    password_update_error: Mutex<Option<String>>,
    session: RwLock<Option<Session>>,
    session_expired: AtomicBool,
    sequence: AtomicU64,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.inner
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.inner
            .tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Fixes the result of a remote procedure instead of deriving it.
    pub fn set_rpc_result(&self, function: &str, result: Value) {
        self.inner.rpc_results.insert(function.to_string(), result);
    }

    /// Number of insert/update attempts against `table`, failed ones included.
    pub fn write_count(&self, table: &str) -> usize {
        self.inner.writes.get(table).map(|count| *count).unwrap_or(0)
    }

    /// Number of inserts into `table` that asked for the stored row back.
    pub fn returned_row_count(&self, table: &str) -> usize {
        self.inner
            .returned_rows
            .get(table)
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn fail_next_write(&self, table: &str) {
        self.inner.failing_writes.insert(table.to_string());
    }

    pub fn fail_reads(&self, table: &str) {
        self.inner.failing_reads.insert(table.to_string());
    }

    pub fn add_account(&self, email: &str, password: &str, auth_id: &str) {
        self.inner.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: AuthUser {
                    id: auth_id.to_string(),
                    email: Some(email.to_string()),
                },
            },
        );
    }

    /// Rejects every call made with the current session until the next sign-in.
    pub fn expire_session(&self) {
        self.inner.session_expired.store(true, AtomicOrdering::SeqCst);
    }

    fn check_session(&self) -> Result<(), anyhow::Error> {
        if self.inner.session_expired.load(AtomicOrdering::SeqCst) {
            return Err(SessionExpired.into());
        }
        Ok(())
    }

    pub fn reject_password_updates(&self, message: &str) {
        if let Ok(mut error) = self.inner.password_update_error.lock() {
            *error = Some(message.to_string());
        }
    }

    pub fn password_of(&self, email: &str) -> Option<String> {
        self.inner
            .accounts
            .get(email)
            .map(|account| account.password.clone())
    }

    fn record_write(&self, table: &str) -> Result<(), anyhow::Error> {
        *self.inner.writes.entry(table.to_string()).or_insert(0) += 1;

        if self.inner.failing_writes.remove(table).is_some() {
            bail!("{}: write rejected", table);
        }
        Ok(())
    }

    fn store(&self, table: &str, mut row: Value) -> Result<Value, anyhow::Error> {
        self.check_session()?;
        self.record_write(table)?;

        let fields = row
            .as_object_mut()
            .ok_or_else(|| anyhow!("{}: row must be a JSON object", table))?;
        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().hyphenated().to_string()));
        let sequence = self.inner.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        let created_at = Utc::now() + chrono::Duration::microseconds(sequence as i64);
        fields.entry("created_at").or_insert_with(|| {
            Value::String(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        });

        self.inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    fn derived_rpc(&self, function: &str, args: &Value) -> Result<Value, anyhow::Error> {
        match function {
            "get_email_for_student_id" => {
                let student_id = args.get("p_student_id").cloned().unwrap_or(Value::Null);
                let email = self
                    .rows("students")
                    .into_iter()
                    .find(|row| row.get("student_id") == Some(&student_id))
                    .and_then(|row| row.get("email").cloned())
                    .unwrap_or(Value::Null);
                Ok(email)
            }
            "get_leaderboard" => {
                let mut students = self.rows("students");
                students.sort_by(|a, b| {
                    compare_values(&b["lifetime_points"], &a["lifetime_points"])
                        .unwrap_or(Ordering::Equal)
                });
                let ranked = students
                    .into_iter()
                    .map(|row| {
                        json!({
                            "student_id": row["student_id"],
                            "name": row["name"],
                            "avatar_url": row.get("avatar_url").cloned().unwrap_or(Value::Null),
                            "lifetime_points": row["lifetime_points"],
                        })
                    })
                    .collect();
                Ok(Value::Array(ranked))
            }
            other => Err(anyhow!("Could not find the function {}", other)),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, anyhow::Error> {
        self.check_session()?;
        if self.inner.failing_reads.contains(table) {
            bail!("{}: read rejected", table);
        }

        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| query.matches(row))
            .collect();

        if let Some(order) = &query.order {
            // Newest rows first among equal keys when sorting descending.
            if !order.ascending {
                rows.reverse();
            }
            rows.sort_by(|a, b| {
                let ordering = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), anyhow::Error> {
        self.store(table, row)?;
        Ok(())
    }

    async fn insert_returning(&self, table: &str, row: Value) -> Result<Value, anyhow::Error> {
        let stored = self.store(table, row)?;
        *self
            .inner
            .returned_rows
            .entry(table.to_string())
            .or_insert(0) += 1;
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        changes: Value,
    ) -> Result<(), anyhow::Error> {
        self.check_session()?;
        self.record_write(table)?;

        let changes = changes
            .as_object()
            .ok_or_else(|| anyhow!("{}: changes must be a JSON object", table))?;

        if let Some(mut rows) = self.inner.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| query.matches(row)) {
                if let Some(fields) = row.as_object_mut() {
                    for (column, value) in changes {
                        fields.insert(column.clone(), value.clone());
                    }
                }
            }
        }

        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, anyhow::Error> {
        self.check_session()?;
        if self.inner.failing_reads.contains(function) {
            bail!("{}: call rejected", function);
        }

        match self.inner.rpc_results.get(function) {
            Some(result) => Ok(result.clone()),
            None => self.derived_rpc(function, &args),
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, anyhow::Error> {
        let user = match self.inner.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => bail!(INVALID_CREDENTIALS),
        };

        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_at: Some(Utc::now().timestamp() + 3_600),
            user,
        };
        *self.inner.session.write().await = Some(session.clone());
        self.inner.session_expired.store(false, AtomicOrdering::SeqCst);

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), anyhow::Error> {
        self.inner.session.write().await.take();
        self.inner.session_expired.store(false, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<(), anyhow::Error> {
        let rejection = self
            .inner
            .password_update_error
            .lock()
            .ok()
            .and_then(|error| error.clone());
        if let Some(message) = rejection {
            bail!("{}", message);
        }
        self.check_session()?;

        let email = match self.inner.session.read().await.as_ref() {
            Some(session) => session.user.email.clone(),
            None => bail!("Auth session missing!"),
        };

        let email = email.ok_or_else(|| anyhow!("Auth user has no email"))?;
        match self.inner.accounts.get_mut(&email) {
            Some(mut account) => {
                account.password = password.to_string();
                Ok(())
            }
            None => Err(anyhow!("User not found")),
        }
    }
}

/// Image host that hands back a fixed URL, or fails when none is set.
#[derive(Clone, Default)]
pub struct MemoryImageHost {
    url: Option<String>,
    uploads: Arc<DashMap<String, usize>>,
}

impl MemoryImageHost {
    pub fn returning(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            uploads: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn uploaded_bytes(&self, file_name: &str) -> Option<usize> {
        self.uploads.get(file_name).map(|size| *size)
    }
}

#[async_trait]
impl ImageHost for MemoryImageHost {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, anyhow::Error> {
        self.uploads.insert(file_name.to_string(), bytes.len());
        self.url.clone().ok_or_else(|| anyhow!("Upload failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn descending_order_lists_newest_insert_first() {
        let backend = MemoryBackend::new();
        for points in [10, 20, 30] {
            backend
                .insert("points_history", json!({"student_id": "s1", "points_change": points}))
                .await
                .unwrap();
        }

        let rows = backend
            .select(
                "points_history",
                &Query::new().eq("student_id", "s1").order("created_at", false),
            )
            .await
            .unwrap();

        let changes: Vec<i64> = rows.iter().map(|r| r["points_change"].as_i64().unwrap()).collect();
        assert_eq!(changes, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn failing_write_is_counted_and_only_fails_once() {
        let backend = MemoryBackend::new();
        backend.fail_next_write("user_rewards");

        assert!(backend.insert("user_rewards", json!({})).await.is_err());
        assert!(backend.insert("user_rewards", json!({})).await.is_ok());
        assert_eq!(backend.write_count("user_rewards"), 2);
        assert_eq!(backend.rows("user_rewards").len(), 1);
    }

    #[tokio::test]
    async fn update_touches_only_matching_rows() {
        let backend = MemoryBackend::new();
        backend.seed(
            "user_rewards",
            vec![json!({"id": 1, "status": "active"}), json!({"id": 2, "status": "active"})],
        );

        backend
            .update("user_rewards", &Query::new().eq("id", "2"), json!({"status": "used"}))
            .await
            .unwrap();

        let rows = backend.rows("user_rewards");
        assert_eq!(rows[0]["status"], "active");
        assert_eq!(rows[1]["status"], "used");
    }

    #[tokio::test]
    async fn sign_in_rejects_wrong_password() {
        let backend = MemoryBackend::new();
        backend.add_account("asha@college.edu", "secret1", "auth-1");

        let err = backend
            .sign_in_with_password("asha@college.edu", "nope")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);
        assert!(backend.session().await.is_none());

        let session = backend
            .sign_in_with_password("asha@college.edu", "secret1")
            .await
            .unwrap();
        assert_eq!(session.user.id, "auth-1");
    }

    #[tokio::test]
    async fn leaderboard_is_derived_from_students_when_unset() {
        let backend = MemoryBackend::new();
        backend.seed(
            "students",
            vec![
                json!({"student_id": "a", "name": "A", "lifetime_points": 10}),
                json!({"student_id": "b", "name": "B", "lifetime_points": 30}),
            ],
        );

        let board = backend.rpc("get_leaderboard", json!({})).await.unwrap();
        assert_eq!(board[0]["student_id"], "b");
        assert_eq!(board[1]["student_id"], "a");
    }
}
