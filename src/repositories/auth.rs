use async_trait::async_trait;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds at which `access_token` stops being accepted.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// True once the access token is within `margin` seconds of expiring.
    /// Sessions without an expiry never go stale.
    pub fn expires_within(&self, now: i64, margin: i64) -> bool {
        self.expires_at
            .map(|expires_at| expires_at - now <= margin)
            .unwrap_or(false)
    }
}

/// The access token was rejected and could not be refreshed. The user has to
/// sign in again.
#[derive(Debug, thiserror::Error)]
#[error("Session expired. Please sign in again.")]
pub struct SessionExpired;

pub fn is_session_expired(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| cause.is::<SessionExpired>())
}

/// Message the auth service returns for a wrong email/password pair.
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in session, if any.
    async fn session(&self) -> Option<Session>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, anyhow::Error>;

    async fn sign_out(&self) -> Result<(), anyhow::Error>;

    async fn update_password(&self, password: &str) -> Result<(), anyhow::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn session(expires_at: Option<i64>) -> Session {
        Session {
            access_token: "token".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at,
            user: AuthUser {
                id: "auth-1".to_string(),
                email: None,
            },
        }
    }

    #[test]
    fn expiry_margin() {
        assert!(!session(Some(1_000)).expires_within(900, 60));
        assert!(session(Some(1_000)).expires_within(940, 60));
        assert!(session(Some(1_000)).expires_within(2_000, 60));
        assert!(!session(None).expires_within(2_000, 60));
    }

    #[test]
    fn expiry_is_found_behind_context() {
        let wrapped = Err::<(), _>(anyhow::Error::new(SessionExpired))
            .context("points_history")
            .unwrap_err();

        assert!(is_session_expired(&wrapped));
        assert!(!is_session_expired(&anyhow::anyhow!("401 Unauthorized")));
    }

    #[test]
    fn token_response_fields() {
        let session: Session = serde_json::from_str(
            r#"{"access_token":"a","token_type":"bearer","expires_in":3600,
                "expires_at":1700003600,"refresh_token":"r","user":{"id":"u1","email":"x@y.z"}}"#,
        )
        .unwrap();

        assert_eq!(session.refresh_token.as_deref(), Some("r"));
        assert_eq!(session.expires_at, Some(1_700_003_600));
    }
}
