use anyhow::bail;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use super::{error_message, SupabaseClient};
use crate::repositories::auth::{AuthProvider, Session, SessionExpired};

impl SupabaseClient {
    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    /// Trades the refresh token of `stale` for a new session. Any failure
    /// leaves the user signed out.
    pub(super) async fn refresh_session(&self, stale: &Session) -> Result<Session, anyhow::Error> {
        let refresh_token = match stale.refresh_token.as_deref() {
            Some(token) => token,
            None => {
                self.session.write().await.take();
                return Err(SessionExpired.into());
            }
        };

        let response = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Session refresh failed: {}", error_message(&body));
            self.session.write().await.take();
            return Err(SessionExpired.into());
        }

        let session: Session = response.json().await?;
        *self.session.write().await = Some(session.clone());
        log::info!("Refreshed session for auth user {}.", session.user.id);

        Ok(session)
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, anyhow::Error> {
        let response = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{}", error_message(&body));
        }

        let session: Session = response.json().await?;
        *self.session.write().await = Some(session.clone());
        log::info!("Signed in as auth user {}.", session.user.id);

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), anyhow::Error> {
        let session = self.session.write().await.take();

        if let Some(session) = session {
            let response = self
                .client
                .post(self.auth_url("logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await?;

            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                bail!("{}", error_message(&body));
            }
        }

        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<(), anyhow::Error> {
        if self.session.read().await.is_none() {
            bail!("Auth session missing!");
        }
        let token = self.access_token().await?;

        let response = self
            .client
            .put(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .json(&json!({ "password": password }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(SessionExpired.into());
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{}", error_message(&body));
        }

        Ok(())
    }
}
