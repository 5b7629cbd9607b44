//! Two-phase commit of user actions: remote writes first, local state only
//! after every write succeeded.
//!
//! A multi-write action that fails halfway leaves the remote side partially
//! written. That is logged and reported, nothing is rolled back, and local
//! state is not touched.

use std::future::Future;

use super::{loaders, ServiceError};
use crate::repositories::auth::is_session_expired;
use crate::repositories::Repositories;
use crate::state::AppState;
use crate::views::View;

#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {cause}")]
pub struct WriteError {
    pub step: &'static str,
    /// Steps of the same action that had already been written.
    pub committed: Vec<&'static str>,
    pub cause: anyhow::Error,
}

/// Ordered remote writes of one action.
pub struct WriteSequence {
    committed: Vec<&'static str>,
}

impl WriteSequence {
    pub fn new() -> Self {
        Self {
            committed: Vec::new(),
        }
    }

    pub async fn step<T, F>(&mut self, step: &'static str, write: F) -> Result<T, WriteError>
    where
        F: Future<Output = Result<T, anyhow::Error>>,
    {
        match write.await {
            Ok(written) => {
                self.committed.push(step);
                Ok(written)
            }
            Err(cause) => Err(WriteError {
                step,
                committed: self.committed.clone(),
                cause,
            }),
        }
    }
}

impl Default for WriteSequence {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CommitPlan {
    pub action: &'static str,
    /// Re-read the points ledger once the local mutation is applied.
    pub refresh_ledger: bool,
    /// Views depending on the mutated fields.
    pub views: Vec<View>,
}

pub async fn commit<T, W, A>(
    state: &mut AppState,
    repositories: &Repositories,
    plan: CommitPlan,
    write: W,
    apply: A,
) -> Result<Vec<View>, ServiceError>
where
    W: Future<Output = Result<T, WriteError>>,
    A: FnOnce(&mut AppState, T),
{
    let written = match write.await {
        Ok(written) => written,
        Err(e) if is_session_expired(&e.cause) => {
            log::warn!("{}: {}", plan.action, e);
            return Err(ServiceError::Unauthenticated);
        }
        Err(e) => {
            if e.committed.is_empty() {
                log::error!("{}: {}", plan.action, e);
            } else {
                log::error!(
                    "{}: {} after {:?} were written, remote state is inconsistent",
                    plan.action,
                    e,
                    e.committed
                );
            }
            return Err(ServiceError::Repository(
                plan.action.to_string(),
                e.to_string(),
            ));
        }
    };

    apply(state, written);

    if plan.refresh_ledger {
        loaders::refresh_history(repositories, state).await;
    }

    Ok(plan.views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::preferences::Theme;
    use crate::repositories::auth::SessionExpired;
    use crate::repositories::memory::MemoryBackend;
    use anyhow::anyhow;
    use std::sync::Arc;

    fn plan(refresh_ledger: bool) -> CommitPlan {
        CommitPlan {
            action: "test",
            refresh_ledger,
            views: vec![View::Header],
        }
    }

    #[tokio::test]
    async fn failed_second_step_reports_what_was_committed() {
        let mut writes = WriteSequence::new();
        writes
            .step("first", async { Ok::<_, anyhow::Error>(()) })
            .await
            .unwrap();
        let err = writes
            .step("second", async { Err::<(), _>(anyhow!("boom")) })
            .await
            .unwrap_err();

        assert_eq!(err.step, "second");
        assert_eq!(err.committed, vec!["first"]);
        assert_eq!(err.to_string(), "second failed: boom");
    }

    #[tokio::test]
    async fn local_state_untouched_when_write_fails() {
        let repositories = Repositories::new(Arc::new(MemoryBackend::new()));
        let mut state = AppState::default();

        let result = commit(
            &mut state,
            &repositories,
            plan(false),
            async {
                WriteSequence::new()
                    .step("only", async { Err::<(), _>(anyhow!("offline")) })
                    .await
            },
            |state: &mut AppState, _| state.theme = Theme::Dark,
        )
        .await;

        assert!(matches!(result, Err(ServiceError::Repository(action, _)) if action == "test"));
        assert_eq!(state.theme, Theme::Light);
    }

    #[tokio::test]
    async fn expired_session_is_unauthenticated() {
        let repositories = Repositories::new(Arc::new(MemoryBackend::new()));
        let mut state = AppState::default();

        let result = commit(
            &mut state,
            &repositories,
            plan(false),
            async {
                WriteSequence::new()
                    .step("only", async {
                        Err::<(), _>(anyhow::Error::new(SessionExpired))
                    })
                    .await
            },
            |state: &mut AppState, _| state.theme = Theme::Dark,
        )
        .await;

        assert!(matches!(result, Err(ServiceError::Unauthenticated)));
        assert_eq!(state.theme, Theme::Light);
    }

    #[tokio::test]
    async fn applies_mutation_and_returns_views_on_success() {
        let repositories = Repositories::new(Arc::new(MemoryBackend::new()));
        let mut state = AppState::default();

        let views = commit(
            &mut state,
            &repositories,
            plan(false),
            async { Ok::<_, WriteError>(Theme::Dark) },
            |state: &mut AppState, theme| state.theme = theme,
        )
        .await
        .unwrap();

        assert_eq!(views, vec![View::Header]);
        assert_eq!(state.theme, Theme::Dark);
    }
}
