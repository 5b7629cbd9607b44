//! Reads from the backing store into [`AppState`].
//!
//! A failed read is logged and leaves the corresponding field at its previous
//! value; the affected sections simply render empty.

use chrono::{DateTime, NaiveDate, Utc};

use super::ServiceError;
use crate::clock::Clock;
use crate::models::challenges::{ChallengeStatus, DailyChallenge};
use crate::models::students::Student;
use crate::repositories::auth::{is_session_expired, AuthProvider};
use crate::repositories::Repositories;
use crate::state::AppState;

fn logged<T>(what: &str, result: Result<T, anyhow::Error>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Error fetching {}: {}", what, e);
            None
        }
    }
}

fn replace<T>(field: &mut T, fetched: Option<T>) {
    if let Some(value) = fetched {
        *field = value;
    }
}

/// The student row of the signed-in auth user. `Ok(None)` means the row does
/// not exist, a failed read is an error.
pub async fn fetch_user_profile(
    repositories: &Repositories,
    auth: &dyn AuthProvider,
) -> Result<Option<Student>, ServiceError> {
    let session = auth.session().await.ok_or(ServiceError::Unauthenticated)?;

    repositories
        .students
        .get_student_by_auth_id(&session.user.id)
        .await
        .map_err(|e| {
            if is_session_expired(&e) {
                return ServiceError::Unauthenticated;
            }
            log::error!("Error fetching student profile: {}", e);
            ServiceError::Repository("student profile".to_string(), e.to_string())
        })
}

async fn sign_out(auth: &dyn AuthProvider, reason: &str) -> ServiceError {
    log::error!("{} Logging out.", reason);
    if let Err(e) = auth.sign_out().await {
        log::warn!("Sign-out failed: {}", e);
    }
    ServiceError::Unauthenticated
}

pub async fn fetch_history(
    repositories: &Repositories,
    student_id: &str,
) -> Option<Vec<crate::models::points::PointsLedgerEntry>> {
    logged("history", repositories.points.history(student_id).await)
}

pub async fn refresh_history(repositories: &Repositories, state: &mut AppState) {
    let student_id = match state.student_id() {
        Some(id) => id.to_string(),
        None => return,
    };
    replace(
        &mut state.history,
        fetch_history(repositories, &student_id).await,
    );
}

/// Today's challenges with the student's completion status applied.
pub async fn fetch_challenges(
    repositories: &Repositories,
    student_id: &str,
    today: NaiveDate,
) -> Option<Vec<DailyChallenge>> {
    let challenges = logged("challenges", repositories.challenges.challenges().await)?;
    let completed = logged(
        "completions",
        repositories
            .challenges
            .completed_on(student_id, today)
            .await,
    )
    .unwrap_or_default();

    Some(
        challenges
            .into_iter()
            .map(|challenge| {
                let status = if completed.contains(&challenge.id) {
                    ChallengeStatus::Completed
                } else {
                    ChallengeStatus::Active
                };
                DailyChallenge { challenge, status }
            })
            .collect(),
    )
}

pub async fn load_initial_data(
    repositories: &Repositories,
    auth: &dyn AuthProvider,
    clock: &dyn Clock,
    state: &mut AppState,
) -> Result<(), ServiceError> {
    let user = match fetch_user_profile(repositories, auth).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(sign_out(auth, "Could not load user profile.").await),
        Err(ServiceError::Unauthenticated) => {
            return Err(sign_out(auth, "Session is no longer valid.").await)
        }
        // A refresh keeps the profile it already has.
        Err(e) => match state.current_user.clone() {
            Some(user) => {
                log::warn!("Keeping the loaded profile: {}", e);
                user
            }
            None => return Err(sign_out(auth, "Could not load user profile.").await),
        },
    };
    let student_id = user.student_id.clone();
    state.current_user = Some(user);

    let now: DateTime<Utc> = clock.now();
    let (
        leaderboard,
        history,
        challenges,
        events,
        rsvps,
        stores,
        products,
        rewards,
        levels,
    ) = futures_util::join!(
        async { logged("leaderboard", repositories.levels.leaderboard().await) },
        fetch_history(repositories, &student_id),
        fetch_challenges(repositories, &student_id, clock.today()),
        async { logged("events", repositories.events.upcoming(now).await) },
        async { logged("RSVPs", repositories.events.rsvps(&student_id).await) },
        async { logged("stores", repositories.stores.stores().await) },
        async { logged("products", repositories.stores.products().await) },
        async { logged("user rewards", repositories.rewards.user_rewards(&student_id).await) },
        async { logged("levels", repositories.levels.levels().await) },
    );

    replace(&mut state.leaderboard, leaderboard);
    replace(&mut state.history, history);
    replace(&mut state.daily_challenges, challenges);
    replace(&mut state.events, events);
    replace(&mut state.event_rsvps, rsvps);
    replace(&mut state.stores, stores);
    replace(&mut state.products, products);
    replace(&mut state.user_rewards, rewards);
    replace(&mut state.levels, levels);

    log::info!("Loaded portal data for {}.", student_id);
    Ok(())
}
