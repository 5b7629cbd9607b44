use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use super::activity::ActivityLogger;
use super::reconcile::{commit, CommitPlan, WriteError, WriteSequence};
use super::{loaders, RequestHandler, Service, ServiceError};
use crate::clock::Clock;
use crate::models::challenges::{ChallengeStatus, NewChallengeCompletion};
use crate::models::events::NewEventRsvp;
use crate::models::points::NewLedgerEntry;
use crate::models::preferences::Theme;
use crate::repositories::auth::{is_session_expired, AuthProvider};
use crate::repositories::backend::Backend;
use crate::repositories::media::ImageHost;
use crate::repositories::preferences::PreferenceStore;
use crate::repositories::Repositories;
use crate::state::AppState;
use crate::views::{self, Notice, Page, View, ViewContext, INSUFFICIENT_POINTS};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const UPLOAD_FAILED: &str = "Upload failed. Please try again.";

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

async fn read_avatar(path: &Path) -> Result<Vec<u8>, ServiceError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ServiceError::Upload(format!("{}: {}", path.display(), e)))
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    ShowPage(Page),
    ShowStore {
        store_id: String,
    },
    ShowProduct {
        store_id: String,
        product_id: String,
    },
    OpenPurchase {
        store_id: String,
        product_id: String,
    },
    ConfirmPurchase {
        store_id: String,
        product_id: String,
    },
    CheckIn,
    CompleteChallenge {
        challenge_id: String,
    },
    Rsvp {
        event_id: String,
    },
    OpenRewardQr {
        user_reward_id: String,
    },
    MarkRewardUsed {
        user_reward_id: String,
    },
    ChangePassword(String),
    UploadAvatar(PathBuf),
    ToggleTheme,
    Refresh,
    Logout,
}

pub struct PortalRequest {
    pub action: Action,
    pub response: oneshot::Sender<Result<Outcome, ServiceError>>,
}

/// What an action changed: the views to re-render, their rendered text and
/// any inline feedback.
#[derive(Debug, Default)]
pub struct Outcome {
    pub views: Vec<View>,
    pub notice: Option<Notice>,
    pub screens: Vec<String>,
    pub signed_out: bool,
}

impl Outcome {
    fn views(views: Vec<View>) -> Self {
        Outcome {
            views,
            ..Default::default()
        }
    }

    fn notice(notice: Notice) -> Self {
        Outcome {
            notice: Some(notice),
            ..Default::default()
        }
    }
}

/// Remote and local services the portal talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub backend: Arc<dyn Backend>,
    pub auth: Arc<dyn AuthProvider>,
    pub images: Arc<dyn ImageHost>,
    pub preferences: Option<PreferenceStore>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone, Debug)]
pub struct PortalOptions {
    pub check_in_reward: i64,
    pub qr_url: String,
}

pub struct PortalRequestHandler {
    repositories: Repositories,
    auth: Arc<dyn AuthProvider>,
    images: Arc<dyn ImageHost>,
    preferences: Option<PreferenceStore>,
    clock: Arc<dyn Clock>,
    activity: ActivityLogger,
    options: PortalOptions,
    state: AppState,
}

impl PortalRequestHandler {
    pub fn new(collaborators: Collaborators, options: PortalOptions) -> Self {
        let repositories = Repositories::new(collaborators.backend);
        let activity = ActivityLogger::new(repositories.activity.clone());

        let theme = collaborators
            .preferences
            .as_ref()
            .and_then(|preferences| preferences.theme())
            .unwrap_or_default();

        PortalRequestHandler {
            repositories,
            auth: collaborators.auth,
            images: collaborators.images,
            preferences: collaborators.preferences,
            clock: collaborators.clock,
            activity,
            options,
            state: AppState {
                theme,
                ..Default::default()
            },
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn load(&mut self) -> Result<(), ServiceError> {
        loaders::load_initial_data(
            &self.repositories,
            self.auth.as_ref(),
            self.clock.as_ref(),
            &mut self.state,
        )
        .await?;

        self.log_activity("app_load_success", json!({}));
        Ok(())
    }

    fn log_activity(&self, activity_type: &str, details: serde_json::Value) {
        self.activity
            .log(self.state.student_id(), activity_type, details);
    }

    fn click(&self, action: &str, mut details: serde_json::Value) {
        if let Some(fields) = details.as_object_mut() {
            fields.insert("action".to_string(), json!(action));
        }
        self.log_activity("button_click", details);
    }

    fn student_id(&self) -> Result<String, ServiceError> {
        self.state
            .student_id()
            .map(str::to_string)
            .ok_or(ServiceError::Unauthenticated)
    }

    /// Dispatches `action` and renders every view it left stale. An action
    /// that finds the session gone signs the user out.
    pub async fn handle(&mut self, action: Action) -> Result<Outcome, ServiceError> {
        let mut outcome = match self.perform(action).await {
            Err(ServiceError::Unauthenticated) => {
                self.end_session().await;
                return Err(ServiceError::Unauthenticated);
            }
            result => result?,
        };

        if !outcome.signed_out {
            let ctx = ViewContext {
                state: &self.state,
                now: self.clock.now(),
                check_in_reward: self.options.check_in_reward,
                qr_url: &self.options.qr_url,
            };
            outcome.screens = outcome
                .views
                .iter()
                .map(|view| views::render(view, &ctx))
                .collect();
        }

        Ok(outcome)
    }

    async fn perform(&mut self, action: Action) -> Result<Outcome, ServiceError> {
        let outcome = match action {
            Action::ShowPage(page) => self.show_page(page),
            Action::ShowStore { store_id } => self.show_store(store_id),
            Action::ShowProduct {
                store_id,
                product_id,
            } => self.show_product(store_id, product_id),
            Action::OpenPurchase {
                store_id,
                product_id,
            } => self.open_purchase(store_id, product_id),
            Action::ConfirmPurchase {
                store_id,
                product_id,
            } => self.confirm_purchase(&store_id, &product_id).await?,
            Action::CheckIn => self.check_in().await?,
            Action::CompleteChallenge { challenge_id } => {
                self.complete_challenge(&challenge_id).await?
            }
            Action::Rsvp { event_id } => self.rsvp(&event_id).await?,
            Action::OpenRewardQr { user_reward_id } => self.open_reward_qr(user_reward_id),
            Action::MarkRewardUsed { user_reward_id } => {
                self.mark_reward_used(&user_reward_id).await?
            }
            Action::ChangePassword(password) => self.change_password(&password).await?,
            Action::UploadAvatar(path) => self.upload_avatar(&path).await?,
            Action::ToggleTheme => self.toggle_theme(),
            Action::Refresh => self.refresh().await?,
            Action::Logout => self.logout().await,
        };
        Ok(outcome)
    }

    fn show_page(&self, page: Page) -> Outcome {
        self.log_activity("page_view", json!({ "page": page.name() }));

        let views = match page {
            Page::Dashboard => vec![
                View::Header,
                View::CheckInCard,
                View::Dashboard,
                View::DashboardChallenges,
            ],
            page => vec![View::Header, page.view()],
        };
        Outcome::views(views)
    }

    fn show_store(&self, store_id: String) -> Outcome {
        self.log_activity(
            "page_view",
            json!({ "page": "store_detail", "storeId": store_id }),
        );

        if self.state.store(&store_id).is_none() {
            return Outcome::default();
        }
        Outcome::views(vec![View::StoreDetail { store_id }])
    }

    fn show_product(&self, store_id: String, product_id: String) -> Outcome {
        self.log_activity(
            "page_view",
            json!({ "page": "product_detail", "productId": product_id }),
        );

        if self.state.product(&store_id, &product_id).is_none() {
            return Outcome::default();
        }
        Outcome::views(vec![View::ProductDetail {
            store_id,
            product_id,
        }])
    }

    fn open_purchase(&self, store_id: String, product_id: String) -> Outcome {
        self.click("open_purchase_modal", json!({ "productId": product_id }));

        if self.state.product(&store_id, &product_id).is_none() {
            return Outcome::default();
        }
        Outcome::views(vec![View::PurchaseModal {
            store_id,
            product_id,
        }])
    }

    pub async fn confirm_purchase(
        &mut self,
        store_id: &str,
        product_id: &str,
    ) -> Result<Outcome, ServiceError> {
        self.click("confirm_purchase_attempt", json!({ "productId": product_id }));

        let (name, cost, product_row_id) = match self.state.product(store_id, product_id) {
            Some((_, product)) => (
                product.name.clone(),
                product.cost_in_points,
                product.id.clone(),
            ),
            None => return Ok(Outcome::default()),
        };
        let student_id = self.student_id()?;

        let affordable = self
            .state
            .current_user
            .as_ref()
            .map(|user| user.can_afford(cost))
            .unwrap_or(false);
        if !affordable {
            self.log_activity(
                "purchase_attempt_failed",
                json!({ "productId": product_id, "reason": "insufficient_points" }),
            );
            return Ok(Outcome::notice(Notice::PurchaseFailed(
                INSUFFICIENT_POINTS.to_string(),
            )));
        }

        let repositories = &self.repositories;
        let entry = NewLedgerEntry::purchase(&student_id, &name, cost);
        let write = async {
            let mut writes = WriteSequence::new();
            let reward = writes
                .step(
                    "user_rewards",
                    repositories.rewards.create(&student_id, &product_row_id),
                )
                .await?;
            writes
                .step("points_history", repositories.points.record(&entry))
                .await?;
            Ok::<_, WriteError>(reward)
        };

        let plan = CommitPlan {
            action: "purchase",
            refresh_ledger: true,
            views: vec![View::Header, View::MyRewards],
        };
        let result = commit(&mut self.state, repositories, plan, write, |state, reward| {
            if let Some(user) = state.current_user.as_mut() {
                user.spend(cost);
            }
            state.user_rewards.insert(0, reward);
        })
        .await;

        match result {
            Ok(views) => {
                self.log_activity(
                    "purchase_attempt_success",
                    json!({ "productId": product_id, "points": -cost }),
                );
                Ok(Outcome {
                    views,
                    notice: Some(Notice::PurchaseSucceeded),
                    ..Default::default()
                })
            }
            Err(e) => {
                self.log_activity(
                    "purchase_attempt_failed",
                    json!({ "productId": product_id, "reason": e.to_string() }),
                );
                Err(e)
            }
        }
    }

    pub async fn check_in(&mut self) -> Result<Outcome, ServiceError> {
        self.click("perform_check_in_attempt", json!({}));

        let today = self.clock.today();
        if !self.state.can_check_in(today) {
            return Ok(Outcome::default());
        }
        let student_id = self.student_id()?;
        let reward = self.options.check_in_reward;

        let repositories = &self.repositories;
        let entry = NewLedgerEntry::check_in(&student_id, reward);
        let write = async {
            let mut writes = WriteSequence::new();
            writes
                .step(
                    "students",
                    repositories.students.set_last_check_in(&student_id, today),
                )
                .await?;
            writes
                .step("points_history", repositories.points.record(&entry))
                .await
        };

        let plan = CommitPlan {
            action: "check-in",
            refresh_ledger: true,
            views: vec![View::CheckInCard, View::Header, View::Dashboard],
        };
        let views = commit(&mut self.state, repositories, plan, write, |state, _| {
            if let Some(user) = state.current_user.as_mut() {
                user.record_check_in(today, reward);
            }
        })
        .await?;

        self.log_activity("check_in_success", json!({ "points": reward }));
        Ok(Outcome::views(views))
    }

    pub async fn complete_challenge(&mut self, challenge_id: &str) -> Result<Outcome, ServiceError> {
        self.click(
            "complete_challenge_attempt",
            json!({ "challengeId": challenge_id }),
        );

        let (title, reward) = match self.state.challenge(challenge_id) {
            Some(daily) if daily.status == ChallengeStatus::Active => (
                daily.challenge.title.clone(),
                daily.challenge.points_reward,
            ),
            _ => return Ok(Outcome::default()),
        };
        let student_id = self.student_id()?;

        let repositories = &self.repositories;
        let completion = NewChallengeCompletion {
            challenge_id: challenge_id.to_string(),
            student_id: student_id.clone(),
            completed_at: self.clock.today(),
        };
        let entry = NewLedgerEntry::challenge(&student_id, &title, reward);
        let write = async {
            let mut writes = WriteSequence::new();
            writes
                .step(
                    "challenge_completions",
                    repositories.challenges.record_completion(&completion),
                )
                .await?;
            writes
                .step("points_history", repositories.points.record(&entry))
                .await
        };

        let plan = CommitPlan {
            action: "challenge completion",
            refresh_ledger: true,
            views: vec![View::Header, View::Challenges, View::DashboardChallenges],
        };
        let views = commit(&mut self.state, repositories, plan, write, |state, _| {
            if let Some(daily) = state
                .daily_challenges
                .iter_mut()
                .find(|daily| daily.challenge.id == challenge_id)
            {
                daily.status = ChallengeStatus::Completed;
            }
            if let Some(user) = state.current_user.as_mut() {
                user.earn(reward);
            }
        })
        .await?;

        self.log_activity(
            "challenge_complete_success",
            json!({ "challengeId": challenge_id, "points": reward }),
        );
        Ok(Outcome::views(views))
    }

    pub async fn rsvp(&mut self, event_id: &str) -> Result<Outcome, ServiceError> {
        self.click("rsvp_event_attempt", json!({ "eventId": event_id }));

        if self.state.has_rsvp(event_id) {
            return Ok(Outcome::default());
        }
        let student_id = self.student_id()?;

        let repositories = &self.repositories;
        let rsvp = NewEventRsvp {
            event_id: event_id.to_string(),
            student_id,
        };
        let write = async {
            WriteSequence::new()
                .step("event_rsvps", repositories.events.rsvp(&rsvp))
                .await
        };

        let plan = CommitPlan {
            action: "RSVP",
            refresh_ledger: false,
            views: vec![View::Events, View::Dashboard],
        };
        let views = commit(&mut self.state, repositories, plan, write, |state, row| {
            state.event_rsvps.push(row);
        })
        .await?;

        self.log_activity("rsvp_event_success", json!({ "eventId": event_id }));
        Ok(Outcome::views(views))
    }

    fn open_reward_qr(&self, user_reward_id: String) -> Outcome {
        self.click("open_qr_modal", json!({ "userRewardId": user_reward_id }));

        if self.state.user_reward(&user_reward_id).is_none() {
            return Outcome::default();
        }
        Outcome::views(vec![View::RewardQr { user_reward_id }])
    }

    pub async fn mark_reward_used(&mut self, user_reward_id: &str) -> Result<Outcome, ServiceError> {
        self.click(
            "mark_reward_used_attempt",
            json!({ "userRewardId": user_reward_id }),
        );

        match self.state.user_reward(user_reward_id) {
            Some(reward) if reward.is_active() => {}
            _ => return Ok(Outcome::default()),
        }

        let used_date = self.clock.now();
        let repositories = &self.repositories;
        let write = async {
            WriteSequence::new()
                .step(
                    "user_rewards",
                    repositories.rewards.mark_used(user_reward_id, used_date),
                )
                .await
        };

        let plan = CommitPlan {
            action: "mark reward used",
            refresh_ledger: false,
            views: vec![View::MyRewards],
        };
        let views = commit(&mut self.state, repositories, plan, write, |state, _| {
            if let Some(reward) = state
                .user_rewards
                .iter_mut()
                .find(|reward| reward.id == user_reward_id)
            {
                reward.mark_used(used_date);
            }
        })
        .await?;

        self.log_activity(
            "mark_reward_used_success",
            json!({ "userRewardId": user_reward_id }),
        );
        Ok(Outcome::views(views))
    }

    pub async fn change_password(&mut self, password: &str) -> Result<Outcome, ServiceError> {
        self.click("change_password_attempt", json!({}));

        match self.update_password(password).await {
            Ok(()) => {
                self.log_activity("change_password_success", json!({}));
                Ok(Outcome::notice(Notice::Password {
                    success: true,
                    message: "Password updated successfully!".to_string(),
                }))
            }
            Err(ServiceError::Validation(message)) => Ok(Outcome::notice(Notice::Password {
                success: false,
                message,
            })),
            Err(ServiceError::Repository(_, message)) => {
                self.log_activity("change_password_failed", json!({ "error": message }));
                Ok(Outcome::notice(Notice::Password {
                    success: false,
                    message: format!("Error: {}", message),
                }))
            }
            Err(e) => Err(e),
        }
    }

    async fn update_password(&self, password: &str) -> Result<(), ServiceError> {
        validate_password(password)?;

        self.auth.update_password(password).await.map_err(|e| {
            if is_session_expired(&e) {
                return ServiceError::Unauthenticated;
            }
            log::error!("Error updating password: {}", e);
            ServiceError::Repository("password update".to_string(), e.to_string())
        })
    }

    pub async fn upload_avatar(&mut self, path: &Path) -> Result<Outcome, ServiceError> {
        self.click("upload_profile_pic_attempt", json!({}));
        let student_id = self.student_id()?;

        match self.store_avatar(&student_id, path).await {
            Ok(views) => {
                self.log_activity("upload_profile_pic_success", json!({}));
                Ok(Outcome::views(views))
            }
            Err(ServiceError::Upload(reason)) => {
                log::error!("Error uploading profile picture: {}", reason);
                self.log_activity("upload_profile_pic_failed", json!({ "error": reason }));
                Ok(Outcome::notice(Notice::UploadFailed(UPLOAD_FAILED.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    /// Uploads the image and points the profile at it. Every failure short of
    /// a lost session is an [`ServiceError::Upload`].
    async fn store_avatar(
        &mut self,
        student_id: &str,
        path: &Path,
    ) -> Result<Vec<View>, ServiceError> {
        let bytes = read_avatar(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());

        let repositories = &self.repositories;
        let images = self.images.clone();
        let write = async {
            let mut writes = WriteSequence::new();
            let url = writes
                .step("image upload", images.upload(&file_name, bytes))
                .await?;
            writes
                .step(
                    "students",
                    repositories.students.set_avatar_url(student_id, &url),
                )
                .await?;
            Ok::<_, WriteError>(url)
        };

        let plan = CommitPlan {
            action: "avatar upload",
            refresh_ledger: false,
            views: vec![View::Profile],
        };
        commit(&mut self.state, repositories, plan, write, |state, url| {
            if let Some(user) = state.current_user.as_mut() {
                user.avatar_url = Some(url);
            }
        })
        .await
        .map_err(|e| match e {
            ServiceError::Repository(_, reason) => ServiceError::Upload(reason),
            other => other,
        })
    }

    pub fn toggle_theme(&mut self) -> Outcome {
        let theme: Theme = self.state.theme.toggled();
        self.state.theme = theme;

        if let Some(preferences) = &self.preferences {
            if let Err(e) = preferences.save_theme(theme) {
                log::warn!("Could not save theme to {:?}: {}", preferences.path(), e);
            }
        }

        self.click("toggle_theme", json!({ "theme": theme }));
        Outcome {
            views: vec![View::Header],
            notice: Some(Notice::ThemeChanged(theme)),
            ..Default::default()
        }
    }

    async fn refresh(&mut self) -> Result<Outcome, ServiceError> {
        self.load().await?;
        Ok(self.show_page(Page::Dashboard))
    }

    async fn end_session(&mut self) {
        log::warn!("Session is no longer valid. Signing out.");
        if let Err(e) = self.auth.sign_out().await {
            log::warn!("Error signing out: {}", e);
        }
        self.state.current_user = None;
    }

    async fn logout(&mut self) -> Outcome {
        self.log_activity("logout", json!({}));

        if let Err(e) = self.auth.sign_out().await {
            log::warn!("Error signing out: {}", e);
        }
        self.state.current_user = None;

        Outcome {
            signed_out: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl RequestHandler<PortalRequest> for PortalRequestHandler {
    async fn handle_request(&mut self, request: PortalRequest) {
        let outcome = self.handle(request.action).await;
        let _ = request.response.send(outcome);
    }
}

pub struct PortalService;

impl PortalService {
    pub fn new() -> Self {
        PortalService {}
    }
}

impl Default for PortalService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service<PortalRequest, PortalRequestHandler> for PortalService {}

/// Loads the signed-in student's data and spawns the controller task.
pub async fn start_portal(
    collaborators: Collaborators,
    options: PortalOptions,
) -> Result<mpsc::Sender<PortalRequest>, ServiceError> {
    let mut handler = PortalRequestHandler::new(collaborators, options);
    handler.load().await?;

    let (sender, mut receiver) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut service = PortalService::new();
        service.run(handler, &mut receiver).await;
        log::info!("Portal controller stopped.");
    });

    Ok(sender)
}

/// Sends `action` to the controller and waits for its outcome.
pub async fn dispatch(
    sender: &mpsc::Sender<PortalRequest>,
    action: Action,
) -> Result<Outcome, ServiceError> {
    let (response, receiver) = oneshot::channel();
    sender
        .send(PortalRequest { action, response })
        .await
        .map_err(|e| ServiceError::Communication("portal".to_string(), e.to_string()))?;

    receiver
        .await
        .map_err(|e| ServiceError::Communication("portal".to_string(), e.to_string()))?
}
