//! Text rendering of the portal screens.
//!
//! Renderers only read [`AppState`] and derived values; the controller decides
//! which [`View`]s are stale after an action and renders those.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::models::preferences::Theme;
use crate::state::AppState;

mod community;
mod dashboard;
mod points;
mod store;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    Header,
    CheckInCard,
    Dashboard,
    DashboardChallenges,
    Challenges,
    Events,
    Rewards,
    StoreDetail { store_id: String },
    ProductDetail { store_id: String, product_id: String },
    PurchaseModal { store_id: String, product_id: String },
    MyRewards,
    RewardQr { user_reward_id: String },
    History,
    Leaderboard,
    Profile,
    EcoPoints,
    ChangePassword,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Challenges,
    Events,
    Rewards,
    MyRewards,
    History,
    Leaderboard,
    Profile,
    EcoPoints,
    ChangePassword,
}

impl Page {
    pub fn name(self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Challenges => "challenges",
            Page::Events => "events",
            Page::Rewards => "rewards",
            Page::MyRewards => "my-rewards",
            Page::History => "history",
            Page::Leaderboard => "leaderboard",
            Page::Profile => "profile",
            Page::EcoPoints => "ecopoints",
            Page::ChangePassword => "change-password",
        }
    }

    pub fn view(self) -> View {
        match self {
            Page::Dashboard => View::Dashboard,
            Page::Challenges => View::Challenges,
            Page::Events => View::Events,
            Page::Rewards => View::Rewards,
            Page::MyRewards => View::MyRewards,
            Page::History => View::History,
            Page::Leaderboard => View::Leaderboard,
            Page::Profile => View::Profile,
            Page::EcoPoints => View::EcoPoints,
            Page::ChangePassword => View::ChangePassword,
        }
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Page::Dashboard,
            Page::Challenges,
            Page::Events,
            Page::Rewards,
            Page::MyRewards,
            Page::History,
            Page::Leaderboard,
            Page::Profile,
            Page::EcoPoints,
            Page::ChangePassword,
        ]
        .into_iter()
        .find(|page| page.name() == s)
        .ok_or_else(|| format!("Unknown page: {}", s))
    }
}

/// Inline feedback shown next to the views an action re-rendered.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    PurchaseSucceeded,
    PurchaseFailed(String),
    Password { success: bool, message: String },
    UploadFailed(String),
    ThemeChanged(Theme),
}

pub const INSUFFICIENT_POINTS: &str = "You do not have enough points for this reward.";

pub struct ViewContext<'a> {
    pub state: &'a AppState,
    pub now: DateTime<Utc>,
    pub check_in_reward: i64,
    pub qr_url: &'a str,
}

pub fn render(view: &View, ctx: &ViewContext) -> String {
    match view {
        View::Header => dashboard::header(ctx),
        View::CheckInCard => dashboard::check_in_card(ctx),
        View::Dashboard => dashboard::dashboard(ctx),
        View::DashboardChallenges => dashboard::dashboard_challenges(ctx),
        View::Challenges => community::challenges(ctx),
        View::Events => community::events(ctx),
        View::Leaderboard => community::leaderboard(ctx),
        View::Rewards => store::rewards(ctx),
        View::StoreDetail { store_id } => store::store_detail(ctx, store_id),
        View::ProductDetail {
            store_id,
            product_id,
        } => store::product_detail(ctx, store_id, product_id),
        View::PurchaseModal {
            store_id,
            product_id,
        } => store::purchase_modal(ctx, store_id, product_id),
        View::MyRewards => store::my_rewards(ctx),
        View::RewardQr { user_reward_id } => store::reward_qr(ctx, user_reward_id),
        View::History => points::history(ctx),
        View::Profile => points::profile(ctx),
        View::EcoPoints => points::ecopoints(ctx),
        View::ChangePassword => "== Change Password ==\nUse: password <new password>".to_string(),
    }
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::PurchaseSucceeded => {
            "Purchase Successful!\nYou can find your new reward in \"My Rewards\".".to_string()
        }
        Notice::PurchaseFailed(reason) => format!("Purchase Failed\n{}", reason),
        Notice::Password { success, message } => {
            let marker = if *success { "ok" } else { "error" };
            format!("[{}] {}", marker, message)
        }
        Notice::UploadFailed(message) => format!("[error] {}", message),
        Notice::ThemeChanged(theme) => format!("Theme: {}", theme.label()),
    }
}

fn date(value: &DateTime<Utc>) -> String {
    value.format("%d/%m/%Y").to_string()
}

fn signed(points: i64) -> String {
    if points >= 0 {
        format!("+{}", points)
    } else {
        points.to_string()
    }
}

fn price(value: Option<f64>) -> String {
    format!("₹{}", value.unwrap_or(0.0))
}

fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    value.filter(|v| !v.is_empty()).unwrap_or(placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_round_trip_through_names() {
        for name in ["dashboard", "my-rewards", "ecopoints", "change-password"] {
            assert_eq!(name.parse::<Page>().unwrap().name(), name);
        }
        assert!("store".parse::<Page>().is_err());
    }

    #[test]
    fn signed_points_show_plus_for_credits() {
        assert_eq!(signed(10), "+10");
        assert_eq!(signed(0), "+0");
        assert_eq!(signed(-300), "-300");
    }

    #[test]
    fn prices_default_to_zero() {
        assert_eq!(price(None), "₹0");
        assert_eq!(price(Some(149.5)), "₹149.5");
    }
}
