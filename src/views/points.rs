use std::fmt::Write;

use super::{date, or_placeholder, signed, ViewContext};
use crate::models::points::{PointsCategory, PointsLedgerEntry};
use crate::state::levels::{ladder, ladder_fraction, StepState};

fn category_label(category: PointsCategory) -> &'static str {
    match category {
        PointsCategory::RewardPurchase => "purchase",
        PointsCategory::CheckIn => "check-in",
        PointsCategory::Event => "event",
        PointsCategory::Challenge | PointsCategory::Other => "award",
    }
}

fn ledger_row(entry: &PointsLedgerEntry) -> String {
    format!(
        "{:<9} {:<40} {:>6}  {}",
        category_label(entry.category),
        entry.description,
        signed(entry.points_change),
        date(&entry.created_at)
    )
}

pub fn history(ctx: &ViewContext) -> String {
    let mut out = String::from("== History ==\n");
    if ctx.state.history.is_empty() {
        out.push_str("No activity yet.");
        return out;
    }

    for entry in &ctx.state.history {
        let _ = writeln!(out, "{}", ledger_row(entry));
    }
    out
}

fn progress_bar(fraction: f64) -> String {
    let filled = (fraction * 20.0).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(20 - filled.min(20)))
}

pub fn ecopoints(ctx: &ViewContext) -> String {
    let user = match &ctx.state.current_user {
        Some(user) => user,
        None => return String::new(),
    };
    let level = ctx.state.user_level();

    let mut out = String::from("== EcoPoints ==\n");
    let _ = writeln!(out, "Balance: {} EcoPoints", user.current_points);
    let _ = writeln!(out, "Level {}: {}", level.level, level.title);
    let _ = writeln!(
        out,
        "{} {:.0}% {}",
        progress_bar(level.progress),
        level.percent(),
        level.progress_text
    );

    for step in ladder(user.lifetime_points, &ctx.state.levels) {
        let marker = match step.state {
            StepState::Reached => "x",
            StepState::Current => ">",
            StepState::Locked => " ",
        };
        let range = match step.max_points {
            Some(max) => format!("{} - {} Pts", step.min_points, max),
            None => format!("{}+ Pts", step.min_points),
        };
        let _ = writeln!(out, " [{}] {}. {} ({})", marker, step.level, step.title, range);
    }
    if !ctx.state.levels.is_empty() {
        let _ = writeln!(
            out,
            "Journey: {:.0}%",
            ladder_fraction(user.lifetime_points, &ctx.state.levels) * 100.0
        );
    }

    let _ = writeln!(out, "-- Recent activity --");
    if ctx.state.history.is_empty() {
        out.push_str("No transactions yet.");
    } else {
        for entry in ctx.state.history.iter().take(3) {
            let _ = writeln!(out, "{}", ledger_row(entry));
        }
    }
    out
}

pub fn profile(ctx: &ViewContext) -> String {
    let user = match &ctx.state.current_user {
        Some(user) => user,
        None => return String::new(),
    };
    let level = ctx.state.user_level();

    let mut out = String::from("== Profile ==\n");
    let _ = writeln!(out, "{}", user.name);
    let _ = writeln!(out, "Avatar: {}", or_placeholder(user.avatar_url.as_deref(), "(none)"));
    if let Some(joined) = &user.joined_at {
        let _ = writeln!(out, "Joined {}", date(joined));
    }
    let _ = writeln!(
        out,
        "Level {} {} {} {}",
        level.level,
        level.title,
        progress_bar(level.progress),
        level.progress_text
    );
    let _ = writeln!(out, "Student ID: {}", user.student_id);
    let _ = writeln!(out, "Course: {}", or_placeholder(user.course.as_deref(), "-"));
    let _ = writeln!(out, "Mobile: {}", or_placeholder(user.mobile.as_deref(), "-"));
    let _ = writeln!(out, "Email: {}", or_placeholder(user.email.as_deref(), "-"));
    if user.is_green_club_member {
        out.push_str("Membership: Green Club (Active Member)");
    } else {
        out.push_str("Membership: No Memberships. Join a club to see it here.");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_is_fixed_width() {
        assert_eq!(progress_bar(0.0), format!("[{}]", "-".repeat(20)));
        assert_eq!(progress_bar(0.5), format!("[{}{}]", "#".repeat(10), "-".repeat(10)));
        assert_eq!(progress_bar(1.0), format!("[{}]", "#".repeat(20)));
    }
}
