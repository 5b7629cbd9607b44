use std::fmt::Write;

use super::ViewContext;
use crate::models::challenges::{ChallengeStatus, DailyChallenge};

pub fn challenge_card(daily: &DailyChallenge) -> String {
    let challenge = &daily.challenge;
    let action = match daily.status {
        ChallengeStatus::Active => format!("[complete {}]", challenge.id),
        ChallengeStatus::Completed => "[Completed]".to_string(),
    };

    format!(
        "{} (+{} EcoPoints) {}\n  {}",
        challenge.title, challenge.points_reward, action, challenge.description
    )
}

pub fn challenges(ctx: &ViewContext) -> String {
    let mut out = String::from("== Challenges ==\n");
    if ctx.state.daily_challenges.is_empty() {
        out.push_str("No challenges available today. Check back tomorrow!");
        return out;
    }

    for daily in &ctx.state.daily_challenges {
        let _ = writeln!(out, "{}", challenge_card(daily));
    }
    out
}

pub fn events(ctx: &ViewContext) -> String {
    let mut out = String::from("== Events ==\n");
    if ctx.state.events.is_empty() {
        out.push_str("No upcoming events scheduled.");
        return out;
    }

    for event in &ctx.state.events {
        let action = if ctx.state.has_rsvp(&event.id) {
            "[Attending]".to_string()
        } else {
            format!("[rsvp {}]", event.id)
        };
        let _ = writeln!(
            out,
            "{} {} {}\n  {}",
            event.event_date.format("%d/%m/%Y, %H:%M"),
            event.title,
            action,
            event.description
        );
    }
    out
}

/// Ranked rows, the signed-in student marked with "(You)".
pub fn leaderboard_rows(ctx: &ViewContext, limit: Option<usize>) -> String {
    let board = &ctx.state.leaderboard;
    if board.is_empty() {
        return "Leaderboard is empty.".to_string();
    }

    let me = ctx.state.student_id();
    board
        .iter()
        .take(limit.unwrap_or(board.len()))
        .enumerate()
        .map(|(index, entry)| {
            let name = if Some(entry.student_id.as_str()) == me {
                format!("{} (You)", entry.name)
            } else {
                entry.name.clone()
            };
            format!("{:>3}. {} - {} Pts", index + 1, name, entry.lifetime_points)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn leaderboard(ctx: &ViewContext) -> String {
    format!("== Leaderboard ==\n{}", leaderboard_rows(ctx, None))
}

