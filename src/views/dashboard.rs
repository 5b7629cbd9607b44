use std::fmt::Write;

use super::{community, ViewContext};

pub fn header(ctx: &ViewContext) -> String {
    let user = match &ctx.state.current_user {
        Some(user) => user,
        None => return String::new(),
    };
    let level = ctx.state.user_level();

    format!(
        "{} | {} EcoPoints | {} | {}",
        user.name,
        user.current_points,
        level.label(),
        ctx.state.theme.label()
    )
}

pub fn check_in_card(ctx: &ViewContext) -> String {
    if ctx.state.current_user.is_none() {
        return String::new();
    }

    if ctx.state.can_check_in(ctx.now.date_naive()) {
        format!(
            "Daily Check-in: earn +{} points for checking in! [check-in]",
            ctx.check_in_reward
        )
    } else {
        "Daily Check-in: you've already checked in today! [Checked-in]".to_string()
    }
}

pub fn dashboard(ctx: &ViewContext) -> String {
    let user = match &ctx.state.current_user {
        Some(user) => user,
        None => return String::new(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "== Dashboard ==");
    let _ = writeln!(out, "Hello, {}!", user.name);

    match ctx.state.next_event(ctx.now) {
        Some(event) => {
            let _ = writeln!(out, "Upcoming Event: {}", event.title);
            let _ = writeln!(out, "  {}", event.description);
        }
        None => {
            let _ = writeln!(out, "No Upcoming Events. Check back later for more events!");
        }
    }

    let impact = ctx.state.impact_stats();
    let _ = writeln!(
        out,
        "Impact: {} kg CO2 saved | {} items recycled | {} events attended",
        impact.co2_saved_kg, impact.items_recycled, impact.events_attended
    );

    let _ = writeln!(out, "{}", check_in_card(ctx));
    let _ = writeln!(out, "-- Top of the leaderboard --");
    let _ = writeln!(out, "{}", community::leaderboard_rows(ctx, Some(3)));
    let _ = write!(out, "{}", dashboard_challenges(ctx));

    out
}

pub fn dashboard_challenges(ctx: &ViewContext) -> String {
    let active: Vec<_> = ctx.state.active_challenges().take(2).collect();
    if active.is_empty() {
        return "You've completed all daily challenges!".to_string();
    }

    let mut out = String::from("-- Today's challenges --\n");
    for daily in active {
        let _ = writeln!(out, "{}", community::challenge_card(daily));
    }
    out
}
