use std::fmt::Write;

use super::{date, or_placeholder, price, ViewContext};
use crate::models::rewards::RewardStatus;
use crate::models::stores::Product;
use crate::repositories::media::reward_qr_url;

fn product_card(product: &Product) -> String {
    format!(
        "{} - {} (was {}) + {} pts [product {} {}]",
        product.name,
        price(product.discounted_price_inr),
        price(product.original_price_inr),
        product.cost_in_points,
        product.store_id,
        product.id
    )
}

pub fn rewards(ctx: &ViewContext) -> String {
    let mut out = String::from("== Eco-Store ==\n");
    for store in &ctx.state.stores {
        let _ = writeln!(out, "{} [store {}]", store.name, store.id);
        for product in ctx.state.store_products(&store.id).into_iter().take(3) {
            let _ = writeln!(out, "  {}", product_card(product));
        }
    }
    out
}

pub fn store_detail(ctx: &ViewContext, store_id: &str) -> String {
    let store = match ctx.state.store(store_id) {
        Some(store) => store,
        None => return String::new(),
    };

    let mut products = ctx.state.store_products(store_id);
    products.sort_by_key(|product| product.cost_in_points);

    let mut out = format!("== {} ==\nAll Products\n", store.name);
    for product in products {
        let _ = writeln!(out, "  {}", product_card(product));
    }
    out
}

pub fn product_detail(ctx: &ViewContext, store_id: &str, product_id: &str) -> String {
    let (store, product) = match ctx.state.product(store_id, product_id) {
        Some(found) => found,
        None => return String::new(),
    };
    let can_afford = ctx
        .state
        .current_user
        .as_ref()
        .map(|user| user.can_afford(product.cost_in_points))
        .unwrap_or(false);

    let mut out = format!("== {} ==\n{}\n", product.name, store.name);
    let _ = writeln!(
        out,
        "Image: {}",
        or_placeholder(product.cover_image(), "(no image)")
    );
    let _ = writeln!(
        out,
        "Description: {}",
        or_placeholder(product.description.as_deref(), "No description available.")
    );
    if !product.features.is_empty() {
        let _ = writeln!(out, "Features:");
        for feature in &product.features {
            let _ = writeln!(out, "  - {}", feature);
        }
    }
    if !product.specifications.is_empty() {
        let _ = writeln!(out, "Specifications:");
        for (key, value) in &product.specifications {
            let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            let _ = writeln!(out, "  {}: {}", key, value);
        }
    }
    let _ = write!(
        out,
        "{} (was {}) + {} pts ",
        price(product.discounted_price_inr),
        price(product.original_price_inr),
        product.cost_in_points
    );
    if can_afford {
        let _ = write!(out, "[buy {} {}]", store.id, product.id);
    } else {
        out.push_str("[Redeem Offer unavailable: not enough points]");
    }
    out
}

pub fn purchase_modal(ctx: &ViewContext, store_id: &str, product_id: &str) -> String {
    let ((store, product), user) = match (
        ctx.state.product(store_id, product_id),
        ctx.state.current_user.as_ref(),
    ) {
        (Some(found), Some(user)) => (found, user),
        _ => return String::new(),
    };

    let mut out = String::from("== Purchase Reward ==\n");
    let _ = writeln!(out, "{} from {}", product.name, store.name);
    let _ = writeln!(
        out,
        "{} + {} EcoPoints",
        price(product.discounted_price_inr),
        product.cost_in_points
    );
    let _ = writeln!(out, "Your Balance: {} EcoPoints", user.current_points);
    let _ = writeln!(out, "Cost:        -{} EcoPoints", product.cost_in_points);
    let _ = writeln!(
        out,
        "Remaining:    {} EcoPoints",
        user.current_points - product.cost_in_points
    );
    let _ = write!(out, "[confirm {} {}] or [cancel]", store.id, product.id);
    out
}

pub fn my_rewards(ctx: &ViewContext) -> String {
    let mut out = String::from("== My Rewards ==\n");
    if ctx.state.user_rewards.is_empty() {
        out.push_str("You have no rewards. Visit the Eco-Store to get some!");
        return out;
    }

    for reward in &ctx.state.user_rewards {
        let details = match ctx.state.reward_details(reward) {
            Some(details) => details,
            None => continue,
        };
        let purchased = reward
            .purchase_date
            .as_ref()
            .map(date)
            .unwrap_or_else(|| "-".to_string());

        match reward.status {
            RewardStatus::Active => {
                let _ = writeln!(
                    out,
                    "{} ({}) purchased {} [qr {}]",
                    details.product.name, details.store.name, purchased, reward.id
                );
            }
            RewardStatus::Used => {
                let used = reward
                    .used_date
                    .as_ref()
                    .map(date)
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    out,
                    "{} ({}) purchased {} used {} [Redeemed]",
                    details.product.name, details.store.name, purchased, used
                );
            }
        }
    }
    out
}

pub fn reward_qr(ctx: &ViewContext, user_reward_id: &str) -> String {
    let details = match ctx
        .state
        .user_reward(user_reward_id)
        .and_then(|reward| ctx.state.reward_details(reward))
    {
        Some(details) => details,
        None => return String::new(),
    };

    let qr = match reward_qr_url(ctx.qr_url, &details.reward.id) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Could not build QR url: {}", e);
            String::new()
        }
    };

    let mut out = format!("== {} ==\n", details.product.name);
    let _ = writeln!(out, "QR: {}", qr);
    let _ = writeln!(
        out,
        "How to Redeem: {}",
        or_placeholder(
            details.product.instructions.as_deref(),
            "Show this QR code to the store vendor."
        )
    );
    if details.reward.is_active() {
        let _ = write!(out, "[use {}] or [done]", details.reward.id);
    } else {
        out.push_str("[Redeemed]");
    }
    out
}
