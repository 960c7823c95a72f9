//! Settlement rewards

use crate::types::{Bundle, Role};

use super::config::RewardConfig;
use super::session::Session;
use super::types::PartyMap;

/// Weighted, normalized surplus of one party over the whole bundle
pub fn bundle_surplus(
    role: Role,
    settlement: &Bundle,
    valuations: &[f64],
    weights: &[f64],
    max_price: f64,
) -> f64 {
    settlement
        .prices()
        .iter()
        .zip(valuations)
        .zip(weights)
        .map(|((price, valuation), weight)| weight * role.surplus(*price, *valuation) / max_price)
        .sum()
}

/// `discount ^ round`; later settlements are worth less
pub fn discount_factor(discount: f64, round: u32) -> f64 {
    discount.powf(f64::from(round))
}

/// Reward of every party for settling `settlement` at the session's round.
///
/// Each party is paid its own role's surplus against its own valuation; with
/// one supplier and one buyer this is the canonical seller/buyer split.
pub fn settlement_rewards(
    session: &Session,
    settlement: &Bundle,
    rewards: &RewardConfig,
) -> PartyMap<f64> {
    let discount = discount_factor(rewards.discount, session.round());

    session
        .turn_order()
        .iter()
        .map(|party| {
            let surplus = bundle_surplus(
                party.role,
                settlement,
                session.valuation_slice(&party.id),
                session.item_weights(),
                session.max_price(),
            );
            (party.id.clone(), surplus * discount)
        })
        .collect()
}
