//! Strategic decision-makers.
//!
//! A [`Strategy`] maps one party's observation to an action. It sees only
//! what the environment shows that party, decoded through an
//! [`ObservationLayout`], and never touches the session itself.

use crate::error::{NegotiatorError, Result};
use crate::negotiation::{Action, Observation, ObservationLayout};
use crate::types::{Party, Role};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decides the action of one seated party
pub trait Strategy: Send {
    /// Short name used in logs and records
    fn name(&self) -> &str;

    /// Pick an action for the party owning `obs`
    fn act(&mut self, obs: &Observation, layout: &ObservationLayout) -> Action;

    /// Forget any per-episode state
    fn reset(&mut self) {}
}

/// Counters with uniform prices from a fixed band and now and then accepts
/// whatever is on the table.
pub struct RandomStrategy {
    seed: u64,
    rng: StdRng,
    low: f64,
    high: f64,
    accept_probability: f64,
}

impl RandomStrategy {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            low: 5000.0,
            high: 7000.0,
            accept_probability: 0.1,
        }
    }

    /// Bounds may come in either order
    pub fn with_band(self, low: f64, high: f64) -> Self {
        Self {
            low: low.min(high),
            high: low.max(high),
            ..self
        }
    }

    pub fn with_accept_probability(self, accept_probability: f64) -> Self {
        Self {
            accept_probability,
            ..self
        }
    }
}

impl Strategy for RandomStrategy {
    fn name(&self) -> &str {
        "random"
    }

    fn act(&mut self, obs: &Observation, layout: &ObservationLayout) -> Action {
        let offer_stands = layout.elapsed(obs) > 0.0;
        if offer_stands && self.rng.gen_bool(self.accept_probability.clamp(0.0, 1.0)) {
            return Action::accept();
        }

        let prices = (0..layout.num_items)
            .map(|_| self.rng.gen_range(self.low..=self.high))
            .collect();
        Action::counter(prices)
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

/// Time-dependent concession.
///
/// Opens `initial_margin * max_price` away from its own valuation on the
/// profitable side and closes that gap linearly as the round budget runs
/// out. Accepts the standing offer once every item is at least as good as
/// the current target.
pub struct ConcessionStrategy {
    role: Role,
    initial_margin: f64,
}

impl ConcessionStrategy {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            initial_margin: 0.3,
        }
    }

    pub fn with_initial_margin(self, initial_margin: f64) -> Self {
        Self {
            initial_margin,
            ..self
        }
    }

    /// Per-item target prices at the observed point in time
    pub fn targets(&self, obs: &Observation, layout: &ObservationLayout) -> Vec<f64> {
        let elapsed = f64::from(layout.elapsed(obs)).clamp(0.0, 1.0);
        let margin = self.initial_margin * (1.0 - elapsed) * layout.max_price;

        layout
            .own_valuations(obs)
            .iter()
            .map(|v| {
                let valuation = f64::from(*v) * layout.max_price;
                let target = match self.role {
                    Role::Supplier => valuation + margin,
                    Role::Buyer => valuation - margin,
                };
                target.clamp(0.0, layout.max_price)
            })
            .collect()
    }

    fn acceptable(&self, offer: &[f32], targets: &[f64], max_price: f64) -> bool {
        offer.iter().zip(targets).all(|(o, target)| {
            let price = f64::from(*o) * max_price;
            match self.role {
                Role::Supplier => price >= *target,
                Role::Buyer => price <= *target,
            }
        })
    }
}

impl Strategy for ConcessionStrategy {
    fn name(&self) -> &str {
        "concession"
    }

    fn act(&mut self, obs: &Observation, layout: &ObservationLayout) -> Action {
        let targets = self.targets(obs, layout);
        let offer_stands = layout.elapsed(obs) > 0.0;

        if offer_stands && self.acceptable(layout.current_bundle(obs), &targets, layout.max_price)
        {
            return Action::accept();
        }
        Action::counter(targets)
    }
}

/// Named strategy families, selectable by name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Random,
    #[default]
    Concession,
}

impl StrategyKind {
    /// Build a strategy for `party`; `seed` only matters for random play
    pub fn build(&self, party: &Party, seed: u64) -> Box<dyn Strategy> {
        match self {
            StrategyKind::Random => Box::new(RandomStrategy::new(seed)),
            StrategyKind::Concession => Box::new(ConcessionStrategy::new(party.role)),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = NegotiatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(StrategyKind::Random),
            "concession" => Ok(StrategyKind::Concession),
            other => Err(NegotiatorError::Configuration(format!(
                "unknown strategy: {other}"
            ))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Random => write!(f, "random"),
            StrategyKind::Concession => write!(f, "concession"),
        }
    }
}
