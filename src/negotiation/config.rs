//! Environment configuration and validation

use crate::error::{NegotiatorError, Result};
use crate::types::{Party, PartyId, Role};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Upper bound of the price range in the canonical configuration
pub const DEFAULT_MAX_PRICE: f64 = 10_000.0;

/// Fewest parties a negotiation can seat
pub const MIN_PARTIES: usize = 2;

/// Most parties a negotiation can seat
pub const MAX_PARTIES: usize = 10;

/// Closed interval valuations are drawn from
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuationRange {
    pub low: f64,
    pub high: f64,
}

impl ValuationRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    fn validate(&self, name: &str, max_price: f64) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(NegotiatorError::Configuration(format!(
                "{name} range must be finite"
            )));
        }
        if self.low < 0.0 || self.high > max_price || self.low > self.high {
            return Err(NegotiatorError::Configuration(format!(
                "{name} range [{}, {}] must satisfy 0 <= low <= high <= {max_price}",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Reward constants for settlement and failure outcomes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Per-round multiplier applied to settlement surplus
    pub discount: f64,
    /// Reward every party receives when anyone quits
    pub quit_penalty: f64,
    /// Reward every party receives when the round limit is hit
    pub timeout_penalty: f64,
    /// Reward for the party accepting while no offer stands
    pub invalid_accept_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            discount: 0.99,
            quit_penalty: -0.1,
            timeout_penalty: -0.05,
            invalid_accept_penalty: -0.5,
        }
    }
}

/// Construction parameters of a [`NegotiationEnv`](super::NegotiationEnv)
///
/// Every field has a default, so a JSON file only needs to name what it
/// changes. Call [`EnvConfig::validate`] (the environment does so on
/// construction) before relying on any derived value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Items in the bundle; all settle together
    pub num_items: usize,
    /// COUNTER actions allowed before the episode truncates
    pub max_rounds: u32,
    /// Most recent normalized offers kept in each observation
    pub history_lag: usize,
    /// Party count used for default naming, clamped to [2, 10]
    pub num_parties: usize,
    /// Explicit seating; overrides `num_parties` and default naming
    pub party_roles: Option<Vec<Party>>,
    /// Per-item weights of the settlement surplus, default 1.0 each
    pub item_weights: Option<Vec<f64>>,
    pub max_price: f64,
    pub supplier_range: ValuationRange,
    pub buyer_range: ValuationRange,
    pub rewards: RewardConfig,
    /// Seed of the valuation RNG; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Scripted valuations used instead of random draws
    pub fixed_valuations: Option<BTreeMap<PartyId, Vec<f64>>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            num_items: 1,
            max_rounds: 20,
            history_lag: 3,
            num_parties: 2,
            party_roles: None,
            item_weights: None,
            max_price: DEFAULT_MAX_PRICE,
            supplier_range: ValuationRange::new(4000.0, 6000.0),
            buyer_range: ValuationRange::new(7000.0, 9000.0),
            rewards: RewardConfig::default(),
            seed: None,
            fixed_valuations: None,
        }
    }
}

impl EnvConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn with_num_items(self, num_items: usize) -> Self {
        Self { num_items, ..self }
    }

    pub fn with_max_rounds(self, max_rounds: u32) -> Self {
        Self { max_rounds, ..self }
    }

    pub fn with_history_lag(self, history_lag: usize) -> Self {
        Self {
            history_lag,
            ..self
        }
    }

    pub fn with_num_parties(self, num_parties: usize) -> Self {
        Self {
            num_parties,
            ..self
        }
    }

    pub fn with_party_roles(self, parties: Vec<Party>) -> Self {
        Self {
            party_roles: Some(parties),
            ..self
        }
    }

    pub fn with_item_weights(self, weights: Vec<f64>) -> Self {
        Self {
            item_weights: Some(weights),
            ..self
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn with_rewards(self, rewards: RewardConfig) -> Self {
        Self { rewards, ..self }
    }

    pub fn with_fixed_valuations(self, valuations: BTreeMap<PartyId, Vec<f64>>) -> Self {
        Self {
            fixed_valuations: Some(valuations),
            ..self
        }
    }

    /// Valuation range of a role
    pub fn range_for(&self, role: Role) -> ValuationRange {
        match role {
            Role::Supplier => self.supplier_range,
            Role::Buyer => self.buyer_range,
        }
    }

    /// Party count after the documented clamp
    pub fn effective_party_count(&self) -> usize {
        self.num_parties.clamp(MIN_PARTIES, MAX_PARTIES)
    }

    /// Seating order, which is also the round-robin turn order
    pub fn parties(&self) -> Vec<Party> {
        match &self.party_roles {
            Some(parties) => parties.clone(),
            None => default_parties(self.effective_party_count()),
        }
    }

    /// Surplus weight of every item
    pub fn weights(&self) -> Vec<f64> {
        self.item_weights
            .clone()
            .unwrap_or_else(|| vec![1.0; self.num_items])
    }

    /// Check every parameter; invalid configurations never reach an episode
    pub fn validate(&self) -> Result<()> {
        if self.num_items == 0 {
            return Err(NegotiatorError::Configuration(
                "num_items must be positive".to_string(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(NegotiatorError::Configuration(
                "max_rounds must be positive".to_string(),
            ));
        }
        if !self.max_price.is_finite() || self.max_price <= 0.0 {
            return Err(NegotiatorError::Configuration(format!(
                "max_price must be positive, got {}",
                self.max_price
            )));
        }

        self.supplier_range.validate("supplier", self.max_price)?;
        self.buyer_range.validate("buyer", self.max_price)?;
        self.validate_rewards()?;
        self.validate_parties()?;
        self.validate_weights()?;
        self.validate_fixed_valuations()?;

        if self.num_parties != self.effective_party_count() && self.party_roles.is_none() {
            tracing::warn!(
                requested = self.num_parties,
                clamped = self.effective_party_count(),
                "Party count outside supported range, clamping"
            );
        }

        Ok(())
    }

    fn validate_rewards(&self) -> Result<()> {
        let r = &self.rewards;
        if !(r.discount > 0.0 && r.discount <= 1.0) {
            return Err(NegotiatorError::Configuration(format!(
                "discount must lie in (0, 1], got {}",
                r.discount
            )));
        }
        let penalties = [r.quit_penalty, r.timeout_penalty, r.invalid_accept_penalty];
        if penalties.iter().any(|p| !p.is_finite()) {
            return Err(NegotiatorError::Configuration(
                "penalties must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_parties(&self) -> Result<()> {
        let Some(parties) = &self.party_roles else {
            return Ok(());
        };

        if parties.len() < MIN_PARTIES || parties.len() > MAX_PARTIES {
            return Err(NegotiatorError::Configuration(format!(
                "party_roles must seat between {MIN_PARTIES} and {MAX_PARTIES} parties, got {}",
                parties.len()
            )));
        }

        let mut seen = HashSet::new();
        for party in parties {
            if party.id.as_str().is_empty() {
                return Err(NegotiatorError::Configuration(
                    "party ids must be non-empty".to_string(),
                ));
            }
            if !seen.insert(&party.id) {
                return Err(NegotiatorError::Configuration(format!(
                    "duplicate party id: {}",
                    party.id
                )));
            }
        }

        for role in [Role::Supplier, Role::Buyer] {
            if !parties.iter().any(|p| p.role == role) {
                return Err(NegotiatorError::Configuration(format!(
                    "party_roles must seat at least one {role}"
                )));
            }
        }
        Ok(())
    }

    fn validate_weights(&self) -> Result<()> {
        let Some(weights) = &self.item_weights else {
            return Ok(());
        };

        if weights.len() != self.num_items {
            return Err(NegotiatorError::Configuration(format!(
                "item_weights has {} entries, expected {}",
                weights.len(),
                self.num_items
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(NegotiatorError::Configuration(
                "item_weights must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_fixed_valuations(&self) -> Result<()> {
        let Some(fixed) = &self.fixed_valuations else {
            return Ok(());
        };

        for party in self.parties() {
            let values = fixed.get(&party.id).ok_or_else(|| {
                NegotiatorError::Configuration(format!(
                    "fixed_valuations is missing party {}",
                    party.id
                ))
            })?;
            if values.len() != self.num_items {
                return Err(NegotiatorError::Configuration(format!(
                    "fixed valuations of {} have {} entries, expected {}",
                    party.id,
                    values.len(),
                    self.num_items
                )));
            }
            if values
                .iter()
                .any(|v| !v.is_finite() || *v < 0.0 || *v > self.max_price)
            {
                return Err(NegotiatorError::Configuration(format!(
                    "fixed valuations of {} must lie in [0, {}]",
                    party.id, self.max_price
                )));
            }
        }
        Ok(())
    }
}

/// Default seating for `count` parties.
///
/// Two parties are the canonical `supplier` / `retailer` pair. Larger tables
/// seat `count / 2` suppliers and the rest buyers, interleaved so the
/// round-robin alternates sides while both remain.
pub fn default_parties(count: usize) -> Vec<Party> {
    if count <= MIN_PARTIES {
        return vec![Party::supplier("supplier"), Party::buyer("retailer")];
    }

    let suppliers = count / 2;
    let buyers = count - suppliers;
    let mut parties = Vec::with_capacity(count);
    for k in 0..buyers.max(suppliers) {
        if k < suppliers {
            parties.push(Party::supplier(format!("supplier_{k}")));
        }
        if k < buyers {
            parties.push(Party::buyer(format!("buyer_{k}")));
        }
    }
    parties
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EnvConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_items, 1);
        assert_eq!(config.max_rounds, 20);
        assert_eq!(config.history_lag, 3);
        assert_eq!(config.weights(), vec![1.0]);
    }

    #[test]
    fn test_canonical_two_party_seating() {
        let parties = EnvConfig::default().parties();
        assert_eq!(parties[0], Party::supplier("supplier"));
        assert_eq!(parties[1], Party::buyer("retailer"));
    }

    #[test]
    fn test_five_party_seating_interleaves() {
        let ids: Vec<String> = default_parties(5)
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(
            ids,
            vec!["supplier_0", "buyer_0", "supplier_1", "buyer_1", "buyer_2"]
        );
    }

    #[test]
    fn test_party_count_is_clamped() {
        let config = EnvConfig::default().with_num_parties(25);
        assert!(config.validate().is_ok());
        assert_eq!(config.parties().len(), MAX_PARTIES);

        let config = EnvConfig::default().with_num_parties(0);
        assert_eq!(config.parties().len(), MIN_PARTIES);
    }

    #[test]
    fn test_rejects_non_positive_counts() {
        assert!(matches!(
            EnvConfig::default().with_num_items(0).validate(),
            Err(NegotiatorError::Configuration(_))
        ));
        assert!(matches!(
            EnvConfig::default().with_max_rounds(0).validate(),
            Err(NegotiatorError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_bad_party_roles() {
        let single = EnvConfig::default().with_party_roles(vec![Party::supplier("solo")]);
        assert!(single.validate().is_err());

        let duplicate = EnvConfig::default()
            .with_party_roles(vec![Party::supplier("a"), Party::buyer("a")]);
        assert!(duplicate.validate().is_err());

        let too_many = EnvConfig::default().with_party_roles(
            (0..11).map(|i| Party::buyer(format!("b{i}"))).collect(),
        );
        assert!(too_many.validate().is_err());

        let no_supplier = EnvConfig::default()
            .with_party_roles(vec![Party::buyer("b1"), Party::buyer("b2")]);
        assert!(no_supplier.validate().is_err());

        let no_buyer = EnvConfig::default()
            .with_party_roles(vec![Party::supplier("s1"), Party::supplier("s2")]);
        assert!(no_buyer.validate().is_err());
    }

    #[test]
    fn test_rejects_mismatched_weights() {
        let config = EnvConfig::default()
            .with_num_items(2)
            .with_item_weights(vec![1.0]);
        assert!(config.validate().is_err());

        let config = EnvConfig::default()
            .with_num_items(2)
            .with_item_weights(vec![1.0, -0.5]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_incomplete_fixed_valuations() {
        let mut fixed = BTreeMap::new();
        fixed.insert(PartyId::from("supplier"), vec![4000.0]);
        let config = EnvConfig::default().with_fixed_valuations(fixed);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_valuation_bounds() {
        let config = EnvConfig {
            buyer_range: ValuationRange::new(7000.0, 12_000.0),
            ..EnvConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EnvConfig =
            serde_json::from_str(r#"{"num_items": 3, "num_parties": 4}"#).unwrap();
        assert_eq!(config.num_items, 3);
        assert_eq!(config.max_rounds, 20);
        assert_eq!(config.parties().len(), 4);
        assert_eq!(config.rewards, RewardConfig::default());
    }
}
