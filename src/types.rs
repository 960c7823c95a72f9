//! Core types used throughout the negotiation environment

use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a negotiating party
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side of the bargain a party negotiates for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sells the bundle; valuation is a cost basis
    Supplier,
    /// Buys the bundle; valuation is a willingness to pay
    Buyer,
}

impl Role {
    /// Unnormalized gain of settling one item at `price` against `valuation`
    pub fn surplus(&self, price: f64, valuation: f64) -> f64 {
        match self {
            Role::Supplier => price - valuation,
            Role::Buyer => valuation - price,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Supplier => write!(f, "supplier"),
            Role::Buyer => write!(f, "buyer"),
        }
    }
}

/// A party seated at the table, with its role fixed at configuration time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub role: Role,
}

impl Party {
    pub fn supplier(id: impl Into<String>) -> Self {
        Self {
            id: PartyId::new(id),
            role: Role::Supplier,
        }
    }

    pub fn buyer(id: impl Into<String>) -> Self {
        Self {
            id: PartyId::new(id),
            role: Role::Buyer,
        }
    }
}

/// Identifier of one negotiation episode
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Derive a session ID from the environment seed and episode counter
    pub fn derive(seed: u64, episode: u64) -> Self {
        let mut hasher = Blake2b512::new();
        hasher.update(seed.to_be_bytes());
        hasher.update(episode.to_be_bytes());
        let result = hasher.finalize();
        Self(format!("session_{}", hex::encode(&result[..8])))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-item prices for the bundle, negotiated as one package
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(pub Vec<f64>);

impl Bundle {
    /// The "no offer yet" bundle
    pub fn zeros(num_items: usize) -> Self {
        Self(vec![0.0; num_items])
    }

    /// Clamp every price into `[0, max_price]`
    pub fn clipped(prices: &[f64], max_price: f64) -> Self {
        Self(prices.iter().map(|p| p.clamp(0.0, max_price)).collect())
    }

    pub fn prices(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prices divided by `max_price`
    pub fn normalized(&self, max_price: f64) -> Vec<f64> {
        self.0.iter().map(|p| p / max_price).collect()
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prices: Vec<String> = self.0.iter().map(|p| format!("${:.0}", p)).collect();
        write!(f, "[{}]", prices.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_deterministic() {
        let a = SessionId::derive(7, 1);
        let b = SessionId::derive(7, 1);
        assert_eq!(a, b);
        assert!(a.0.starts_with("session_"));
        // "session_" + 16 hex chars
        assert_eq!(a.0.len(), 8 + 16);
    }

    #[test]
    fn test_session_id_differs_per_episode() {
        assert_ne!(SessionId::derive(7, 1), SessionId::derive(7, 2));
        assert_ne!(SessionId::derive(7, 1), SessionId::derive(8, 1));
    }

    #[test]
    fn test_role_surplus_direction() {
        assert_eq!(Role::Supplier.surplus(6000.0, 4000.0), 2000.0);
        assert_eq!(Role::Buyer.surplus(6000.0, 8000.0), 2000.0);
        assert!(Role::Supplier.surplus(3000.0, 4000.0) < 0.0);
    }

    #[test]
    fn test_bundle_clipping() {
        let bundle = Bundle::clipped(&[-5.0, 500.0, 20_000.0], 10_000.0);
        assert_eq!(bundle.prices(), &[0.0, 500.0, 10_000.0]);
        assert_eq!(bundle.normalized(10_000.0), vec![0.0, 0.05, 1.0]);
    }

    #[test]
    fn test_bundle_display() {
        let bundle = Bundle(vec![6000.0, 5499.6]);
        assert_eq!(bundle.to_string(), "[$6000, $5500]");
    }

    #[test]
    fn test_party_id_serializes_as_string() {
        let id = PartyId::from("supplier_0");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"supplier_0\"");
        assert_eq!(id.to_string(), "supplier_0");
    }
}
