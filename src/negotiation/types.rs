//! Action, outcome and step-result types

use crate::error::{NegotiatorError, Result};
use crate::types::{Bundle, PartyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-party values returned in lock-step for every seated party
pub type PartyMap<T> = BTreeMap<PartyId, T>;

/// What the proposer does with its turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Accept,
    Counter,
    Quit,
}

impl ActionKind {
    /// Decode the discrete action index used by policies (0, 1, 2)
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ActionKind::Accept),
            1 => Ok(ActionKind::Counter),
            2 => Ok(ActionKind::Quit),
            other => Err(NegotiatorError::UnknownActionKind(other.to_string())),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            ActionKind::Accept => 0,
            ActionKind::Counter => 1,
            ActionKind::Quit => 2,
        }
    }
}

impl FromStr for ActionKind {
    type Err = NegotiatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "accept" => Ok(ActionKind::Accept),
            "counter" => Ok(ActionKind::Counter),
            "quit" => Ok(ActionKind::Quit),
            _ => Err(NegotiatorError::UnknownActionKind(s.to_string())),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Accept => write!(f, "ACCEPT"),
            ActionKind::Counter => write!(f, "COUNTER"),
            ActionKind::Quit => write!(f, "QUIT"),
        }
    }
}

/// An action submitted for one party
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Proposed bundle prices; only read for COUNTER
    #[serde(default)]
    pub prices: Vec<f64>,
}

impl Action {
    pub fn counter(prices: Vec<f64>) -> Self {
        Self {
            kind: ActionKind::Counter,
            prices,
        }
    }

    pub fn accept() -> Self {
        Self {
            kind: ActionKind::Accept,
            prices: Vec::new(),
        }
    }

    pub fn quit() -> Self {
        Self {
            kind: ActionKind::Quit,
            prices: Vec::new(),
        }
    }

    /// Shape checks, run before the action touches any state.
    ///
    /// COUNTER needs exactly `num_items` finite prices. ACCEPT and QUIT
    /// ignore prices but still reject a vector of the wrong length.
    pub fn validate(&self, num_items: usize, party: &PartyId) -> Result<()> {
        let malformed = |reason: String| NegotiatorError::MalformedAction {
            party: party.to_string(),
            reason,
        };

        match self.kind {
            ActionKind::Counter if self.prices.len() != num_items => Err(malformed(format!(
                "expected {num_items} prices, got {}",
                self.prices.len()
            ))),
            ActionKind::Accept | ActionKind::Quit
                if !self.prices.is_empty() && self.prices.len() != num_items =>
            {
                Err(malformed(format!(
                    "expected no prices or {num_items}, got {}",
                    self.prices.len()
                )))
            }
            _ if self.prices.iter().any(|p| !p.is_finite()) => {
                Err(malformed("prices must be finite".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// How an episode ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// An offer was accepted and settled
    Deal,
    /// A party walked away
    Quit,
    /// ACCEPT arrived before any offer was on the table
    InvalidAccept,
    /// The round limit was reached
    Timeout,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Deal => write!(f, "deal"),
            Outcome::Quit => write!(f, "quit"),
            Outcome::InvalidAccept => write!(f, "invalid_accept"),
            Outcome::Timeout => write!(f, "timeout"),
        }
    }
}

/// Per-party info record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Bundle>,
}

/// Flat observation vector, every entry in [0, 1]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation(pub Vec<f32>);

impl Observation {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Returned by `reset`
#[derive(Clone, Debug)]
pub struct ResetResult {
    pub observations: PartyMap<Observation>,
    pub infos: PartyMap<StepInfo>,
}

/// Returned by `step`, one entry per seated party in every map
#[derive(Clone, Debug)]
pub struct StepResult {
    pub observations: PartyMap<Observation>,
    pub rewards: PartyMap<f64>,
    pub terminated: PartyMap<bool>,
    pub truncated: PartyMap<bool>,
    pub infos: PartyMap<StepInfo>,
}

impl StepResult {
    /// True once any party is terminated or truncated
    pub fn is_done(&self) -> bool {
        self.terminated.values().any(|t| *t) || self.truncated.values().any(|t| *t)
    }

    /// The episode outcome, if this step ended it
    pub fn outcome(&self) -> Option<Outcome> {
        self.infos.values().find_map(|info| info.result)
    }

    /// The settled bundle, if this step produced a deal
    pub fn settlement(&self) -> Option<&Bundle> {
        self.infos.values().find_map(|info| info.settlement.as_ref())
    }
}
