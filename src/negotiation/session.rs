//! Negotiation session state

use crate::error::{NegotiatorError, Result};
use crate::types::{Bundle, Party, PartyId};
use serde::{Deserialize, Serialize};

use super::config::EnvConfig;
use super::history::PriceHistory;
use super::types::{Outcome, PartyMap};

/// Session state machine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Offers are being exchanged
    Bargaining,
    /// An offer was accepted; the settlement never changes afterwards
    Agreed { settlement: Bundle, accepted_by: PartyId },
    /// A party walked away
    Abandoned { by: PartyId },
    /// A party accepted while nothing was on the table
    Rejected { by: PartyId },
    /// The round limit was reached
    Expired,
}

impl SessionState {
    /// Check if the session is in a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Bargaining)
    }

    /// Check if offers can still be exchanged
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// How the session ended, if it has
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            SessionState::Bargaining => None,
            SessionState::Agreed { .. } => Some(Outcome::Deal),
            SessionState::Abandoned { .. } => Some(Outcome::Quit),
            SessionState::Rejected { .. } => Some(Outcome::InvalidAccept),
            SessionState::Expired => Some(Outcome::Timeout),
        }
    }
}

/// One negotiation episode.
///
/// Owned exclusively by the environment. Anything handed out (valuations,
/// history, bundles) is either borrowed immutably or copied.
#[derive(Clone, Debug)]
pub struct Session {
    parties: Vec<Party>,
    max_rounds: u32,
    max_price: f64,
    item_weights: Vec<f64>,
    valuations: PartyMap<Vec<f64>>,
    current_bundle: Bundle,
    price_history: PriceHistory,
    round: u32,
    proposer: usize,
    state: SessionState,
}

impl Session {
    /// Fresh session: no offer, zeroed history, first party to move
    pub fn new(config: &EnvConfig, parties: Vec<Party>, valuations: PartyMap<Vec<f64>>) -> Self {
        Self {
            parties,
            max_rounds: config.max_rounds,
            max_price: config.max_price,
            item_weights: config.weights(),
            valuations,
            current_bundle: Bundle::zeros(config.num_items),
            price_history: PriceHistory::new(config.history_lag, config.num_items),
            round: 0,
            proposer: 0,
            state: SessionState::Bargaining,
        }
    }

    /// Seating order, which doubles as the round-robin turn order
    pub fn turn_order(&self) -> &[Party] {
        &self.parties
    }

    pub fn party(&self, id: &PartyId) -> Option<&Party> {
        self.parties.iter().find(|p| &p.id == id)
    }

    pub fn current_proposer(&self) -> &Party {
        &self.parties[self.proposer]
    }

    pub fn num_items(&self) -> usize {
        self.current_bundle.len()
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn max_price(&self) -> f64 {
        self.max_price
    }

    pub fn item_weights(&self) -> &[f64] {
        &self.item_weights
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn current_bundle(&self) -> &Bundle {
        &self.current_bundle
    }

    pub fn price_history(&self) -> &PriceHistory {
        &self.price_history
    }

    /// Settled bundle, set only by an accepted offer
    pub fn deal_bundle(&self) -> Option<&Bundle> {
        match &self.state {
            SessionState::Agreed { settlement, .. } => Some(settlement),
            _ => None,
        }
    }

    /// Copy of a party's private valuations
    pub fn valuations(&self, id: &PartyId) -> Option<Vec<f64>> {
        self.valuations.get(id).cloned()
    }

    pub(crate) fn valuation_slice(&self, id: &PartyId) -> &[f64] {
        self.valuations.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Copy of every party's valuations
    pub fn all_valuations(&self) -> PartyMap<Vec<f64>> {
        self.valuations.clone()
    }

    /// An offer stands once at least one COUNTER has been made
    pub fn has_standing_offer(&self) -> bool {
        self.round > 0
    }

    pub fn round_limit_reached(&self) -> bool {
        self.round >= self.max_rounds
    }

    /// Put a new offer on the table: clamp, record in history, count the round
    pub fn record_counter(&mut self, prices: &[f64]) -> Result<&Bundle> {
        self.ensure_active("Cannot counter in a terminal session")?;

        self.current_bundle = Bundle::clipped(prices, self.max_price);
        self.price_history
            .push(self.current_bundle.normalized(self.max_price));
        self.round += 1;

        Ok(&self.current_bundle)
    }

    /// Pass the turn to the next party in round-robin order
    pub fn advance_turn(&mut self) -> &Party {
        self.proposer = (self.proposer + 1) % self.parties.len();
        &self.parties[self.proposer]
    }

    /// Accept the standing offer
    pub fn settle(&mut self, accepted_by: PartyId) -> Result<Bundle> {
        self.ensure_active("Negotiation already finalized")?;
        if !self.has_standing_offer() {
            return Err(NegotiatorError::InvalidStateTransition(
                "No standing offer to settle".to_string(),
            ));
        }

        let settlement = self.current_bundle.clone();
        self.state = SessionState::Agreed {
            settlement: settlement.clone(),
            accepted_by,
        };
        Ok(settlement)
    }

    pub fn abandon(&mut self, by: PartyId) -> Result<()> {
        self.ensure_active("Negotiation already finalized")?;
        self.state = SessionState::Abandoned { by };
        Ok(())
    }

    pub fn reject_accept(&mut self, by: PartyId) -> Result<()> {
        self.ensure_active("Negotiation already finalized")?;
        self.state = SessionState::Rejected { by };
        Ok(())
    }

    pub fn expire(&mut self) -> Result<()> {
        self.ensure_active("Negotiation already finalized")?;
        self.state = SessionState::Expired;
        Ok(())
    }

    fn ensure_active(&self, message: &str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(NegotiatorError::InvalidStateTransition(message.to_string()));
        }
        Ok(())
    }
}
