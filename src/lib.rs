//! Equilibrium: a multi-party, multi-item bargaining environment.
//!
//! Suppliers and buyers with private valuations take turns proposing a
//! price for a whole bundle of items. The proposer may ACCEPT the standing
//! offer, COUNTER with a new one, or QUIT. Settlements pay each party its
//! normalized, round-discounted surplus.
//!
//! Around the environment sit the pieces that drive and record it:
//! - [`strategy`]: decision-makers mapping observations to actions
//! - [`narrator`]: natural-language justifications of counter offers
//! - [`arena`]: plays whole episodes and produces turn logs
//! - [`archive`] / [`tracking`]: in-memory session store and run logs
//! - [`server`]: JSON-lines TCP server streaming live negotiations

pub mod archive;
pub mod arena;
pub mod cli;
pub mod error;
pub mod narrator;
pub mod negotiation;
pub mod rollout;
pub mod server;
pub mod strategy;
pub mod tracking;
pub mod types;

// Re-export commonly used types
pub use error::{NegotiatorError, Result};
pub use negotiation::{
    Action, ActionKind, EnvConfig, NegotiationEnv, Observation, Outcome, PartyMap, StepResult,
};
pub use types::{Bundle, Party, PartyId, Role, SessionId};
