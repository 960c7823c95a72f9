//! Multi-party bargaining environment

pub mod config;
pub mod env;
pub mod history;
pub mod observation;
pub mod session;
pub mod settlement;
pub mod types;

pub use config::{EnvConfig, RewardConfig, ValuationRange};
pub use env::{EnvStatus, NegotiationEnv};
pub use history::PriceHistory;
pub use observation::ObservationLayout;
pub use session::{Session, SessionState};
pub use types::{
    Action, ActionKind, Observation, Outcome, PartyMap, ResetResult, StepInfo, StepResult,
};
