//! Episode orchestration: strategies pick actions, the narrator justifies
//! counters, the environment settles the outcome.

use crate::error::{NegotiatorError, Result};
use crate::narrator::{build_prompt, NarrationRequest, Narrator, Persona};
use crate::negotiation::{
    Action, ActionKind, NegotiationEnv, Outcome, PartyMap, StepResult,
};
use crate::strategy::{Strategy, StrategyKind};
use crate::types::{Bundle, Party, PartyId, Role, SessionId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// A seated decision-maker and the voice it speaks with
pub struct Contestant {
    pub strategy: Box<dyn Strategy>,
    pub persona: Persona,
}

impl Contestant {
    pub fn new(strategy: Box<dyn Strategy>, persona: Persona) -> Self {
        Self { strategy, persona }
    }
}

/// One step of an episode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Round at which the action was taken
    pub round: u32,
    pub proposer: PartyId,
    pub kind: ActionKind,
    /// Offer put on the table, after clamping; COUNTER only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices: Option<Bundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub rewards: PartyMap<f64>,
}

/// Complete log of a finished episode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub session_id: SessionId,
    pub parties: Vec<Party>,
    pub valuations: PartyMap<Vec<f64>>,
    pub turns: Vec<TurnRecord>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Bundle>,
    pub rounds: u32,
    pub final_rewards: PartyMap<f64>,
}

impl EpisodeRecord {
    pub fn is_deal(&self) -> bool {
        self.outcome == Outcome::Deal
    }

    /// Mean final reward of the parties holding `role`
    pub fn mean_reward(&self, role: Role) -> Option<f64> {
        let rewards: Vec<f64> = self
            .parties
            .iter()
            .filter(|p| p.role == role)
            .filter_map(|p| self.final_rewards.get(&p.id).copied())
            .collect();
        if rewards.is_empty() {
            return None;
        }
        Some(rewards.iter().sum::<f64>() / rewards.len() as f64)
    }
}

/// Progress notifications for spectators
#[derive(Clone, Debug)]
pub enum ArenaEvent {
    Started {
        session_id: SessionId,
        parties: Vec<Party>,
        valuations: PartyMap<Vec<f64>>,
    },
    Turn(TurnRecord),
    Finished(EpisodeRecord),
}

/// Drives episodes of one environment with seated contestants
pub struct Arena<N: Narrator> {
    env: NegotiationEnv,
    narrator: N,
    contestants: PartyMap<Contestant>,
    events: Option<mpsc::UnboundedSender<ArenaEvent>>,
}

impl<N: Narrator> Arena<N> {
    pub fn new(env: NegotiationEnv, narrator: N) -> Self {
        Self {
            env,
            narrator,
            contestants: PartyMap::new(),
            events: None,
        }
    }

    /// Stream events of every episode to `events`
    pub fn with_events(self, events: mpsc::UnboundedSender<ArenaEvent>) -> Self {
        Self {
            events: Some(events),
            ..self
        }
    }

    pub fn env(&self) -> &NegotiationEnv {
        &self.env
    }

    /// Seat a contestant for one party
    pub fn seat(&mut self, id: &PartyId, contestant: Contestant) -> Result<()> {
        if self.env.session().party(id).is_none() {
            return Err(NegotiatorError::PartyNotFound(id.to_string()));
        }
        self.contestants.insert(id.clone(), contestant);
        Ok(())
    }

    /// Seat `kind` for every party. Suppliers speak aggressively and buyers
    /// cooperatively; each strategy gets its own seed.
    pub fn seat_all(&mut self, kind: StrategyKind, seed: u64) {
        for (index, party) in self.env.parties().iter().enumerate() {
            let persona = match party.role {
                Role::Supplier => Persona::Aggressive,
                Role::Buyer => Persona::Cooperative,
            };
            let strategy = kind.build(party, seed.wrapping_add(index as u64));
            self.contestants
                .insert(party.id.clone(), Contestant::new(strategy, persona));
        }
    }

    /// Play one episode to the end
    pub async fn run_episode(&mut self, seed: Option<u64>) -> Result<EpisodeRecord> {
        if let Some(missing) = self
            .env
            .parties()
            .iter()
            .find(|p| !self.contestants.contains_key(&p.id))
        {
            return Err(NegotiatorError::Configuration(format!(
                "no contestant seated for {}",
                missing.id
            )));
        }

        let mut observations = self.env.reset(seed).observations;
        for contestant in self.contestants.values_mut() {
            contestant.strategy.reset();
        }

        let session_id = self.env.session_id().clone();
        let parties = self.env.parties().to_vec();
        let valuations = self.env.session().all_valuations();
        let layout = self.env.layout();
        let max_price = self.env.config().max_price;

        self.emit(ArenaEvent::Started {
            session_id: session_id.clone(),
            parties: parties.clone(),
            valuations: valuations.clone(),
        });

        let mut transcripts: PartyMap<Vec<String>> =
            parties.iter().map(|p| (p.id.clone(), Vec::new())).collect();
        let mut turns = Vec::new();

        loop {
            let proposer = self.env.session().current_proposer().clone();
            let round = self.env.session().round();
            let obs = observations
                .get(&proposer.id)
                .ok_or_else(|| NegotiatorError::PartyNotFound(proposer.id.to_string()))?;
            let contestant = self
                .contestants
                .get_mut(&proposer.id)
                .ok_or_else(|| NegotiatorError::PartyNotFound(proposer.id.to_string()))?;

            let action = contestant.strategy.act(obs, &layout);
            let persona = contestant.persona;

            let (prices, message) = if action.kind == ActionKind::Counter {
                let offer = Bundle::clipped(&action.prices, max_price);
                let request = NarrationRequest {
                    party: proposer.id.clone(),
                    role: proposer.role,
                    persona,
                    prices: offer.clone(),
                    history: transcripts.get(&proposer.id).cloned().unwrap_or_default(),
                };
                trace!(party = %proposer.id, prompt = %build_prompt(&request), "Narration prompt");
                let message = self.narrator.justify(request).await?;
                (Some(offer), Some(message))
            } else {
                (None, None)
            };

            let result = self.step_for(&proposer.id, action.clone())?;

            if let Some(offer) = &prices {
                record_offer(&mut transcripts, &proposer.id, offer);
            }

            let turn = TurnRecord {
                round,
                proposer: proposer.id.clone(),
                kind: action.kind,
                prices,
                message,
                rewards: result.rewards.clone(),
            };
            debug!(party = %turn.proposer, kind = %turn.kind, round, "Turn played");
            self.emit(ArenaEvent::Turn(turn.clone()));
            turns.push(turn);

            if result.is_done() {
                let outcome = result.outcome().ok_or_else(|| {
                    NegotiatorError::Internal("episode ended without an outcome".to_string())
                })?;
                let record = EpisodeRecord {
                    session_id,
                    parties,
                    valuations,
                    turns,
                    outcome,
                    settlement: result.settlement().cloned(),
                    rounds: self.env.session().round(),
                    final_rewards: result.rewards,
                };
                info!(
                    session_id = %record.session_id,
                    outcome = %record.outcome,
                    rounds = record.rounds,
                    "Arena episode complete"
                );
                self.emit(ArenaEvent::Finished(record.clone()));
                return Ok(record);
            }

            observations = result.observations;
        }
    }

    fn step_for(&mut self, id: &PartyId, action: Action) -> Result<StepResult> {
        let mut actions = PartyMap::new();
        actions.insert(id.clone(), action);
        self.env.step(&actions)
    }

    fn emit(&self, event: ArenaEvent) {
        if let Some(events) = &self.events {
            // Spectators may leave at any time
            let _ = events.send(event);
        }
    }
}

/// Own offers read "$p", everyone else's "Opponent: $p"
fn record_offer(transcripts: &mut PartyMap<Vec<String>>, proposer: &PartyId, offer: &Bundle) {
    for (id, lines) in transcripts.iter_mut() {
        if id == proposer {
            lines.push(offer.to_string());
        } else {
            lines.push(format!("Opponent: {offer}"));
        }
    }
}
