//! The bargaining environment: `reset` and `step`

use crate::error::{NegotiatorError, Result};
use crate::types::{Party, PartyId, Role, SessionId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use super::config::EnvConfig;
use super::observation::{self, ObservationLayout};
use super::session::Session;
use super::settlement;
use super::types::{
    Action, ActionKind, Observation, Outcome, PartyMap, ResetResult, StepInfo, StepResult,
};

/// Lifecycle status of the environment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvStatus {
    /// Constructed; waiting for the first `reset()`
    Ready,
    /// An episode is active and accepts `step()` calls
    Running,
    /// The episode ended; `reset()` starts the next one
    EpisodeDone,
}

/// What a single transition decided, before observations are attached
struct Transition {
    rewards: PartyMap<f64>,
    terminated: bool,
    truncated: bool,
    outcome: Option<Outcome>,
}

impl Transition {
    fn zero(parties: &[Party]) -> Self {
        Self {
            rewards: parties.iter().map(|p| (p.id.clone(), 0.0)).collect(),
            terminated: false,
            truncated: false,
            outcome: None,
        }
    }

    fn flat(parties: &[Party], reward: f64) -> Self {
        Self {
            rewards: parties.iter().map(|p| (p.id.clone(), reward)).collect(),
            ..Self::zero(parties)
        }
    }
}

/// Multi-party bargaining environment.
///
/// Parties move strictly in turn, but every call returns a value for every
/// seated party. Single-writer: callers that need concurrency give each
/// episode its own environment.
#[derive(Clone, Debug)]
pub struct NegotiationEnv {
    config: EnvConfig,
    parties: Vec<Party>,
    rng: StdRng,
    base_seed: u64,
    episode: u64,
    session_id: SessionId,
    session: Session,
    status: EnvStatus,
}

impl NegotiationEnv {
    /// Validate `config` and build an environment waiting for `reset()`
    pub fn new(config: EnvConfig) -> Result<Self> {
        config.validate()?;

        let parties = config.parties();
        let base_seed = config.seed.unwrap_or_else(rand::random);
        let valuations = parties
            .iter()
            .map(|p| (p.id.clone(), vec![0.0; config.num_items]))
            .collect();
        let session = Session::new(&config, parties.clone(), valuations);

        Ok(Self {
            rng: StdRng::seed_from_u64(base_seed),
            parties,
            base_seed,
            episode: 0,
            session_id: SessionId::derive(base_seed, 0),
            session,
            status: EnvStatus::Ready,
            config,
        })
    }

    /// Number episodes after `offset`, so environments sharing a seed still
    /// hand out distinct session IDs
    pub fn with_episode_offset(self, offset: u64) -> Self {
        Self {
            episode: offset,
            ..self
        }
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn status(&self) -> EnvStatus {
        self.status
    }

    /// Number of the current episode, counting from the offset
    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn layout(&self) -> ObservationLayout {
        ObservationLayout::of(&self.session)
    }

    /// Start a fresh episode.
    ///
    /// A `seed` reseeds the valuation RNG, so equal seeds replay equal
    /// episodes. The first party in turn order moves first.
    #[tracing::instrument(skip(self), fields(episode = self.episode + 1))]
    pub fn reset(&mut self, seed: Option<u64>) -> ResetResult {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
            self.base_seed = seed;
        }
        self.episode += 1;
        self.session_id = SessionId::derive(self.base_seed, self.episode);

        let valuations = self.draw_valuations();
        self.session = Session::new(&self.config, self.parties.clone(), valuations);
        self.status = EnvStatus::Running;

        info!(
            session_id = %self.session_id,
            parties = self.parties.len(),
            items = self.config.num_items,
            "Episode Starting"
        );

        ResetResult {
            observations: self.observations(),
            infos: self
                .parties
                .iter()
                .map(|p| (p.id.clone(), StepInfo::default()))
                .collect(),
        }
    }

    /// Apply the current proposer's action.
    ///
    /// Actions keyed to any other party are ignored. Without an action for
    /// the proposer the call changes nothing and returns zero rewards.
    pub fn step(&mut self, actions: &PartyMap<Action>) -> Result<StepResult> {
        self.check_step_status()?;

        let proposer = self.session.current_proposer().clone();
        for id in actions.keys().filter(|id| **id != proposer.id) {
            trace!(party = %id, proposer = %proposer.id, "Ignoring action from non-proposer");
        }

        let Some(action) = actions.get(&proposer.id) else {
            debug!(proposer = %proposer.id, "No action for proposer, nothing to apply");
            let transition = Transition::zero(&self.parties);
            return Ok(self.finish(transition));
        };

        action.validate(self.config.num_items, &proposer.id)?;

        let transition = match action.kind {
            ActionKind::Accept => self.apply_accept(&proposer)?,
            ActionKind::Quit => self.apply_quit(&proposer)?,
            ActionKind::Counter => self.apply_counter(&proposer, &action.prices)?,
        };

        if transition.terminated || transition.truncated {
            self.status = EnvStatus::EpisodeDone;
            info!(
                session_id = %self.session_id,
                outcome = ?transition.outcome,
                round = self.session.round(),
                "Episode Finished"
            );
        }

        Ok(self.finish(transition))
    }

    /// Observation of every party
    pub fn observations(&self) -> PartyMap<Observation> {
        self.parties
            .iter()
            .map(|p| (p.id.clone(), observation::encode(&self.session, p)))
            .collect()
    }

    /// Observation of one party
    pub fn observe(&self, id: &PartyId) -> Result<Observation> {
        let party = self
            .session
            .party(id)
            .ok_or_else(|| NegotiatorError::PartyNotFound(id.to_string()))?;
        Ok(observation::encode(&self.session, party))
    }

    fn apply_accept(&mut self, proposer: &Party) -> Result<Transition> {
        if !self.session.has_standing_offer() {
            debug!(party = %proposer.id, "Accept with no standing offer");
            self.session.reject_accept(proposer.id.clone())?;

            let mut transition = Transition::zero(&self.parties);
            transition
                .rewards
                .insert(proposer.id.clone(), self.config.rewards.invalid_accept_penalty);
            transition.terminated = true;
            transition.outcome = Some(Outcome::InvalidAccept);
            return Ok(transition);
        }

        let deal = self.session.settle(proposer.id.clone())?;
        let rewards = settlement::settlement_rewards(&self.session, &deal, &self.config.rewards);
        debug!(party = %proposer.id, round = self.session.round(), deal = %deal, "Offer accepted");

        Ok(Transition {
            rewards,
            terminated: true,
            truncated: false,
            outcome: Some(Outcome::Deal),
        })
    }

    fn apply_quit(&mut self, proposer: &Party) -> Result<Transition> {
        debug!(party = %proposer.id, round = self.session.round(), "Party quit");
        self.session.abandon(proposer.id.clone())?;

        let mut transition = Transition::flat(&self.parties, self.config.rewards.quit_penalty);
        transition.terminated = true;
        transition.outcome = Some(Outcome::Quit);
        Ok(transition)
    }

    fn apply_counter(&mut self, proposer: &Party, prices: &[f64]) -> Result<Transition> {
        let offer = self.session.record_counter(prices)?.clone();
        debug!(party = %proposer.id, round = self.session.round(), offer = %offer, "Counter offer");

        if self.session.round_limit_reached() {
            self.session.expire()?;
            let mut transition =
                Transition::flat(&self.parties, self.config.rewards.timeout_penalty);
            transition.truncated = true;
            transition.outcome = Some(Outcome::Timeout);
            return Ok(transition);
        }

        let next = self.session.advance_turn();
        trace!(next = %next.id, "Turn passed");
        Ok(Transition::zero(&self.parties))
    }

    fn finish(&self, transition: Transition) -> StepResult {
        let settlement = self.session.deal_bundle().cloned();
        let info = StepInfo {
            result: transition.outcome,
            settlement: if transition.outcome == Some(Outcome::Deal) {
                settlement
            } else {
                None
            },
        };

        let per_party = |value: bool| -> PartyMap<bool> {
            self.parties.iter().map(|p| (p.id.clone(), value)).collect()
        };

        StepResult {
            observations: self.observations(),
            rewards: transition.rewards,
            terminated: per_party(transition.terminated),
            truncated: per_party(transition.truncated),
            infos: self
                .parties
                .iter()
                .map(|p| (p.id.clone(), info.clone()))
                .collect(),
        }
    }

    fn draw_valuations(&mut self) -> PartyMap<Vec<f64>> {
        let mut valuations: PartyMap<Vec<f64>> = match &self.config.fixed_valuations {
            Some(fixed) => fixed.clone(),
            None => {
                let num_items = self.config.num_items;
                let mut drawn = PartyMap::new();
                for party in &self.parties {
                    let range = self.config.range_for(party.role);
                    let values = (0..num_items)
                        .map(|_| self.rng.gen_range(range.low..=range.high))
                        .collect();
                    drawn.insert(party.id.clone(), values);
                }
                drawn
            }
        };

        if self.parties.len() == 2 {
            enforce_feasibility(&self.parties, &mut valuations);
        }
        valuations
    }

    fn check_step_status(&self) -> Result<()> {
        match self.status {
            EnvStatus::Running => Ok(()),
            EnvStatus::Ready => Err(NegotiatorError::InvalidStateTransition(
                "Environment is not started. Call `reset()` before stepping.".to_string(),
            )),
            EnvStatus::EpisodeDone => Err(NegotiatorError::InvalidStateTransition(
                "Episode is done. Call `reset()` before stepping.".to_string(),
            )),
        }
    }
}

/// Swap per item so the supplier's valuation never exceeds the buyer's.
/// Only applies to a one-supplier, one-buyer table.
fn enforce_feasibility(parties: &[Party], valuations: &mut PartyMap<Vec<f64>>) {
    let supplier = parties.iter().find(|p| p.role == Role::Supplier);
    let buyer = parties.iter().find(|p| p.role == Role::Buyer);
    let (Some(supplier), Some(buyer)) = (supplier, buyer) else {
        return;
    };

    let (Some(mut low), Some(mut high)) = (
        valuations.remove(&supplier.id),
        valuations.remove(&buyer.id),
    ) else {
        return;
    };

    for (s, b) in low.iter_mut().zip(high.iter_mut()) {
        if *s > *b {
            std::mem::swap(s, b);
        }
    }

    valuations.insert(supplier.id.clone(), low);
    valuations.insert(buyer.id.clone(), high);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::config::ValuationRange;
    use std::collections::{BTreeMap, HashSet};

    fn id(s: &str) -> PartyId {
        PartyId::from(s)
    }

    fn act(party: &str, action: Action) -> PartyMap<Action> {
        let mut actions = PartyMap::new();
        actions.insert(id(party), action);
        actions
    }

    fn scripted_env(max_rounds: u32) -> NegotiationEnv {
        let mut fixed = BTreeMap::new();
        fixed.insert(id("supplier"), vec![4000.0]);
        fixed.insert(id("retailer"), vec![8000.0]);
        let config = EnvConfig::default()
            .with_max_rounds(max_rounds)
            .with_fixed_valuations(fixed);
        let mut env = NegotiationEnv::new(config).unwrap();
        env.reset(None);
        env
    }

    #[test]
    fn test_reset_observation_shapes() {
        for (parties, items, lag) in [(2, 1, 3), (3, 2, 3), (5, 3, 4), (10, 4, 0)] {
            let config = EnvConfig::default()
                .with_num_parties(parties)
                .with_num_items(items)
                .with_history_lag(lag);
            let mut env = NegotiationEnv::new(config).unwrap();
            let reset = env.reset(Some(3));

            assert_eq!(reset.observations.len(), parties);
            assert_eq!(reset.infos.len(), parties);
            for obs in reset.observations.values() {
                assert_eq!(obs.len(), 2 * items + 2 + items * lag);
                assert!(obs.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn test_two_party_feasibility_after_reset() {
        let config = EnvConfig {
            supplier_range: ValuationRange::new(1000.0, 9000.0),
            buyer_range: ValuationRange::new(1000.0, 9000.0),
            ..EnvConfig::default().with_num_items(4)
        };
        let mut env = NegotiationEnv::new(config).unwrap();

        for seed in 0..50 {
            env.reset(Some(seed));
            let s = env.session().valuations(&id("supplier")).unwrap();
            let b = env.session().valuations(&id("retailer")).unwrap();
            assert!(s.iter().zip(&b).all(|(s, b)| s <= b));
        }
    }

    #[test]
    fn test_valuations_drawn_from_role_ranges() {
        let mut env = NegotiationEnv::new(EnvConfig::default().with_num_items(3)).unwrap();
        env.reset(Some(11));
        for v in env.session().valuations(&id("supplier")).unwrap() {
            assert!((4000.0..=6000.0).contains(&v));
        }
        for v in env.session().valuations(&id("retailer")).unwrap() {
            assert!((7000.0..=9000.0).contains(&v));
        }
    }

    #[test]
    fn test_equal_seeds_replay_episodes() {
        let mut a = NegotiationEnv::new(EnvConfig::default().with_num_items(2)).unwrap();
        let mut b = NegotiationEnv::new(EnvConfig::default().with_num_items(2)).unwrap();
        a.reset(Some(42));
        b.reset(Some(42));
        assert_eq!(a.session().all_valuations(), b.session().all_valuations());
        assert_eq!(a.session_id(), b.session_id());

        a.reset(None);
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_episode_offset_separates_session_ids() {
        let config = EnvConfig::default().with_seed(3);
        let mut a = NegotiationEnv::new(config.clone()).unwrap();
        let mut b = NegotiationEnv::new(config).unwrap().with_episode_offset(1);
        a.reset(Some(3));
        b.reset(Some(3));

        assert_eq!(a.session().all_valuations(), b.session().all_valuations());
        assert_eq!(b.episode(), 2);
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_reset_zeroes_state() {
        let mut env = scripted_env(10);
        env.step(&act("supplier", Action::counter(vec![6000.0]))).unwrap();
        env.reset(None);

        assert_eq!(env.session().round(), 0);
        assert_eq!(env.session().current_bundle().prices(), &[0.0]);
        assert_eq!(env.session().price_history().flatten(), vec![0.0; 3]);
        assert_eq!(env.session().current_proposer().id, id("supplier"));
        assert!(env.session().deal_bundle().is_none());
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = NegotiationEnv::new(EnvConfig::default()).unwrap();
        let result = env.step(&act("supplier", Action::counter(vec![5000.0])));
        assert!(matches!(
            result,
            Err(NegotiatorError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn test_step_mechanics_and_ignored_actions() {
        let mut env = scripted_env(10);

        let mut actions = act("supplier", Action::counter(vec![5000.0]));
        actions.insert(id("retailer"), Action::counter(vec![0.0]));
        let result = env.step(&actions).unwrap();

        assert_eq!(env.session().current_bundle().prices(), &[5000.0]);
        assert_eq!(env.session().round(), 1);
        assert_eq!(env.session().current_proposer().id, id("retailer"));
        assert!(!result.is_done());

        env.step(&act("retailer", Action::counter(vec![5500.0]))).unwrap();
        assert_eq!(env.session().current_bundle().prices(), &[5500.0]);
        assert_eq!(env.session().round(), 2);
        assert_eq!(env.session().current_proposer().id, id("supplier"));
    }

    #[test]
    fn test_missing_proposer_action_is_noop() {
        let mut env = scripted_env(10);
        let result = env.step(&act("retailer", Action::accept())).unwrap();

        assert_eq!(env.session().round(), 0);
        assert_eq!(env.session().current_proposer().id, id("supplier"));
        assert!(result.rewards.values().all(|r| *r == 0.0));
        assert!(!result.is_done());
        assert_eq!(result.observations.len(), 2);
    }

    #[test]
    fn test_malformed_action_changes_nothing() {
        let mut env = scripted_env(10);
        let err = env
            .step(&act("supplier", Action::counter(vec![5000.0, 6000.0])))
            .unwrap_err();

        assert!(matches!(err, NegotiatorError::MalformedAction { .. }));
        assert_eq!(env.session().round(), 0);
        assert_eq!(env.status(), EnvStatus::Running);
    }

    #[test]
    fn test_counter_prices_are_clamped() {
        let mut env = scripted_env(10);
        env.step(&act("supplier", Action::counter(vec![25_000.0]))).unwrap();
        assert_eq!(env.session().current_bundle().prices(), &[10_000.0]);

        env.step(&act("retailer", Action::counter(vec![-40.0]))).unwrap();
        assert_eq!(env.session().current_bundle().prices(), &[0.0]);
    }

    // Scenario A
    #[test]
    fn test_agreement_rewards() {
        let mut env = scripted_env(10);
        env.step(&act("supplier", Action::counter(vec![6000.0]))).unwrap();
        let result = env.step(&act("retailer", Action::accept())).unwrap();

        assert!(result.terminated.values().all(|t| *t));
        assert!(result.truncated.values().all(|t| !*t));
        assert_eq!(env.session().deal_bundle().unwrap().prices(), &[6000.0]);
        assert!((result.rewards[&id("supplier")] - 0.198).abs() < 1e-9);
        assert!((result.rewards[&id("retailer")] - 0.198).abs() < 1e-9);

        for info in result.infos.values() {
            assert_eq!(info.result, Some(Outcome::Deal));
            assert_eq!(info.settlement.as_ref().unwrap().prices(), &[6000.0]);
        }
        assert_eq!(env.status(), EnvStatus::EpisodeDone);
    }

    #[test]
    fn test_item_weights_scale_agreement_rewards() {
        let mut fixed = BTreeMap::new();
        fixed.insert(id("supplier"), vec![4000.0]);
        fixed.insert(id("retailer"), vec![8000.0]);
        let config = EnvConfig::default()
            .with_item_weights(vec![2.0])
            .with_fixed_valuations(fixed);
        let mut env = NegotiationEnv::new(config).unwrap();
        env.reset(None);

        env.step(&act("supplier", Action::counter(vec![6000.0]))).unwrap();
        let result = env.step(&act("retailer", Action::accept())).unwrap();

        // 2.0 * 0.2 * 0.99
        assert!((result.rewards[&id("supplier")] - 0.396).abs() < 1e-9);
        assert!((result.rewards[&id("retailer")] - 0.396).abs() < 1e-9);
    }

    #[test]
    fn test_settlement_is_final() {
        let mut env = scripted_env(10);
        env.step(&act("supplier", Action::counter(vec![6000.0]))).unwrap();
        env.step(&act("retailer", Action::accept())).unwrap();

        let after = env.step(&act("supplier", Action::counter(vec![9000.0])));
        assert!(after.is_err());
        assert_eq!(env.session().deal_bundle().unwrap().prices(), &[6000.0]);
    }

    #[test]
    fn test_later_settlement_is_worth_less() {
        let mut rewards = Vec::new();
        for counters in [1u32, 3, 5] {
            let mut env = scripted_env(20);
            let mut proposer = "supplier";
            for _ in 0..counters {
                env.step(&act(proposer, Action::counter(vec![6000.0]))).unwrap();
                proposer = if proposer == "supplier" { "retailer" } else { "supplier" };
            }
            let result = env.step(&act(proposer, Action::accept())).unwrap();
            rewards.push(result.rewards[&id("supplier")]);
        }
        assert!(rewards[0] > rewards[1]);
        assert!(rewards[1] > rewards[2]);
    }

    // Scenario B
    #[test]
    fn test_quit_penalizes_everyone() {
        for counters in [0usize, 2] {
            let mut env = scripted_env(10);
            let mut proposer = "supplier";
            for _ in 0..counters {
                env.step(&act(proposer, Action::counter(vec![6000.0]))).unwrap();
                proposer = if proposer == "supplier" { "retailer" } else { "supplier" };
            }
            let result = env.step(&act(proposer, Action::quit())).unwrap();

            assert!(result.rewards.values().all(|r| *r == -0.1));
            assert!(result.terminated.values().all(|t| *t));
            assert!(result
                .infos
                .values()
                .all(|i| i.result == Some(Outcome::Quit) && i.settlement.is_none()));
            assert!(env.session().deal_bundle().is_none());
        }
    }

    // Scenario C
    #[test]
    fn test_round_limit_truncates() {
        let mut env = scripted_env(3);

        let r = env.step(&act("supplier", Action::counter(vec![5000.0]))).unwrap();
        assert_eq!(env.session().round(), 1);
        assert!(!r.is_done());

        let r = env.step(&act("retailer", Action::counter(vec![6000.0]))).unwrap();
        assert_eq!(env.session().round(), 2);
        assert!(!r.is_done());

        let r = env.step(&act("supplier", Action::counter(vec![5500.0]))).unwrap();
        assert_eq!(env.session().round(), 3);
        assert!(r.truncated.values().all(|t| *t));
        assert!(r.terminated.values().all(|t| !*t));
        assert!(r.rewards.values().all(|v| *v == -0.05));
        assert_eq!(r.outcome(), Some(Outcome::Timeout));
        assert!(env.session().deal_bundle().is_none());
    }

    // Scenario D
    #[test]
    fn test_accept_without_offer() {
        let mut env = scripted_env(10);
        let result = env.step(&act("supplier", Action::accept())).unwrap();

        assert!(result.terminated.values().all(|t| *t));
        assert_eq!(result.rewards[&id("supplier")], -0.5);
        assert_eq!(result.rewards[&id("retailer")], 0.0);
        assert_eq!(result.outcome(), Some(Outcome::InvalidAccept));
        assert!(env.session().deal_bundle().is_none());
    }

    // Scenario E
    #[test]
    fn test_five_parties_each_propose_once() {
        let config = EnvConfig::default()
            .with_num_parties(5)
            .with_num_items(3)
            .with_max_rounds(15);
        let mut env = NegotiationEnv::new(config).unwrap();
        env.reset(Some(5));

        let mut proposers = HashSet::new();
        proposers.insert(env.session().current_proposer().id.clone());
        for _ in 0..4 {
            let proposer = env.session().current_proposer().id.clone();
            let result = env
                .step(&act(proposer.as_str(), Action::counter(vec![6000.0; 3])))
                .unwrap();
            assert!(!result.is_done());
            proposers.insert(env.session().current_proposer().id.clone());
        }
        assert_eq!(proposers.len(), 5);

        // The fifth counter hands the turn back to the first seat
        let last = env.session().current_proposer().id.clone();
        env.step(&act(last.as_str(), Action::counter(vec![6000.0; 3])))
            .unwrap();
        assert_eq!(env.session().current_proposer().id, env.parties()[0].id);
    }

    #[test]
    fn test_round_robin_cycles_through_turn_order() {
        let mut env = NegotiationEnv::new(EnvConfig::default().with_num_parties(3)).unwrap();
        env.reset(Some(1));
        let order: Vec<PartyId> = env.parties().iter().map(|p| p.id.clone()).collect();

        for step in 0..6 {
            let expected = &order[step % order.len()];
            assert_eq!(&env.session().current_proposer().id, expected);
            env.step(&act(expected.as_str(), Action::counter(vec![6500.0])))
                .unwrap();
        }
    }

    #[test]
    fn test_turn_indicator_follows_proposer() {
        let mut env = scripted_env(10);
        let layout = env.layout();
        let result = env.step(&act("supplier", Action::counter(vec![6000.0]))).unwrap();

        assert!(layout.is_my_turn(&result.observations[&id("retailer")]));
        assert!(!layout.is_my_turn(&result.observations[&id("supplier")]));
        assert_eq!(layout.elapsed(&result.observations[&id("supplier")]), 0.1);
    }

    #[test]
    fn test_multi_party_settlement_uses_each_role() {
        let parties = vec![
            Party::supplier("s"),
            Party::buyer("b1"),
            Party::buyer("b2"),
        ];
        let mut fixed = BTreeMap::new();
        fixed.insert(id("s"), vec![4000.0]);
        fixed.insert(id("b1"), vec![8000.0]);
        fixed.insert(id("b2"), vec![7000.0]);
        let config = EnvConfig::default()
            .with_party_roles(parties)
            .with_fixed_valuations(fixed);
        let mut env = NegotiationEnv::new(config).unwrap();
        env.reset(None);

        env.step(&act("s", Action::counter(vec![6000.0]))).unwrap();
        let result = env.step(&act("b1", Action::accept())).unwrap();

        let d = 0.99;
        assert!((result.rewards[&id("s")] - 0.2 * d).abs() < 1e-9);
        assert!((result.rewards[&id("b1")] - 0.2 * d).abs() < 1e-9);
        assert!((result.rewards[&id("b2")] - 0.1 * d).abs() < 1e-9);
    }

    #[test]
    fn test_observe_unknown_party() {
        let env = scripted_env(10);
        assert!(matches!(
            env.observe(&id("stranger")),
            Err(NegotiatorError::PartyNotFound(_))
        ));
        assert!(env.observe(&id("retailer")).is_ok());
    }
}
