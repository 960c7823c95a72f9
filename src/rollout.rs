//! Batch episodes and aggregate their outcomes

use crate::archive::SessionArchive;
use crate::arena::{Arena, EpisodeRecord};
use crate::error::Result;
use crate::narrator::Narrator;
use crate::negotiation::Outcome;
use crate::tracking::ExperimentRun;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate outcome counts over a batch
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RolloutStats {
    pub episodes: usize,
    pub deals: usize,
    pub quits: usize,
    pub timeouts: usize,
    pub invalid_accepts: usize,
    pub mean_rounds: f64,
    pub mean_supplier_reward: Option<f64>,
    pub mean_buyer_reward: Option<f64>,
}

impl RolloutStats {
    pub fn deal_rate(&self) -> f64 {
        if self.episodes == 0 {
            return 0.0;
        }
        self.deals as f64 / self.episodes as f64
    }

    pub fn as_metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("episodes".to_string(), self.episodes as f64);
        metrics.insert("deal_rate".to_string(), self.deal_rate());
        metrics.insert("mean_rounds".to_string(), self.mean_rounds);
        if let Some(r) = self.mean_supplier_reward {
            metrics.insert("mean_supplier_reward".to_string(), r);
        }
        if let Some(r) = self.mean_buyer_reward {
            metrics.insert("mean_buyer_reward".to_string(), r);
        }
        metrics
    }
}

#[derive(Default)]
struct Accumulator {
    stats: RolloutStats,
    rounds: u64,
    supplier: (f64, usize),
    buyer: (f64, usize),
}

impl Accumulator {
    fn add(&mut self, record: &EpisodeRecord) {
        self.stats.episodes += 1;
        match record.outcome {
            Outcome::Deal => self.stats.deals += 1,
            Outcome::Quit => self.stats.quits += 1,
            Outcome::Timeout => self.stats.timeouts += 1,
            Outcome::InvalidAccept => self.stats.invalid_accepts += 1,
        }
        self.rounds += u64::from(record.rounds);

        if let Some(r) = record.mean_reward(Role::Supplier) {
            self.supplier.0 += r;
            self.supplier.1 += 1;
        }
        if let Some(r) = record.mean_reward(Role::Buyer) {
            self.buyer.0 += r;
            self.buyer.1 += 1;
        }
    }

    fn finish(mut self) -> RolloutStats {
        let mean = |(sum, n): (f64, usize)| (n > 0).then(|| sum / n as f64);
        if self.stats.episodes > 0 {
            self.stats.mean_rounds = self.rounds as f64 / self.stats.episodes as f64;
        }
        self.stats.mean_supplier_reward = mean(self.supplier);
        self.stats.mean_buyer_reward = mean(self.buyer);
        self.stats
    }
}

/// Per-episode metrics written to a run
fn episode_metrics(record: &EpisodeRecord) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    metrics.insert("rounds".to_string(), f64::from(record.rounds));
    metrics.insert("deal".to_string(), if record.is_deal() { 1.0 } else { 0.0 });
    for (party, reward) in &record.final_rewards {
        metrics.insert(format!("reward/{party}"), *reward);
    }
    metrics
}

/// Play `episodes` episodes through `arena`.
///
/// Each finished episode is logged to `run` (one metrics record per episode,
/// plus a final summary record) and appended to `archive` when given.
pub async fn rollout<N: Narrator>(
    arena: &mut Arena<N>,
    episodes: usize,
    mut run: Option<&mut ExperimentRun>,
    archive: Option<&SessionArchive>,
) -> Result<RolloutStats> {
    let mut acc = Accumulator::default();

    for episode in 0..episodes {
        let record = arena.run_episode(None).await?;
        acc.add(&record);

        if let Some(run) = run.as_deref_mut() {
            run.log_metrics(episode as u64, episode_metrics(&record))?;
        }
        if let Some(archive) = archive {
            archive.append(record).await;
        }
    }

    let stats = acc.finish();
    if let Some(run) = run.as_deref_mut() {
        run.log_metrics(episodes as u64, stats.as_metrics())?;
    }

    tracing::info!(
        episodes = stats.episodes,
        deals = stats.deals,
        mean_rounds = stats.mean_rounds,
        "Rollout complete"
    );
    Ok(stats)
}
