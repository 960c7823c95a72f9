//! Application layer behind the CLI commands

use crate::archive::SessionArchive;
use crate::arena::{Arena, EpisodeRecord};
use crate::error::Result;
use crate::narrator::TemplateNarrator;
use crate::negotiation::{ActionKind, EnvConfig, NegotiationEnv};
use crate::rollout::{rollout, RolloutStats};
use crate::server::SessionServer;
use crate::strategy::StrategyKind;
use crate::tracking::{ExperimentTracker, RunSummary};
use crate::types::Bundle;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::commands::TableArgs;

/// Resolved configuration shared by every command
#[derive(Clone, Debug)]
pub struct EquilibriumApp {
    config: EnvConfig,
}

impl EquilibriumApp {
    /// Load the configuration file, if any, and apply command-line overrides
    pub fn new(config_path: Option<&Path>, table: &TableArgs) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                EnvConfig::from_json_file(path)?
            }
            None => EnvConfig::default(),
        };

        if let Some(parties) = table.parties {
            config.num_parties = parties;
            config.party_roles = None;
            config.fixed_valuations = None;
        }
        if let Some(items) = table.items {
            config.num_items = items;
        }
        if let Some(rounds) = table.rounds {
            config.max_rounds = rounds;
        }
        if let Some(seed) = table.seed {
            config.seed = Some(seed);
        }

        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    fn arena(
        &self,
        strategy: StrategyKind,
        narrator: TemplateNarrator,
    ) -> Result<Arena<TemplateNarrator>> {
        let env = NegotiationEnv::new(self.config.clone())?;
        let mut arena = Arena::new(env, narrator);
        arena.seat_all(strategy, self.config.seed.unwrap_or_else(rand::random));
        Ok(arena)
    }

    /// Play and print one episode
    pub async fn demo(&self, strategy: StrategyKind, latency_ms: u64) -> Result<EpisodeRecord> {
        let narrator = TemplateNarrator::new().with_latency(Duration::from_millis(latency_ms));
        let mut arena = self.arena(strategy, narrator)?;
        let record = arena.run_episode(None).await?;

        print!("{}", render_transcript(&record));
        Ok(record)
    }

    /// Play `episodes` episodes into a tracked run
    pub async fn simulate(
        &self,
        strategy: StrategyKind,
        episodes: usize,
        tracking_dir: PathBuf,
        experiment: &str,
        run_name: Option<&str>,
        export: Option<&Path>,
    ) -> Result<(RolloutStats, RunSummary)> {
        let tracker = ExperimentTracker::new(tracking_dir, experiment);
        let mut run = tracker.start_run(run_name)?;
        run.log_params(&self.config)?;

        let archive = SessionArchive::new();
        let mut arena = self.arena(strategy, TemplateNarrator::new())?;
        let stats = rollout(&mut arena, episodes, Some(&mut run), Some(&archive)).await?;
        let summary = run.close()?;

        if let Some(path) = export {
            archive.export_json(path).await?;
        }

        println!(
            "{} episodes: {} deals, {} quits, {} timeouts, {} invalid accepts, mean rounds {:.2}",
            stats.episodes,
            stats.deals,
            stats.quits,
            stats.timeouts,
            stats.invalid_accepts,
            stats.mean_rounds
        );
        println!("Run written to {}", summary.path.display());
        Ok((stats, summary))
    }

    /// Serve negotiations until the process is stopped
    pub async fn serve(&self, host: &str, port: u16, latency_ms: u64) -> Result<()> {
        let narrator = TemplateNarrator::new().with_latency(Duration::from_millis(latency_ms));
        let server = SessionServer::bind(&format!("{}:{}", host, port), self.config.clone())
            .await?
            .with_narrator(narrator);
        server.run().await
    }
}

/// Human-readable transcript of an episode
pub fn render_transcript(record: &EpisodeRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("Session {}\n", record.session_id));
    for party in &record.parties {
        let valuations = record
            .valuations
            .get(&party.id)
            .map(|v| Bundle(v.clone()).to_string())
            .unwrap_or_default();
        out.push_str(&format!("  {} ({}) values {}\n", party.id, party.role, valuations));
    }

    for turn in &record.turns {
        match (turn.kind, &turn.prices) {
            (ActionKind::Counter, Some(prices)) => {
                out.push_str(&format!(
                    "[round {}] {} proposes {}\n",
                    turn.round + 1,
                    turn.proposer,
                    prices
                ));
                if let Some(message) = &turn.message {
                    out.push_str(&format!("    \"{}\"\n", message));
                }
            }
            (kind, _) => {
                out.push_str(&format!("[round {}] {} {}\n", turn.round + 1, turn.proposer, kind));
            }
        }
    }

    match &record.settlement {
        Some(settlement) => out.push_str(&format!("Deal at {}\n", settlement)),
        None => out.push_str(&format!("No deal ({})\n", record.outcome)),
    }
    for (party, reward) in &record.final_rewards {
        out.push_str(&format!("  {}: {:+.4}\n", party, reward));
    }
    out
}
