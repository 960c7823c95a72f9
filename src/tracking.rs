//! Experiment tracking.
//!
//! Runs are opened explicitly from a tracker, written as JSON lines under
//! `<root>/<experiment>/<run>.jsonl`, and closed explicitly. Nothing here is
//! process-global; independent runs can be open at the same time.

use crate::error::{NegotiatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One line of a run file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunRecord {
    Opened {
        experiment: String,
        run: String,
        timestamp: u64,
    },
    Params {
        params: serde_json::Value,
    },
    Metrics {
        step: u64,
        metrics: BTreeMap<String, f64>,
    },
    Closed {
        timestamp: u64,
        metric_records: u64,
    },
}

/// What a closed run wrote
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub run: String,
    pub path: PathBuf,
    pub metric_records: u64,
}

/// Opens runs of one experiment
#[derive(Clone, Debug)]
pub struct ExperimentTracker {
    root: PathBuf,
    experiment: String,
}

impl ExperimentTracker {
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            experiment: experiment.into(),
        }
    }

    pub fn experiment_dir(&self) -> PathBuf {
        self.root.join(&self.experiment)
    }

    /// Open a run; without a name one is generated from the clock
    pub fn start_run(&self, name: Option<&str>) -> Result<ExperimentRun> {
        let run = match name {
            Some(name) => name.to_string(),
            None => format!("run_{}_{:04x}", unix_seconds(), rand::random::<u16>()),
        };

        let dir = self.experiment_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{run}.jsonl"));
        let file = File::create(&path)?;

        let mut handle = ExperimentRun {
            run,
            path,
            writer: Some(BufWriter::new(file)),
            metric_records: 0,
        };
        handle.write(&RunRecord::Opened {
            experiment: self.experiment.clone(),
            run: handle.run.clone(),
            timestamp: unix_seconds(),
        })?;

        tracing::info!(experiment = %self.experiment, run = %handle.run, "Run opened");
        Ok(handle)
    }
}

/// An open run
#[derive(Debug)]
pub struct ExperimentRun {
    run: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    metric_records: u64,
}

impl ExperimentRun {
    pub fn name(&self) -> &str {
        &self.run
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn log_params<P: Serialize>(&mut self, params: &P) -> Result<()> {
        let params = serde_json::to_value(params)?;
        self.write(&RunRecord::Params { params })
    }

    pub fn log_metrics(&mut self, step: u64, metrics: BTreeMap<String, f64>) -> Result<()> {
        self.write(&RunRecord::Metrics { step, metrics })?;
        self.metric_records += 1;
        Ok(())
    }

    /// Write the closing record and release the file
    pub fn close(&mut self) -> Result<RunSummary> {
        self.write(&RunRecord::Closed {
            timestamp: unix_seconds(),
            metric_records: self.metric_records,
        })?;
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        tracing::info!(run = %self.run, metric_records = self.metric_records, "Run closed");
        Ok(RunSummary {
            run: self.run.clone(),
            path: self.path.clone(),
            metric_records: self.metric_records,
        })
    }

    fn write(&mut self, record: &RunRecord) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| NegotiatorError::RunClosed(self.run.clone()))?;
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl Drop for ExperimentRun {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            tracing::warn!(run = %self.run, "Run dropped without close");
            let _ = writer.flush();
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Read every record of a run file
pub fn read_run(path: impl AsRef<Path>) -> Result<Vec<RunRecord>> {
    let raw = fs::read_to_string(path)?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(NegotiatorError::from))
        .collect()
}
