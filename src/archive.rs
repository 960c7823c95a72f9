//! Append-only store of finished episodes

use crate::arena::EpisodeRecord;
use crate::error::{NegotiatorError, Result};
use crate::negotiation::Outcome;
use crate::types::SessionId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Listing entry for one archived episode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub parties: usize,
    pub outcome: Outcome,
    pub rounds: u32,
}

impl From<&EpisodeRecord> for SessionSummary {
    fn from(record: &EpisodeRecord) -> Self {
        Self {
            session_id: record.session_id.clone(),
            parties: record.parties.len(),
            outcome: record.outcome,
            rounds: record.rounds,
        }
    }
}

/// Shared archive; clones refer to the same store
#[derive(Clone, Default)]
pub struct SessionArchive {
    records: Arc<Mutex<Vec<EpisodeRecord>>>,
}

impl SessionArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: EpisodeRecord) {
        tracing::debug!(session_id = %record.session_id, "Archiving episode");
        self.records.lock().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Summaries in archival order
    pub async fn list(&self) -> Vec<SessionSummary> {
        self.records
            .lock()
            .await
            .iter()
            .map(SessionSummary::from)
            .collect()
    }

    pub async fn get(&self, id: &SessionId) -> Result<EpisodeRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| &r.session_id == id)
            .cloned()
            .ok_or_else(|| NegotiatorError::SessionNotFound(id.to_string()))
    }

    /// Write every record as a pretty-printed JSON array
    pub async fn export_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let records = self.records.lock().await.clone();
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(path.as_ref(), json).await?;
        tracing::info!(
            path = %path.as_ref().display(),
            sessions = records.len(),
            "Archive exported"
        );
        Ok(records.len())
    }
}
