//! Wire messages of the session server, one JSON object per line

use crate::archive::SessionSummary;
use crate::arena::{ArenaEvent, EpisodeRecord, TurnRecord};
use crate::negotiation::{EnvConfig, Outcome, PartyMap};
use crate::strategy::StrategyKind;
use crate::types::{Bundle, Party, SessionId};
use serde::{Deserialize, Serialize};

/// Client to server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Play one episode and stream it back
    Negotiate {
        /// Overrides the server defaults entirely
        #[serde(default)]
        config: Option<EnvConfig>,
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default)]
        strategy: StrategyKind,
    },
    ListSessions,
    GetSession {
        id: SessionId,
    },
}

/// Server to client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Init {
        session_id: SessionId,
        parties: Vec<Party>,
        valuations: PartyMap<Vec<f64>>,
    },
    Turn(TurnRecord),
    End {
        session_id: SessionId,
        outcome: Outcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        settlement: Option<Bundle>,
        rounds: u32,
        final_rewards: PartyMap<f64>,
    },
    Sessions {
        sessions: Vec<SessionSummary>,
    },
    Session(EpisodeRecord),
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, ServerMessage::End { .. })
    }
}

impl From<ArenaEvent> for ServerMessage {
    fn from(event: ArenaEvent) -> Self {
        match event {
            ArenaEvent::Started {
                session_id,
                parties,
                valuations,
            } => ServerMessage::Init {
                session_id,
                parties,
                valuations,
            },
            ArenaEvent::Turn(turn) => ServerMessage::Turn(turn),
            ArenaEvent::Finished(record) => ServerMessage::End {
                session_id: record.session_id,
                outcome: record.outcome,
                settlement: record.settlement,
                rounds: record.rounds,
                final_rewards: record.final_rewards,
            },
        }
    }
}
