//! TCP session server.
//!
//! Each connection is served by its own task and every negotiation it asks
//! for runs in a fresh environment, so sessions never share state. Messages
//! are framed as JSON lines.

use crate::archive::SessionArchive;
use crate::arena::Arena;
use crate::error::{NegotiatorError, Result};
use crate::narrator::TemplateNarrator;
use crate::negotiation::{EnvConfig, NegotiationEnv};
use crate::strategy::StrategyKind;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};

use super::message::{ClientRequest, ServerMessage};

/// Longest accepted request line
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Serves negotiations over TCP
pub struct SessionServer {
    listener: TcpListener,
    defaults: EnvConfig,
    narrator: TemplateNarrator,
    archive: SessionArchive,
    negotiations: Arc<AtomicU64>,
}

impl SessionServer {
    /// Bind to `addr`; `defaults` configures negotiations that send no config
    pub async fn bind(addr: &str, defaults: EnvConfig) -> Result<Self> {
        defaults.validate()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| NegotiatorError::NetworkConnection(e.to_string()))?;

        Ok(Self {
            listener,
            defaults,
            narrator: TemplateNarrator::new(),
            archive: SessionArchive::new(),
            negotiations: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn with_narrator(self, narrator: TemplateNarrator) -> Self {
        Self { narrator, ..self }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle onto the archive every finished episode lands in
    pub fn archive(&self) -> SessionArchive {
        self.archive.clone()
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> Result<()> {
        tracing::info!("Session server listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    tracing::info!("New connection from {}", addr);
                    let connection = Connection {
                        defaults: self.defaults.clone(),
                        narrator: self.narrator.clone(),
                        archive: self.archive.clone(),
                        negotiations: self.negotiations.clone(),
                    };

                    tokio::spawn(async move {
                        if let Err(e) = connection.serve(stream).await {
                            tracing::debug!("Connection {} ended: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// State one connection task owns
struct Connection {
    defaults: EnvConfig,
    narrator: TemplateNarrator,
    archive: SessionArchive,
    /// Server-wide count of negotiations, used as each one's episode offset
    negotiations: Arc<AtomicU64>,
}

type Transport = Framed<TcpStream, LinesCodec>;

impl Connection {
    async fn serve(self, stream: TcpStream) -> Result<()> {
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

        while let Some(line) = framed.next().await {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: ClientRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    let error = NegotiatorError::InvalidRequest(e.to_string());
                    tracing::warn!("Rejecting request: {}", error);
                    send(&mut framed, &ServerMessage::error(error.to_string())).await?;
                    continue;
                }
            };

            match request {
                ClientRequest::Negotiate {
                    config,
                    seed,
                    strategy,
                } => {
                    let config = config.unwrap_or_else(|| self.defaults.clone());
                    if let Err(e) = self.negotiate(&mut framed, config, seed, strategy).await {
                        tracing::warn!("Negotiation failed: {}", e);
                        send(&mut framed, &ServerMessage::error(e.to_string())).await?;
                    }
                }
                ClientRequest::ListSessions => {
                    let sessions = self.archive.list().await;
                    send(&mut framed, &ServerMessage::Sessions { sessions }).await?;
                }
                ClientRequest::GetSession { id } => {
                    let reply = match self.archive.get(&id).await {
                        Ok(record) => ServerMessage::Session(record),
                        Err(e) => ServerMessage::error(e.to_string()),
                    };
                    send(&mut framed, &reply).await?;
                }
            }
        }

        Ok(())
    }

    /// Play one episode, streaming its events as they happen
    async fn negotiate(
        &self,
        framed: &mut Transport,
        config: EnvConfig,
        seed: Option<u64>,
        strategy: StrategyKind,
    ) -> Result<()> {
        let offset = self.negotiations.fetch_add(1, Ordering::Relaxed);
        let env = NegotiationEnv::new(config)?.with_episode_offset(offset);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut arena = Arena::new(env, self.narrator.clone()).with_events(tx);
        arena.seat_all(strategy, seed.unwrap_or_else(rand::random));

        let episode = tokio::spawn(async move { arena.run_episode(seed).await });

        // The sender lives inside the arena, so the stream ends with the task.
        // A client that goes away stops the forwarding, not the episode.
        let mut forwarded = Ok(());
        while let Some(event) = rx.recv().await {
            if forwarded.is_ok() {
                forwarded = send(framed, &ServerMessage::from(event)).await;
            }
        }

        let record = episode
            .await
            .map_err(|e| NegotiatorError::Internal(e.to_string()))??;
        self.archive.append(record).await;
        forwarded
    }
}

async fn send(framed: &mut Transport, message: &ServerMessage) -> Result<()> {
    let line = serde_json::to_string(message)?;
    framed
        .send(line)
        .await
        .map_err(|e| NegotiatorError::MessageRouting(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::Outcome;
    use crate::types::SessionId;

    async fn start() -> (SocketAddr, SessionArchive) {
        let server = SessionServer::bind("127.0.0.1:0", EnvConfig::default().with_max_rounds(10))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let archive = server.archive();
        tokio::spawn(server.run());
        (addr, archive)
    }

    async fn connect(addr: SocketAddr) -> Transport {
        let stream = TcpStream::connect(addr).await.unwrap();
        Framed::new(stream, LinesCodec::new())
    }

    async fn request(framed: &mut Transport, json: &str) -> ServerMessage {
        framed.send(json.to_string()).await.unwrap();
        receive(framed).await
    }

    async fn receive(framed: &mut Transport) -> ServerMessage {
        let line = framed.next().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_negotiation_is_streamed_and_archived() {
        let (addr, archive) = start().await;
        let mut client = connect(addr).await;

        let first = request(&mut client, r#"{"type":"negotiate","seed":3}"#).await;
        let session_id = match first {
            ServerMessage::Init {
                session_id,
                parties,
                ..
            } => {
                assert_eq!(parties.len(), 2);
                session_id
            }
            other => panic!("expected init, got {:?}", other),
        };

        let mut turns = 0;
        loop {
            match receive(&mut client).await {
                ServerMessage::Turn(_) => turns += 1,
                ServerMessage::End {
                    session_id: ended,
                    rounds,
                    ..
                } => {
                    assert_eq!(ended, session_id);
                    assert!(rounds <= 10);
                    break;
                }
                other => panic!("unexpected message {:?}", other),
            }
        }
        assert!(turns > 0);

        match request(&mut client, r#"{"type":"list_sessions"}"#).await {
            ServerMessage::Sessions { sessions } => {
                assert_eq!(sessions.len(), 1);
                assert_eq!(sessions[0].session_id, session_id);
            }
            other => panic!("expected sessions, got {:?}", other),
        }

        let get = format!(r#"{{"type":"get_session","id":"{}"}}"#, session_id);
        match request(&mut client, &get).await {
            ServerMessage::Session(record) => assert_eq!(record.turns.len(), turns),
            other => panic!("expected session, got {:?}", other),
        }
        assert_eq!(archive.len().await, 1);
    }

    #[tokio::test]
    async fn test_bad_requests_get_errors() {
        let (addr, _) = start().await;
        let mut client = connect(addr).await;

        assert!(matches!(
            request(&mut client, "not json").await,
            ServerMessage::Error { .. }
        ));
        assert!(matches!(
            request(&mut client, r#"{"type":"get_session","id":"session_missing"}"#).await,
            ServerMessage::Error { .. }
        ));
        assert!(matches!(
            request(&mut client, r#"{"type":"negotiate","config":{"num_items":0}}"#).await,
            ServerMessage::Error { .. }
        ));

        // The connection survives errors
        match request(
            &mut client,
            r#"{"type":"negotiate","config":{"max_rounds":1},"strategy":"concession"}"#,
        )
        .await
        {
            ServerMessage::Init { .. } => {}
            other => panic!("expected init, got {:?}", other),
        }
        let _turn = receive(&mut client).await;
        match receive(&mut client).await {
            ServerMessage::End { outcome, .. } => assert_eq!(outcome, Outcome::Timeout),
            other => panic!("expected end, got {:?}", other),
        }
    }

    async fn wait_for_archive(archive: &SessionArchive, expected: usize) {
        for _ in 0..50 {
            if archive.len().await == expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    async fn play(framed: &mut Transport, json: &str) -> (SessionId, usize) {
        let session_id = match request(framed, json).await {
            ServerMessage::Init { session_id, .. } => session_id,
            other => panic!("expected init, got {:?}", other),
        };
        let mut turns = 0;
        loop {
            match receive(framed).await {
                ServerMessage::Turn(_) => turns += 1,
                ServerMessage::End { .. } => return (session_id, turns),
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_same_seed_negotiations_archived_apart() {
        let (addr, archive) = start().await;
        let mut client = connect(addr).await;

        let (first, first_turns) = play(
            &mut client,
            r#"{"type":"negotiate","seed":3,"strategy":"concession"}"#,
        )
        .await;
        let (second, second_turns) =
            play(&mut client, r#"{"type":"negotiate","seed":3,"strategy":"random"}"#).await;
        assert_ne!(first, second);

        wait_for_archive(&archive, 2).await;
        assert_eq!(archive.get(&first).await.unwrap().turns.len(), first_turns);
        let replay = archive.get(&second).await.unwrap();
        assert_eq!(replay.session_id, second);
        assert_eq!(replay.turns.len(), second_turns);
    }

    #[tokio::test]
    async fn test_episode_archived_after_client_disconnects() {
        let (addr, archive) = start().await;
        let mut client = connect(addr).await;

        let session_id = match request(&mut client, r#"{"type":"negotiate","seed":5}"#).await {
            ServerMessage::Init { session_id, .. } => session_id,
            other => panic!("expected init, got {:?}", other),
        };
        drop(client);

        wait_for_archive(&archive, 1).await;
        assert_eq!(archive.len().await, 1);
        assert_eq!(archive.list().await[0].session_id, session_id);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_isolated() {
        let (addr, archive) = start().await;

        let mut clients = Vec::new();
        for seed in 0..3u64 {
            clients.push(tokio::spawn(async move {
                let mut client = connect(addr).await;
                let json = format!(r#"{{"type":"negotiate","seed":{}}}"#, seed);
                let mut message = request(&mut client, &json).await;
                while !message.is_end() {
                    message = receive(&mut client).await;
                }
            }));
        }
        for client in clients {
            client.await.unwrap();
        }

        // The archive is written just after the end message goes out
        wait_for_archive(&archive, 3).await;
        let sessions = archive.list().await;
        assert_eq!(sessions.len(), 3);
        assert!(sessions[0].session_id != sessions[1].session_id);
    }
}
