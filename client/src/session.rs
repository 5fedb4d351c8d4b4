//! Session layer: registration state, guard clauses and reply side effects
//!
//! Sits between the interactive command loop and the request/response
//! engine. It remembers whether this client is currently registered,
//! refuses commands locally that the tracker would reject anyway (no
//! packet sent), and reacts to specific replies: a successful REGISTER
//! flips the registered flag on, a successful DEREGISTER flips it off,
//! and a successful START_GAME establishes the peer topology before the
//! call returns to the caller.

use crate::engine::{EngineError, TrackerEngine, DEFAULT_REPLY_TIMEOUT};
use crate::peers::{self, PeerLink};
use log::warn;
use shared::{is_success, Command, MatchAnnouncement, WireMessage};

/// Who this client claims to be, captured at registration time.
#[derive(Debug, Clone)]
pub struct PlayerIdentity {
    pub name: String,
    pub ip: String,
    pub tracker_port: u16,
    pub peer_port: u16,
}

/// What became of one session command.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The tracker answered; the full reply text.
    Reply(String),
    /// No matching reply arrived in time. The tracker may still process
    /// the request later, so local and tracker state can drift.
    TimedOut,
    /// Refused locally before anything was sent.
    Refused(&'static str),
}

pub struct TrackerSession {
    engine: TrackerEngine,
    identity: Option<PlayerIdentity>,
    registered: bool,
    peers: Vec<PeerLink>,
}

impl TrackerSession {
    pub fn new(engine: TrackerEngine) -> Self {
        Self {
            engine,
            identity: None,
            registered: false,
            peers: Vec::new(),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Peer links of the current game, in ring order.
    pub fn peers(&self) -> &[PeerLink] {
        &self.peers
    }

    pub async fn register(
        &mut self,
        identity: PlayerIdentity,
    ) -> Result<SessionOutcome, EngineError> {
        if self.registered {
            return Ok(SessionOutcome::Refused(
                "already registered; deregister first",
            ));
        }

        let payload = format!(
            "{} {} {} {}",
            identity.name, identity.ip, identity.tracker_port, identity.peer_port
        );
        let message = WireMessage::new(Command::Register, payload);

        match self.engine.send_and_await(&message, DEFAULT_REPLY_TIMEOUT).await? {
            Some(reply) => {
                if is_success(&reply, Command::Register) {
                    self.registered = true;
                    self.identity = Some(identity);
                }
                Ok(SessionOutcome::Reply(reply))
            }
            None => Ok(SessionOutcome::TimedOut),
        }
    }

    pub async fn deregister(&mut self) -> Result<SessionOutcome, EngineError> {
        let Some(identity) = self.identity.clone() else {
            return Ok(SessionOutcome::Refused("not registered"));
        };

        let message = WireMessage::new(Command::Deregister, identity.name);

        match self.engine.send_and_await(&message, DEFAULT_REPLY_TIMEOUT).await? {
            Some(reply) => {
                if is_success(&reply, Command::Deregister) {
                    self.registered = false;
                    self.identity = None;
                    self.peers.clear();
                }
                Ok(SessionOutcome::Reply(reply))
            }
            None => Ok(SessionOutcome::TimedOut),
        }
    }

    /// Requests a match with `n` opponents over `holes` holes. On a
    /// success reply the peer topology is established before returning.
    pub async fn start_game(&mut self, n: u32, holes: u32) -> Result<SessionOutcome, EngineError> {
        let Some(identity) = self.identity.clone() else {
            return Ok(SessionOutcome::Refused("not registered"));
        };

        let payload = format!("{} {} {}", identity.name, n, holes);
        let message = WireMessage::new(Command::StartGame, payload);

        match self.engine.send_and_await(&message, DEFAULT_REPLY_TIMEOUT).await? {
            Some(reply) => {
                if is_success(&reply, Command::StartGame) {
                    self.setup_peers(&reply, &identity.name).await?;
                }
                Ok(SessionOutcome::Reply(reply))
            }
            None => Ok(SessionOutcome::TimedOut),
        }
    }

    pub async fn end_game(&mut self, game_id: u32) -> Result<SessionOutcome, EngineError> {
        let Some(identity) = self.identity.clone() else {
            return Ok(SessionOutcome::Refused("not registered"));
        };

        let payload = format!("{} {}", game_id, identity.name);
        let message = WireMessage::new(Command::EndGame, payload);

        match self.engine.send_and_await(&message, DEFAULT_REPLY_TIMEOUT).await? {
            Some(reply) => {
                if is_success(&reply, Command::EndGame) {
                    self.peers.clear();
                }
                Ok(SessionOutcome::Reply(reply))
            }
            None => Ok(SessionOutcome::TimedOut),
        }
    }

    pub async fn query_players(&mut self) -> Result<SessionOutcome, EngineError> {
        self.query(Command::QueryPlayers).await
    }

    pub async fn query_games(&mut self) -> Result<SessionOutcome, EngineError> {
        self.query(Command::QueryGames).await
    }

    async fn query(&mut self, command: Command) -> Result<SessionOutcome, EngineError> {
        let message = WireMessage::new(command, "");
        match self.engine.send_and_await(&message, DEFAULT_REPLY_TIMEOUT).await? {
            Some(reply) => Ok(SessionOutcome::Reply(reply)),
            None => Ok(SessionOutcome::TimedOut),
        }
    }

    async fn setup_peers(&mut self, reply: &str, own_name: &str) -> Result<(), EngineError> {
        let payload = reply
            .strip_prefix(&Command::StartGame.success_prefix())
            .unwrap_or(reply)
            .trim();

        match MatchAnnouncement::parse(payload) {
            Ok(announcement) => {
                self.peers = peers::establish(&announcement, own_name).await?;
                Ok(())
            }
            Err(e) => {
                // A garbled announcement leaves us matched on the tracker
                // but without peer links; surface it loudly.
                warn!("Could not parse match announcement: {}", e);
                Err(EngineError::Wire(e))
            }
        }
    }
}
