use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MAX_DATAGRAM_SIZE: usize = 1024;
pub const MAX_ADDITIONAL_PLAYERS: u32 = 3;
pub const MAX_HOLES: u32 = 9;

pub const SUCCESS: &str = "SUCCESS";
pub const FAILURE: &str = "FAILURE";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Register,
    Deregister,
    QueryPlayers,
    StartGame,
    QueryGames,
    EndGame,
}

impl Command {
    /// Canonical uppercase tag used in reply prefixes.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Command::Register => "REGISTER",
            Command::Deregister => "DEREGISTER",
            Command::QueryPlayers => "QUERY_PLAYERS",
            Command::StartGame => "START_GAME",
            Command::QueryGames => "QUERY_GAMES",
            Command::EndGame => "END_GAME",
        }
    }

    pub fn success_prefix(&self) -> String {
        format!("{} {}", SUCCESS, self.wire_name())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("datagram of {0} bytes exceeds the {} byte limit", MAX_DATAGRAM_SIZE)]
    Oversize(usize),
    #[error(transparent)]
    Codec(#[from] bincode::Error),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// One request datagram: a command tag plus a whitespace-delimited text
/// payload. Carries no request identifier, so replies can only be matched
/// back to requests by their command-name prefix.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub command: Command,
    pub payload: String,
}

impl WireMessage {
    pub fn new(command: Command, payload: impl Into<String>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let data = bincode::serialize(self)?;
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(WireError::Oversize(data.len()));
        }
        Ok(data)
    }

    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        Ok(bincode::deserialize(data)?)
    }
}

pub fn is_success(reply: &str, command: Command) -> bool {
    reply.starts_with(&command.success_prefix())
}

/// One seat in a match: where to reach this player for peer traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub name: String,
    pub ip: String,
    pub peer_port: u16,
}

/// The START_GAME success payload: `gameId holes playerCount` followed by
/// one `name ip peerPort` triple per seat, dealer first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAnnouncement {
    pub game_id: u32,
    pub holes: u32,
    pub seats: Vec<Seat>,
}

impl MatchAnnouncement {
    pub fn to_payload(&self) -> String {
        let mut out = format!("{} {} {}", self.game_id, self.holes, self.seats.len());
        for seat in &self.seats {
            out.push_str(&format!(" {} {} {}", seat.name, seat.ip, seat.peer_port));
        }
        out
    }

    pub fn parse(payload: &str) -> Result<Self, WireError> {
        let mut fields = payload.split_whitespace();
        let game_id = next_field(&mut fields, "game id")?;
        let holes = next_field(&mut fields, "holes")?;
        let count: usize = next_field(&mut fields, "player count")?;

        let mut seats = Vec::with_capacity(count);
        for _ in 0..count {
            let name = fields
                .next()
                .ok_or_else(|| WireError::Malformed("truncated seat list".into()))?
                .to_string();
            let ip = fields
                .next()
                .ok_or_else(|| WireError::Malformed("seat missing ip".into()))?
                .to_string();
            let peer_port = next_field(&mut fields, "seat peer port")?;
            seats.push(Seat {
                name,
                ip,
                peer_port,
            });
        }

        Ok(Self {
            game_id,
            holes,
            seats,
        })
    }

    /// The dealer always occupies the first seat.
    pub fn dealer(&self) -> Option<&Seat> {
        self.seats.first()
    }
}

fn next_field<'a, T>(
    fields: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<T, WireError>
where
    T: std::str::FromStr,
{
    let raw = fields
        .next()
        .ok_or_else(|| WireError::Malformed(format!("missing {}", what)))?;
    raw.parse()
        .map_err(|_| WireError::Malformed(format!("invalid {}: {}", what, raw)))
}
