//! Authoritative matchmaking state for the tracker service
//!
//! This module owns the roster of registered players and the set of games
//! currently in progress:
//! - Player registration lifecycle (register, deregister, availability state)
//! - Game lifecycle (start, end) with monotonically increasing game ids
//! - Random opponent selection for a dealer requesting a match
//!
//! All operations are synchronous and the tracker holds no locks; the serve
//! loop processes one datagram at a time, which serializes every mutation.

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::{MatchAnnouncement, Seat, MAX_ADDITIONAL_PLAYERS, MAX_HOLES};
use std::collections::HashMap;
use thiserror::Error;

/// Why a tracker operation was refused. The display text is the exact
/// reason string sent back in `FAILURE` replies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Player already registered")]
    AlreadyRegistered,
    #[error("Player not registered")]
    NotRegistered,
    #[error("Player is currently in a game")]
    InGame,
    #[error("Invalid dealer or dealer not available")]
    DealerUnavailable,
    #[error("Invalid number of additional players")]
    InvalidPlayerCount,
    #[error("Invalid number of holes")]
    InvalidHoleCount,
    #[error("Not enough registered players")]
    NotEnoughRegisteredPlayers,
    #[error("Not enough free players")]
    NotEnoughFreePlayers,
    #[error("Game not found")]
    GameNotFound,
    #[error("Only the dealer can end the game")]
    NotTheDealer,
}

/// Player availability as reported in QUERY_PLAYERS listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Free,
    InPlay,
}

impl PlayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Free => "free",
            PlayerState::InPlay => "in-play",
        }
    }
}

/// A registered player. The name is the unique key and never changes;
/// only the availability state is mutated after registration.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub name: String,
    pub ip: String,
    pub tracker_port: u16,
    pub peer_port: u16,
    pub state: PlayerState,
}

/// A game in progress. `players` lists the non-dealer participants in
/// selection order; the dealer is tracked separately.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub id: u32,
    pub dealer: String,
    pub players: Vec<String>,
    pub holes: u32,
}

/// The tracker's entire authoritative state
///
/// Game ids start at 1 and are never reused for the lifetime of the
/// process, even after the owning game ends. The random source is owned
/// by the tracker and seeded once at construction so that opponent
/// selection is reproducible in tests via [`Tracker::with_seed`].
pub struct Tracker {
    players: HashMap<String, PlayerRecord>,
    games: HashMap<u32, GameRecord>,
    next_game_id: u32,
    rng: StdRng,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic construction for tests asserting exact selections.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            games: HashMap::new(),
            next_game_id: 1,
            rng,
        }
    }

    /// Registers a new player in the Free state
    ///
    /// Fails without touching any state if the name is already taken, so
    /// a duplicate REGISTER leaves exactly one record behind.
    pub fn register(
        &mut self,
        name: &str,
        ip: &str,
        tracker_port: u16,
        peer_port: u16,
    ) -> Result<(), TrackerError> {
        if self.players.contains_key(name) {
            return Err(TrackerError::AlreadyRegistered);
        }

        self.players.insert(
            name.to_string(),
            PlayerRecord {
                name: name.to_string(),
                ip: ip.to_string(),
                tracker_port,
                peer_port,
                state: PlayerState::Free,
            },
        );
        info!("Player {} registered from {}:{}", name, ip, tracker_port);
        Ok(())
    }

    /// Removes a player from the roster
    ///
    /// A player that is currently dealing or seated in a game cannot
    /// leave until that game ends.
    pub fn deregister(&mut self, name: &str) -> Result<(), TrackerError> {
        match self.players.get(name) {
            None => Err(TrackerError::NotRegistered),
            Some(record) if record.state == PlayerState::InPlay => Err(TrackerError::InGame),
            Some(_) => {
                self.players.remove(name);
                info!("Player {} deregistered", name);
                Ok(())
            }
        }
    }

    /// All registered players, sorted by name for stable listings.
    pub fn players(&self) -> Vec<&PlayerRecord> {
        let mut records: Vec<&PlayerRecord> = self.players.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// All games in progress, sorted by id.
    pub fn games(&self) -> Vec<&GameRecord> {
        let mut records: Vec<&GameRecord> = self.games.values().collect();
        records.sort_by_key(|g| g.id);
        records
    }

    /// Starts a game on behalf of `dealer` with `n` randomly selected
    /// free opponents
    ///
    /// Never starts a short-handed game: if fewer than `n` free
    /// non-dealer players exist the request fails outright. Candidates
    /// are collected in sorted-name order before sampling so a seeded
    /// tracker selects reproducibly; the sampling itself is uniform
    /// without replacement, not biased toward insertion order.
    pub fn start_game(
        &mut self,
        dealer: &str,
        n: u32,
        holes: u32,
    ) -> Result<MatchAnnouncement, TrackerError> {
        match self.players.get(dealer) {
            Some(record) if record.state == PlayerState::Free => {}
            _ => return Err(TrackerError::DealerUnavailable),
        }
        if !(1..=MAX_ADDITIONAL_PLAYERS).contains(&n) {
            return Err(TrackerError::InvalidPlayerCount);
        }
        if !(1..=MAX_HOLES).contains(&holes) {
            return Err(TrackerError::InvalidHoleCount);
        }
        if (self.players.len() as u32) < n + 1 {
            return Err(TrackerError::NotEnoughRegisteredPlayers);
        }

        let mut candidates: Vec<String> = self
            .players
            .values()
            .filter(|r| r.name != dealer && r.state == PlayerState::Free)
            .map(|r| r.name.clone())
            .collect();
        candidates.sort();

        if (candidates.len() as u32) < n {
            return Err(TrackerError::NotEnoughFreePlayers);
        }

        let selected: Vec<String> = candidates
            .choose_multiple(&mut self.rng, n as usize)
            .cloned()
            .collect();

        let game_id = self.next_game_id;
        self.next_game_id += 1;

        self.set_state(dealer, PlayerState::InPlay);
        for name in &selected {
            self.set_state(name, PlayerState::InPlay);
        }

        self.games.insert(
            game_id,
            GameRecord {
                id: game_id,
                dealer: dealer.to_string(),
                players: selected.clone(),
                holes,
            },
        );

        let mut seats = vec![self.seat(dealer)];
        seats.extend(selected.iter().map(|name| self.seat(name)));

        info!(
            "Game {} started: dealer {}, players {:?}, {} holes",
            game_id, dealer, selected, holes
        );

        Ok(MatchAnnouncement {
            game_id,
            holes,
            seats,
        })
    }

    /// Ends a game and returns everyone involved to the Free state
    ///
    /// Only the dealer that started the game may end it. The game id is
    /// retired permanently; `next_game_id` never moves backwards.
    pub fn end_game(&mut self, game_id: u32, requester: &str) -> Result<(), TrackerError> {
        match self.games.get(&game_id) {
            None => return Err(TrackerError::GameNotFound),
            Some(game) if game.dealer != requester => return Err(TrackerError::NotTheDealer),
            Some(_) => {}
        }

        if let Some(game) = self.games.remove(&game_id) {
            self.set_state(&game.dealer, PlayerState::Free);
            for name in &game.players {
                self.set_state(name, PlayerState::Free);
            }
        }
        info!("Game {} ended by dealer {}", game_id, requester);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    pub fn is_in_play(&self, name: &str) -> bool {
        matches!(
            self.players.get(name),
            Some(record) if record.state == PlayerState::InPlay
        )
    }

    fn set_state(&mut self, name: &str, state: PlayerState) {
        if let Some(record) = self.players.get_mut(name) {
            record.state = state;
        }
    }

    fn seat(&self, name: &str) -> Seat {
        let record = &self.players[name];
        Seat {
            name: record.name.clone(),
            ip: record.ip.clone(),
            peer_port: record.peer_port,
        }
    }
}
