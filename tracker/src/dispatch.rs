//! Maps wire commands onto tracker operations and formats replies
//!
//! The dispatcher is the only layer that knows both the wire grammar and
//! the tracker's typed API. It decodes a request datagram, extracts the
//! whitespace-delimited payload fields, invokes the matching operation,
//! and renders the result as `SUCCESS <CMD> …` or `FAILURE <CMD> <reason>`.
//!
//! It also keeps a best-effort map from source IP to the name last
//! registered from that address. The map only labels incoming traffic in
//! the log; it is not authoritative identity and nothing enforces it.

use crate::tracker::Tracker;
use log::{info, warn};
use shared::{is_success, Command, WireMessage, FAILURE, SUCCESS};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

pub struct Dispatcher {
    tracker: Tracker,
    addr_names: HashMap<IpAddr, String>,
}

impl Dispatcher {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            addr_names: HashMap::new(),
        }
    }

    /// Handles one inbound datagram end-to-end and returns the reply text.
    pub fn handle_datagram(&mut self, data: &[u8], source: SocketAddr) -> String {
        let message = match WireMessage::decode(data) {
            Ok(message) => message,
            Err(e) => {
                warn!("Undecodable datagram from {}: {}", source, e);
                return format!("{} UnknownCommand", FAILURE);
            }
        };

        match self.addr_names.get(&source.ip()) {
            Some(name) => info!(
                "Received from {} ({}): {} {}",
                source, name, message.command, message.payload
            ),
            None => info!(
                "Received from {}: {} {}",
                source, message.command, message.payload
            ),
        }

        let reply = self.dispatch(&message);

        // Keep the diagnostic labels in step with successful (de)registrations.
        if message.command == Command::Register && is_success(&reply, Command::Register) {
            if let Some(name) = message.payload.split_whitespace().next() {
                self.addr_names.insert(source.ip(), name.to_string());
            }
        }
        if message.command == Command::Deregister && is_success(&reply, Command::Deregister) {
            self.addr_names.remove(&source.ip());
        }

        reply
    }

    fn dispatch(&mut self, message: &WireMessage) -> String {
        let command = message.command;
        let mut fields = message.payload.split_whitespace();

        let result: Result<String, String> = match command {
            Command::Register => self
                .parse_register(&mut fields)
                .and_then(|(name, ip, t_port, p_port)| {
                    self.tracker
                        .register(&name, &ip, t_port, p_port)
                        .map(|_| String::new())
                        .map_err(|e| e.to_string())
                }),
            Command::Deregister => match fields.next() {
                Some(name) => self
                    .tracker
                    .deregister(name)
                    .map(|_| String::new())
                    .map_err(|e| e.to_string()),
                None => Err("Malformed arguments".to_string()),
            },
            Command::QueryPlayers => Ok(self.render_players()),
            Command::QueryGames => Ok(self.render_games()),
            Command::StartGame => self.parse_start_game(&mut fields).and_then(|(dealer, n, holes)| {
                self.tracker
                    .start_game(&dealer, n, holes)
                    .map(|announcement| announcement.to_payload())
                    .map_err(|e| e.to_string())
            }),
            Command::EndGame => self.parse_end_game(&mut fields).and_then(|(game_id, dealer)| {
                self.tracker
                    .end_game(game_id, &dealer)
                    .map(|_| String::new())
                    .map_err(|e| e.to_string())
            }),
        };

        match result {
            Ok(payload) if payload.is_empty() => format!("{} {}", SUCCESS, command.wire_name()),
            Ok(payload) => format!("{} {} {}", SUCCESS, command.wire_name(), payload),
            Err(reason) => format!("{} {} {}", FAILURE, command.wire_name(), reason),
        }
    }

    fn parse_register<'a>(
        &self,
        fields: &mut impl Iterator<Item = &'a str>,
    ) -> Result<(String, String, u16, u16), String> {
        let name = fields.next().ok_or("Malformed arguments")?.to_string();
        let ip = fields.next().ok_or("Malformed arguments")?.to_string();
        let t_port = parse_field(fields.next())?;
        let p_port = parse_field(fields.next())?;
        Ok((name, ip, t_port, p_port))
    }

    fn parse_start_game<'a>(
        &self,
        fields: &mut impl Iterator<Item = &'a str>,
    ) -> Result<(String, u32, u32), String> {
        let dealer = fields.next().ok_or("Malformed arguments")?.to_string();
        let n = parse_field(fields.next())?;
        let holes = parse_field(fields.next())?;
        Ok((dealer, n, holes))
    }

    fn parse_end_game<'a>(
        &self,
        fields: &mut impl Iterator<Item = &'a str>,
    ) -> Result<(u32, String), String> {
        let game_id = parse_field(fields.next())?;
        let dealer = fields.next().ok_or("Malformed arguments")?.to_string();
        Ok((game_id, dealer))
    }

    fn render_players(&self) -> String {
        let players = self.tracker.players();
        let mut out = players.len().to_string();
        for record in players {
            out.push_str(&format!(
                " {} {} {} {} {}",
                record.name,
                record.ip,
                record.tracker_port,
                record.peer_port,
                record.state.as_str()
            ));
        }
        out
    }

    fn render_games(&self) -> String {
        let games = self.tracker.games();
        let mut out = games.len().to_string();
        for game in games {
            out.push_str(&format!(" {} {} {}", game.id, game.dealer, game.holes));
            for player in &game.players {
                out.push_str(&format!(" {}", player));
            }
        }
        out
    }
}

fn parse_field<T: std::str::FromStr>(raw: Option<&str>) -> Result<T, String> {
    raw.ok_or("Malformed arguments")?
        .parse()
        .map_err(|_| "Malformed arguments".to_string())
}
