//! # Tracker Service Library
//!
//! The tracker is the authoritative matchmaking service for the card game:
//! players register with it over UDP, ask it to match them with free
//! opponents, and release their opponents back to the pool when a game
//! ends. Once matched, players talk to each other directly; the tracker
//! only ever hands out addresses.
//!
//! ## Architecture
//!
//! ### Single-Threaded Serialization
//! All state lives in [`tracker::Tracker`] and is only ever touched from
//! the serve loop in [`server::TrackerServer`], which finishes handling
//! one datagram before receiving the next. There is no locking anywhere
//! in the service; the loop is the concurrency-safety mechanism. If a
//! concurrent-accept model is ever introduced, the tracker must move
//! behind a single exclusive-access point (one mutex or an actor queue),
//! never per-map locks, because starting a game atomically reads and
//! mutates both the player and game collections.
//!
//! ### Unreliable Transport
//! The protocol offers no ordering, no delivery guarantee, and no request
//! identifiers. The tracker simply answers whatever arrives; a client
//! that times out waiting may still have its request processed later,
//! which is a documented limitation rather than something this layer
//! papers over.
//!
//! ## Module Organization
//!
//! - [`tracker`]: the pure state machine - player roster, game table,
//!   random opponent selection. No I/O.
//! - [`dispatch`]: decodes wire commands, invokes the state machine,
//!   formats `SUCCESS`/`FAILURE` reply text, labels traffic by source IP.
//! - [`server`]: the UDP serve loop tying socket to dispatcher.

pub mod dispatch;
pub mod server;
pub mod tracker;
