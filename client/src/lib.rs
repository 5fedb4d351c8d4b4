//! # Player Client Library
//!
//! Client-side half of the matchmaking system. The tracker speaks
//! single-packet UDP with no delivery guarantee, no ordering and no
//! request identifiers; this library wraps that in a synchronous
//! command/reply interface the interactive loop can use directly.
//!
//! ## Architecture
//!
//! ### Request/Response Engine (`engine`)
//! Owns the tracker-facing socket. A background task drains it into a
//! single-slot mailbox; `send_and_await` sends one request and waits,
//! with a deadline, for the reply carrying the matching command tag.
//! The single slot means only one request may be in flight at a time;
//! the session layer serializes its own requests by construction.
//!
//! ### Session Layer (`session`)
//! Tracks whether this client is registered, refuses commands locally
//! that cannot succeed (registering twice, starting a game while
//! unregistered), and applies reply side effects: flipping the
//! registered flag and triggering peer setup after a successful match.
//!
//! ### Peer Topology (`peers`)
//! Turns a match announcement into one socket plus receive loop per
//! fellow player, in ring order. This is where the (external) card game
//! engine takes over; this library only delivers addresses and traffic.

pub mod engine;
pub mod peers;
pub mod session;
