//! Request/response engine over the tracker-facing UDP socket
//!
//! UDP gives us single packets with no ordering, no delivery guarantee and
//! no request identifiers. This module turns that into a blocking
//! "send a command, wait up to T for the answer" call:
//! - a background task drains the socket continuously and deposits every
//!   inbound datagram into a single-slot mailbox,
//! - [`TrackerEngine::send_and_await`] sends the request and waits on the
//!   mailbox for a reply whose text carries the matching command tag.
//!
//! Because the mailbox is one shared slot rather than per-request, the
//! engine cannot correlate replies if two commands are in flight at once.
//! The session layer keeps at most one outstanding request by convention.

use log::{info, warn};
use shared::{Command, WireError, WireMessage, FAILURE, SUCCESS};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

/// How long a caller waits for a reply before giving up.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Single-slot reply mailbox. Every inbound datagram overwrites the slot;
/// the notify is the sole suspension point for waiting callers.
#[derive(Default)]
struct ReplyMailbox {
    slot: Mutex<Option<String>>,
    arrived: Notify,
}

pub struct TrackerEngine {
    socket: Arc<UdpSocket>,
    tracker_addr: SocketAddr,
    mailbox: Arc<ReplyMailbox>,
}

impl TrackerEngine {
    /// Binds an ephemeral local socket and starts the background receiver.
    pub async fn connect(tracker_addr: SocketAddr) -> std::io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        let mailbox = Arc::new(ReplyMailbox::default());

        Self::spawn_receiver(Arc::clone(&socket), tracker_addr, Arc::clone(&mailbox));

        Ok(Self {
            socket,
            tracker_addr,
            mailbox,
        })
    }

    /// Local address of the tracker-facing socket.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns the task that continuously drains the tracker socket into
    /// the mailbox. Datagrams whose source IP differs from the tracker's
    /// are dropped; that check is a sanity filter, not authentication.
    fn spawn_receiver(
        socket: Arc<UdpSocket>,
        tracker_addr: SocketAddr,
        mailbox: Arc<ReplyMailbox>,
    ) {
        tokio::spawn(async move {
            let mut buffer = [0u8; shared::MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, source)) => {
                        if source.ip() != tracker_addr.ip() {
                            warn!("Dropping packet from unexpected source {}", source);
                            continue;
                        }

                        let text = String::from_utf8_lossy(&buffer[..len]).into_owned();
                        info!("Received from tracker: {}", text);

                        *mailbox.slot.lock().await = Some(text);
                        mailbox.arrived.notify_one();
                    }
                    Err(e) => {
                        warn!("Error receiving from tracker socket: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });
    }

    /// Sends `message` and waits up to `timeout` for the reply carrying
    /// the same command tag
    ///
    /// Both `SUCCESS <CMD>` and `FAILURE <CMD>` replies answer the
    /// request; matching is purely textual since the wire format has no
    /// request id. A matching reply empties the mailbox and is returned;
    /// expiry returns `None` and leaves the engine ready for the next
    /// request. Anything else that lands in the mailbox is left there to
    /// be overwritten (and has already been logged by the receiver).
    pub async fn send_and_await(
        &self,
        message: &WireMessage,
        timeout: Duration,
    ) -> Result<Option<String>, EngineError> {
        let data = message.encode()?;
        self.socket.send_to(&data, self.tracker_addr).await?;

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(reply) = self.take_if_matching(message.command).await {
                return Ok(Some(reply));
            }
            if tokio::time::timeout_at(deadline, self.mailbox.arrived.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn take_if_matching(&self, command: Command) -> Option<String> {
        let mut slot = self.mailbox.slot.lock().await;
        let matches = slot
            .as_deref()
            .map(|text| reply_matches(text, command))
            .unwrap_or(false);
        if matches {
            slot.take()
        } else {
            None
        }
    }
}

/// A reply answers `command` when its first token is an outcome and its
/// second token is the command's wire name.
fn reply_matches(reply: &str, command: Command) -> bool {
    let mut words = reply.split_whitespace();
    matches!(
        (words.next(), words.next()),
        (Some(outcome), Some(tag))
            if (outcome == SUCCESS || outcome == FAILURE) && tag == command.wire_name()
    )
}
