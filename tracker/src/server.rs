//! UDP serve loop for the tracker
//!
//! One task owns the socket and processes each inbound datagram end-to-end
//! (decode, dispatch, reply) before receiving the next. That serializes
//! every tracker mutation, so the state machine itself needs no locking.
//! Socket errors are treated as fatal: the loop propagates them and the
//! process exits with a diagnostic rather than limping along.

use crate::dispatch::Dispatcher;
use log::{debug, info};
use shared::MAX_DATAGRAM_SIZE;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

pub struct TrackerServer {
    socket: UdpSocket,
    dispatcher: Dispatcher,
}

impl TrackerServer {
    pub async fn bind(addr: &str, dispatcher: Dispatcher) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Tracker listening on {}", socket.local_addr()?);
        Ok(Self { socket, dispatcher })
    }

    /// The OS-assigned address, needed when binding to port 0 in tests.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(&mut self) -> io::Result<()> {
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (len, source) = self.socket.recv_from(&mut buffer).await?;
            let reply = self.dispatcher.handle_datagram(&buffer[..len], source);
            self.socket.send_to(reply.as_bytes(), source).await?;
            debug!("Sent reply to {}: {}", source, reply);
        }
    }
}
