//! Peer topology setup after a successful match
//!
//! The tracker's START_GAME reply lists every seat in the game. This
//! module finds the client's own seat, opens one UDP socket per remote
//! seat, and starts a background receive loop for each. Links are handed
//! back in ring order (starting with the seat after our own) so the game
//! engine knows each player's next neighbor. No handshake happens here;
//! a peer socket is considered ready as soon as it is bound.

use log::{info, warn};
use shared::MatchAnnouncement;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// One established peer endpoint. The socket is shared with the
/// background receive loop; the game engine sends through it directly.
pub struct PeerLink {
    pub name: String,
    pub addr: SocketAddr,
    pub socket: Arc<UdpSocket>,
}

/// Opens a socket and receive loop for every other seat in the match.
pub async fn establish(
    announcement: &MatchAnnouncement,
    own_name: &str,
) -> io::Result<Vec<PeerLink>> {
    let seats = &announcement.seats;
    let position = seats
        .iter()
        .position(|seat| seat.name == own_name)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("own seat {} missing from match announcement", own_name),
            )
        })?;

    let mut links = Vec::with_capacity(seats.len().saturating_sub(1));

    // Walk the ring starting from the seat after our own.
    for offset in 1..seats.len() {
        let seat = &seats[(position + offset) % seats.len()];
        let addr: SocketAddr = format!("{}:{}", seat.ip, seat.peer_port)
            .parse()
            .map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("bad peer address for {}: {}", seat.name, e),
                )
            })?;

        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        spawn_peer_receiver(Arc::clone(&socket), seat.name.clone());

        links.push(PeerLink {
            name: seat.name.clone(),
            addr,
            socket,
        });
    }

    info!(
        "Game {}: peer links ready for {:?}",
        announcement.game_id,
        links.iter().map(|l| l.name.as_str()).collect::<Vec<_>>()
    );

    Ok(links)
}

/// Background loop printing inbound peer traffic. This is the handoff
/// point to the game engine, which replaces the logging with real play.
fn spawn_peer_receiver(socket: Arc<UdpSocket>, peer_name: String) {
    tokio::spawn(async move {
        let mut buffer = [0u8; shared::MAX_DATAGRAM_SIZE];

        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, _)) => {
                    let text = String::from_utf8_lossy(&buffer[..len]);
                    info!("Received from {}: {}", peer_name, text);
                }
                Err(e) => {
                    warn!("Error receiving from peer {}: {}", peer_name, e);
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Seat;

    fn announcement() -> MatchAnnouncement {
        MatchAnnouncement {
            game_id: 3,
            holes: 9,
            seats: vec![
                Seat {
                    name: "alice".to_string(),
                    ip: "127.0.0.1".to_string(),
                    peer_port: 9100,
                },
                Seat {
                    name: "bob".to_string(),
                    ip: "127.0.0.1".to_string(),
                    peer_port: 9200,
                },
                Seat {
                    name: "carol".to_string(),
                    ip: "127.0.0.1".to_string(),
                    peer_port: 9300,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_links_follow_ring_order() {
        // bob sits in the middle; the ring continues carol, then alice.
        let links = establish(&announcement(), "bob").await.unwrap();
        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["carol", "alice"]);
        assert_eq!(links[0].addr.port(), 9300);
        assert_eq!(links[1].addr.port(), 9100);
    }

    #[tokio::test]
    async fn test_dealer_gets_all_other_seats() {
        let links = establish(&announcement(), "alice").await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].name, "bob");
    }

    #[tokio::test]
    async fn test_unknown_own_seat_is_an_error() {
        let result = establish(&announcement(), "mallory").await;
        assert!(result.is_err());
    }
}
