mod engine;
mod peers;
mod session;

use clap::Parser;
use engine::TrackerEngine;
use log::info;
use session::{PlayerIdentity, SessionOutcome, TrackerSession};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tracker address to talk to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    tracker: String,
}

fn print_outcome(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Reply(reply) => println!("{}", reply),
        SessionOutcome::TimedOut => println!("No response from tracker (timed out)"),
        SessionOutcome::Refused(reason) => println!("Refused: {}", reason),
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  register <name> <ip> <tracker_port> <peer_port> - Register player");
    println!("  deregister - De-register player");
    println!("  start <num_players> <num_holes> - Start a new game");
    println!("  end <game_id> - End a game you are dealing");
    println!("  players - Query registered players");
    println!("  games - Query ongoing games");
    println!("  help - Show this help message");
    println!("  quit - Exit the program");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let tracker_addr: SocketAddr = args.tracker.parse()?;

    info!("Connecting to tracker at {}", tracker_addr);
    let engine = TrackerEngine::connect(tracker_addr).await?;
    let mut session = TrackerSession::new(engine);

    println!("Welcome to the Six Card Golf client!");
    println!("Type 'help' for a list of available commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();

        match words.next() {
            Some("quit") => break,
            Some("help") => print_help(),
            Some("register") => {
                let parsed = (|| {
                    Some(PlayerIdentity {
                        name: words.next()?.to_string(),
                        ip: words.next()?.to_string(),
                        tracker_port: words.next()?.parse().ok()?,
                        peer_port: words.next()?.parse().ok()?,
                    })
                })();
                match parsed {
                    Some(identity) => print_outcome(&session.register(identity).await?),
                    None => println!("Usage: register <name> <ip> <tracker_port> <peer_port>"),
                }
            }
            Some("deregister") => print_outcome(&session.deregister().await?),
            Some("start") => {
                let parsed = (|| Some((words.next()?.parse().ok()?, words.next()?.parse().ok()?)))();
                match parsed {
                    Some((n, holes)) => print_outcome(&session.start_game(n, holes).await?),
                    None => println!("Usage: start <num_players> <num_holes>"),
                }
            }
            Some("end") => match words.next().and_then(|w| w.parse().ok()) {
                Some(game_id) => print_outcome(&session.end_game(game_id).await?),
                None => println!("Usage: end <game_id>"),
            },
            Some("players") => print_outcome(&session.query_players().await?),
            Some("games") => print_outcome(&session.query_games().await?),
            Some(_) => println!("Unknown command. Type 'help' for a list of commands."),
            None => {}
        }
    }

    Ok(())
}
