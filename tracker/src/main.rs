mod dispatch;
mod server;
mod tracker;

use clap::Parser;
use dispatch::Dispatcher;
use server::TrackerServer;
use tracker::Tracker;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// UDP port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Fixed seed for opponent selection (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let tracker = match args.seed {
        Some(seed) => Tracker::with_seed(seed),
        None => Tracker::new(),
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = TrackerServer::bind(&address, Dispatcher::new(tracker)).await?;

    server.run().await?;
    Ok(())
}
