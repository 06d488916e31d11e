use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::config::{ServerConfig, StatsFile};
use server::events::EventQueue;
use server::game::GameState;
use server::network::{generate_join_code, NetResult, Server, ServerOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Maximum number of connected players
    #[arg(short, long, default_value = "4")]
    max_clients: usize,

    /// Server config file (RON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Combat stats file (RON), re-read on every spawn and respawn
    #[arg(short, long, default_value = "combat_stats.ron")]
    stats: PathBuf,

    /// Join code clients must present; random when omitted, empty accepts anyone
    #[arg(short, long)]
    join_code: Option<String>,

    /// Seed for spawn positions, hostile HP and player colours
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> NetResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let join_code = args
        .join_code
        .unwrap_or_else(|| generate_join_code(&mut rng));

    let config = ServerConfig::load_or_default(args.config.as_deref());
    let stats = StatsFile::new(&args.stats);
    info!("Combat stats from {}", stats.path().display());

    let game_state = GameState::new(config, Box::new(stats), rng, EventQueue::new());

    let options = ServerOptions {
        tick_duration: Duration::from_secs_f64(1.0 / args.tick_rate.max(1) as f64),
        max_clients: args.max_clients,
        join_code,
        ..ServerOptions::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, options, game_state).await?;

    info!("Starting server on {}", server.local_addr()?);
    info!("Tick rate: {}Hz, max clients: {}", args.tick_rate, args.max_clients);
    if server.join_code().is_empty() {
        info!("No join code, any client may join");
    } else {
        info!("Join code: {}", server.join_code());
    }

    let shutdown = server.shutdown_handle();
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            shutdown.shutdown();
        }
    }

    Ok(())
}
