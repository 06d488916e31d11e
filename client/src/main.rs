use clap::Parser;
use client::app::App;
use client::session::SessionConfig;
use log::info;
use macroquad::window::Conf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Join code printed by the server
    #[arg(short = 'j', long, default_value = "")]
    join_code: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "1024")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "768")]
    height: usize,
}

fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Controls: WASD/arrows to move, Space or left click to attack, R to respawn");

    let conf = Conf {
        window_title: "Horde Arena".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    };

    let config = SessionConfig::new(args.server, args.join_code);
    let (width, height) = (args.width, args.height);
    macroquad::Window::from_config(conf, async move {
        App::new(config, width, height).run().await;
    });
}
