use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind both sockets to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Port for paddle and ball position datagrams
    #[arg(short, long, default_value = "4444")]
    datagram_port: u16,
    /// Port for the control connection
    #[arg(short, long, default_value = "4445")]
    control_port: u16,
    /// Simulation ticks per second
    #[arg(short, long, default_value = "250")]
    tick_rate: u32,
    /// Milliseconds between ball position datagrams
    #[arg(long, default_value = "100")]
    send_interval_ms: u64,
    /// Seconds of silence before a player is dropped
    #[arg(long, default_value = "5")]
    heartbeat_timeout_secs: u64,
    /// Points needed to win
    #[arg(short, long, default_value = "7")]
    winning_score: u32,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            datagram_port: args.datagram_port,
            control_port: args.control_port,
            tick_rate: args.tick_rate,
            send_interval: Duration::from_millis(args.send_interval_ms),
            heartbeat_timeout: Duration::from_secs(args.heartbeat_timeout_secs),
            winning_score: args.winning_score,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::from(args);
    info!(
        "Starting server at {} Hz, first to {}",
        config.tick_rate, config.winning_score
    );

    let mut server = Server::bind(config).await?;
    server.run().await
}
