use clap::Parser;
use client::config::ClientConfig;
use client::frontend::Autopilot;
use client::network::Client;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// Server port for position datagrams
    #[arg(short = 'd', long, default_value = "4444")]
    datagram_port: u16,

    /// Server port for the control connection
    #[arg(short = 'c', long, default_value = "4445")]
    control_port: u16,

    /// Milliseconds per client frame
    #[arg(long, default_value = "4")]
    frame_interval_ms: u64,

    /// Milliseconds between own paddle position datagrams
    #[arg(long, default_value = "100")]
    send_interval_ms: u64,

    /// Start with prediction and interpolation disabled
    #[arg(long)]
    no_prediction: bool,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        ClientConfig {
            server: args.server,
            datagram_port: args.datagram_port,
            control_port: args.control_port,
            frame_interval: Duration::from_millis(args.frame_interval_ms.max(1)),
            send_interval: Duration::from_millis(args.send_interval_ms),
            prediction: !args.no_prediction,
            ..ClientConfig::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ClientConfig::from(args);

    info!("Starting client...");
    info!("Connecting to: {}", config.control_addr());
    if !config.prediction {
        info!("Prediction and interpolation start disabled");
    }

    let mut client = Client::new(config, Autopilot::new());
    client.run().await
}
