use shared::{
    DEFAULT_CONTROL_PORT, DEFAULT_DATAGRAM_PORT, HEARTBEAT_TIMEOUT, SEND_INTERVAL, WINNING_SCORE,
};
use std::time::Duration;

/// Runtime settings for the game server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    /// Port of the datagram socket that relays paddles and sends the ball.
    pub datagram_port: u16,
    /// Port the control-channel listener accepts players on.
    pub control_port: u16,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    pub send_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub winning_score: u32,
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn datagram_addr(&self) -> String {
        format!("{}:{}", self.host, self.datagram_port)
    }

    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.host, self.control_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            datagram_port: DEFAULT_DATAGRAM_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            tick_rate: 250,
            send_interval: Duration::from_secs_f64(SEND_INTERVAL),
            heartbeat_timeout: Duration::from_secs_f64(HEARTBEAT_TIMEOUT),
            winning_score: WINNING_SCORE,
        }
    }
}
