use shared::{DEFAULT_CONTROL_PORT, DEFAULT_DATAGRAM_PORT, SEND_INTERVAL};
use std::time::Duration;

/// Runtime settings for a game client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Host name or address of the game server.
    pub server: String,
    pub datagram_port: u16,
    pub control_port: u16,
    /// Target duration of one client frame.
    pub frame_interval: Duration,
    /// How often the own paddle position is sent.
    pub send_interval: Duration,
    /// Start with prediction and interpolation enabled.
    pub prediction: bool,
    /// Wait between attempts to reconnect after a finished session.
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.server, self.control_port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1".to_string(),
            datagram_port: DEFAULT_DATAGRAM_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            frame_interval: Duration::from_millis(4),
            send_interval: Duration::from_secs_f64(SEND_INTERVAL),
            prediction: true,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}
