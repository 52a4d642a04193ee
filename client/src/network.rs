//! Client network layer: handshake, datagram sockets and the frame loop

use crate::config::ClientConfig;
use crate::frontend::Frontend;
use crate::game::{ClientEvent, ClientGameState};
use crate::input::InputManager;
use log::{debug, error, info, warn};
use shared::framing::{read_frame, write_frame};
use shared::{ControlMessage, Cooldown, Handshake, PaddleId, PositionSample, SessionClock};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Where the client is in its session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    AwaitingAssignment,
    AwaitingStart,
    Playing,
    Finished(Outcome),
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    OpponentLeft,
    /// The control connection closed without a result.
    Disconnected,
    /// The frontend asked to quit.
    Quit,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::Won => "won",
            Outcome::Lost => "lost",
            Outcome::OpponentLeft => "opponent left",
            Outcome::Disconnected => "disconnected",
            Outcome::Quit => "quit",
        };
        f.write_str(text)
    }
}

/// Messages sent from network tasks to the frame loop
#[derive(Debug)]
enum ClientMessage {
    Frame(Vec<u8>),
    Closed,
    Datagram(Vec<u8>),
}

/// Sockets and tasks belonging to one session with the server
struct Link {
    writer: OwnedWriteHalf,
    paddle_socket: Arc<UdpSocket>,
    local_port: u16,
    datagram_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl Link {
    async fn close(mut self) {
        for task in &self.tasks {
            task.abort();
        }
        if let Err(e) = self.writer.shutdown().await {
            debug!("Shutdown of control connection failed: {}", e);
        }
    }
}

pub struct Client<F: Frontend> {
    config: ClientConfig,
    frontend: F,
    input: InputManager,
    clock: SessionClock,
    state: LinkState,
    prediction_enabled: bool,
}

impl<F: Frontend> Client<F> {
    pub fn new(config: ClientConfig, frontend: F) -> Self {
        Client {
            prediction_enabled: config.prediction,
            config,
            frontend,
            input: InputManager::new(),
            clock: SessionClock::start(),
            state: LinkState::Connecting,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    fn transition(&mut self, next: LinkState) {
        if self.state != next {
            debug!("Client state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Plays sessions until the frontend quits.
    ///
    /// Failing to reach the server the first time is an error; afterwards
    /// the client keeps reconnecting with a fixed back-off.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut connected_once = false;

        loop {
            self.transition(LinkState::Connecting);
            info!("Connecting to {}", self.config.control_addr());

            let stream = match TcpStream::connect(self.config.control_addr()).await {
                Ok(stream) => stream,
                Err(e) if !connected_once => return Err(e.into()),
                Err(e) => {
                    warn!("Reconnect failed: {}", e);
                    sleep(self.config.reconnect_delay).await;
                    continue;
                }
            };
            connected_once = true;

            let outcome = match self.play_session(stream).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Session failed: {}", e);
                    Outcome::Disconnected
                }
            };
            self.transition(LinkState::Finished(outcome));
            info!("Session ended: {}", outcome);

            if outcome == Outcome::Quit {
                return Ok(());
            }
            sleep(self.config.reconnect_delay).await;
        }
    }

    /// Runs the handshake and, once the game starts, the frame loop.
    async fn play_session(&mut self, stream: TcpStream) -> Result<Outcome, Box<dyn std::error::Error>> {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to disable Nagle: {}", e);
        }
        let local = stream.local_addr()?;
        let server = stream.peer_addr()?;
        let (mut reader, mut writer) = stream.into_split();

        self.transition(LinkState::AwaitingAssignment);
        let Some(frame) = read_frame(&mut reader).await? else {
            return Ok(Outcome::Disconnected);
        };
        let paddle = Handshake::decode_assignment(&frame)?;
        info!("Assigned paddle {}", paddle);
        self.frontend.notify(&ClientEvent::Assigned(paddle));

        if !self.frontend.confirm_ready(paddle) {
            writer.shutdown().await?;
            return Ok(Outcome::Quit);
        }

        // Relayed opponent positions arrive on the control connection's port.
        let paddle_socket = Arc::new(UdpSocket::bind(local).await?);
        let ball_socket = Arc::new(UdpSocket::bind(SocketAddr::new(local.ip(), 0)).await?);
        let ball_port = ball_socket.local_addr()?.port();

        write_frame(&mut writer, &Handshake::ReadyPort(ball_port).encode()?).await?;
        info!("Ready, receiving ball positions on port {}", ball_port);

        self.transition(LinkState::AwaitingStart);
        let Some(frame) = read_frame(&mut reader).await? else {
            return Ok(Outcome::Disconnected);
        };
        Handshake::decode_game_started(&frame)?;
        info!("Game started");
        self.frontend.notify(&ClientEvent::GameStarted);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let tasks = vec![
            Self::spawn_control_reader(reader, tx.clone()),
            Self::spawn_datagram_receiver(Arc::clone(&paddle_socket), tx.clone()),
            Self::spawn_datagram_receiver(ball_socket, tx),
        ];
        let link = Link {
            writer,
            paddle_socket,
            local_port: local.port(),
            datagram_addr: SocketAddr::new(server.ip(), self.config.datagram_port),
            tasks,
        };

        self.transition(LinkState::Playing);
        let outcome = self.play(paddle, &link, &mut rx).await;
        link.close().await;
        Ok(outcome)
    }

    /// Frame loop of a running game
    async fn play(
        &mut self,
        paddle: PaddleId,
        link: &Link,
        rx: &mut mpsc::UnboundedReceiver<ClientMessage>,
    ) -> Outcome {
        let mut game = ClientGameState::new(paddle, self.prediction_enabled);
        let mut send_cooldown = Cooldown::from_duration(self.config.send_interval);
        let mut frame_interval = interval(self.config.frame_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_frame = self.clock.now();

        let outcome = loop {
            tokio::select! {
                message = rx.recv() => {
                    let Some(message) = message else {
                        break Outcome::Disconnected;
                    };
                    if let Some(outcome) = self.handle_message(&mut game, message) {
                        break outcome;
                    }
                },

                _ = frame_interval.tick() => {
                    let now = self.clock.now();
                    let dt = now - last_frame;
                    last_frame = now;

                    let input = self.input.update(self.frontend.poll_keys());
                    if input.quit {
                        break Outcome::Quit;
                    }
                    if let Some(event) = game.apply_input(&input, dt as f32) {
                        self.frontend.notify(&event);
                    }
                    for event in game.frame(now, dt) {
                        self.frontend.notify(&event);
                    }

                    if send_cooldown.ready(now) {
                        Self::send_position(link, &game.own_sample(now, link.local_port)).await;
                    }

                    self.frontend.present(&game.display());
                }
            }
        };

        self.prediction_enabled = game.prediction_enabled();
        outcome
    }

    fn handle_message(&mut self, game: &mut ClientGameState, message: ClientMessage) -> Option<Outcome> {
        match message {
            ClientMessage::Datagram(bytes) => {
                match PositionSample::decode(&bytes) {
                    Ok(sample) => {
                        if let Some(event) = game.receive_sample(sample, self.clock.now()) {
                            self.frontend.notify(&event);
                        }
                    }
                    Err(e) => debug!("Ignoring malformed datagram: {}", e),
                }
                None
            }
            ClientMessage::Frame(payload) => {
                let message = match ControlMessage::decode(&payload) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Ignoring malformed control message: {}", e);
                        return None;
                    }
                };
                let event = game.apply_control(message);
                self.frontend.notify(&event);
                match event {
                    ClientEvent::Won => Some(Outcome::Won),
                    ClientEvent::Lost => Some(Outcome::Lost),
                    ClientEvent::OpponentLeft => Some(Outcome::OpponentLeft),
                    _ => None,
                }
            }
            ClientMessage::Closed => {
                self.frontend.notify(&ClientEvent::Disconnected);
                Some(Outcome::Disconnected)
            }
        }
    }

    async fn send_position(link: &Link, sample: &PositionSample) {
        let result = match sample.encode() {
            Ok(data) => link.paddle_socket.send_to(&data, link.datagram_addr).await.map(|_| ()),
            Err(e) => {
                error!("Failed to encode position: {}", e);
                return;
            }
        };
        if let Err(e) = result {
            warn!("Failed to send position to {}: {}", link.datagram_addr, e);
        }
    }

    /// Spawns task that forwards frames from the control connection
    fn spawn_control_reader(
        mut reader: OwnedReadHalf,
        tx: mpsc::UnboundedSender<ClientMessage>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match read_frame(&mut reader).await {
                    Ok(Some(payload)) => {
                        if tx.send(ClientMessage::Frame(payload)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Control connection failed: {}", e);
                        break;
                    }
                }
            }
            let _ = tx.send(ClientMessage::Closed);
        })
    }

    /// Spawns task that forwards datagrams from one socket
    fn spawn_datagram_receiver(
        socket: Arc<UdpSocket>,
        tx: mpsc::UnboundedSender<ClientMessage>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buffer = [0u8; 512];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, _)) => {
                        if tx.send(ClientMessage::Datagram(buffer[..len].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Error receiving datagram: {}", e);
                        sleep(std::time::Duration::from_millis(1)).await;
                    }
                }
            }
        })
    }
}
