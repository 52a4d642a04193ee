//! Server network layer: control listener, datagram socket and the game loop

use crate::config::ServerConfig;
use crate::session::ConnectionId;
use crate::state::{Match, Outgoing, Reliable};
use log::{debug, error, info, warn};
use shared::framing::{read_frame, write_frame};
use shared::{PositionSample, SessionClock};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Accepted {
        conn: ConnectionId,
        peer: SocketAddr,
        writer: OwnedWriteHalf,
        reader: JoinHandle<()>,
    },
    Frame {
        conn: ConnectionId,
        payload: Vec<u8>,
    },
    Closed {
        conn: ConnectionId,
    },
    Datagram {
        bytes: Vec<u8>,
        addr: SocketAddr,
    },
}

/// Per-connection tasks; dropping `outbox` lets the writer drain and shut down.
struct Connection {
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    reader: JoinHandle<()>,
}

/// Authoritative game server
pub struct Server {
    config: ServerConfig,
    listener: Option<TcpListener>,
    socket: Arc<UdpSocket>,
    connections: HashMap<ConnectionId, Connection>,
    game: Match,
    clock: SessionClock,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Binds the control listener and the datagram socket.
    ///
    /// Port 0 in the config picks an ephemeral port; the chosen ports are
    /// written back so [`Server::config`] reports the real addresses.
    pub async fn bind(mut config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(config.control_addr()).await?;
        let socket = UdpSocket::bind(config.datagram_addr()).await?;

        config.control_port = listener.local_addr()?.port();
        config.datagram_port = socket.local_addr()?.port();
        info!(
            "Server listening on {} (control) and {} (datagrams)",
            config.control_addr(),
            config.datagram_addr()
        );

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            game: Match::new(config.clone()),
            config,
            listener: Some(listener),
            socket: Arc::new(socket),
            connections: HashMap::new(),
            clock: SessionClock::start(),
            server_tx,
            server_rx,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Spawns task that accepts control connections
    fn spawn_listener(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_conn = 0u64;

            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to disable Nagle for {}: {}", peer, e);
                        }
                        next_conn += 1;
                        let conn = ConnectionId(next_conn);
                        let (read_half, writer) = stream.into_split();
                        let reader =
                            Self::spawn_connection_reader(conn, read_half, server_tx.clone());

                        let accepted = ServerMessage::Accepted {
                            conn,
                            peer,
                            writer,
                            reader,
                        };
                        if server_tx.send(accepted).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that forwards frames from one control connection
    fn spawn_connection_reader(
        conn: ConnectionId,
        mut read_half: OwnedReadHalf,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match read_frame(&mut read_half).await {
                    Ok(Some(payload)) => {
                        if server_tx.send(ServerMessage::Frame { conn, payload }).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Control connection {} failed: {}", conn, e);
                        break;
                    }
                }
            }
            let _ = server_tx.send(ServerMessage::Closed { conn });
        })
    }

    /// Spawns task that writes queued frames to one control connection
    ///
    /// The write half is shut down once the queue is closed and drained.
    fn spawn_connection_writer(
        conn: ConnectionId,
        mut writer: OwnedWriteHalf,
    ) -> mpsc::UnboundedSender<Vec<u8>> {
        let (outbox, mut queue) = mpsc::unbounded_channel::<Vec<u8>>();

        tokio::spawn(async move {
            while let Some(payload) = queue.recv().await {
                if let Err(e) = write_frame(&mut writer, &payload).await {
                    warn!("Failed to write to {}: {}", conn, e);
                    return;
                }
            }
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown of {} failed: {}", conn, e);
            }
        });

        outbox
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_datagram_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 512];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let message = ServerMessage::Datagram {
                            bytes: buffer[..len].to_vec(),
                            addr,
                        };
                        if server_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // ICMP port unreachable from a departed client surfaces here
                        debug!("Error receiving datagram: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    }
                }
            }
        });
    }

    async fn handle_message(&mut self, message: ServerMessage) {
        let now = self.clock.now();
        let outgoing = match message {
            ServerMessage::Accepted {
                conn,
                peer,
                writer,
                reader,
            } => {
                let outbox = Self::spawn_connection_writer(conn, writer);
                self.connections.insert(conn, Connection { outbox, reader });
                self.game.on_connect(conn, peer, now)
            }
            ServerMessage::Frame { conn, payload } => {
                self.game.on_control_frame(conn, &payload, now)
            }
            ServerMessage::Closed { conn } => {
                self.connections.remove(&conn);
                self.game.on_disconnect(conn, now)
            }
            ServerMessage::Datagram { bytes, addr } => self.game.on_datagram(addr, &bytes, now),
        };

        self.dispatch(outgoing).await;
    }

    async fn dispatch(&mut self, outgoing: Vec<Outgoing>) {
        for action in outgoing {
            match action {
                Outgoing::Reliable { conn, message } => self.send_reliable(conn, &message),
                Outgoing::Datagram { to, sample } => self.send_datagram(&sample, to).await,
                Outgoing::Close { conn } => {
                    if let Some(connection) = self.connections.remove(&conn) {
                        connection.reader.abort();
                        info!("Closed connection {}", conn);
                    }
                }
            }
        }
    }

    /// Queues a message on the connection's writer task.
    fn send_reliable(&self, conn: ConnectionId, message: &Reliable) {
        let Some(connection) = self.connections.get(&conn) else {
            return;
        };

        match message.encode() {
            Ok(payload) => {
                if connection.outbox.send(payload).is_err() {
                    warn!("Connection {} writer has stopped, dropping {:?}", conn, message);
                }
            }
            Err(e) => error!("Failed to encode {:?} for {}: {}", message, conn, e),
        }
    }

    async fn send_datagram(&self, sample: &PositionSample, addr: SocketAddr) {
        let result = match sample.encode() {
            Ok(data) => self.socket.send_to(&data, addr).await.map(|_| ()),
            Err(e) => {
                error!("Failed to encode position: {}", e);
                return;
            }
        };
        if let Err(e) = result {
            warn!("Failed to send datagram to {}: {}", addr, e);
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_listener();
        self.spawn_datagram_receiver();

        let mut tick_interval = interval(self.config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        info!("Server started, waiting for players");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    let outgoing = self.game.tick(dt, self.clock.at(now));
                    self.dispatch(outgoing).await;
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
