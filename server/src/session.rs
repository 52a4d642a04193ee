//! Player session registry for the game server
//!
//! Tracks the (at most two) players connected over the control channel:
//! - Paddle assignment, always the lowest free paddle id
//! - Readiness and the port each player receives ball positions on
//! - Heartbeat bookkeeping for silent-player detection
//!
//! Sessions are keyed by [`ConnectionId`], which is never reused, so events
//! that belong to a connection torn down earlier can be recognised and dropped.

use log::info;
use shared::PaddleId;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Identifies one accepted control connection for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A connected player
#[derive(Debug, Clone)]
pub struct Session {
    pub conn: ConnectionId,
    pub paddle: PaddleId,
    /// Remote address of the control connection. Clients bind their paddle
    /// datagram socket to the same port, so this is also where relayed
    /// opponent positions are sent.
    pub peer: SocketAddr,
    pub ready: bool,
    /// Port announced during the handshake for ball positions.
    pub ball_port: Option<u16>,
    /// Session time of the last message received from this player.
    pub last_message: f64,
}

impl Session {
    pub fn new(conn: ConnectionId, paddle: PaddleId, peer: SocketAddr, now: f64) -> Self {
        Self {
            conn,
            paddle,
            peer,
            ready: false,
            ball_port: None,
            last_message: now,
        }
    }

    pub fn mark_ready(&mut self, ball_port: u16, now: f64) {
        self.ready = true;
        self.ball_port = Some(ball_port);
        self.last_message = now;
    }

    /// Where ball positions for this player go.
    pub fn ball_addr(&self) -> Option<SocketAddr> {
        self.ball_port
            .map(|port| SocketAddr::new(self.peer.ip(), port))
    }

    /// True once a ready player has been silent for at least `timeout`.
    pub fn is_timed_out(&self, now: f64, timeout: Duration) -> bool {
        self.ready && now - self.last_message >= timeout.as_secs_f64()
    }
}

/// Registry of connected players, at most one per paddle
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Vec<Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and assigns it the lowest free paddle.
    ///
    /// Returns None when both paddles are taken.
    pub fn add_session(
        &mut self,
        conn: ConnectionId,
        peer: SocketAddr,
        now: f64,
    ) -> Option<PaddleId> {
        let paddle = PaddleId::ALL
            .into_iter()
            .find(|id| self.get(*id).is_none())?;

        info!("Connection {} from {} assigned paddle {}", conn, peer, paddle);
        self.sessions.push(Session::new(conn, paddle, peer, now));
        self.sessions.sort_by_key(|s| s.paddle.as_i32());
        Some(paddle)
    }

    /// Removes the session owning `conn`, if it is still registered.
    pub fn remove_session(&mut self, conn: ConnectionId) -> Option<Session> {
        let index = self.sessions.iter().position(|s| s.conn == conn)?;
        let session = self.sessions.remove(index);
        info!("Paddle {} ({}) left", session.paddle, session.conn);
        Some(session)
    }

    pub fn get(&self, paddle: PaddleId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.paddle == paddle)
    }

    pub fn get_mut(&mut self, paddle: PaddleId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.paddle == paddle)
    }

    pub fn find_by_conn_mut(&mut self, conn: ConnectionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.conn == conn)
    }

    /// Matches a datagram sender to a player.
    ///
    /// The exact address is tried first; a sender on the player's host whose
    /// payload names the player's control port as origin also matches.
    pub fn find_by_addr(&self, addr: SocketAddr, origin_port: u16) -> Option<PaddleId> {
        self.sessions
            .iter()
            .find(|s| s.peer == addr)
            .or_else(|| {
                self.sessions
                    .iter()
                    .find(|s| s.peer.ip() == addr.ip() && s.peer.port() == origin_port)
            })
            .map(|s| s.paddle)
    }

    /// Refreshes the heartbeat of a player.
    pub fn touch(&mut self, paddle: PaddleId, now: f64) {
        if let Some(session) = self.get_mut(paddle) {
            session.last_message = now;
        }
    }

    /// Restarts every heartbeat, used when a game begins.
    pub fn touch_all(&mut self, now: f64) {
        for session in &mut self.sessions {
            session.last_message = now;
        }
    }

    /// Both paddles are taken and both players announced their ball port.
    pub fn all_ready(&self) -> bool {
        self.is_full() && self.sessions.iter().all(|s| s.ready)
    }

    /// Connections of ready players silent for at least `timeout`.
    pub fn check_timeouts(&self, now: f64, timeout: Duration) -> Vec<ConnectionId> {
        self.sessions
            .iter()
            .filter(|s| s.is_timed_out(now, timeout))
            .map(|s| s.conn)
            .collect()
    }

    pub fn connections(&self) -> Vec<ConnectionId> {
        self.sessions.iter().map(|s| s.conn).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() == PaddleId::ALL.len()
    }
}
