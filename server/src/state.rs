//! Session synchronization state machine.
//!
//! [`Match`] performs no I/O. The network layer feeds it connection,
//! control-frame and datagram events plus periodic ticks, and performs the
//! returned [`Outgoing`] actions in order. Times are session seconds.

use crate::config::ServerConfig;
use crate::game::World;
use crate::session::{ConnectionId, SessionManager};
use log::{debug, error, info, warn};
use shared::{
    ControlMessage, Cooldown, Handshake, PaddleId, PositionSample, ScoreMessage, LOG_INTERVAL,
};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fewer than two players connected.
    WaitingForPlayers,
    /// Two players connected, at least one has not announced its ball port.
    ReadyHandshake,
    Playing,
    GameOver,
    Reset,
}

/// Control-channel message for one player.
#[derive(Debug, Clone, PartialEq)]
pub enum Reliable {
    Assignment(PaddleId),
    GameStarted,
    Control(ControlMessage),
}

impl Reliable {
    pub fn encode(&self) -> Result<Vec<u8>, shared::ProtocolError> {
        match self {
            Reliable::Assignment(paddle) => Handshake::Assignment(*paddle).encode(),
            Reliable::GameStarted => Handshake::GameStarted.encode(),
            Reliable::Control(message) => message.encode(),
        }
    }
}

/// Action requested from the network layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Reliable {
        conn: ConnectionId,
        message: Reliable,
    },
    Datagram {
        to: SocketAddr,
        sample: PositionSample,
    },
    /// Close the control connection; queued messages for it are sent first.
    Close { conn: ConnectionId },
}

pub struct Match {
    phase: Phase,
    sessions: SessionManager,
    world: World,
    config: ServerConfig,
    send_cooldown: Cooldown,
    log_cooldown: Cooldown,
}

impl Match {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            phase: Phase::WaitingForPlayers,
            sessions: SessionManager::new(),
            world: World::new(config.winning_score),
            send_cooldown: Cooldown::from_duration(config.send_interval),
            log_cooldown: Cooldown::new(LOG_INTERVAL),
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn transition(&mut self, phase: Phase) {
        if self.phase != phase {
            info!("{:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// A control connection was accepted.
    pub fn on_connect(&mut self, conn: ConnectionId, peer: SocketAddr, now: f64) -> Vec<Outgoing> {
        if matches!(self.phase, Phase::Playing) {
            warn!("Rejecting {} from {}: game in progress", conn, peer);
            return vec![Outgoing::Close { conn }];
        }

        let Some(paddle) = self.sessions.add_session(conn, peer, now) else {
            warn!("Rejecting {} from {}: both paddles taken", conn, peer);
            return vec![Outgoing::Close { conn }];
        };

        if self.sessions.is_full() {
            self.transition(Phase::ReadyHandshake);
        }

        vec![Outgoing::Reliable {
            conn,
            message: Reliable::Assignment(paddle),
        }]
    }

    /// A frame arrived on a control connection.
    pub fn on_control_frame(&mut self, conn: ConnectionId, payload: &[u8], now: f64) -> Vec<Outgoing> {
        let Some(session) = self.sessions.find_by_conn_mut(conn) else {
            debug!("Ignoring frame from stale connection {}", conn);
            return Vec::new();
        };

        if session.ready {
            warn!("Unexpected control frame from paddle {}", session.paddle);
            return Vec::new();
        }

        match Handshake::decode_ready_port(payload) {
            Ok(port) => {
                info!("Paddle {} ready, ball port {}", session.paddle, port);
                session.mark_ready(port, now);
            }
            Err(e) => {
                warn!("Malformed ready message from {}: {}", conn, e);
                return Vec::new();
            }
        }

        if self.sessions.all_ready() {
            self.start_game(now)
        } else {
            Vec::new()
        }
    }

    fn start_game(&mut self, now: f64) -> Vec<Outgoing> {
        self.world.reset();
        self.sessions.touch_all(now);
        self.send_cooldown.reset();
        self.transition(Phase::Playing);
        info!("Game started");

        self.sessions
            .connections()
            .into_iter()
            .map(|conn| Outgoing::Reliable {
                conn,
                message: Reliable::GameStarted,
            })
            .collect()
    }

    /// The control connection closed or failed.
    pub fn on_disconnect(&mut self, conn: ConnectionId, _now: f64) -> Vec<Outgoing> {
        let Some(session) = self.sessions.remove_session(conn) else {
            return Vec::new();
        };

        if self.phase != Phase::Playing {
            // Leaving before the game starts only frees the paddle.
            self.transition(Phase::WaitingForPlayers);
            return Vec::new();
        }

        info!("Paddle {} disconnected mid-game", session.paddle);
        let mut outgoing = Vec::new();
        for remaining in self.sessions.connections() {
            outgoing.push(Outgoing::Reliable {
                conn: remaining,
                message: Reliable::Control(ControlMessage::OpponentDisconnected),
            });
        }
        outgoing.extend(self.reset());
        outgoing
    }

    /// A datagram arrived on the server's datagram socket.
    pub fn on_datagram(&mut self, from: SocketAddr, bytes: &[u8], now: f64) -> Vec<Outgoing> {
        let sample = match PositionSample::decode(bytes) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Dropping malformed datagram from {}: {}", from, e);
                return Vec::new();
            }
        };

        if self.phase != Phase::Playing {
            return Vec::new();
        }

        let Some(paddle) = self.sessions.find_by_addr(from, sample.origin_port) else {
            debug!("Datagram from unknown sender {}", from);
            return Vec::new();
        };

        if sample.is_ball {
            warn!("Paddle {} sent a ball position; ignoring", paddle);
            return Vec::new();
        }

        self.sessions.touch(paddle, now);
        self.world.accept_paddle_sample(paddle, sample, now);

        match self.sessions.get(paddle.opponent()) {
            Some(opponent) => vec![Outgoing::Datagram {
                to: opponent.peer,
                sample,
            }],
            None => Vec::new(),
        }
    }

    /// Runs one simulation step and the periodic duties of a running game.
    pub fn tick(&mut self, dt: f32, now: f64) -> Vec<Outgoing> {
        if self.phase != Phase::Playing {
            return Vec::new();
        }

        let timed_out = self
            .sessions
            .check_timeouts(now, self.config.heartbeat_timeout);
        if let Some(&conn) = timed_out.first() {
            warn!("Connection {} timed out", conn);
            let mut outgoing = vec![Outgoing::Close { conn }];
            outgoing.extend(self.on_disconnect(conn, now));
            return outgoing;
        }

        let outcome = self.world.tick(dt, now);
        let mut outgoing = Vec::new();

        if outcome.scored.is_some() {
            let update = ScoreMessage::new(now, self.world.score);
            for conn in self.sessions.connections() {
                outgoing.push(Outgoing::Reliable {
                    conn,
                    message: Reliable::Control(ControlMessage::ScoreUpdate(update)),
                });
            }
        }

        if let Some(winner) = outcome.winner {
            self.transition(Phase::GameOver);
            info!("Player {} wins", winner);
            for conn in self.sessions.connections() {
                outgoing.push(Outgoing::Reliable {
                    conn,
                    message: Reliable::Control(ControlMessage::Winner(winner)),
                });
            }
            outgoing.extend(self.reset());
            return outgoing;
        }

        if self.send_cooldown.ready(now) {
            let sample = PositionSample::new(
                now,
                self.world.ball.position,
                true,
                self.config.datagram_port,
            );
            for session in self.sessions.iter() {
                match session.ball_addr() {
                    Some(to) => outgoing.push(Outgoing::Datagram { to, sample }),
                    None => error!("Paddle {} is playing without a ball port", session.paddle),
                }
            }
        }

        if self.log_cooldown.ready(now) {
            debug!(
                "Ball at ({:.1}, {:.1}), paddles at {:.1} / {:.1}",
                self.world.ball.position.x,
                self.world.ball.position.y,
                self.world.paddle(PaddleId::One).paddle.position.y,
                self.world.paddle(PaddleId::Two).paddle.position.y,
            );
        }

        outgoing
    }

    /// Closes every remaining connection and restores a fresh world.
    fn reset(&mut self) -> Vec<Outgoing> {
        self.transition(Phase::Reset);
        let outgoing = self
            .sessions
            .connections()
            .into_iter()
            .map(|conn| Outgoing::Close { conn })
            .collect();
        self.sessions.clear();
        self.world.reset();
        self.send_cooldown.reset();
        self.transition(Phase::WaitingForPlayers);
        outgoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Score, Vec2, BALL_SPEED};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn ready(port: u16) -> Vec<u8> {
        Handshake::ReadyPort(port).encode().unwrap()
    }

    fn playing_match() -> Match {
        let mut game = Match::new(ServerConfig::default());
        game.on_connect(ConnectionId(1), addr(5001), 0.0);
        game.on_connect(ConnectionId(2), addr(5002), 0.0);
        game.on_control_frame(ConnectionId(1), &ready(6001), 0.0);
        game.on_control_frame(ConnectionId(2), &ready(6002), 0.0);
        assert_eq!(game.phase(), Phase::Playing);
        game
    }

    fn closes(outgoing: &[Outgoing]) -> Vec<ConnectionId> {
        outgoing
            .iter()
            .filter_map(|o| match o {
                Outgoing::Close { conn } => Some(*conn),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_handshake_flow() {
        let mut game = Match::new(ServerConfig::default());
        assert_eq!(game.phase(), Phase::WaitingForPlayers);

        let out = game.on_connect(ConnectionId(1), addr(5001), 0.0);
        assert_eq!(
            out,
            vec![Outgoing::Reliable {
                conn: ConnectionId(1),
                message: Reliable::Assignment(PaddleId::One)
            }]
        );
        assert_eq!(game.phase(), Phase::WaitingForPlayers);

        // Ready before the opponent arrives is remembered.
        assert!(game
            .on_control_frame(ConnectionId(1), &ready(6001), 0.1)
            .is_empty());

        let out = game.on_connect(ConnectionId(2), addr(5002), 0.2);
        assert!(matches!(
            out[0],
            Outgoing::Reliable {
                message: Reliable::Assignment(PaddleId::Two),
                ..
            }
        ));
        assert_eq!(game.phase(), Phase::ReadyHandshake);

        let out = game.on_control_frame(ConnectionId(2), &ready(6002), 0.3);
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|o| matches!(
            o,
            Outgoing::Reliable {
                message: Reliable::GameStarted,
                ..
            }
        )));
    }

    #[test]
    fn test_third_player_rejected() {
        let mut game = Match::new(ServerConfig::default());
        game.on_connect(ConnectionId(1), addr(5001), 0.0);
        game.on_connect(ConnectionId(2), addr(5002), 0.0);
        let out = game.on_connect(ConnectionId(3), addr(5003), 0.0);
        assert_eq!(out, vec![Outgoing::Close { conn: ConnectionId(3) }]);
    }

    #[test]
    fn test_malformed_ready_is_ignored() {
        let mut game = Match::new(ServerConfig::default());
        game.on_connect(ConnectionId(1), addr(5001), 0.0);
        assert!(game.on_control_frame(ConnectionId(1), &[], 0.0).is_empty());
        assert!(!game.sessions().get(PaddleId::One).unwrap().ready);
    }

    #[test]
    fn test_leaving_during_handshake_frees_paddle() {
        let mut game = Match::new(ServerConfig::default());
        game.on_connect(ConnectionId(1), addr(5001), 0.0);
        game.on_connect(ConnectionId(2), addr(5002), 0.0);

        assert!(game.on_disconnect(ConnectionId(1), 0.5).is_empty());
        assert_eq!(game.phase(), Phase::WaitingForPlayers);

        let out = game.on_connect(ConnectionId(3), addr(5003), 1.0);
        assert!(matches!(
            out[0],
            Outgoing::Reliable {
                message: Reliable::Assignment(PaddleId::One),
                ..
            }
        ));
    }

    #[test]
    fn test_paddle_datagram_is_relayed_to_opponent() {
        let mut game = playing_match();
        let sample = PositionSample::new(0.5, Vec2::new(50.0, 200.0), false, 5001);

        let out = game.on_datagram(addr(5001), &sample.encode().unwrap(), 0.5);

        assert_eq!(
            out,
            vec![Outgoing::Datagram {
                to: addr(5002),
                sample
            }]
        );
        assert_eq!(game.sessions().get(PaddleId::One).unwrap().last_message, 0.5);
    }

    #[test]
    fn test_malformed_and_unknown_datagrams_dropped() {
        let mut game = playing_match();
        assert!(game.on_datagram(addr(5001), &[1, 2, 3], 0.5).is_empty());

        let sample = PositionSample::new(0.5, Vec2::ZERO, false, 9999);
        assert!(game
            .on_datagram(addr(9999), &sample.encode().unwrap(), 0.5)
            .is_empty());
    }

    #[test]
    fn test_ball_positions_sent_on_cooldown() {
        let mut game = playing_match();

        let out = game.tick(0.004, 0.01);
        let targets: Vec<SocketAddr> = out
            .iter()
            .filter_map(|o| match o {
                Outgoing::Datagram { to, sample } if sample.is_ball => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![addr(6001), addr(6002)]);

        assert!(game.tick(0.004, 0.05).is_empty());
        assert_eq!(game.tick(0.004, 0.12).len(), 2);
    }

    #[test]
    fn test_score_update_broadcast() {
        let mut game = playing_match();
        game.world_mut().ball.position = Vec2::new(1.0, 100.0);
        game.world_mut().ball.velocity = Vec2::new(-BALL_SPEED, 0.0);

        let out = game.tick(0.01, 0.01);

        let updates: Vec<&ControlMessage> = out
            .iter()
            .filter_map(|o| match o {
                Outgoing::Reliable {
                    message: Reliable::Control(message),
                    ..
                } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 2);
        match updates[0] {
            ControlMessage::ScoreUpdate(scores) => assert_eq!(scores.score(), Score::new(0, 1)),
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_win_broadcasts_winner_and_resets() {
        let mut game = playing_match();
        game.world_mut().score = Score::new(6, 2);
        game.world_mut().ball.position = Vec2::new(1270.0, 100.0);
        game.world_mut().ball.velocity = Vec2::new(BALL_SPEED, 0.0);

        let out = game.tick(0.01, 0.01);

        assert!(out.contains(&Outgoing::Reliable {
            conn: ConnectionId(1),
            message: Reliable::Control(ControlMessage::Winner(PaddleId::One)),
        }));
        assert_eq!(closes(&out), vec![ConnectionId(1), ConnectionId(2)]);
        assert_eq!(game.phase(), Phase::WaitingForPlayers);
        assert!(game.sessions().is_empty());
        assert_eq!(game.world().score, Score::default());
    }

    #[test]
    fn test_disconnect_mid_game_notifies_and_resets() {
        let mut game = playing_match();
        let out = game.on_disconnect(ConnectionId(2), 1.0);

        assert_eq!(
            out[0],
            Outgoing::Reliable {
                conn: ConnectionId(1),
                message: Reliable::Control(ControlMessage::OpponentDisconnected),
            }
        );
        assert_eq!(closes(&out), vec![ConnectionId(1)]);
        assert_eq!(game.phase(), Phase::WaitingForPlayers);

        // Events from the torn-down connections are ignored.
        assert!(game.on_disconnect(ConnectionId(1), 1.1).is_empty());
        assert!(game
            .on_control_frame(ConnectionId(2), &ready(6002), 1.1)
            .is_empty());
    }

    #[test]
    fn test_heartbeat_timeout() {
        let mut game = playing_match();
        let alive = PositionSample::new(4.0, Vec2::new(1230.0, 300.0), false, 5002);
        game.on_datagram(addr(5002), &alive.encode().unwrap(), 4.0);

        let out = game.tick(0.004, 5.0);

        assert_eq!(out[0], Outgoing::Close { conn: ConnectionId(1) });
        assert!(out.contains(&Outgoing::Reliable {
            conn: ConnectionId(2),
            message: Reliable::Control(ControlMessage::OpponentDisconnected),
        }));
        assert_eq!(game.phase(), Phase::WaitingForPlayers);
    }

    #[test]
    fn test_connect_while_playing_is_rejected() {
        let mut game = playing_match();
        let out = game.on_connect(ConnectionId(9), addr(5009), 1.0);
        assert_eq!(out, vec![Outgoing::Close { conn: ConnectionId(9) }]);
    }
}
