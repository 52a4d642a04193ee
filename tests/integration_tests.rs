//! Integration tests for the paddle sync layer
//!
//! These tests validate the wire formats over real sockets, the full
//! server handshake and cross-crate sync behaviour.

use bincode::serialize;
use serde::Serialize;
use shared::framing::{read_frame, write_frame};
use shared::{
    ControlMessage, Handshake, PaddleId, PositionSample, ProtocolError, Score, ScoreMessage, Vec2,
};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::timeout;
use tokio_test::assert_ok;

const WAIT: Duration = Duration::from_secs(5);

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Field-for-field mirror of the datagram layout
    #[derive(Serialize)]
    struct RawSample {
        timestamp: f64,
        x: f32,
        y: f32,
        is_ball: bool,
        origin_port: u16,
    }

    /// Tests that a position sample matches the fixed 23-byte datagram layout
    #[test]
    fn position_sample_layout() {
        let sample = PositionSample::new(12.5, Vec2::new(632.5, 352.5), true, 4444);
        let raw = RawSample {
            timestamp: 12.5,
            x: 632.5,
            y: 352.5,
            is_ball: true,
            origin_port: 4444,
        };

        let encoded = assert_ok!(sample.encode());
        assert_eq!(encoded.len(), 23);
        assert_eq!(encoded, serialize(&raw).unwrap());
        assert_eq!(&encoded[..8], &12.5f64.to_le_bytes());
        assert_eq!(&encoded[21..], &4444u16.to_le_bytes());
    }

    /// Tests real UDP socket communication
    #[tokio::test]
    async fn udp_sample_over_socket() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sample = PositionSample::new(3.25, Vec2::new(50.0, 120.0), false, 5000);

        sender
            .send_to(&sample.encode().unwrap(), receiver.local_addr().unwrap())
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = timeout(WAIT, receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(len, 23);
        assert_eq!(from, sender.local_addr().unwrap());
        assert_eq!(assert_ok!(PositionSample::decode(&buf[..len])), sample);
    }

    /// Tests control frames over a real TCP connection
    #[tokio::test]
    async fn control_frames_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let writer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            for message in [
                Handshake::Assignment(PaddleId::Two).encode().unwrap(),
                Handshake::GameStarted.encode().unwrap(),
                ControlMessage::ScoreUpdate(ScoreMessage::new(2.0, Score::new(3, 1)))
                    .encode()
                    .unwrap(),
                ControlMessage::Winner(PaddleId::One).encode().unwrap(),
            ] {
                write_frame(&mut stream, &message).await.unwrap();
            }
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();

        let frame = read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(Handshake::decode_assignment(&frame).unwrap(), PaddleId::Two);

        let frame = read_frame(&mut stream).await.unwrap().unwrap();
        assert_ok!(Handshake::decode_game_started(&frame));

        let frame = read_frame(&mut stream).await.unwrap().unwrap();
        match ControlMessage::decode(&frame).unwrap() {
            ControlMessage::ScoreUpdate(update) => assert_eq!(update.score(), Score::new(3, 1)),
            other => panic!("Unexpected message {:?}", other),
        }

        let frame = read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(
            ControlMessage::decode(&frame).unwrap(),
            ControlMessage::Winner(PaddleId::One)
        );

        writer.await.unwrap();
        assert!(read_frame(&mut stream).await.unwrap().is_none());
    }

    /// Tests malformed input handling
    #[test]
    fn malformed_messages_are_rejected() {
        let valid = PositionSample::new(1.0, Vec2::ZERO, false, 1).encode().unwrap();
        assert!(PositionSample::decode(&valid[..valid.len() / 2]).is_err());
        assert!(matches!(
            PositionSample::decode(&[]),
            Err(ProtocolError::Empty)
        ));

        assert!(matches!(
            ControlMessage::decode(&[9, 0, 0, 0]),
            Err(ProtocolError::UnknownHeader(9))
        ));
        assert!(matches!(
            Handshake::decode_assignment(&3i32.to_le_bytes()),
            Err(ProtocolError::InvalidPaddleId(3))
        ));
    }
}

/// SERVER SESSION TESTS
mod session_tests {
    use super::*;
    use server::config::ServerConfig;
    use server::network::Server;

    fn ephemeral_config() -> ServerConfig {
        ServerConfig {
            datagram_port: 0,
            control_port: 0,
            send_interval: Duration::from_millis(20),
            ..ServerConfig::default()
        }
    }

    async fn start_server() -> ServerConfig {
        let mut server = assert_ok!(Server::bind(ephemeral_config()).await);
        let config = server.config().clone();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        config
    }

    /// A raw player speaking the wire protocol directly
    struct Player {
        stream: TcpStream,
        paddle_socket: UdpSocket,
        ball_socket: UdpSocket,
    }

    impl Player {
        async fn join(config: &ServerConfig, expected: PaddleId) -> Player {
            let mut stream = TcpStream::connect(config.control_addr()).await.unwrap();
            let frame = timeout(WAIT, read_frame(&mut stream))
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(Handshake::decode_assignment(&frame).unwrap(), expected);

            let paddle_socket = UdpSocket::bind(stream.local_addr().unwrap()).await.unwrap();
            let ball_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            Player {
                stream,
                paddle_socket,
                ball_socket,
            }
        }

        async fn ready(&mut self) {
            let port = self.ball_socket.local_addr().unwrap().port();
            let frame = Handshake::ReadyPort(port).encode().unwrap();
            assert_ok!(write_frame(&mut self.stream, &frame).await);
        }

        async fn next_frame(&mut self) -> Option<Vec<u8>> {
            timeout(WAIT, read_frame(&mut self.stream))
                .await
                .unwrap()
                .unwrap()
        }

        async fn next_datagram(socket: &UdpSocket) -> PositionSample {
            let mut buf = [0u8; 64];
            let (len, _) = timeout(WAIT, socket.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();
            PositionSample::decode(&buf[..len]).unwrap()
        }
    }

    /// Tests the handshake, datagram flow and disconnect notice end to end
    #[tokio::test]
    async fn two_player_session() {
        let config = start_server().await;

        let mut one = Player::join(&config, PaddleId::One).await;
        let mut two = Player::join(&config, PaddleId::Two).await;

        one.ready().await;
        two.ready().await;
        for player in [&mut one, &mut two] {
            let frame = player.next_frame().await.unwrap();
            assert_ok!(Handshake::decode_game_started(&frame));
        }

        let ball = Player::next_datagram(&one.ball_socket).await;
        assert!(ball.is_ball);
        assert_eq!(ball.origin_port, config.datagram_port);

        // paddle one's position is relayed to paddle two's control port
        let x = PaddleId::One.home_position().x;
        let sample = PositionSample::new(
            1.0,
            Vec2::new(x, 200.0),
            false,
            one.stream.local_addr().unwrap().port(),
        );
        one.paddle_socket
            .send_to(&sample.encode().unwrap(), config.datagram_addr())
            .await
            .unwrap();
        let relayed = Player::next_datagram(&two.paddle_socket).await;
        assert!(!relayed.is_ball);
        assert_eq!(relayed.position(), Vec2::new(x, 200.0));

        drop(one);

        let frame = two.next_frame().await.unwrap();
        assert_eq!(
            ControlMessage::decode(&frame).unwrap(),
            ControlMessage::OpponentDisconnected
        );
        assert!(two.next_frame().await.is_none());
    }

    /// Tests that a third connection is turned away while two are seated
    #[tokio::test]
    async fn third_player_is_rejected() {
        let config = start_server().await;

        let _one = Player::join(&config, PaddleId::One).await;
        let _two = Player::join(&config, PaddleId::Two).await;

        let mut third = TcpStream::connect(config.control_addr()).await.unwrap();
        let frame = timeout(WAIT, read_frame(&mut third)).await.unwrap();
        assert!(matches!(frame, Ok(None) | Err(_)));
    }

    /// Tests that a player leaving during the handshake frees its paddle
    #[tokio::test]
    async fn handshake_leaver_frees_paddle() {
        let config = start_server().await;

        let one = Player::join(&config, PaddleId::One).await;
        let _two = Player::join(&config, PaddleId::Two).await;
        drop(one);

        // give the server a moment to observe the close
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _again = Player::join(&config, PaddleId::One).await;
    }
}

/// CLIENT LIFECYCLE TESTS
mod client_tests {
    use super::*;
    use client::config::ClientConfig;
    use client::frontend::Frontend;
    use client::game::{ClientEvent, DisplayState};
    use client::input::KeyState;
    use client::network::{Client, LinkState, Outcome};
    use server::config::ServerConfig;
    use server::network::Server;

    /// Plays one session, then declines the next one
    #[derive(Default)]
    struct Scripted {
        events: Vec<ClientEvent>,
        frames: usize,
    }

    impl Frontend for Scripted {
        fn confirm_ready(&mut self, _: PaddleId) -> bool {
            !self.events.contains(&ClientEvent::OpponentLeft)
        }

        fn poll_keys(&mut self) -> KeyState {
            KeyState::default()
        }

        fn present(&mut self, _: &DisplayState) {
            self.frames += 1;
        }

        fn notify(&mut self, event: &ClientEvent) {
            self.events.push(*event);
        }
    }

    /// Tests handshake, opponent departure and reconnect of a real client
    #[tokio::test]
    async fn client_reconnects_after_opponent_leaves() {
        let mut server = assert_ok!(
            Server::bind(ServerConfig {
                datagram_port: 0,
                control_port: 0,
                ..ServerConfig::default()
            })
            .await
        );
        let server_config = server.config().clone();
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        // raw opponent takes paddle one
        let mut opponent = TcpStream::connect(server_config.control_addr()).await.unwrap();
        let frame = read_frame(&mut opponent).await.unwrap().unwrap();
        assert_eq!(Handshake::decode_assignment(&frame).unwrap(), PaddleId::One);

        let config = ClientConfig {
            server: server_config.host.clone(),
            datagram_port: server_config.datagram_port,
            control_port: server_config.control_port,
            reconnect_delay: Duration::from_millis(20),
            ..ClientConfig::default()
        };
        let mut client = Client::new(config, Scripted::default());
        let handle = tokio::spawn(async move {
            let ok = client.run().await.is_ok();
            (ok, client)
        });

        let ball_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let ready = Handshake::ReadyPort(ball_socket.local_addr().unwrap().port())
            .encode()
            .unwrap();
        write_frame(&mut opponent, &ready).await.unwrap();
        let frame = timeout(WAIT, read_frame(&mut opponent))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_ok!(Handshake::decode_game_started(&frame));

        // let the client run a few frames before leaving
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(opponent);

        let (ok, client) = timeout(WAIT, handle).await.unwrap().unwrap();
        assert!(ok);
        assert_eq!(client.state(), LinkState::Finished(Outcome::Quit));

        let events = &client.frontend().events;
        assert_eq!(events[0], ClientEvent::Assigned(PaddleId::Two));
        assert!(events.contains(&ClientEvent::GameStarted));
        assert!(events.contains(&ClientEvent::OpponentLeft));
        assert_eq!(events.last(), Some(&ClientEvent::Assigned(PaddleId::One)));
        assert!(client.frontend().frames > 0);
    }
}

/// SYNC SCENARIO TESTS
mod sync_tests {
    use super::*;
    use client::game::{ClientEvent, ClientGameState};
    use server::game::World;
    use shared::{Ball, BALL_SPEED, COURT_HEIGHT, WINNING_SCORE};

    const FRAME: f64 = 0.004;

    /// Tests that the displayed ball follows the authoritative ball between datagrams
    #[test]
    fn client_ball_tracks_server_ball() {
        let mut world = World::new(WINNING_SCORE);
        world.ball.velocity = Vec2::new(BALL_SPEED, 0.0);
        let mut game = ClientGameState::new(PaddleId::One, true);

        let start = game.ball.position.x;
        let mut now = 0.0;
        let mut next_send = 0.0;

        // 0.8 s keeps the ball clear of the far paddle
        for _ in 0..200 {
            now += FRAME;
            world.tick(FRAME as f32, now);

            if now >= next_send {
                let sample = PositionSample::new(now, world.ball.position, true, 4444);
                game.receive_sample(sample, now);
                next_send += 0.1;
            }
            game.frame(now, FRAME);
        }

        assert!(game.ball.position.x > start + 300.0);
        assert!((game.ball.position.x - world.ball.position.x).abs() < 5.0);
        assert!((game.ball.position.y - world.ball.position.y).abs() < 1.0);
    }

    /// Tests that a re-served ball is snapped instead of interpolated
    #[test]
    fn reserved_ball_snaps_to_centre() {
        let mut game = ClientGameState::new(PaddleId::Two, true);
        game.ball.position = Vec2::new(1262.0, 100.0);

        let event = game.receive_sample(
            PositionSample::new(5.0, Ball::serve_position(), true, 4444),
            5.0,
        );

        assert_eq!(event, Some(ClientEvent::BallReserved));
        assert_eq!(game.ball.position, Ball::serve_position());
    }

    /// Tests that the server scores while the client snaps without prediction
    #[test]
    fn scoring_and_snapping_without_prediction() {
        let mut world = World::new(WINNING_SCORE);
        world.ball.position = Vec2::new(5.0, COURT_HEIGHT / 4.0);
        world.ball.velocity = Vec2::new(-BALL_SPEED, 0.0);
        let mut game = ClientGameState::new(PaddleId::One, false);

        let outcome = world.tick(0.02, 0.02);
        assert_eq!(outcome.scored, Some(PaddleId::Two));

        game.receive_sample(
            PositionSample::new(0.02, world.ball.position, true, 4444),
            0.02,
        );
        game.apply_control(ControlMessage::ScoreUpdate(ScoreMessage::new(
            0.02,
            world.score,
        )));

        assert_eq!(game.ball.position, Ball::serve_position());
        assert_eq!(game.display().score, Score::new(0, 1));
    }
}
