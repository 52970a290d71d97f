//! End-to-end session tests against a scripted in-process server.
//!
//! Each test binds a loopback listener and plays the server's half of the
//! protocol with the same packet types the client uses, so both directions
//! of every exchange are exercised over a real TCP stream.

use andesite::client::{Client, SessionState};
use andesite::dispatch::GameEvent;
use andesite::error::ClientError;
use andesite_mc::ProtocolError;
use andesite_mc::codec::{RawPacket, read_packet, write_packet};
use andesite_mc::packets::{
    Handshake, KeepAlive, LoginStart, LoginSuccess, NextState, Ping, Pong, StatusRequest,
    StatusResponse, TimeUpdate,
};
use bytes::BytesMut;
use tokio::net::{TcpListener, TcpStream};

const SESSION_ID: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Accept one connection and play the server's half of the login flow,
/// returning the play-state stream along with what the client sent.
async fn accept_login(listener: &TcpListener) -> (TcpStream, Handshake, LoginStart) {
    let (mut stream, _) = listener.accept().await.unwrap();

    let handshake = Handshake::from_raw(&read_packet(&mut stream).await.unwrap()).unwrap();
    let login = LoginStart::from_raw(&read_packet(&mut stream).await.unwrap()).unwrap();

    let success = LoginSuccess::new(SESSION_ID, login.username.clone());
    write_packet(&mut stream, &success.to_raw()).await.unwrap();

    (stream, handshake, login)
}

#[tokio::test]
async fn join_completes_login_and_enters_play() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (_stream, handshake, login) = accept_login(&listener).await;
        assert_eq!(handshake.protocol_version, 4);
        assert_eq!(handshake.server_address, "127.0.0.1");
        assert_eq!(handshake.server_port, port);
        assert_eq!(handshake.next_state, NextState::Login);
        assert_eq!(login.username, "steve");
    });

    let client = Client::join("127.0.0.1", port, "steve").await.unwrap();
    assert_eq!(client.state(), SessionState::Play);

    let identity = client.identity().unwrap();
    assert_eq!(identity.session_id, SESSION_ID);
    assert_eq!(identity.username, "steve");

    server.await.unwrap();
}

#[tokio::test]
async fn keep_alive_is_echoed_back_to_the_server() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _, _) = accept_login(&listener).await;

        write_packet(&mut stream, &KeepAlive::new(0x2A).to_raw())
            .await
            .unwrap();

        // The echo must carry id 0 and the identical 4-byte token.
        let echo = read_packet(&mut stream).await.unwrap();
        assert_eq!(echo.id, 0x00);
        assert_eq!(&echo.payload[..], &[0x00, 0x00, 0x00, 0x2A]);
    });

    let mut client = Client::join("127.0.0.1", port, "steve").await.unwrap();

    let packet = client.recv().await.expect("keep-alive should arrive");
    let event = client.handle(&packet).await.unwrap();
    assert!(matches!(event, GameEvent::KeepAlive(k) if k.token == 0x2A));

    server.await.unwrap();
}

#[tokio::test]
async fn ping_returns_the_status_json() {
    let (listener, port) = bind().await;
    let status_json = r#"{"version":{"name":"1.7.5","protocol":4},"players":{"max":20,"online":1}}"#;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let handshake = Handshake::from_raw(&read_packet(&mut stream).await.unwrap()).unwrap();
        assert_eq!(handshake.next_state, NextState::Status);

        let raw = read_packet(&mut stream).await.unwrap();
        StatusRequest::from_raw(&raw).unwrap();
        assert!(raw.payload.is_empty());

        write_packet(&mut stream, &StatusResponse::new(status_json).to_raw())
            .await
            .unwrap();

        let ping = Ping::from_raw(&read_packet(&mut stream).await.unwrap()).unwrap();
        write_packet(&mut stream, &Pong::new(ping.payload).to_raw())
            .await
            .unwrap();
    });

    let json = Client::ping("127.0.0.1", port).await.unwrap();
    assert_eq!(json, status_json);

    server.await.unwrap();
}

#[tokio::test]
async fn login_reply_with_wrong_id_fails_naming_the_id() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_packet(&mut stream).await.unwrap(); // handshake
        read_packet(&mut stream).await.unwrap(); // login start

        // Reply with something that is not Login Success.
        write_packet(&mut stream, &RawPacket::empty(0x05))
            .await
            .unwrap();
    });

    let err = Client::join("127.0.0.1", port, "steve").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Protocol(ProtocolError::UnexpectedPacket {
            expected: 0x02,
            actual: 0x05,
        })
    ));
    assert!(err.to_string().contains('5'), "error must name the id: {err}");

    server.await.unwrap();
}

#[tokio::test]
async fn unknown_packet_id_is_skipped_and_the_pipeline_continues() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _, _) = accept_login(&listener).await;

        let mystery = RawPacket::new(0x7F, BytesMut::from(&[0xDE, 0xAD, 0xBE, 0xEF][..]));
        write_packet(&mut stream, &mystery).await.unwrap();
        write_packet(&mut stream, &KeepAlive::new(7).to_raw())
            .await
            .unwrap();

        // The pipeline must still deliver and echo the keep-alive.
        let echo = read_packet(&mut stream).await.unwrap();
        assert_eq!(echo.id, 0x00);
        assert_eq!(&echo.payload[..], &[0x00, 0x00, 0x00, 0x07]);
    });

    let mut client = Client::join("127.0.0.1", port, "steve").await.unwrap();

    let packet = client.recv().await.unwrap();
    let event = client.handle(&packet).await.unwrap();
    assert!(matches!(event, GameEvent::Unknown { id: 0x7F }));

    let packet = client.recv().await.unwrap();
    let event = client.handle(&packet).await.unwrap();
    assert!(matches!(event, GameEvent::KeepAlive(k) if k.token == 7));

    server.await.unwrap();
}

#[tokio::test]
async fn play_packets_arrive_in_wire_order() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _, _) = accept_login(&listener).await;

        for age in 0..3_i64 {
            let time = TimeUpdate {
                world_age: age,
                time_of_day: age * 24_000,
            };
            write_packet(&mut stream, &time.to_raw()).await.unwrap();
        }
        stream
    });

    let mut client = Client::join("127.0.0.1", port, "steve").await.unwrap();

    for age in 0..3_i64 {
        let packet = client.recv().await.unwrap();
        let event = client.handle(&packet).await.unwrap();
        match event {
            GameEvent::TimeUpdate(time) => assert_eq!(time.world_age, age),
            other => panic!("expected TimeUpdate, got {other:?}"),
        }
    }

    server.await.unwrap();
}

#[tokio::test]
async fn client_can_send_a_keep_alive_proactively() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (mut stream, _, _) = accept_login(&listener).await;

        let keep_alive = KeepAlive::from_raw(&read_packet(&mut stream).await.unwrap()).unwrap();
        assert_eq!(keep_alive.token, 99);
    });

    let mut client = Client::join("127.0.0.1", port, "steve").await.unwrap();
    client.send_keep_alive(99).await.unwrap();

    server.await.unwrap();
}

#[tokio::test]
async fn status_request_after_play_is_rejected() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _, _) = accept_login(&listener).await;
        stream
    });

    let mut client = Client::join("127.0.0.1", port, "steve").await.unwrap();
    assert_eq!(client.state(), SessionState::Play);

    let err = client.send_status_request().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::InvalidState {
            op: "send_status_request",
            state: SessionState::Play,
        }
    ));

    server.await.unwrap();
}

#[tokio::test]
async fn server_close_surfaces_as_end_of_inbound_packets() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _, _) = accept_login(&listener).await;
        drop(stream);
    });

    let mut client = Client::join("127.0.0.1", port, "steve").await.unwrap();
    server.await.unwrap();

    // The pipeline terminates; no further packets will ever arrive.
    assert!(client.recv().await.is_none());
    assert!(client.recv().await.is_none());
}

#[tokio::test]
async fn shutdown_after_join_is_idempotent() {
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _, _) = accept_login(&listener).await;
        stream
    });

    let mut client = Client::join("127.0.0.1", port, "steve").await.unwrap();
    server.await.unwrap();

    client.shutdown();
    assert_eq!(client.state(), SessionState::Disconnected);
    client.shutdown();
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(client.recv().await.is_none());
}
