//! Client connection lifecycle and session state machine.
//!
//! A [`Client`] owns one outbound connection to one server. The session
//! progresses through [`SessionState`] in a single direction:
//! `Disconnected -> Handshaking -> {AwaitingStatusResponse |
//! AwaitingLoginSuccess -> Play}`, returning to `Disconnected` only through
//! explicit shutdown or a fatal I/O error. Every send is checked against
//! the current state, so packets can never go out in a phase where they are
//! not legal.

use std::time::Instant;

use andesite_mc::codec::{RawPacket, read_packet, write_packet};
use andesite_mc::packets::{
    Handshake, KeepAlive, LoginStart, LoginSuccess, NextState, Ping, Pong, StatusRequest,
    StatusResponse,
};
use andesite_mc::version::ProtocolVersion;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::{self, GameEvent};
use crate::error::{ClientError, Result};
use crate::pipeline;

/// Protocol version sent in every handshake.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V4;

/// Session state progression for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection. The only state that allows `connect`.
    Disconnected,
    /// Socket open, handshake not yet sent.
    Handshaking,
    /// Handshake selected status mode; a status exchange is pending.
    AwaitingStatusResponse,
    /// Handshake selected login mode; a login success is pending.
    AwaitingLoginSuccess,
    /// Steady state after login success; the receive pipeline is running.
    Play,
}

/// Identity assigned by the server on login success.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Session id (uuid in text form).
    pub session_id: String,
    /// Display name confirmed by the server.
    pub username: String,
}

/// A client connection to one server.
///
/// Exclusively owned by its creator. The receive worker holds only the read
/// half of the socket and the sending side of the inbound queue; dropping
/// the `Client` (or calling [`Client::shutdown`]) stops the worker and
/// closes the socket.
#[derive(Debug)]
pub struct Client {
    host: String,
    port: u16,
    state: SessionState,
    writer: Option<OwnedWriteHalf>,
    reader: Option<BufReader<OwnedReadHalf>>,
    identity: Option<Identity>,
    inbound: Option<mpsc::Receiver<RawPacket>>,
    reader_task: Option<JoinHandle<()>>,
}

impl Client {
    /// Create a disconnected client for the given server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the host is empty or the port is
    /// zero. This is checked before any I/O.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(ClientError::Config("host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(ClientError::Config(
                "port must be in the range 1-65535".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            state: SessionState::Disconnected,
            writer: None,
            reader: None,
            identity: None,
            inbound: None,
            reader_task: None,
        })
    }

    /// The current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The identity assigned at login, if the session reached play state.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Open the TCP connection. On success the state becomes `Handshaking`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the dial fails.
    pub async fn connect(&mut self) -> Result<()> {
        self.expect_state(SessionState::Disconnected, "connect")?;

        let addr = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let (read_half, write_half) = stream.into_split();
        self.reader = Some(BufReader::new(read_half));
        self.writer = Some(write_half);
        self.state = SessionState::Handshaking;

        debug!(host = %self.host, port = self.port, "connected");
        Ok(())
    }

    /// Send the handshake selecting the post-handshake mode.
    ///
    /// Must be the first packet on a fresh connection, before any status or
    /// login packet; valid only from `Handshaking`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is in the wrong state or the write
    /// fails.
    pub async fn send_handshake(&mut self, next_state: NextState) -> Result<()> {
        self.expect_state(SessionState::Handshaking, "send_handshake")?;

        let handshake = Handshake {
            protocol_version: PROTOCOL_VERSION.as_raw(),
            server_address: self.host.clone(),
            server_port: self.port,
            next_state,
        };
        self.write(&handshake.to_raw()).await?;

        self.state = match next_state {
            NextState::Status => SessionState::AwaitingStatusResponse,
            NextState::Login => SessionState::AwaitingLoginSuccess,
        };
        Ok(())
    }

    /// Send an empty status request. Valid only after a status handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is in the wrong state or the write
    /// fails.
    pub async fn send_status_request(&mut self) -> Result<()> {
        self.expect_state(SessionState::AwaitingStatusResponse, "send_status_request")?;
        self.write(&StatusRequest.to_raw()).await
    }

    /// Send a login start with the given username. Valid only after a login
    /// handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is in the wrong state or the write
    /// fails.
    pub async fn send_login_start(&mut self, username: &str) -> Result<()> {
        self.expect_state(SessionState::AwaitingLoginSuccess, "send_login_start")?;
        self.write(&LoginStart::new(username).to_raw()).await
    }

    /// Send a keep-alive token to the server. Valid only in play state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is in the wrong state or the write
    /// fails.
    pub async fn send_keep_alive(&mut self, token: i32) -> Result<()> {
        self.expect_state(SessionState::Play, "send_keep_alive")?;
        self.write(&KeepAlive::new(token).to_raw()).await
    }

    /// Query a server's status without entering a session.
    ///
    /// Performs the full status exchange (handshake, request, response) and
    /// a ping round-trip for latency, then closes the connection and
    /// returns the server's status JSON.
    ///
    /// # Errors
    ///
    /// Returns a configuration, connection, or protocol error; see
    /// [`ClientError`].
    pub async fn ping(host: impl Into<String>, port: u16) -> Result<String> {
        let mut client = Self::new(host, port)?;
        client.connect().await?;
        client.send_handshake(NextState::Status).await?;
        client.send_status_request().await?;

        let raw = client.read().await?;
        let response = StatusResponse::from_raw(&raw)?;

        // Latency round-trip; the server echoes the payload back.
        let started = Instant::now();
        let ping = Ping::new(epoch_millis());
        client.write(&ping.to_raw()).await?;
        let raw = client.read().await?;
        let pong = Pong::from_raw(&raw)?;
        if pong.payload == ping.payload {
            #[allow(clippy::cast_possible_truncation)]
            let latency_ms = started.elapsed().as_millis() as u64;
            debug!(latency_ms, "status ping round-trip");
        } else {
            warn!(
                sent = ping.payload,
                received = pong.payload,
                "server echoed a different ping payload"
            );
        }

        client.shutdown();
        Ok(response.json)
    }

    /// Join a server: connect, handshake, log in, and upgrade the session
    /// to play state with the receive pipeline running.
    ///
    /// The first reply after login start must be Login Success (id 2); any
    /// other id fails the join with an error naming the offending id.
    ///
    /// # Errors
    ///
    /// Returns a configuration, connection, or protocol error; see
    /// [`ClientError`].
    pub async fn join(host: impl Into<String>, port: u16, username: &str) -> Result<Self> {
        let mut client = Self::new(host, port)?;
        info!(host = %client.host, port = client.port, username, "joining server");

        client.connect().await?;
        client.send_handshake(NextState::Login).await?;
        client.send_login_start(username).await?;

        let raw = client.read().await?;
        let success = LoginSuccess::from_raw(&raw)?;
        info!(
            session_id = %success.session_id,
            username = %success.username,
            "login success"
        );

        client.identity = Some(Identity {
            session_id: success.session_id,
            username: success.username,
        });
        client.state = SessionState::Play;

        // Hand the read half to the receive pipeline; from here on the
        // worker is the sole reader of the socket.
        let Some(reader) = client.reader.take() else {
            return Err(ClientError::InvalidState {
                op: "spawn pipeline",
                state: client.state,
            });
        };
        let (tx, rx) = pipeline::channel();
        client.reader_task = Some(pipeline::spawn(reader, tx));
        client.inbound = Some(rx);

        Ok(client)
    }

    /// Receive the next inbound packet.
    ///
    /// Returns `None` once the receive pipeline has terminated (the stream
    /// ended or a framing error killed it), which the caller must treat as
    /// disconnection.
    pub async fn recv(&mut self) -> Option<RawPacket> {
        match self.inbound.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Dispatch one inbound packet, performing any reactive writes (the
    /// keep-alive echo) on this client's socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not in play state, a known
    /// packet's payload is malformed, or the echo write fails.
    pub async fn handle(&mut self, packet: &RawPacket) -> Result<GameEvent> {
        self.expect_state(SessionState::Play, "handle")?;
        let state = self.state;
        let writer = self
            .writer
            .as_mut()
            .ok_or(ClientError::InvalidState { op: "handle", state })?;
        Ok(dispatch::dispatch(writer, packet).await?)
    }

    /// Tear down the connection: stop the receive worker, close the socket,
    /// and return to `Disconnected`.
    ///
    /// Idempotent, and safe to call even if the connection was never fully
    /// established.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.inbound = None;
        self.reader = None;
        self.writer = None;
        if self.state != SessionState::Disconnected {
            debug!(host = %self.host, port = self.port, "disconnected");
        }
        self.state = SessionState::Disconnected;
    }

    /// Read one packet synchronously on the caller's task. Only legal
    /// before the pipeline starts (handshake/status/login phases).
    async fn read(&mut self) -> Result<RawPacket> {
        let reader = self.reader.as_mut().ok_or(ClientError::InvalidState {
            op: "read",
            state: self.state,
        })?;
        Ok(read_packet(reader).await?)
    }

    async fn write(&mut self, packet: &RawPacket) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ClientError::InvalidState {
            op: "write",
            state: self.state,
        })?;
        Ok(write_packet(writer, packet).await?)
    }

    fn expect_state(&self, expected: SessionState, op: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::InvalidState {
                op,
                state: self.state,
            })
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Milliseconds since the Unix epoch, for the status ping payload.
#[allow(clippy::cast_possible_truncation)]
fn epoch_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_host_is_a_config_error() {
        let result = Client::new("", 25565);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_zero_port_is_a_config_error() {
        let result = Client::new("localhost", 0);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_new_client_starts_disconnected() {
        let client = Client::new("localhost", 25565).unwrap();
        assert_eq!(client.state(), SessionState::Disconnected);
        assert!(client.identity().is_none());
    }

    #[tokio::test]
    async fn test_handshake_requires_a_connection() {
        let mut client = Client::new("localhost", 25565).unwrap();
        let result = client.send_handshake(NextState::Status).await;
        assert!(matches!(
            result,
            Err(ClientError::InvalidState {
                op: "send_handshake",
                state: SessionState::Disconnected,
            })
        ));
    }

    #[test]
    fn test_shutdown_is_idempotent_before_connect() {
        let mut client = Client::new("localhost", 25565).unwrap();
        client.shutdown();
        client.shutdown();
        assert_eq!(client.state(), SessionState::Disconnected);
    }
}
