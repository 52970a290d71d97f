//! Client engine for the Minecraft 1.7 wire protocol.
//!
//! The protocol types and codecs live in the `andesite-mc` crate; this
//! crate owns everything stateful: the connection lifecycle and session
//! state machine ([`client`]), the packet receive pipeline ([`pipeline`]),
//! and inbound packet dispatch ([`dispatch`]).
//!
//! The engine has no rendering dependency. It talks to whatever owns the
//! application loop through two narrow interfaces: a tick interval the loop
//! creates itself, and the inbound packet source ([`client::Client::recv`]).
//! The `andesite` binary is a headless consumer of exactly those two.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod pipeline;
