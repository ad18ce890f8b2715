//! Protocol crate - message model, XML codec and stream framing
//!
//! The game server speaks a single XML stream per connection. Each direction
//! opens with `<protocol>`; after that every top-level element is one message.
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **join**: `<join/>`, `<joinPrepared reservationCode="…"/>` or `<joinRoom roomId="…"/>`
//! - **move**: `<room roomId="…"><data class="move">…</data></room>`
//!
//! ## Server → Client
//!
//! - **joined**: `<joined roomId="…"/>`
//! - **welcomeMessage**: team assignment inside a room envelope
//! - **memento**: full game state snapshot
//! - **moveRequest**: it is this client's turn
//! - **result**: game over with scores and winner
//! - **error**: room error or top-level `<errorpacket>`
//! - **left**: the room was closed
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: <protocol><joinPrepared reservationCode="c0ffee"/>
//! Server -> Client: <protocol><joined roomId="7f2e"/>
//! Server -> Client: <room roomId="7f2e"><data class="welcomeMessage" team="ONE"/></room>
//! Server -> Client: <room roomId="7f2e"><data class="memento"><state turn="0">…</state></data></room>
//! Server -> Client: <room roomId="7f2e"><data class="moveRequest"/></room>
//! Client -> Server: <room roomId="7f2e"><data class="move"><to x="3" y="5"/></data></room>
//! Server -> Client: <room roomId="7f2e"><data class="result">…</data></room>
//! Server -> Client: <left roomId="7f2e"/></protocol>
//! ```
//!
//! Game payloads (state, move, result bodies) are carried as raw markup; see
//! [`socha_types::Snapshot`].

pub mod codec;
pub mod framing;
pub mod message;

pub use socha_types as types;

pub use codec::{decode, decode_str, encode, winner, MalformedMessageError, EPILOGUE, PREAMBLE};
pub use framing::{Frame, FrameBuffer, FrameError, DEFAULT_MAX_FRAME_BYTES};
pub use message::{create_join, create_move, ErrorContext, ProtocolMessage};
