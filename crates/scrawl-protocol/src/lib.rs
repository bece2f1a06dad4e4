//! Wire protocol for Scrawl.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Commands** ([`ClientCommand`]): everything a client may ask for,
//!   tagged by a `type` field.
//! - **Events** ([`ServerEvent`], [`RoomEvent`]): everything the server
//!   pushes back, either to one connection or fanned out to a room.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages are turned
//!   into wire bytes and back.
//!
//! The protocol layer sits between transport (raw frames) and the game
//! engine. It does not know about connections, rooms, or rules; it only
//! knows how to name and serialize messages.

mod codec;
mod command;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::{ClientCommand, ModAction};
pub use error::ProtocolError;
pub use event::{RoomEvent, ServerEvent, VoteOutcome};
pub use types::{ErrorCode, Mode, Phase, Pid, RoomCode, RoomState, Team, Vote};
