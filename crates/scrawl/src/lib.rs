//! # Scrawl
//!
//! Real-time drawing and guessing game server.
//!
//! A room is a small party session: a GameMaster sets a secret word, a
//! drawer sketches it under a stroke budget, everyone else guesses. VS
//! mode splits the room into two teams racing on separate canvases,
//! with sabotage strokes on the enemy canvas.
//!
//! This crate is the runnable server; the layers underneath are
//! `scrawl-transport` (websockets and fan-out), `scrawl-protocol`
//! (commands, events, codec), `scrawl-store` (room documents), and
//! `scrawl-engine` (rules and the dispatcher).

mod config;
mod error;
mod handler;
mod server;

pub use config::Settings;
pub use error::ScrawlError;
pub use server::ScrawlServer;
