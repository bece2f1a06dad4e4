//! Game rules and room state machine for scrawl.
//!
//! Everything here is transport-agnostic: handlers take a mutable room
//! and a unix timestamp and return the events to deliver. The
//! [`Dispatcher`] is the single entry point the server uses; it settles
//! overdue deadlines with [`advance_clock`] before every command, so no
//! background timer task is needed.

mod clock;
mod dispatcher;
mod draw;
mod error;
mod flow;
mod fsm;
mod game;
mod lifecycle;
mod lobby;
mod moderation;
mod output;
mod roles;
mod rules;
mod snapshot;
mod voting;

pub use clock::advance_clock;
pub use dispatcher::Dispatcher;
pub use error::Reject;
pub use output::Reply;
pub use snapshot::snapshot_for;
