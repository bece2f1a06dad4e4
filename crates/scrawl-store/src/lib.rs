//! Room storage for Scrawl.
//!
//! The engine never holds room state in its own structures; every room
//! lives behind a [`RoomStore`]. The trait's closure-based
//! [`with_room`](RoomStore::with_room) makes each command's whole
//! read-modify-write atomic, and the two named spend primitives keep
//! budget races out of the handlers entirely.
//!
//! [`MemoryStore`] is the in-process implementation. Rooms carry a TTL
//! refreshed by activity; expired rooms are treated as missing and
//! reaped by a periodic sweep.

use std::future::Future;

use scrawl_protocol::{RoomCode, Team};

mod error;
mod memory;
mod models;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{
    DrawOp, GameState, MAX_OPS, ModLogEntry, OpKind, Player, RoleMap, Room, RoomHeader,
    RoundConfig,
};

/// Result of an atomic sabotage spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SabotageSpend {
    /// Budget charged and cooldown armed.
    Spent { remaining: u32, cooldown_until: u64 },
    /// The team's previous sabotage hasn't cooled down yet.
    OnCooldown { until: u64 },
    /// The team has no strokes left to spend.
    NoBudget,
}

/// Storage backend for room documents.
///
/// All methods take `now` (epoch seconds) so that TTL checks and
/// cooldowns are testable without touching the wall clock. An expired
/// room is indistinguishable from a missing one.
pub trait RoomStore: Send + Sync + 'static {
    /// Inserts a freshly created room.
    fn create(&self, room: Room) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns a copy of the room document.
    fn get(
        &self,
        code: &RoomCode,
        now: u64,
    ) -> impl Future<Output = Result<Room, StoreError>> + Send;

    /// Runs `f` against the room under the store lock. Everything `f`
    /// does is atomic with respect to other connections.
    fn with_room<F, T>(
        &self,
        code: &RoomCode,
        now: u64,
        f: F,
    ) -> impl Future<Output = Result<T, StoreError>> + Send
    where
        F: FnOnce(&mut Room) -> Result<T, StoreError> + Send,
        T: Send;

    /// Removes a room outright.
    fn remove(&self, code: &RoomCode) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Refreshes the room TTL.
    fn touch(
        &self,
        code: &RoomCode,
        now: u64,
        ttl_sec: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically decrements the stroke budget under `key` (`"pool"` or a
    /// team letter). `Ok(None)` means the budget was already empty; the
    /// caller must not apply the stroke.
    fn consume_stroke(
        &self,
        code: &RoomCode,
        now: u64,
        key: &str,
    ) -> impl Future<Output = Result<Option<u32>, StoreError>> + Send;

    /// Atomically checks the team cooldown, charges one stroke from the
    /// team's own budget, and arms a new cooldown.
    fn consume_sabotage(
        &self,
        code: &RoomCode,
        now: u64,
        team: Team,
        cooldown_sec: u64,
    ) -> impl Future<Output = Result<SabotageSpend, StoreError>> + Send;

    /// Drops every room whose TTL has lapsed, returning their codes.
    fn sweep_expired(&self, now: u64) -> impl Future<Output = Vec<RoomCode>> + Send;
}
