//! In-process room storage.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use scrawl_protocol::{RoomCode, Team};

use crate::error::StoreError;
use crate::models::Room;
use crate::{RoomStore, SabotageSpend};

/// A [`RoomStore`] backed by a mutex-guarded map.
///
/// One lock for the whole table is deliberate: rooms are small, commands
/// are short, and a single lock makes every cross-field invariant (budget
/// vs. cooldown, roles vs. teams) trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<RoomCode, Room>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expired rooms are treated as missing everywhere; eviction happens
    /// lazily on access and in bulk via `sweep_expired`.
    fn live<'a>(
        rooms: &'a mut HashMap<RoomCode, Room>,
        code: &RoomCode,
        now: u64,
    ) -> Result<&'a mut Room, StoreError> {
        let expired = rooms.get(code).is_some_and(|r| r.expires_at <= now);
        if expired {
            rooms.remove(code);
            debug!(room = %code, "evicted expired room");
        }
        rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::RoomNotFound(code.clone()))
    }
}

impl RoomStore for MemoryStore {
    async fn create(&self, room: Room) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        let code = room.header.code.clone();
        if rooms.contains_key(&code) {
            return Err(StoreError::RoomExists(code));
        }
        rooms.insert(code, room);
        Ok(())
    }

    async fn get(&self, code: &RoomCode, now: u64) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        Self::live(&mut rooms, code, now).map(|r| r.clone())
    }

    async fn with_room<F, T>(&self, code: &RoomCode, now: u64, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Room) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let mut rooms = self.rooms.lock().await;
        let room = Self::live(&mut rooms, code, now)?;
        f(room)
    }

    async fn remove(&self, code: &RoomCode) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .remove(code)
            .map(drop)
            .ok_or_else(|| StoreError::RoomNotFound(code.clone()))
    }

    async fn touch(&self, code: &RoomCode, now: u64, ttl_sec: u64) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        let room = Self::live(&mut rooms, code, now)?;
        room.expires_at = now + ttl_sec;
        Ok(())
    }

    async fn consume_stroke(
        &self,
        code: &RoomCode,
        now: u64,
        key: &str,
    ) -> Result<Option<u32>, StoreError> {
        let mut rooms = self.rooms.lock().await;
        let room = Self::live(&mut rooms, code, now)?;
        match room.budgets.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(Some(*remaining))
            }
            _ => Ok(None),
        }
    }

    async fn consume_sabotage(
        &self,
        code: &RoomCode,
        now: u64,
        team: Team,
        cooldown_sec: u64,
    ) -> Result<SabotageSpend, StoreError> {
        let mut rooms = self.rooms.lock().await;
        let room = Self::live(&mut rooms, code, now)?;

        let until = room.sabotage_until.get(&team).copied().unwrap_or(0);
        if until > now {
            return Ok(SabotageSpend::OnCooldown { until });
        }

        // The sabotage is paid for out of the attacker's own budget.
        let key = team.to_string();
        match room.budgets.get_mut(&key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                let remaining = *remaining;
                let cooldown_until = now + cooldown_sec;
                room.sabotage_until.insert(team, cooldown_until);
                Ok(SabotageSpend::Spent { remaining, cooldown_until })
            }
            _ => Ok(SabotageSpend::NoBudget),
        }
    }

    async fn sweep_expired(&self, now: u64) -> Vec<RoomCode> {
        let mut rooms = self.rooms.lock().await;
        let dead: Vec<RoomCode> = rooms
            .iter()
            .filter(|(_, r)| r.expires_at <= now)
            .map(|(code, _)| code.clone())
            .collect();
        for code in &dead {
            rooms.remove(code);
            debug!(room = %code, "swept expired room");
        }
        dead
    }
}
