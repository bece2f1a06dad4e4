//! Per-viewer room snapshots.
//!
//! The secret word is the only privileged datum: a snapshot built for a
//! viewer who is neither GM nor a drawer must not contain the
//! `secret_word` key at all, until the game ends and the word is public.

use serde_json::{Map, Value, json};

use scrawl_protocol::{Pid, RoomState, ServerEvent};
use scrawl_store::Room;

/// Whether `viewer` may see the secret word right now.
pub fn sees_secret(room: &Room, viewer: &Pid) -> bool {
    room.header.state == RoomState::GameEnd
        || room.roles.is_gm(viewer)
        || room.roles.is_drawer(viewer)
}

/// Builds the full room view for one viewer.
pub fn snapshot_for(room: &Room, viewer: &Pid) -> ServerEvent {
    let round_config = match &room.round_config {
        Some(cfg) => {
            let mut value = serde_json::to_value(cfg).unwrap_or(Value::Null);
            if !sees_secret(room, viewer) {
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("secret_word");
                }
            }
            value
        }
        None => Value::Null,
    };

    let mut game = serde_json::to_value(&room.game)
        .ok()
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_else(Map::new);
    game.insert("budgets".into(), json!(room.budgets));
    game.insert("sabotage_until".into(), json!(room.sabotage_until));

    ServerEvent::RoomSnapshot {
        room: serde_json::to_value(&room.header).unwrap_or(Value::Null),
        players: room
            .players
            .values()
            .map(|p| serde_json::to_value(p).unwrap_or(Value::Null))
            .collect(),
        roles: room.roles.to_wire(),
        round_config,
        game: Value::Object(game),
        ops: room
            .ops
            .iter()
            .map(|op| serde_json::to_value(op).unwrap_or(Value::Null))
            .collect(),
        modlog: room
            .modlog
            .iter()
            .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
            .collect(),
    }
}
