//! Presence handlers: join, leave, heartbeat, snapshot, reconnect, and
//! the transport disconnect path.

use scrawl_protocol::{ErrorCode, Pid, ServerEvent};
use scrawl_store::{Player, Room};

use crate::error::Reject;
use crate::output::Reply;
use crate::snapshot;

/// Adds the player (or revives their record) and answers with a
/// redacted snapshot.
pub fn join(room: &mut Room, pid: &Pid, name: String, now: u64) -> Result<Reply, Reject> {
    match room.players.get_mut(pid) {
        Some(existing) => {
            if existing.kicked {
                return Err(Reject::new(
                    ErrorCode::Kicked,
                    "you have been kicked from this room",
                ));
            }
            existing.name = name.clone();
            existing.connected = true;
            existing.last_seen = now;
        }
        None => {
            // Kicked players keep their record, so the cap counts them;
            // a full room stays full even if its ghosts never return.
            if room.players.len() as u32 >= room.header.cap {
                return Err(Reject::new(ErrorCode::RoomFull, "room is full"));
            }
            room.players
                .insert(pid.clone(), Player::new(pid.clone(), name.clone(), now));
        }
    }

    let mut reply = Reply::to_sender(snapshot::snapshot_for(room, pid));
    reply.push_room(ServerEvent::PlayerJoined { pid: pid.clone(), name });
    Ok(reply)
}

/// Marks the player disconnected but keeps the record for reconnect.
pub fn leave(room: &mut Room, pid: &Pid, now: u64) -> Result<Reply, Reject> {
    let player = room.player_mut(pid)?;
    player.connected = false;
    player.last_seen = now;
    Ok(Reply::broadcast(ServerEvent::PlayerLeft { pid: pid.clone() }))
}

/// Quiet presence refresh; no broadcast spam.
pub fn heartbeat(room: &mut Room, pid: &Pid, now: u64) -> Result<Reply, Reject> {
    let player = room.player_mut(pid)?;
    if !player.kicked {
        player.connected = true;
    }
    player.last_seen = now;
    Ok(Reply::new())
}

pub fn snapshot_request(room: &Room, pid: &Pid) -> Result<Reply, Reject> {
    Ok(Reply::to_sender(snapshot::snapshot_for(room, pid)))
}

/// Resume a previous identity. The effective pid is the one the client
/// presents, falling back to the connection's own.
pub fn reconnect(room: &mut Room, effective_pid: &Pid, now: u64) -> Result<Reply, Reject> {
    let player = room.player_mut(effective_pid)?;
    if player.kicked {
        return Err(Reject::new(
            ErrorCode::Kicked,
            "you have been kicked from this room",
        ));
    }
    player.connected = true;
    player.last_seen = now;
    Ok(Reply::to_sender(snapshot::snapshot_for(room, effective_pid)))
}

/// Transport-initiated disconnect. Mirrors `leave` but never errors: a
/// vanished player is simply nothing to do.
pub fn disconnect(room: &mut Room, pid: &Pid, now: u64) -> Reply {
    match room.players.get_mut(pid) {
        Some(player) => {
            player.connected = false;
            player.last_seen = now;
            Reply::broadcast(ServerEvent::PlayerLeft { pid: pid.clone() })
        }
        None => Reply::new(),
    }
}
