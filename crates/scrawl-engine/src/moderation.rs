//! GM moderation: warn, mute, kick. Every action lands in the room's
//! audit log and is broadcast.

use serde_json::Value;

use scrawl_protocol::{ErrorCode, ModAction, Pid, ServerEvent};
use scrawl_store::{ModLogEntry, Room};

use crate::error::Reject;
use crate::output::Reply;
use crate::rules;

pub fn moderate(
    room: &mut Room,
    actor: &Pid,
    action: ModAction,
    target: Pid,
    reason: String,
    duration_sec: Option<u64>,
    now: u64,
) -> Result<Reply, Reject> {
    if !room.roles.is_gm(actor) {
        return Err(Reject::new(ErrorCode::NotGm, "only the GameMaster can moderate"));
    }
    if target == *actor {
        return Err(Reject::new(ErrorCode::InvalidTarget, "cannot moderate yourself"));
    }
    if !room.players.contains_key(&target) {
        return Err(Reject::new(
            ErrorCode::PlayerNotFound,
            format!("player {target} not found"),
        ));
    }

    let mut kicked = false;
    {
        let player = room.player_mut(&target)?;
        match action {
            ModAction::Warn => {
                player.warnings += 1;
            }
            ModAction::Mute => {
                let duration =
                    duration_sec.filter(|d| rules::timer_in_range(*d)).ok_or_else(|| {
                        Reject::new(
                            ErrorCode::BadMute,
                            format!("mute duration must be 1..={} seconds", rules::MAX_TIMER_SEC),
                        )
                    })?;
                player.muted_until = now + duration;
            }
            ModAction::Kick => {
                player.connected = false;
                player.kicked = true;
                kicked = true;
            }
        }
    }

    let entry = ModLogEntry {
        ts: now,
        actor: actor.clone(),
        action: action_name(action).to_owned(),
        target: target.clone(),
        reason: reason.clone(),
        duration_sec,
    };
    room.modlog.push(entry.clone());

    let player_doc = room
        .players
        .get(&target)
        .and_then(|p| serde_json::to_value(p).ok())
        .unwrap_or(Value::Null);

    let mut reply = Reply::broadcast(ServerEvent::PlayerUpdated { player: player_doc });
    reply.push_room(ServerEvent::ModlogEntry {
        entry: serde_json::to_value(&entry).unwrap_or(Value::Null),
    });
    if kicked {
        reply.push_room(ServerEvent::PlayerKicked { pid: target.clone(), reason });
        // The transport closes the victim's socket with a policy code.
        reply.to_close.push(target);
    }
    Ok(reply)
}

fn action_name(action: ModAction) -> &'static str {
    match action {
        ModAction::Warn => "warn",
        ModAction::Mute => "mute",
        ModAction::Kick => "kick",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_protocol::{Mode, RoomCode};
    use scrawl_store::Player;

    fn room() -> Room {
        let mut room = Room::new(RoomCode::from("MOD001"), Mode::Single, 4, 100, 1800);
        for name in ["gm", "p1"] {
            let pid = Pid::from(name);
            room.players.insert(pid.clone(), Player::new(pid, name.into(), 100));
        }
        room.roles.gm = Some(Pid::from("gm"));
        room
    }

    #[test]
    fn test_only_gm_moderates() {
        let mut room = room();
        let err = moderate(
            &mut room,
            &Pid::from("p1"),
            ModAction::Warn,
            Pid::from("gm"),
            String::new(),
            None,
            200,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotGm);
    }

    #[test]
    fn test_warn_increments_and_logs() {
        let mut room = room();
        let reply = moderate(
            &mut room,
            &Pid::from("gm"),
            ModAction::Warn,
            Pid::from("p1"),
            "spam".into(),
            None,
            200,
        )
        .unwrap();
        assert_eq!(room.players[&Pid::from("p1")].warnings, 1);
        assert_eq!(room.modlog.len(), 1);
        assert_eq!(room.modlog[0].action, "warn");
        assert!(reply.to_room.iter().any(|e| matches!(
            e.event,
            ServerEvent::ModlogEntry { .. }
        )));
        assert!(reply.to_close.is_empty());
    }

    #[test]
    fn test_mute_requires_duration_in_range() {
        let mut room = room();
        for bad in [None, Some(0), Some(rules::MAX_TIMER_SEC + 1), Some(u64::MAX)] {
            let err = moderate(
                &mut room,
                &Pid::from("gm"),
                ModAction::Mute,
                Pid::from("p1"),
                String::new(),
                bad,
                200,
            )
            .unwrap_err();
            assert_eq!(err.code, ErrorCode::BadMute);
        }

        moderate(
            &mut room,
            &Pid::from("gm"),
            ModAction::Mute,
            Pid::from("p1"),
            String::new(),
            Some(60),
            200,
        )
        .unwrap();
        assert!(room.players[&Pid::from("p1")].is_muted(259));
        assert!(!room.players[&Pid::from("p1")].is_muted(260));
    }

    #[test]
    fn test_kick_flags_and_requests_close() {
        let mut room = room();
        let reply = moderate(
            &mut room,
            &Pid::from("gm"),
            ModAction::Kick,
            Pid::from("p1"),
            "griefing".into(),
            None,
            200,
        )
        .unwrap();
        let p = &room.players[&Pid::from("p1")];
        assert!(p.kicked && !p.connected);
        assert_eq!(reply.to_close, vec![Pid::from("p1")]);
        assert!(reply.to_room.iter().any(|e| matches!(
            e.event,
            ServerEvent::PlayerKicked { .. }
        )));
    }

    #[test]
    fn test_gm_cannot_moderate_themselves() {
        let mut room = room();
        let err = moderate(
            &mut room,
            &Pid::from("gm"),
            ModAction::Kick,
            Pid::from("gm"),
            String::new(),
            None,
            200,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTarget);
    }
}
