//! Lobby handlers: team picking and role assignment.

use scrawl_protocol::{ErrorCode, Mode, Pid, RoomState, ServerEvent, Team};
use scrawl_store::Room;

use crate::error::Reject;
use crate::fsm;
use crate::output::Reply;
use crate::roles;
use crate::rules::MIN_PLAYERS_VS;

/// Pick or switch teams while the lobby is open. VS only.
pub fn set_team(room: &mut Room, pid: &Pid, team: Team) -> Result<Reply, Reject> {
    if room.header.mode != Mode::Vs {
        return Err(Reject::new(ErrorCode::NotVs, "teams only exist in VS rooms"));
    }
    if room.header.state != RoomState::Waiting {
        return Err(Reject::new(
            ErrorCode::BadState,
            format!("cannot change teams in {}", room.header.state),
        ));
    }
    room.assign_team(pid, team)?;
    Ok(Reply::broadcast(ServerEvent::TeamsUpdated { teams: room.teams() }))
}

/// WAITING → ROLE_PICK. In a VS room without a GM yet, the caller takes
/// the chair (and leaves their team, since the GM referees).
pub fn start_role_pick(room: &mut Room, pid: &Pid) -> Result<Reply, Reject> {
    let connected = room.active_players().count() as u32;
    match room.header.mode {
        Mode::Single if connected < 2 => {
            return Err(Reject::new(
                ErrorCode::NotEnoughPlayers,
                "need at least 2 players",
            ));
        }
        Mode::Vs if connected < MIN_PLAYERS_VS => {
            return Err(Reject::new(
                ErrorCode::NotEnoughPlayers,
                format!("VS needs at least {MIN_PLAYERS_VS} players"),
            ));
        }
        _ => {}
    }

    fsm::transition(room, RoomState::RolePick)?;

    let mut reply = Reply::broadcast(ServerEvent::RoomStateChanged { state: RoomState::RolePick });
    if room.header.mode == Mode::Vs && room.roles.gm.is_none() {
        room.roles.gm = Some(pid.clone());
        if let Some(p) = room.players.get_mut(pid) {
            p.team = None;
        }
        reply.push_room(ServerEvent::RolesAssigned { roles: room.roles.to_wire() });
        reply.push_room(ServerEvent::TeamsUpdated { teams: room.teams() });
    }
    Ok(reply)
}

/// ROLE_PICK → CONFIG with roles settled for the room's mode.
///
/// SINGLE needs no caller privileges when the room has no GM yet (the
/// seeded pick creates one); otherwise only the GM may assign.
pub fn assign_roles(
    room: &mut Room,
    pid: &Pid,
    drawer_a: Option<Pid>,
    drawer_b: Option<Pid>,
) -> Result<Reply, Reject> {
    if room.header.state != RoomState::RolePick {
        return Err(Reject::new(
            ErrorCode::BadState,
            format!("cannot assign roles in {}", room.header.state),
        ));
    }
    if let Some(gm) = &room.roles.gm {
        if gm != pid {
            return Err(Reject::new(ErrorCode::NotGm, "only the GameMaster assigns roles"));
        }
    }

    match room.header.mode {
        Mode::Single => roles::assign_single(room)?,
        Mode::Vs => roles::assign_vs(room, drawer_a, drawer_b)?,
    }
    fsm::transition(room, RoomState::Config)?;

    let mut reply = Reply::broadcast(ServerEvent::RoomStateChanged { state: RoomState::Config });
    reply.push_room(ServerEvent::RolesAssigned { roles: room.roles.to_wire() });
    Ok(reply)
}
