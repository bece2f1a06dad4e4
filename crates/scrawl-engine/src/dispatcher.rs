//! The command dispatcher: gating, routing, and the lazy clock hook.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, info, warn};

use scrawl_protocol::{ClientCommand, ErrorCode, Mode, Pid, RoomCode, ServerEvent};
use scrawl_store::{Room, RoomStore};

use crate::clock::advance_clock;
use crate::error::Reject;
use crate::output::Reply;
use crate::{draw, game, lifecycle, lobby, moderation};

/// Runs one handler body under the room lock, translating store errors
/// into rejections.
pub(crate) async fn in_room<S, T, F>(
    store: &S,
    code: &RoomCode,
    now: u64,
    f: F,
) -> Result<T, Reject>
where
    S: RoomStore,
    T: Send,
    F: FnOnce(&mut Room) -> Result<T, Reject> + Send,
{
    store
        .with_room(code, now, |room| Ok(f(room)))
        .await
        .map_err(Reject::from)?
}

/// Routes client commands into handlers.
///
/// Shared by every connection task; holds no per-room state of its own.
pub struct Dispatcher<S> {
    store: Arc<S>,
    ttl_sec: u64,
}

impl<S: RoomStore> Dispatcher<S> {
    pub fn new(store: Arc<S>, ttl_sec: u64) -> Self {
        Dispatcher { store, ttl_sec }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Handles one command from `pid` on the connection bound to
    /// `room_code`. Never fails: rejections become error events for the
    /// sender.
    pub async fn dispatch(
        &self,
        room_code: &RoomCode,
        pid: &Pid,
        cmd: ClientCommand,
        now: u64,
    ) -> Reply {
        debug!(room = %room_code, %pid, cmd = cmd_name(&cmd), "dispatch");

        if let ClientCommand::CreateRoom { mode, cap } = cmd {
            return self.create_room(pid, mode, cap, now).await;
        }

        // Settle overdue deadlines before the command sees the room,
        // and read the sender's standing for gating.
        let pregame = {
            let pid = pid.clone();
            in_room(&*self.store, room_code, now, move |room| {
                let clock_events = advance_clock(room, now);
                let standing = room.players.get(&pid).map(|p| (p.kicked, p.is_muted(now)));
                Ok((clock_events, standing))
            })
            .await
        };
        let (clock_events, standing) = match pregame {
            Ok(x) => x,
            Err(reject) => return Reply::to_sender(reject.into_event()),
        };

        let mut reply = match self.gate(standing, &cmd) {
            Err(reject) => Reply::to_sender(reject.into_event()),
            Ok(()) => match self.route(room_code, pid, cmd, now).await {
                Ok(reply) => reply,
                Err(reject) => Reply::to_sender(reject.into_event()),
            },
        };
        reply.prepend_room(clock_events);

        // Any handled traffic keeps the room alive.
        if let Err(err) = self.store.touch(room_code, now, self.ttl_sec).await {
            debug!(room = %room_code, %err, "ttl refresh skipped");
        }
        reply
    }

    /// Transport-initiated disconnect; mirrors `leave` without a command.
    pub async fn disconnect(&self, room_code: &RoomCode, pid: &Pid, now: u64) -> Reply {
        let pid2 = pid.clone();
        let result = in_room(&*self.store, room_code, now, move |room| {
            let mut reply = lifecycle::disconnect(room, &pid2, now);
            reply.prepend_room(advance_clock(room, now));
            Ok(reply)
        })
        .await;
        match result {
            Ok(reply) => reply,
            // The room may already be gone; a silent disconnect is fine.
            Err(_) => Reply::new(),
        }
    }

    async fn create_room(&self, pid: &Pid, mode: Mode, cap: u32, now: u64) -> Reply {
        for _ in 0..5 {
            let code = mint_room_code();
            let room = Room::new(code.clone(), mode, cap.max(2), now, self.ttl_sec);
            match self.store.create(room).await {
                Ok(()) => {
                    info!(room = %code, %mode, cap, "room created");
                    return Reply::to_sender(ServerEvent::RoomCreated {
                        room_code: code,
                        mode,
                        pid: pid.clone(),
                    });
                }
                Err(err) => {
                    warn!(%err, "room code collision, retrying");
                }
            }
        }
        Reply::to_sender(ServerEvent::error(
            ErrorCode::BadState,
            "could not allocate a room code",
        ))
    }

    /// Kicked players may only try to come back (and get told why they
    /// can't); muted players keep presence commands.
    fn gate(&self, standing: Option<(bool, bool)>, cmd: &ClientCommand) -> Result<(), Reject> {
        use ClientCommand::*;
        let Some((kicked, muted)) = standing else {
            return Ok(());
        };
        if kicked && !matches!(cmd, Join { .. } | Reconnect { .. }) {
            return Err(Reject::new(
                ErrorCode::Kicked,
                "you have been kicked from this room",
            ));
        }
        if muted
            && !matches!(
                cmd,
                Heartbeat | Snapshot | Leave | Join { .. } | Reconnect { .. }
            )
        {
            return Err(Reject::new(ErrorCode::Muted, "you are muted"));
        }
        Ok(())
    }

    async fn route(
        &self,
        code: &RoomCode,
        pid: &Pid,
        cmd: ClientCommand,
        now: u64,
    ) -> Result<Reply, Reject> {
        use ClientCommand::*;
        let store = &*self.store;
        let pid = pid.clone();
        match cmd {
            CreateRoom { .. } => unreachable!("handled before routing"),
            Join { name } => {
                in_room(store, code, now, move |room| lifecycle::join(room, &pid, name, now)).await
            }
            Leave => in_room(store, code, now, move |room| lifecycle::leave(room, &pid, now)).await,
            Heartbeat => {
                in_room(store, code, now, move |room| lifecycle::heartbeat(room, &pid, now)).await
            }
            Snapshot => {
                in_room(store, code, now, move |room| lifecycle::snapshot_request(room, &pid))
                    .await
            }
            Reconnect { pid: presented } => {
                let effective = presented.unwrap_or(pid);
                in_room(store, code, now, move |room| {
                    lifecycle::reconnect(room, &effective, now)
                })
                .await
            }
            SetTeam { team } => {
                in_room(store, code, now, move |room| lobby::set_team(room, &pid, team)).await
            }
            StartRolePick => {
                in_room(store, code, now, move |room| lobby::start_role_pick(room, &pid)).await
            }
            AssignRoles { drawer_a, drawer_b } => {
                in_room(store, code, now, move |room| {
                    lobby::assign_roles(room, &pid, drawer_a, drawer_b)
                })
                .await
            }
            SetRoundConfig { secret_word, stroke_limit, time_limit_sec } => {
                in_room(store, code, now, move |room| {
                    game::set_round_config(room, &pid, secret_word, stroke_limit, time_limit_sec)
                })
                .await
            }
            SetVsConfig {
                secret_word,
                draw_window_sec,
                guess_window_sec,
                strokes_per_phase,
                max_rounds,
            } => {
                in_room(store, code, now, move |room| {
                    game::set_vs_config(
                        room,
                        &pid,
                        secret_word,
                        draw_window_sec,
                        guess_window_sec,
                        strokes_per_phase,
                        max_rounds,
                    )
                })
                .await
            }
            StartGame { countdown_sec } => {
                in_room(store, code, now, move |room| {
                    game::start_game(room, &pid, countdown_sec, now)
                })
                .await
            }
            DrawOp { op, canvas } => draw::draw_op(store, code, &pid, op, canvas, now).await,
            Guess { text } => {
                in_room(store, code, now, move |room| game::guess(room, &pid, text, now)).await
            }
            PhaseTick => {
                in_room(store, code, now, move |room| game::phase_tick(room, &pid, now)).await
            }
            Sabotage { target, op } => {
                draw::sabotage(store, code, &pid, target, op, now).await
            }
            VoteNext { vote } => {
                in_room(store, code, now, move |room| game::vote_next(room, &pid, vote, now)).await
            }
            EndRound => {
                in_room(store, code, now, move |room| game::end_round(room, &pid, now)).await
            }
            EndGame => in_room(store, code, now, move |room| game::end_game(room, &pid, now)).await,
            Moderation { action, target, reason, duration_sec } => {
                in_room(store, code, now, move |room| {
                    moderation::moderate(room, &pid, action, target, reason, duration_sec, now)
                })
                .await
            }
        }
    }
}

fn mint_room_code() -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (&mut rng)
        .sample_iter(Alphanumeric)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(6)
        .map(char::from)
        .collect();
    RoomCode(code)
}

fn cmd_name(cmd: &ClientCommand) -> &'static str {
    use ClientCommand::*;
    match cmd {
        CreateRoom { .. } => "create_room",
        Join { .. } => "join",
        Leave => "leave",
        Heartbeat => "heartbeat",
        Snapshot => "snapshot",
        Reconnect { .. } => "reconnect",
        SetTeam { .. } => "set_team",
        StartRolePick => "start_role_pick",
        AssignRoles { .. } => "assign_roles",
        SetRoundConfig { .. } => "set_round_config",
        SetVsConfig { .. } => "set_vs_config",
        StartGame { .. } => "start_game",
        DrawOp { .. } => "draw_op",
        Guess { .. } => "guess",
        PhaseTick => "phase_tick",
        Sabotage { .. } => "sabotage",
        VoteNext { .. } => "vote_next",
        EndRound => "end_round",
        EndGame => "end_game",
        Moderation { .. } => "moderation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..50 {
            let code = mint_room_code();
            assert_eq!(code.as_str().len(), 6);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}
