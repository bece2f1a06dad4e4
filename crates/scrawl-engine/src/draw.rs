//! Draw and sabotage handlers.
//!
//! These are the two multi-step paths: validation happens under the room
//! lock, but the budget spend itself goes through the store's atomic
//! primitives so concurrent strokes can never overdraw.

use serde_json::Value;

use scrawl_protocol::{
    ErrorCode, Mode, Phase, Pid, RoomCode, RoomState, ServerEvent, Team,
};
use scrawl_store::{DrawOp, OpKind, RoomStore, SabotageSpend};

use crate::dispatcher::in_room;
use crate::error::Reject;
use crate::flow;
use crate::output::Reply;
use crate::rules::{self, SABOTAGE_COOLDOWN_SEC};

struct ValidatedStroke {
    budget_key: String,
    kind: OpKind,
    canvas: Option<Team>,
    too_long: bool,
}

/// A drawer submits a stroke to their own canvas.
pub async fn draw_op<S: RoomStore>(
    store: &S,
    code: &RoomCode,
    pid: &Pid,
    op: Value,
    canvas: Option<Team>,
    now: u64,
) -> Result<Reply, Reject> {
    let checked = {
        let pid = pid.clone();
        let op = op.clone();
        in_room(store, code, now, move |room| {
            if room.header.state != RoomState::InGame || room.game.phase != Phase::Draw {
                return Err(Reject::new(ErrorCode::BadPhase, "drawing is only open in DRAW"));
            }
            if !room.roles.is_drawer(&pid) {
                return Err(Reject::new(ErrorCode::NotDrawer, "only drawers may draw"));
            }

            let (budget_key, own_canvas) = match room.header.mode {
                Mode::Single => ("pool".to_owned(), None),
                Mode::Vs => {
                    let own = room
                        .roles
                        .drawer_canvas(&pid)
                        .ok_or_else(|| Reject::new(ErrorCode::NotDrawer, "no canvas assigned"))?;
                    if canvas.is_some_and(|c| c != own) {
                        return Err(Reject::new(
                            ErrorCode::InvalidTarget,
                            "draw on your own canvas; sabotage targets the other one",
                        ));
                    }
                    (own.to_string(), Some(own))
                }
            };

            let kind = rules::validate_op(&op)?;
            Ok(ValidatedStroke {
                budget_key,
                kind,
                canvas: own_canvas,
                too_long: rules::stroke_too_long(&op),
            })
        })
        .await?
    };

    let spent = store
        .consume_stroke(code, now, &checked.budget_key)
        .await
        .map_err(Reject::from)?;
    if spent.is_none() {
        return Err(Reject::new(ErrorCode::NoBudget, "no strokes left this phase"));
    }

    if checked.too_long {
        // The oversized stroke is refused but its budget cost stands,
        // so splitting a marathon stroke client-side buys nothing.
        let budget = in_room(store, code, now, |room| Ok(flow::budget_event(room))).await?;
        let mut reply = Reply::to_sender(
            Reject::new(
                ErrorCode::StrokeTooLong,
                "stroke exceeds the duration or point limit",
            )
            .into_event(),
        );
        reply.push_room(budget);
        return Ok(reply);
    }

    let pid = pid.clone();
    in_room(store, code, now, move |room| {
        room.push_op(DrawOp {
            t: checked.kind,
            p: op.get("p").cloned().unwrap_or(Value::Null),
            ts: now,
            by: pid.clone(),
            canvas: checked.canvas,
        });
        let mut reply = Reply::broadcast(ServerEvent::OpBroadcast {
            op,
            canvas: checked.canvas,
            by: pid,
        });
        reply.push_room(flow::budget_event(room));
        Ok(reply)
    })
    .await
}

/// A VS drawer scribbles on the opposing canvas, paying from their own
/// team's budget.
pub async fn sabotage<S: RoomStore>(
    store: &S,
    code: &RoomCode,
    pid: &Pid,
    target: Team,
    op: Value,
    now: u64,
) -> Result<Reply, Reject> {
    let own_team = {
        let pid = pid.clone();
        let op = op.clone();
        in_room(store, code, now, move |room| {
            if room.header.mode != Mode::Vs {
                return Err(Reject::new(ErrorCode::NotVs, "sabotage only exists in VS"));
            }
            if room.header.state != RoomState::InGame || room.game.phase != Phase::Draw {
                return Err(Reject::new(ErrorCode::BadPhase, "sabotage is only open in DRAW"));
            }
            let own = room
                .roles
                .drawer_canvas(&pid)
                .ok_or_else(|| Reject::new(ErrorCode::NotDrawer, "only drawers may sabotage"))?;
            if target != own.other() {
                return Err(Reject::new(
                    ErrorCode::InvalidTarget,
                    "sabotage targets the opposing canvas",
                ));
            }
            if rules::sabotage_in_blackout(now, room.game.draw_end_at) {
                return Err(Reject::new(
                    ErrorCode::SabotageBlocked,
                    "sabotage is disabled in the last seconds of the draw phase",
                ));
            }
            rules::validate_op(&op)?;
            Ok(own)
        })
        .await?
    };

    let spend = store
        .consume_sabotage(code, now, own_team, SABOTAGE_COOLDOWN_SEC)
        .await
        .map_err(Reject::from)?;
    let cooldown_until = match spend {
        SabotageSpend::OnCooldown { until } => {
            return Err(Reject::new(
                ErrorCode::SabotageBlocked,
                format!("sabotage on cooldown for {} more seconds", until.saturating_sub(now)),
            ));
        }
        SabotageSpend::NoBudget => {
            return Err(Reject::new(
                ErrorCode::InsufficientBudget,
                "not enough strokes left to pay for sabotage",
            ));
        }
        SabotageSpend::Spent { cooldown_until, .. } => cooldown_until,
    };

    let pid = pid.clone();
    in_room(store, code, now, move |room| {
        room.push_op(DrawOp {
            t: OpKind::Sabotage,
            p: op.get("p").cloned().unwrap_or(Value::Null),
            ts: now,
            by: pid.clone(),
            canvas: Some(target),
        });
        let mut reply = Reply::broadcast(ServerEvent::SabotageUsed {
            by: pid.clone(),
            target,
            cooldown_until,
        });
        reply.push_room(ServerEvent::OpBroadcast {
            op,
            canvas: Some(target),
            by: pid,
        });
        reply.push_room(flow::budget_event(room));
        Ok(reply)
    })
    .await
}
