//! Per-connection handler: path and origin checks, pid minting, the
//! read loop, and reply fan-out.
//!
//! Each accepted socket gets one task running [`handle_connection`] and
//! one writer task draining the connection's outbound channel. Game
//! traffic flows read → dispatch → registry; the socket writer never
//! blocks the game.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use scrawl_engine::Reply;
use scrawl_protocol::{ClientCommand, Codec, ErrorCode, Pid, RoomCode, ServerEvent};
use scrawl_transport::{Outbound, WsConnection, WsSender};

use crate::ScrawlError;
use crate::server::{ServerState, unix_now};

pub(crate) async fn handle_connection(
    conn: WsConnection,
    state: Arc<ServerState>,
) -> Result<(), ScrawlError> {
    let conn_id = conn.id();

    if !state.settings.origin_allowed(conn.origin()) {
        warn!(%conn_id, origin = ?conn.origin(), "origin rejected");
        let (mut tx, _rx) = conn.into_split();
        let _ = tx.close(1008, "origin not allowed").await;
        return Ok(());
    }

    let Some(room) = room_from_path(conn.path()) else {
        debug!(%conn_id, path = conn.path(), "bad connection path");
        let (mut tx, _rx) = conn.into_split();
        let _ = tx.close(1008, "expected /ws/{room_code}").await;
        return Ok(());
    };

    let mut pid = mint_pid();
    debug!(%conn_id, %room, %pid, "connection bound");

    let (sender, mut receiver) = conn.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    state.registry.register(&room, &pid, tx.clone());
    tokio::spawn(write_loop(sender, rx));

    loop {
        let text = match receiver.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                info!(%room, %pid, "connection closed cleanly");
                break;
            }
            Err(e) => {
                debug!(%room, %pid, error = %e, "recv error");
                break;
            }
        };

        let cmd: ClientCommand = match state.codec.decode(text.as_bytes()) {
            Ok(cmd) => cmd,
            Err(e) => {
                send_event(
                    &state,
                    &room,
                    &pid,
                    &ServerEvent::error(ErrorCode::BadMessage, format!("unreadable message: {e}")),
                );
                continue;
            }
        };

        // A reconnect presenting an earlier pid adopts it: the registry
        // entry moves so targeted events reach this socket again.
        if let ClientCommand::Reconnect { pid: Some(ref presented) } = cmd {
            if *presented != pid {
                state.registry.unregister(&room, &pid);
                pid = presented.clone();
                state.registry.register(&room, &pid, tx.clone());
            }
        }

        let reply = state.dispatcher.dispatch(&room, &pid, cmd, unix_now()).await;
        deliver(&state, &room, &pid, reply);
    }

    state.registry.unregister(&room, &pid);
    let reply = state.dispatcher.disconnect(&room, &pid, unix_now()).await;
    deliver(&state, &room, &pid, reply);
    Ok(())
}

/// Drains a connection's outbound channel onto the socket. Ends when
/// the channel closes (unregister or reconnect) or the peer is gone.
async fn write_loop(mut sender: WsSender, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(frame) = rx.recv().await {
        match frame {
            Outbound::Text(text) => {
                if sender.send_text(&text).await.is_err() {
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                let _ = sender.close(code, &reason).await;
                break;
            }
        }
    }
}

/// Fans one reply out through the registry.
fn deliver(state: &ServerState, room: &RoomCode, pid: &Pid, reply: Reply) {
    for event in &reply.to_sender {
        send_event(state, room, pid, event);
    }
    for room_event in &reply.to_room {
        if let Some(text) = encode(state, &room_event.event) {
            state
                .registry
                .broadcast(room, room_event.targets.as_deref(), &text);
        }
    }
    for target in &reply.to_close {
        state.registry.close_pid(room, target, "kicked");
    }
}

fn send_event(state: &ServerState, room: &RoomCode, pid: &Pid, event: &ServerEvent) {
    if let Some(text) = encode(state, event) {
        state.registry.send_to(room, pid, Outbound::Text(text));
    }
}

fn encode(state: &ServerState, event: &ServerEvent) -> Option<String> {
    match state.codec.encode(event).map(String::from_utf8) {
        Ok(Ok(text)) => Some(text),
        other => {
            warn!(?other, "dropping unencodable event");
            None
        }
    }
}

/// `/ws/{room_code}` → the room code, uppercased.
fn room_from_path(path: &str) -> Option<RoomCode> {
    let code = path.strip_prefix("/ws/")?.trim_matches('/');
    if code.is_empty() || code.contains('/') {
        return None;
    }
    Some(RoomCode(code.to_ascii_uppercase()))
}

/// Server-minted player identity, unique per connection.
fn mint_pid() -> Pid {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(12)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    Pid(format!("p-{suffix}"))
}
