//! Whole-server tests: real sockets, JSON frames, full game flows.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use scrawl::{ScrawlServer, Settings};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> String {
    let settings = Settings {
        bind_addr: "127.0.0.1:0".to_string(),
        ..Settings::default()
    };
    let server = ScrawlServer::bind(settings).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());
    addr
}

struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    async fn connect(addr: &str, code: &str) -> Self {
        let (ws, _) = connect_async(format!("ws://{addr}/ws/{code}")).await.unwrap();
        Client { ws }
    }

    async fn send(&mut self, value: Value) {
        self.ws
            .send(Message::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    /// Next event of the given `type`, skipping everything else.
    async fn recv_type(&mut self, wanted: &str) -> Value {
        tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let event: Value = serde_json::from_str(text.as_str()).unwrap();
                        if event["type"] == wanted {
                            return event;
                        }
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("stream ended while waiting for {wanted}: {other:?}"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
    }

    /// Waits for the server to close the socket; returns the close code.
    async fn recv_close(&mut self) -> u16 {
        tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Close(Some(frame)))) => {
                        return u16::from(frame.code);
                    }
                    Some(Ok(_)) => continue,
                    None => panic!("stream ended without a close frame"),
                    Some(Err(e)) => panic!("recv error while waiting for close: {e}"),
                }
            }
        })
        .await
        .expect("timed out waiting for close")
    }

    /// Joins and returns the pid the server minted, read back from the
    /// `player_joined` broadcast for this name.
    async fn join(&mut self, name: &str) -> String {
        self.send(json!({"type": "join", "name": name})).await;
        loop {
            let event = self.recv_type("player_joined").await;
            if event["name"] == name {
                return event["pid"].as_str().unwrap().to_string();
            }
        }
    }
}

async fn create_room(addr: &str, mode: &str) -> String {
    let mut lobby = Client::connect(addr, "LOBBY0").await;
    lobby.send(json!({"type": "create_room", "mode": mode})).await;
    let created = lobby.recv_type("room_created").await;
    created["room_code"].as_str().unwrap().to_string()
}

/// Three joined clients with roles settled, room in CONFIG. Returns
/// (gm, drawer, guesser) clients.
async fn single_room_in_config(addr: &str) -> (String, Client, Client, Client) {
    let code = create_room(addr, "SINGLE").await;

    let mut clients = Vec::new();
    let mut pids = Vec::new();
    for name in ["ana", "ben", "cas"] {
        let mut c = Client::connect(addr, &code).await;
        pids.push(c.join(name).await);
        clients.push(c);
    }

    clients[0].send(json!({"type": "start_role_pick"})).await;
    clients[0].send(json!({"type": "assign_roles"})).await;
    let roles = clients[0].recv_type("roles_assigned").await;
    let gm_pid = roles["roles"]["gm"].as_str().unwrap().to_string();
    let drawer_pid = roles["roles"]["drawer"].as_str().unwrap().to_string();

    // Order the clients as (gm, drawer, guesser) by their pids.
    let mut gm = None;
    let mut drawer = None;
    let mut guesser = None;
    for (client, pid) in clients.into_iter().zip(pids) {
        if pid == gm_pid {
            gm = Some(client);
        } else if pid == drawer_pid {
            drawer = Some(client);
        } else {
            guesser = Some(client);
        }
    }
    (code, gm.unwrap(), drawer.unwrap(), guesser.unwrap())
}

#[tokio::test]
async fn test_create_room_returns_code_and_pid() {
    let addr = start_server().await;
    let mut lobby = Client::connect(&addr, "LOBBY0").await;
    lobby.send(json!({"type": "create_room", "mode": "VS", "cap": 6})).await;
    let created = lobby.recv_type("room_created").await;
    let code = created["room_code"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert_eq!(created["mode"], "VS");
    assert!(created["pid"].as_str().unwrap().starts_with("p-"));
}

#[tokio::test]
async fn test_join_answers_with_snapshot_and_broadcasts() {
    let addr = start_server().await;
    let code = create_room(&addr, "SINGLE").await;

    let mut first = Client::connect(&addr, &code).await;
    first.send(json!({"type": "join", "name": "ana"})).await;
    let snapshot = first.recv_type("room_snapshot").await;
    assert_eq!(snapshot["room"]["state"], "WAITING");
    assert_eq!(snapshot["room"]["mode"], "SINGLE");

    let mut second = Client::connect(&addr, &code).await;
    second.send(json!({"type": "join", "name": "ben"})).await;

    // The first client hears about the second one.
    let joined = first.recv_type("player_joined").await;
    assert_eq!(joined["name"], "ben");
}

#[tokio::test]
async fn test_unreadable_frame_gets_bad_message_error() {
    let addr = start_server().await;
    let code = create_room(&addr, "SINGLE").await;

    let mut client = Client::connect(&addr, &code).await;
    client
        .ws
        .send(Message::Text("{not json at all".to_string().into()))
        .await
        .unwrap();
    let err = client.recv_type("error").await;
    assert_eq!(err["code"], "BAD_MESSAGE");
}

#[tokio::test]
async fn test_unknown_room_rejects_commands() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, "ZZZZZZ").await;
    client.send(json!({"type": "join", "name": "ana"})).await;
    let err = client.recv_type("error").await;
    assert_eq!(err["code"], "ROOM_NOT_FOUND");
}

#[tokio::test]
async fn test_single_game_full_flow() {
    let addr = start_server().await;
    let (_code, mut gm, mut drawer, mut guesser) = single_room_in_config(&addr).await;

    gm.send(json!({
        "type": "set_round_config",
        "secret_word": "apple",
        "stroke_limit": 10,
        "time_limit_sec": 120,
    }))
    .await;
    // Configuring pushes the drawer a private snapshot with the word.
    let snapshot = drawer.recv_type("room_snapshot").await;
    assert_eq!(snapshot["round_config"]["secret_word"], "apple");

    gm.send(json!({"type": "start_game"})).await;
    let budget = drawer.recv_type("budget_update").await;
    assert_eq!(budget["budget"]["pool"], 10);

    // The guesser's snapshot must not reveal the word mid-game.
    guesser.send(json!({"type": "snapshot"})).await;
    let snapshot = guesser.recv_type("room_snapshot").await;
    assert!(snapshot["round_config"].get("secret_word").is_none());

    drawer
        .send(json!({
            "type": "draw_op",
            "op": {"t": "line", "p": {"pts": [[0, 0], [5, 5]], "dur_sec": 2}},
        }))
        .await;
    let op = guesser.recv_type("op_broadcast").await;
    assert_eq!(op["op"]["t"], "line");
    let budget = guesser.recv_type("budget_update").await;
    assert_eq!(budget["budget"]["pool"], 9);

    gm.send(json!({"type": "phase_tick"})).await;
    let phase = guesser.recv_type("phase_changed").await;
    assert_eq!(phase["phase"], "GUESS");

    guesser.send(json!({"type": "guess", "text": " APPLE "})).await;
    let result = gm.recv_type("guess_result").await;
    assert_eq!(result["correct"], true);
    let end = gm.recv_type("game_end").await;
    assert_eq!(end["word"], "apple");
    assert_eq!(end["reason"], "CORRECT_GUESS");
}

#[tokio::test]
async fn test_kick_closes_socket_with_application_code() {
    let addr = start_server().await;
    let (_code, mut gm, _drawer, mut guesser) = single_room_in_config(&addr).await;

    // Identify the guesser's pid from the roles the GM can see.
    gm.send(json!({"type": "snapshot"})).await;
    let snapshot = gm.recv_type("room_snapshot").await;
    let gm_pid = snapshot["roles"]["gm"].as_str().unwrap();
    let drawer_pid = snapshot["roles"]["drawer"].as_str().unwrap();
    let guesser_pid = snapshot["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["pid"].as_str().unwrap())
        .find(|pid| *pid != gm_pid && *pid != drawer_pid)
        .unwrap()
        .to_string();

    gm.send(json!({
        "type": "moderation",
        "action": "kick",
        "target": guesser_pid,
        "reason": "afk",
    }))
    .await;

    let kicked = gm.recv_type("player_kicked").await;
    assert_eq!(kicked["pid"], guesser_pid.as_str());
    assert_eq!(guesser.recv_close().await, 4001);
}
