//! WebSocket listener built on `tokio-tungstenite`.
//!
//! The handshake callback captures the request path (which carries the
//! room code) and the `Origin` header so the server can validate both
//! before any game traffic flows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::ConnectionId;
use crate::error::TransportError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// Accepts websocket connections on a TCP address.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "websocket listener bound");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::AcceptFailed)
    }

    /// Waits for the next connection and completes its handshake.
    pub async fn accept(&self) -> Result<WsConnection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        // The handshake callback is the only place tungstenite exposes
        // the request line, so the path and origin are captured there.
        let captured: Arc<Mutex<(String, Option<String>)>> = Arc::default();
        let slot = Arc::clone(&captured);
        let ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, resp| {
            let path = req.uri().path().to_string();
            let origin = req
                .headers()
                .get("origin")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if let Ok(mut guard) = slot.lock() {
                *guard = (path, origin);
            }
            Ok(resp)
        })
        .await
        .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        let (path, origin) = match captured.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, path, "accepted websocket connection");

        let (sink, stream) = ws.split();
        Ok(WsConnection {
            id,
            path,
            origin,
            sender: WsSender { sink },
            receiver: WsReceiver { stream },
        })
    }
}

type Request = tokio_tungstenite::tungstenite::handshake::server::Request;

/// One accepted connection, ready to be split into reader and writer
/// halves so sends and receives can proceed independently.
pub struct WsConnection {
    id: ConnectionId,
    path: String,
    origin: Option<String>,
    sender: WsSender,
    receiver: WsReceiver,
}

impl WsConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Request path from the handshake, e.g. `/ws/AB12CD`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `Origin` header from the handshake, if the client sent one.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn into_split(self) -> (WsSender, WsReceiver) {
        (self.sender, self.receiver)
    }
}

/// Writer half of a connection.
pub struct WsSender {
    sink: SplitSink<WsStream, Message>,
}

impl WsSender {
    pub async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Sends a close frame with an application close code (e.g. 4001
    /// for kicks) and flushes it.
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            })))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

/// Reader half of a connection.
pub struct WsReceiver {
    stream: SplitStream<WsStream>,
}

impl WsReceiver {
    /// Next text payload, or `Ok(None)` once the peer closes. Binary
    /// frames are accepted as UTF-8 payloads; control frames are
    /// handled by tungstenite and skipped here.
    pub async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Binary(data))) => {
                    match String::from_utf8(data.to_vec()) {
                        Ok(text) => return Ok(Some(text)),
                        Err(_) => {
                            return Err(TransportError::ReceiveFailed(
                                "binary frame was not valid UTF-8".into(),
                            ));
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
    }
}
