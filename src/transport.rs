//! WebSocket transport.
//!
//! Thin wrapper around `tokio-tungstenite` exposing the minimal duplex
//! capability set the bus needs: open a connection, send text, receive
//! frame events, close. The bus should use this module rather than
//! `tokio-tungstenite` directly.
//!
//! # Architecture
//!
//! [`open`] normalizes the URL scheme, performs the handshake, and returns
//! a ([`WireWriter`], [`WireReader`]) pair for use in a `tokio::select!`
//! pump. Centralizing the connection logic here means future transport
//! changes (TLS config, timeouts) apply in one place.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

/// Concrete WebSocket stream type (avoids repeating the generic everywhere).
type SocketStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A frame event received from the connection.
#[derive(Debug)]
pub enum WireEvent {
    /// UTF-8 text frame — one envelope.
    Text(String),
    /// Binary frame. The bus protocol is text-only; these are ignored.
    Binary(Vec<u8>),
    /// Ping frame with payload; answer with [`WireWriter::send_pong`].
    Ping(Vec<u8>),
    /// Pong frame with payload.
    Pong(Vec<u8>),
    /// Close frame from the peer.
    Closed {
        /// WebSocket close code (1000 = normal, 1005 = no code given).
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Write half of a connection.
#[derive(Debug)]
pub struct WireWriter {
    sink: futures_util::stream::SplitSink<SocketStream, tungstenite::Message>,
}

impl WireWriter {
    /// Send a UTF-8 text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails (connection closed, I/O error).
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(text.to_string()))
            .await
            .context("WebSocket send_text failed")
    }

    /// Send a pong frame in response to a ping.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails.
    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket send_pong failed")
    }

    /// Send a close frame and flush the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if closing fails.
    pub async fn send_close(&mut self) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Close(None))
            .await
            .context("WebSocket send_close failed")?;
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of a connection.
#[derive(Debug)]
pub struct WireReader {
    stream: futures_util::stream::SplitStream<SocketStream>,
}

impl WireReader {
    /// Receive the next frame event, returning `None` when the stream ends.
    ///
    /// Raw `Frame` variants are skipped internally.
    pub async fn recv(&mut self) -> Option<Result<WireEvent>> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(Ok(WireEvent::Text(text.to_string())));
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    return Some(Ok(WireEvent::Binary(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Ping(data))) => {
                    return Some(Ok(WireEvent::Ping(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Pong(data))) => {
                    return Some(Ok(WireEvent::Pong(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Close(close_frame))) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(WireEvent::Closed { code, reason }));
                }
                Some(Ok(tungstenite::Message::Frame(_))) => {
                    // Raw frames — skip
                    continue;
                }
                Some(Err(e)) => {
                    return Some(Err(anyhow::anyhow!("WebSocket read error: {e}")));
                }
                None => return None,
            }
        }
    }
}

/// Open a connection to `url`.
///
/// The scheme is normalized first (`http(s)://` becomes `ws(s)://`), then
/// the WebSocket handshake runs. Returns split (writer, reader) halves.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the handshake fails.
pub async fn open(url: &str) -> Result<(WireWriter, WireReader)> {
    let ws_url = normalize_ws_url(url);

    let (socket, _response) = tokio_tungstenite::connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("WebSocket handshake with {ws_url} failed"))?;

    let (sink, stream) = socket.split();

    Ok((WireWriter { sink }, WireReader { stream }))
}

/// Convert an HTTP(S) URL to WS(S) scheme.
///
/// Passes `ws://` and `wss://` through unchanged.
#[must_use]
pub fn normalize_ws_url(url: &str) -> String {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        url.to_string()
    } else {
        url.replace("https://", "wss://")
            .replace("http://", "ws://")
    }
}
