//! Typed publish/subscribe message bus over a single WebSocket connection.
//!
//! `wirebus` wraps one persistent bidirectional connection and gives
//! application code a typed surface instead of raw socket events: send a
//! message of type `T` with payload `P`, register handlers for messages of
//! type `T`.
//!
//! # Architecture
//!
//! ```text
//! MessageBus
//!     ├── handler registry      type → ordered handler list
//!     ├── open-callback slot    single, overwritable
//!     └── connection task       handshake → open callback → select pump
//!             ├── transport     tokio-tungstenite writer/reader halves
//!             └── protocol      {"type": ..., "data": ...} envelopes
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use serde_json::json;
//! use wirebus::MessageBus;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wirebus::BusError> {
//!     let bus = MessageBus::new();
//!
//!     bus.add_message_listener("chat", |data: &serde_json::Value| {
//!         println!("chat: {data}");
//!     })
//!     .await;
//!     bus.set_on_open_listener(|| println!("connected")).await;
//!
//!     bus.connect("ws://127.0.0.1:8181/core").await?;
//!     // ...once the open callback has fired:
//!     bus.send("chat", json!({ "msg": "hi" })).await?;
//!     bus.close().await;
//!     Ok(())
//! }
//! ```
//!
//! Out of scope by design: reconnection, message ordering guarantees beyond
//! the transport's, acknowledgement or request/response correlation, and
//! authentication.

pub mod bus;
pub mod error;
pub mod protocol;
pub mod transport;

pub use bus::{MessageBus, MessageHandler, OpenHandler};
pub use error::BusError;
pub use protocol::Envelope;
