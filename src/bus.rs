//! The message bus: connection lifecycle plus typed dispatch.
//!
//! # Architecture
//!
//! `MessageBus` owns at most one live connection at a time. `connect` spawns
//! a background connection task that performs the handshake, fires the open
//! callback, and then pumps two sources in a `tokio::select!` loop:
//!
//! ```text
//! send(type, data) ──► outbound queue ──► connection task ──► writer half
//! reader half ──► connection task ──► deliver ──► handlers for the type
//! ```
//!
//! Outbound calls never touch the socket directly; they enqueue onto an
//! unbounded channel drained by the task, so all wire I/O is serialized in
//! one place. Inbound dispatch is synchronous and sequential across the
//! handlers registered for the envelope's type, in registration order.
//!
//! There is no reconnection, no ordering guarantee beyond the transport's,
//! no request/response correlation, and no authentication. The only state
//! transitions are `connect` → open event → `close`.

// Rust guideline compliant 2026-02

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::BusError;
use crate::protocol;
use crate::transport::{self, WireEvent};

/// Callback invoked with the `data` payload of each matching envelope.
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Callback invoked, with no arguments, once per successful connection
/// establishment.
pub type OpenHandler = Arc<dyn Fn() + Send + Sync>;

/// Mapping from message type to the ordered list of registered handlers.
type HandlerRegistry = HashMap<String, Vec<MessageHandler>>;

/// The live connection handle. Exclusive to the bus; released by `close`.
struct Connection {
    /// Outbound queue drained by the connection task.
    outbound: mpsc::UnboundedSender<String>,
    /// Set by the connection task once the handshake completes.
    established: Arc<AtomicBool>,
    /// The spawned connection task.
    task: JoinHandle<()>,
}

/// Client-side dispatcher over a single persistent WebSocket connection.
///
/// The registry and callback slot are instance-scoped: two buses share
/// nothing. Cloning a bus yields a second handle to the same instance.
#[derive(Clone, Default)]
pub struct MessageBus {
    handlers: Arc<Mutex<HandlerRegistry>>,
    on_open: Arc<Mutex<Option<OpenHandler>>>,
    connection: Arc<Mutex<Option<Connection>>>,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus").finish_non_exhaustive()
    }
}

impl MessageBus {
    /// Create an inert bus with an empty handler registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection to `url`.
    ///
    /// Spawns the connection task and returns without waiting for
    /// establishment; the open callback signals readiness. A handshake
    /// failure surfaces as a logged transport event, not as an error here,
    /// and the dead handle stays held until [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// Returns [`BusError::AlreadyConnected`] if a handle is already live.
    /// The bus never silently replaces a connection.
    pub async fn connect(&self, url: &str) -> Result<(), BusError> {
        let mut slot = self.connection.lock().await;
        if slot.is_some() {
            return Err(BusError::AlreadyConnected);
        }

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let established = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_connection(
            url.to_string(),
            Arc::clone(&self.handlers),
            Arc::clone(&self.on_open),
            Arc::clone(&established),
            outbound_rx,
        ));

        *slot = Some(Connection {
            outbound,
            established,
            task,
        });
        Ok(())
    }

    /// Store the open callback, replacing any previous one.
    ///
    /// The slot holds a single callback; it is overwritten, not
    /// accumulated. Registering after [`connect`](Self::connect) but before
    /// the open event still fires on open.
    pub async fn set_on_open_listener<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_open.lock().await = Some(Arc::new(callback));
    }

    /// Append `callback` to the ordered handler list for `msg_type`,
    /// creating the list if absent.
    ///
    /// No de-duplication: registering the same callback twice invokes it
    /// twice per matching message. There is no removal operation; entries
    /// live as long as the bus.
    pub async fn add_message_listener<F>(&self, msg_type: impl Into<String>, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut registry = self.handlers.lock().await;
        registry
            .entry(msg_type.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Build a `{type, data}` envelope and queue it for transmission on
    /// the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotConnected`] if no handle is live or the open
    /// event has not fired yet, [`BusError::InvalidEnvelope`] for an empty
    /// `msg_type` or unserializable payload, and [`BusError::SendFailed`]
    /// if the connection task has already exited.
    pub async fn send<T: Serialize>(&self, msg_type: &str, data: T) -> Result<(), BusError> {
        let slot = self.connection.lock().await;
        let conn = slot.as_ref().ok_or(BusError::NotConnected)?;
        if !conn.established.load(Ordering::SeqCst) {
            return Err(BusError::NotConnected);
        }

        let text = protocol::encode(msg_type, &data)?;
        conn.outbound
            .send(text)
            .map_err(|_| BusError::SendFailed("connection task exited".to_string()))
    }

    /// Close the live connection and release the handle, making the bus
    /// inert until [`connect`](Self::connect) is called again.
    ///
    /// A no-op when nothing is connected. Registered handlers survive.
    pub async fn close(&self) {
        let mut slot = self.connection.lock().await;
        let Some(conn) = slot.take() else {
            return;
        };

        if conn.established.load(Ordering::SeqCst) {
            // Dropping the outbound sender ends the pump, which sends a
            // close frame on its way out.
            drop(conn);
            log::info!("[MessageBus] Connection closed");
        } else {
            // Still mid-handshake: abort before the open callback can fire.
            conn.task.abort();
            log::info!("[MessageBus] Connection attempt aborted");
        }
    }
}

/// Connection task: handshake, open callback, then the select pump.
///
/// Runs until `close()` drops the outbound sender, the server closes, or
/// the transport errors. The handle slot is NOT cleared on exit — only
/// `close()` releases it.
async fn run_connection(
    url: String,
    handlers: Arc<Mutex<HandlerRegistry>>,
    on_open: Arc<Mutex<Option<OpenHandler>>>,
    established: Arc<AtomicBool>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) {
    let (mut writer, mut reader) = match transport::open(&url).await {
        Ok(halves) => halves,
        Err(e) => {
            log::warn!("[MessageBus] Connection to {} failed: {}", url, e);
            return;
        }
    };

    established.store(true, Ordering::SeqCst);
    log::info!("[MessageBus] Connected to {}", url);

    // Snapshot the slot so the callback itself may re-register.
    let open_callback = on_open.lock().await.as_ref().map(Arc::clone);
    if let Some(callback) = open_callback {
        callback();
    }

    loop {
        tokio::select! {
            outgoing = outbound_rx.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = writer.send_text(&text).await {
                        log::warn!("[MessageBus] Send failed: {}", e);
                        break;
                    }
                }
                None => {
                    // close() released the handle.
                    if let Err(e) = writer.send_close().await {
                        log::debug!("[MessageBus] Close handshake failed: {}", e);
                    }
                    break;
                }
            },
            incoming = reader.recv() => match incoming {
                Some(Ok(WireEvent::Text(text))) => {
                    // A fault here is confined to this message; the next
                    // frame gets a fresh turn.
                    if let Err(e) = deliver(&handlers, &text).await {
                        log::error!("[MessageBus] {}", e);
                    }
                }
                Some(Ok(WireEvent::Ping(data))) => {
                    if let Err(e) = writer.send_pong(data).await {
                        log::warn!("[MessageBus] Pong failed: {}", e);
                        break;
                    }
                }
                Some(Ok(WireEvent::Pong(_))) => {}
                Some(Ok(WireEvent::Binary(_))) => {
                    log::trace!("[MessageBus] Ignoring binary frame");
                }
                Some(Ok(WireEvent::Closed { code, reason })) => {
                    log::info!("[MessageBus] Server closed connection ({}: {})", code, reason);
                    break;
                }
                Some(Err(e)) => {
                    log::warn!("[MessageBus] Read error: {}", e);
                    break;
                }
                None => break,
            },
        }
    }

    log::debug!("[MessageBus] Connection task for {} finished", url);
}

/// Dispatch one raw inbound frame.
///
/// Decodes the envelope, then invokes every handler registered for its
/// type, in registration order. An envelope whose type has no handlers is
/// dropped silently — no error, no log. The handler list is snapshotted
/// before invocation so handlers may register listeners or send without
/// deadlocking; invocation itself stays synchronous and sequential.
///
/// # Errors
///
/// Returns [`BusError::Parse`] for text that is not a valid envelope; no
/// handler is invoked in that case.
async fn deliver(handlers: &Mutex<HandlerRegistry>, raw: &str) -> Result<(), BusError> {
    let envelope = protocol::decode(raw)?;

    let snapshot = {
        let registry = handlers.lock().await;
        registry
            .get(&envelope.msg_type)
            .map(|list| list.iter().map(Arc::clone).collect::<Vec<_>>())
    };

    if let Some(listeners) = snapshot {
        for listener in &listeners {
            listener(&envelope.data);
        }
    }
    Ok(())
}
