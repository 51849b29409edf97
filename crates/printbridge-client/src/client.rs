//! Bridge connection manager.

use crate::config::BridgeConfig;
use crate::handlers::BridgeHandlers;
use futures_util::{SinkExt, StreamExt};
use printbridge_core::{ConfigurationError, ConnectionState, Endpoint, PrintJob};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type BridgeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Owns the single WebSocket to a print bridge.
///
/// After [`connect`](Self::connect) a background task keeps the socket
/// alive: every drop or failed handshake is followed by another attempt,
/// forever, until the client is closed or dropped.
///
/// Submission is fire-and-forget. While the socket is down, submitted jobs
/// are logged and discarded; the caller gets no error and nothing reaches
/// the bridge. Frames handed over just before a drop may be lost the same
/// way.
pub struct BridgeClient {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

/// Writer slot of the live session.
///
/// `generation` changes on every `connect` and `close`. A connection task
/// only touches the slot or the state while its own generation is current,
/// so a task that outlives `close` cannot resurrect the connection.
#[derive(Default)]
struct Session {
    generation: u64,
    /// `None` while disconnected.
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

/// State the connection task and callers both touch.
struct Shared {
    config: BridgeConfig,
    handlers: BridgeHandlers,
    state: watch::Sender<ConnectionState>,
    session: Mutex<Session>,
    /// Set after the first unreachable warning has been surfaced.
    has_warned: AtomicBool,
}

impl BridgeClient {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_handlers(config, BridgeHandlers::default())
    }

    pub fn with_handlers(config: BridgeConfig, handlers: BridgeHandlers) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                config,
                handlers,
                state,
                session: Mutex::new(Session::default()),
                has_warned: AtomicBool::new(false),
            }),
            supervisor: Mutex::new(None),
        }
    }

    /// Start maintaining a connection to `endpoint`.
    ///
    /// Returns as soon as the address is validated; the handshake happens in
    /// the background. Calling this while a connection is established or
    /// being attempted does nothing. Must be called from within a Tokio
    /// runtime.
    pub fn connect(&self, endpoint: &str) -> Result<(), ConfigurationError> {
        let endpoint: Endpoint = endpoint.parse()?;

        let mut supervisor = lock(&self.supervisor);
        if supervisor.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!("Bridge connection already active, ignoring connect to {}", endpoint);
            return Ok(());
        }

        tracing::info!("Connecting to print bridge at {}", endpoint);
        let generation = {
            let mut session = lock(&self.shared.session);
            session.generation += 1;
            session.generation
        };
        let shared = self.shared.clone();
        *supervisor = Some(tokio::spawn(shared.maintain(endpoint, generation)));
        Ok(())
    }

    /// Send one job to the bridge.
    ///
    /// Each frame of the job is a separate message, sent in order. If the
    /// bridge is not connected the job is dropped without error.
    pub fn submit(&self, job: PrintJob) {
        self.submit_all([job]);
    }

    /// Send several jobs as one burst, preserving their order.
    ///
    /// Frames from one burst are never interleaved with another caller's.
    pub fn submit_all(&self, jobs: impl IntoIterator<Item = PrintJob>) {
        let session = lock(&self.shared.session);
        let Some(tx) = session.outbound.as_ref() else {
            let dropped: Vec<_> = jobs.into_iter().map(|j| j.kind().to_string()).collect();
            if !dropped.is_empty() {
                tracing::warn!(
                    "Print bridge not connected, dropping {} job(s) for {:?}",
                    dropped.len(),
                    dropped
                );
            }
            return;
        };

        for job in jobs {
            let kind = job.kind().to_string();
            for frame in job.into_frames() {
                let text = match frame.to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("Could not encode {} frame: {}", kind, e);
                        continue;
                    }
                };
                if tx.send(Message::Text(text.into())).is_err() {
                    tracing::warn!("Print bridge connection closed mid-burst, dropping rest");
                    return;
                }
                tracing::debug!("Queued {} frame for bridge", kind);
            }
        }
    }

    /// Whether a handshake has completed and the socket is still up.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Stop reconnecting and drop the socket.
    ///
    /// A later [`connect`](Self::connect) starts over, though the one-time
    /// unreachable warning is not repeated.
    pub fn close(&self) {
        if let Some(task) = lock(&self.supervisor).take() {
            task.abort();
        }
        let mut session = lock(&self.shared.session);
        session.generation += 1;
        session.outbound = None;
        self.shared.set_state(ConnectionState::Disconnected);
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.supervisor).take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("state", &self.state())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl Shared {
    /// Reconnect loop. Runs until aborted or superseded.
    async fn maintain(self: Arc<Self>, endpoint: Endpoint, generation: u64) {
        let mut backoff = self.config.reconnect.backoff();
        let url = endpoint.to_string();

        loop {
            if !self.transition(generation, ConnectionState::Connecting) {
                tracing::debug!("Bridge connection to {} closed, stopping", endpoint);
                return;
            }

            let attempt = tokio::time::timeout(
                self.config.handshake_timeout,
                tokio_tungstenite::connect_async(url.as_str()),
            )
            .await;

            match attempt {
                Ok(Ok((socket, _response))) => {
                    backoff.reset();
                    self.run_session(&endpoint, socket, generation).await;
                }
                Ok(Err(e)) => self.attempt_failed(&endpoint, generation, &e.to_string()),
                Err(_) => self.attempt_failed(
                    &endpoint,
                    generation,
                    &format!("handshake timed out after {:?}", self.config.handshake_timeout),
                ),
            }

            let delay = backoff.next_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Pump one established socket until it drops.
    async fn run_session(&self, endpoint: &Endpoint, socket: BridgeSocket, generation: u64) {
        let (mut sink, mut stream) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        {
            let mut session = lock(&self.session);
            if session.generation != generation {
                return;
            }
            session.outbound = Some(tx);
            self.set_state(ConnectionState::Connected);
        }
        tracing::info!("Connected to print bridge at {}", endpoint);
        self.handlers.connected();

        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    if let Err(e) = sink.send(msg).await {
                        tracing::debug!("Bridge write failed: {}", e);
                        break;
                    }
                }

                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            tracing::debug!("Bridge says: {}", text.as_str());
                            self.handlers.message(text.as_str());
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::debug!("Bridge closed the connection: {:?}", frame);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::debug!("Bridge socket error: {}", e);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        // Close the writer before flipping state so nothing submitted after
        // `is_connected()` turns false can reach the transport.
        {
            let mut session = lock(&self.session);
            if session.generation != generation {
                return;
            }
            session.outbound = None;
            self.set_state(ConnectionState::Disconnected);
        }
        tracing::info!("Disconnected from print bridge at {}, reconnecting", endpoint);
        self.handlers.disconnected();
    }

    fn attempt_failed(&self, endpoint: &Endpoint, generation: u64, reason: &str) {
        if !self.transition(generation, ConnectionState::Disconnected) {
            return;
        }
        if self.has_warned.swap(true, Ordering::SeqCst) {
            tracing::debug!("Print bridge at {} still unreachable: {}", endpoint, reason);
        } else {
            tracing::warn!(
                "Could not connect to the printer at {} ({}). \
                 Please verify that the hardware bridge is running.",
                endpoint,
                reason
            );
            self.handlers.unreachable(endpoint, reason);
        }
    }

    /// Set the state on behalf of task `generation`, unless it is stale.
    fn transition(&self, generation: u64, next: ConnectionState) -> bool {
        let session = lock(&self.session);
        if session.generation != generation {
            return false;
        }
        self.set_state(next);
        true
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::trace!("Bridge state {} -> {}", prev, next);
        }
    }
}

/// The guarded data stays consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
