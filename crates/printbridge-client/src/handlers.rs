//! Lifecycle callbacks.

use printbridge_core::Endpoint;
use std::fmt;
use std::sync::Arc;

type Hook = Arc<dyn Fn() + Send + Sync>;
type MessageHook = Arc<dyn Fn(&str) + Send + Sync>;
type UnreachableHook = Arc<dyn Fn(&Endpoint, &str) + Send + Sync>;

/// Callbacks fired by the connection task.
///
/// Callbacks run on the connection task itself and should return quickly.
#[derive(Clone, Default)]
pub struct BridgeHandlers {
    pub(crate) on_connect: Option<Hook>,
    pub(crate) on_disconnect: Option<Hook>,
    pub(crate) on_message: Option<MessageHook>,
    pub(crate) on_unreachable: Option<UnreachableHook>,
}

impl BridgeHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fired after every successful handshake.
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Fired when an established connection drops or closes.
    pub fn on_disconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Fired for each text frame the bridge pushes.
    pub fn on_message(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Fired once per client, the first time the bridge cannot be reached.
    pub fn on_unreachable(mut self, f: impl Fn(&Endpoint, &str) + Send + Sync + 'static) -> Self {
        self.on_unreachable = Some(Arc::new(f));
        self
    }

    pub(crate) fn connected(&self) {
        if let Some(f) = &self.on_connect {
            f();
        }
    }

    pub(crate) fn disconnected(&self) {
        if let Some(f) = &self.on_disconnect {
            f();
        }
    }

    pub(crate) fn message(&self, text: &str) {
        if let Some(f) = &self.on_message {
            f(text);
        }
    }

    pub(crate) fn unreachable(&self, endpoint: &Endpoint, reason: &str) {
        if let Some(f) = &self.on_unreachable {
            f(endpoint, reason);
        }
    }
}

impl fmt::Debug for BridgeHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_unreachable", &self.on_unreachable.is_some())
            .finish()
    }
}
