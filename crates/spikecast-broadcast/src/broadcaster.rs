//! The broadcaster facade.
//!
//! Two execution contexts meet here and never share mutable state
//! directly:
//!
//! - the **real-time dispatch context** calls [`Broadcaster::dispatch`]
//!   once per event; it only reads the current binding snapshot and issues
//!   non-blocking sends
//! - the **control context** is a single consumer applying reconfiguration
//!   requests one at a time; it alone mutates the [`PortManager`] and then
//!   publishes a new, fully-constructed snapshot
//!
//! The snapshot lives behind a lock held only for the pointer swap, so the
//! dispatch path always sees either the old or the new complete binding.
//! Pending asynchronous requests sit in a single-slot watch channel: a
//! newer request overwrites an older one that has not been applied yet.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::sync::watch;
use tracing::{info, trace, warn};

use spikecast_core::{ChannelDescriptor, EventRecord, OutputFormat};
use spikecast_protocol::{codec, MsgPart};
use spikecast_transport::{framer, NetContext, PortManager, PubSocket, TransportError};

use crate::config::BroadcastConfig;
use crate::metrics;

/// Default listening port requested at construction.
pub const DEFAULT_PORT: u16 = 5557;

/// A reconfiguration request.
#[derive(Debug, Clone)]
pub struct Reconfigure {
    /// Port to bind; 0 requests an OS-assigned ephemeral port.
    pub port: u16,
    /// New output format; `None` keeps the current one.
    pub format: Option<OutputFormat>,
    /// Rebind even when the port already matches.
    pub force_restart: bool,
    /// Search upward for a free port when the requested one is occupied.
    pub search_for_port: bool,
}

/// State published to the display collaborator after every applied
/// reconfigure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedState {
    /// Actually bound port, 0 when unbound.
    pub port: u16,
    /// Active output format.
    pub format: OutputFormat,
}

/// The active binding read by every dispatch.
struct Binding {
    socket: Option<Arc<PubSocket>>,
    port: u16,
    format: OutputFormat,
}

struct Inner {
    manager: Mutex<PortManager>,
    binding: RwLock<Arc<Binding>>,
    applied_tx: watch::Sender<AppliedState>,
    #[cfg(test)]
    apply_delay: Mutex<Option<std::time::Duration>>,
}

impl Inner {
    fn lock_manager(&self) -> MutexGuard<'_, PortManager> {
        match self.manager.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn snapshot(&self) -> Arc<Binding> {
        match self.binding.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn store(&self, binding: Binding) {
        let binding = Arc::new(binding);
        match self.binding.write() {
            Ok(mut guard) => *guard = binding,
            Err(poisoned) => *poisoned.into_inner() = binding,
        }
    }

    /// Apply one reconfiguration request.
    ///
    /// Runs on the control context, or inline on the caller's thread for a
    /// synchronous reconfigure; the manager lock serializes the two.
    fn apply(&self, request: &Reconfigure) -> Result<u16, TransportError> {
        let mut manager = self.lock_manager();

        #[cfg(test)]
        {
            let delay = match self.apply_delay.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            };
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
        }

        let format = request.format.unwrap_or_else(|| self.snapshot().format);

        let result = if request.force_restart
            || request.port == 0
            || manager.bound_port() != request.port
        {
            manager.rebind(request.port, request.search_for_port)
        } else {
            Ok(manager.bound_port())
        };

        // Publish whatever survived: the new binding, the rolled-back one,
        // or none at all.
        let port = manager.bound_port();
        self.store(Binding {
            socket: manager.socket(),
            port,
            format,
        });
        self.applied_tx.send_replace(AppliedState { port, format });
        metrics::record_reconfigure(result.is_ok(), port);

        match &result {
            Ok(bound) => info!(port = bound, ?format, "Broadcaster reconfigured"),
            Err(error) => warn!(requested = request.port, %error, "Reconfigure failed"),
        }

        result
    }
}

/// Publishes acquisition events to external subscribers.
pub struct Broadcaster {
    inner: Arc<Inner>,
    request_tx: watch::Sender<Option<Reconfigure>>,
}

impl Broadcaster {
    /// Create a broadcaster with the default configuration (port 5557,
    /// JSON, port search enabled).
    #[must_use]
    pub fn new(ctx: NetContext) -> Self {
        Self::with_config(ctx, &BroadcastConfig::default())
    }

    /// Create a broadcaster and asynchronously request the configured
    /// port; the actual binding lands shortly after on the control
    /// context and is observable via [`state_changes`].
    ///
    /// [`state_changes`]: Broadcaster::state_changes
    #[must_use]
    pub fn with_config(ctx: NetContext, config: &BroadcastConfig) -> Self {
        let (request_tx, mut request_rx) = watch::channel(None::<Reconfigure>);
        let (applied_tx, _) = watch::channel(AppliedState {
            port: 0,
            format: config.format,
        });

        let inner = Arc::new(Inner {
            manager: Mutex::new(PortManager::new(ctx.clone())),
            binding: RwLock::new(Arc::new(Binding {
                socket: None,
                port: 0,
                format: config.format,
            })),
            applied_tx,
            #[cfg(test)]
            apply_delay: Mutex::new(None),
        });

        // Control context: a single consumer applying coalesced requests
        // one at a time. A request in progress runs to completion before
        // the next (latest) one is read.
        let control = Arc::clone(&inner);
        ctx.handle().spawn(async move {
            while request_rx.changed().await.is_ok() {
                let request = request_rx.borrow_and_update().clone();
                if let Some(request) = request {
                    let control = Arc::clone(&control);
                    let _ = tokio::task::spawn_blocking(move || control.apply(&request)).await;
                }
            }
        });

        let broadcaster = Self { inner, request_tx };
        broadcaster.reconfigure_async(Reconfigure {
            port: config.port,
            format: Some(config.format),
            force_restart: false,
            search_for_port: config.search_for_port,
        });
        broadcaster
    }

    /// Encode and send one event. Called from the real-time path.
    ///
    /// Failures never cross this boundary: a send error is logged with the
    /// failing part and dropped, and with no active binding the event is
    /// dropped silently. Nothing is queued or retried.
    pub fn dispatch(&self, event: &EventRecord, channel: &ChannelDescriptor) {
        let binding = self.inner.snapshot();
        let Some(socket) = binding.socket.as_deref() else {
            trace!("No active binding, dropping event");
            return;
        };

        let parts = codec::encode(event, channel, binding.format);
        let bytes: usize = parts.iter().map(MsgPart::len).sum();
        match framer::send_multipart(socket, &parts) {
            Ok(()) => metrics::record_event(event.kind(), bytes),
            Err(error) => {
                warn!(%error, "Dropping event after send failure");
                metrics::record_send_failure();
            }
        }
    }

    /// Apply a reconfiguration inline and return the bound port.
    ///
    /// # Errors
    ///
    /// Returns the bind failure; on failure the previous binding has been
    /// restored when possible, otherwise the broadcaster is unbound.
    pub fn reconfigure(&self, request: Reconfigure) -> Result<u16, TransportError> {
        self.inner.apply(&request)
    }

    /// Queue a reconfiguration for the control context and return
    /// immediately.
    ///
    /// A previously queued, not-yet-applied request is overwritten: latest
    /// wins, there is no backlog.
    pub fn reconfigure_async(&self, request: Reconfigure) {
        self.request_tx.send_replace(Some(request));
    }

    /// Synchronously bind a new listening port, keeping the format.
    ///
    /// # Errors
    ///
    /// See [`reconfigure`](Broadcaster::reconfigure).
    pub fn set_listening_port(
        &self,
        port: u16,
        force_restart: bool,
        search_for_port: bool,
    ) -> Result<u16, TransportError> {
        self.reconfigure(Reconfigure {
            port,
            format: None,
            force_restart,
            search_for_port,
        })
    }

    /// Asynchronously request a new listening port, keeping the format.
    pub fn request_listening_port(&self, port: u16, force_restart: bool, search_for_port: bool) {
        self.reconfigure_async(Reconfigure {
            port,
            format: None,
            force_restart,
            search_for_port,
        });
    }

    /// Switch the output format without touching the binding.
    pub fn set_output_format(&self, format: OutputFormat) {
        let manager = self.inner.lock_manager();
        let current = self.inner.snapshot();
        self.inner.store(Binding {
            socket: current.socket.clone(),
            port: current.port,
            format,
        });
        self.inner.applied_tx.send_replace(AppliedState {
            port: current.port,
            format,
        });
        drop(manager);
    }

    /// Currently bound port, 0 when unbound.
    #[must_use]
    pub fn listening_port(&self) -> u16 {
        self.inner.snapshot().port
    }

    /// Active output format.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.inner.snapshot().format
    }

    /// Watch the applied port/format, updated after every reconfigure.
    ///
    /// This is the surface a display collaborator mirrors into its UI.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<AppliedState> {
        self.inner.applied_tx.subscribe()
    }

    #[cfg(test)]
    fn set_apply_delay(&self, delay: std::time::Duration) {
        if let Ok(mut guard) = self.inner.apply_delay.lock() {
            *guard = Some(delay);
        }
    }

    #[cfg(test)]
    fn active_socket(&self) -> Option<Arc<PubSocket>> {
        self.inner.snapshot().socket.clone()
    }
}

impl Drop for Broadcaster {
    // Release the port deterministically; the control task winds down on
    // its own once the request channel closes.
    fn drop(&mut self) {
        self.inner.lock_manager().unbind();
        self.inner.store(Binding {
            socket: None,
            port: 0,
            format: self.inner.snapshot().format,
        });
    }
}
