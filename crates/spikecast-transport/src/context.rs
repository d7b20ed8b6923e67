//! Shared I/O context.
//!
//! Every socket's accept loop and subscriber writers run on one runtime
//! owned by a `NetContext`. The context is an explicit value the host
//! creates and injects into each [`PortManager`] - there is no ambient
//! global - and it is reference-counted: clones are cheap, and the backing
//! runtime shuts down when the last clone is dropped.
//!
//! [`PortManager`]: crate::port::PortManager

use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

use crate::error::TransportError;

/// Reference-counted handle to the broadcast I/O runtime.
#[derive(Clone)]
pub struct NetContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl NetContext {
    /// Create a context backed by its own small multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn new() -> Result<Self, TransportError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("spikecast-io")
            .enable_all()
            .build()
            .map_err(TransportError::Context)?;
        let handle = runtime.handle().clone();

        debug!("Created broadcast I/O context");
        Ok(Self {
            inner: Arc::new(ContextInner {
                runtime: Some(runtime),
                handle,
            }),
        })
    }

    /// Wrap a runtime the host already owns.
    ///
    /// The context never shuts a borrowed runtime down; its lifetime stays
    /// with the host.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                runtime: None,
                handle,
            }),
        }
    }

    /// Handle for spawning onto the context runtime.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Contexts may be dropped from async code, so never block here.
            runtime.shutdown_background();
            debug!("Broadcast I/O context shut down");
        }
    }
}

impl std::fmt::Debug for NetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetContext")
            .field("owns_runtime", &self.inner.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_spawns_tasks() {
        let ctx = NetContext::new().unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        ctx.handle().spawn(async move {
            let _ = tx.send(42);
        });
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(1)), Ok(42));
    }

    #[test]
    fn test_clones_share_runtime() {
        let ctx = NetContext::new().unwrap();
        let clone = ctx.clone();
        drop(ctx);

        // The runtime stays up until the last clone is gone.
        let (tx, rx) = std::sync::mpsc::channel();
        clone.handle().spawn(async move {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(std::time::Duration::from_secs(1)).is_ok());
    }
}
