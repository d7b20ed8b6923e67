//! Listening-port lifecycle.
//!
//! `PortManager` owns the one bound publisher socket and walks it through
//! the unbound/bound lifecycle: bind with optional upward port search,
//! unbind-before-rebind, and rollback to the previous port when a rebind
//! fails.

use std::sync::Arc;

use tracing::{info, warn};

use crate::context::NetContext;
use crate::error::TransportError;
use crate::socket::PubSocket;

/// Owner of the bound publisher socket.
///
/// Starts unbound. All mutation is expected to happen from one control
/// context at a time; readers get the active socket via [`socket`] and keep
/// using their snapshot until the next hand-off.
///
/// [`socket`]: PortManager::socket
pub struct PortManager {
    ctx: NetContext,
    socket: Option<Arc<PubSocket>>,
}

impl PortManager {
    /// Create an unbound manager on the given context.
    #[must_use]
    pub fn new(ctx: NetContext) -> Self {
        Self { ctx, socket: None }
    }

    /// Currently bound port, 0 when unbound.
    #[must_use]
    pub fn bound_port(&self) -> u16 {
        self.socket
            .as_ref()
            .map(|socket| socket.local_port())
            .unwrap_or(0)
    }

    /// Handle to the active socket, if any.
    #[must_use]
    pub fn socket(&self) -> Option<Arc<PubSocket>> {
        self.socket.clone()
    }

    /// Bind at `requested`, searching upward past occupied ports when
    /// `search_if_busy` is set.
    ///
    /// Any existing binding is released first, so the old port is free the
    /// moment this returns whatever the outcome. `requested` 0 binds an
    /// OS-assigned ephemeral port directly (no search involved).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] for a terminal bind failure and
    /// [`TransportError::PortsExhausted`] when the search runs out of
    /// candidates.
    pub fn bind(&mut self, requested: u16, search_if_busy: bool) -> Result<u16, TransportError> {
        self.unbind();

        let mut candidate = requested;
        let socket = loop {
            match PubSocket::bind(&self.ctx, candidate) {
                Ok(socket) => break socket,
                Err(error) if search_if_busy && requested != 0 && error.is_addr_in_use() => {
                    candidate = candidate
                        .checked_add(1)
                        .ok_or(TransportError::PortsExhausted(requested))?;
                }
                Err(error) => {
                    warn!(port = candidate, %error, "Bind failed");
                    return Err(error);
                }
            }
        };

        let port = socket.local_port();
        self.socket = Some(Arc::new(socket));
        Ok(port)
    }

    /// Bind at `requested` with rollback.
    ///
    /// When the new bind fails the manager tries to restore the previous
    /// port; when that also fails it ends unbound, and the caller's
    /// dispatches drop until the next successful reconfigure.
    ///
    /// # Errors
    ///
    /// Returns the original bind failure even when the rollback succeeds.
    pub fn rebind(&mut self, requested: u16, search_if_busy: bool) -> Result<u16, TransportError> {
        let previous = self.bound_port();
        match self.bind(requested, search_if_busy) {
            Ok(port) => Ok(port),
            Err(error) => {
                if previous != 0 {
                    match self.bind(previous, false) {
                        Ok(_) => info!(port = previous, "Restored previous binding"),
                        Err(rollback) => {
                            warn!(port = previous, %rollback, "Could not restore previous binding")
                        }
                    }
                }
                Err(error)
            }
        }
    }

    /// Release the bound port. No-op when already unbound.
    pub fn unbind(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.close();
        }
    }
}

impl Drop for PortManager {
    fn drop(&mut self) {
        self.unbind();
    }
}
