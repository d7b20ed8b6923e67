//! Publisher socket.
//!
//! A `PubSocket` owns a wildcard-bound TCP listener and the set of
//! subscriber connections accepted from it. Publishing is fire-and-forget
//! fan-out: a completed message is offered to each subscriber's bounded
//! outgoing queue without blocking; a subscriber that cannot keep up misses
//! that message, a disconnected one is pruned. Nothing is ever read from
//! subscribers.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::context::NetContext;
use crate::error::TransportError;

/// Per-subscriber outgoing queue depth; a subscriber that falls this far
/// behind starts missing messages.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 1024;

/// Bound on how long `close` waits for the accept loop to release the port.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Shared {
    subscribers: DashMap<u64, mpsc::Sender<Bytes>>,
    next_subscriber_id: AtomicU64,
    closed: AtomicBool,
}

/// A bound publisher socket.
#[derive(Debug)]
pub struct PubSocket {
    shared: Arc<Shared>,
    port: u16,
    accept_task: JoinHandle<()>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    released_rx: Mutex<Option<std_mpsc::Receiver<()>>>,
}

impl PubSocket {
    /// Bind a publisher socket on the wildcard address.
    ///
    /// `port` 0 requests an OS-assigned ephemeral port. The listener is
    /// bound synchronously on the calling thread so bind failures
    /// (`AddrInUse` in particular) surface immediately; the accept loop
    /// then runs on the context runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] when the port cannot be bound.
    pub fn bind(ctx: &NetContext, port: u16) -> Result<Self, TransportError> {
        let bind_err = |source| TransportError::Bind { port, source };

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = StdTcpListener::bind(addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let actual = listener.local_addr().map_err(bind_err)?.port();

        let shared = Arc::new(Shared {
            subscribers: DashMap::new(),
            next_subscriber_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (released_tx, released_rx) = std_mpsc::channel();

        let accept_task = ctx.handle().spawn(accept_loop(
            listener,
            Arc::clone(&shared),
            shutdown_rx,
            released_tx,
            actual,
        ));

        info!(port = actual, "Publisher socket listening");
        Ok(Self {
            shared,
            port: actual,
            accept_task,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            released_rx: Mutex::new(Some(released_rx)),
        })
    }

    /// Port the socket is bound to.
    #[must_use]
    pub fn local_port(&self) -> u16 {
        self.port
    }

    /// Number of connected subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Whether the socket has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Fan a completed message out to every subscriber.
    ///
    /// Non-blocking: each subscriber either takes the message into its
    /// queue or misses it. Returns the number of subscribers that took it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the socket has been closed.
    pub fn publish(&self, message: &Bytes) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut delivered = 0;
        let mut disconnected = Vec::new();
        for entry in self.shared.subscribers.iter() {
            match entry.value().try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!(subscriber = *entry.key(), "Subscriber queue full, message missed");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => disconnected.push(*entry.key()),
            }
        }
        for id in disconnected {
            self.shared.subscribers.remove(&id);
            debug!(subscriber = id, "Pruned disconnected subscriber");
        }

        Ok(delivered)
    }

    /// Close the socket and release the port.
    ///
    /// Waits (bounded) until the accept loop has dropped the listener, so a
    /// competing bind on the same port can succeed as soon as this returns.
    /// Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Ok(mut guard) = self.shutdown_tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
            }
        }
        if let Ok(mut guard) = self.released_rx.lock() {
            if let Some(rx) = guard.take() {
                if rx.recv_timeout(CLOSE_TIMEOUT).is_err() {
                    warn!(port = self.port, "Timed out waiting for listener release");
                }
            }
        }
        self.shared.subscribers.clear();

        info!(port = self.port, "Publisher socket closed");
    }
}

impl Drop for PubSocket {
    // Best-effort teardown without blocking; `close` is the deterministic
    // release path.
    fn drop(&mut self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            if let Ok(mut guard) = self.shutdown_tx.lock() {
                if let Some(tx) = guard.take() {
                    let _ = tx.send(());
                }
            }
            self.shared.subscribers.clear();
        }
        self.accept_task.abort();
    }
}

async fn accept_loop(
    listener: StdTcpListener,
    shared: Arc<Shared>,
    mut shutdown_rx: oneshot::Receiver<()>,
    released_tx: std_mpsc::Sender<()>,
    port: u16,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(error) => {
            warn!(port, %error, "Failed to register listener with the runtime");
            let _ = released_tx.send(());
            return;
        }
    };

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let id = shared.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
                    let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
                    shared.subscribers.insert(id, tx);
                    debug!(subscriber = id, %peer, "Subscriber connected");
                    tokio::spawn(subscriber_writer(id, stream, rx, Arc::clone(&shared)));
                }
                Err(error) => {
                    warn!(port, %error, "Failed to accept subscriber");
                }
            },
        }
    }

    drop(listener);
    let _ = released_tx.send(());
}

async fn subscriber_writer(
    id: u64,
    mut stream: TcpStream,
    mut rx: mpsc::Receiver<Bytes>,
    shared: Arc<Shared>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(error) = stream.write_all(&message).await {
            debug!(subscriber = id, %error, "Subscriber write failed");
            break;
        }
    }
    shared.subscribers.remove(&id);
    debug!(subscriber = id, "Subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpStream as StdTcpStream;
    use std::time::Instant;

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_bind_ephemeral() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();
        assert_ne!(socket.local_port(), 0);
        assert!(!socket.is_closed());
        socket.close();
    }

    #[test]
    fn test_bind_occupied_port_fails() {
        let ctx = NetContext::new().unwrap();
        let holder = PubSocket::bind(&ctx, 0).unwrap();
        let port = holder.local_port();

        let error = PubSocket::bind(&ctx, port).unwrap_err();
        assert!(error.is_addr_in_use());

        holder.close();
    }

    #[test]
    fn test_close_releases_port() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();
        let port = socket.local_port();
        socket.close();

        // The port is free the moment close() returns.
        let rebound = PubSocket::bind(&ctx, port).unwrap();
        assert_eq!(rebound.local_port(), port);
        rebound.close();
    }

    #[test]
    fn test_publish_without_subscribers() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();
        assert_eq!(socket.publish(&Bytes::from_static(b"payload")).unwrap(), 0);
        socket.close();
    }

    #[test]
    fn test_publish_after_close() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();
        socket.close();
        assert!(matches!(
            socket.publish(&Bytes::from_static(b"payload")),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn test_subscriber_receives_message() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();

        let mut stream =
            StdTcpStream::connect((Ipv4Addr::LOCALHOST, socket.local_port())).unwrap();
        assert!(wait_for(|| socket.subscriber_count() == 1));

        let delivered = socket.publish(&Bytes::from_static(b"spike")).unwrap();
        assert_eq!(delivered, 1);

        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut received = [0u8; 5];
        stream.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"spike");

        socket.close();
    }

    #[test]
    fn test_disconnected_subscriber_is_pruned() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();

        let stream =
            StdTcpStream::connect((Ipv4Addr::LOCALHOST, socket.local_port())).unwrap();
        assert!(wait_for(|| socket.subscriber_count() == 1));
        drop(stream);

        // Writes start failing once the peer is gone; the writer task then
        // removes itself from the subscriber set.
        assert!(wait_for(|| {
            let _ = socket.publish(&Bytes::from_static(b"ping"));
            socket.subscriber_count() == 0
        }));

        socket.close();
    }
}
