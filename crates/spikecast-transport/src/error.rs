//! Transport error taxonomy.

use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O context or runtime allocation failed.
    #[error("Failed to create I/O context: {0}")]
    Context(#[source] std::io::Error),

    /// Binding the requested port failed.
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        /// Port the bind was attempted on.
        port: u16,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The automatic port search ran out of candidate ports.
    #[error("No free port found searching upward from {0}")]
    PortsExhausted(u16),

    /// The socket has already been closed.
    #[error("Socket is closed")]
    Closed,

    /// Part-level framing error.
    #[error("Framing error: {0}")]
    Part(#[from] spikecast_protocol::PartError),
}

impl TransportError {
    /// Whether this is a bind failure caused by the port being occupied -
    /// the only failure the port search retries past.
    #[must_use]
    pub fn is_addr_in_use(&self) -> bool {
        matches!(
            self,
            TransportError::Bind { source, .. }
                if source.kind() == std::io::ErrorKind::AddrInUse
        )
    }
}

/// A mid-message send failure.
///
/// The message is abandoned at the named part; later messages are
/// unaffected.
#[derive(Debug, Error)]
#[error("Failed to send part '{part}' (index {index}): {source}")]
pub struct SendError {
    /// Name of the part that failed.
    pub part: &'static str,
    /// Index of the part within the message.
    pub index: usize,
    /// Underlying transport failure.
    #[source]
    pub source: TransportError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_in_use_detection() {
        let busy = TransportError::Bind {
            port: 5557,
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(busy.is_addr_in_use());

        let denied = TransportError::Bind {
            port: 80,
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!denied.is_addr_in_use());
        assert!(!TransportError::Closed.is_addr_in_use());
    }

    #[test]
    fn test_send_error_message() {
        let error = SendError {
            part: "json",
            index: 1,
            source: TransportError::Closed,
        };
        assert_eq!(
            error.to_string(),
            "Failed to send part 'json' (index 1): Socket is closed"
        );
    }
}
