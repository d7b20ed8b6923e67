//! # spikecast-transport
//!
//! Publisher socket and listening-port lifecycle for the Spikecast
//! broadcaster.
//!
//! This crate owns everything between an encoded message and the network:
//!
//! - **NetContext** - explicit, reference-counted I/O context the host
//!   creates and injects; no ambient globals
//! - **PubSocket** - wildcard-bound listener with fire-and-forget
//!   subscriber fan-out
//! - **PortManager** - bind / unbind / port-search / rollback state machine
//! - **framer** - the multi-part send loop
//!
//! Sends are fire-and-forget: no acknowledgement, no retry, no queuing of
//! unsent messages beyond each subscriber's bounded outgoing queue.

pub mod context;
pub mod error;
pub mod framer;
pub mod port;
pub mod socket;

pub use context::NetContext;
pub use error::{SendError, TransportError};
pub use port::PortManager;
pub use socket::PubSocket;
