//! # spikecast-broadcast
//!
//! Event broadcaster facade for real-time acquisition pipelines.
//!
//! The [`Broadcaster`] sits between a real-time processing loop and
//! external subscriber processes: the loop hands it one event per cycle,
//! and it encodes the event (raw binary or JSON), frames it as a
//! multi-part message, and fans it out to every connected subscriber -
//! fire-and-forget, never blocking the caller beyond a non-blocking send.
//!
//! Reconfiguration (port and format) runs on a separate control context;
//! the dispatch path always reads a complete binding snapshot, never an
//! intermediate one.
//!
//! ## Example
//!
//! ```no_run
//! use spikecast_broadcast::{BroadcastConfig, Broadcaster};
//! use spikecast_core::{ChannelDescriptor, EventRecord, TtlEvent};
//! use spikecast_transport::NetContext;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = NetContext::new()?;
//! let broadcaster = Broadcaster::with_config(ctx, &BroadcastConfig::default());
//!
//! // From the processing loop, once per event:
//! let channel = ChannelDescriptor {
//!     identifier: "stream-0.ttl".into(),
//!     name: "TTL".into(),
//!     stream_name: "probe-a".into(),
//!     source_node_id: 104,
//!     sample_rate: 30_000.0,
//!     channel_count: 1,
//!     extra_data_size: 0,
//!     metadata: Vec::new(),
//! };
//! let event = EventRecord::Ttl(TtlEvent {
//!     line: 3,
//!     state: true,
//!     sample_number: 1000,
//!     metadata: Vec::new(),
//! });
//! broadcaster.dispatch(&event, &channel);
//! # Ok(())
//! # }
//! ```

pub mod broadcaster;
pub mod config;
pub mod metrics;

pub use broadcaster::{AppliedState, Broadcaster, Reconfigure, DEFAULT_PORT};
pub use config::BroadcastConfig;
