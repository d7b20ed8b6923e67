//! # spikecast-protocol
//!
//! Wire encoders and multi-part message framing for the Spikecast
//! broadcaster.
//!
//! Every event leaves the process as one logical message made of ordered,
//! named parts: a two-byte kind discriminator, then either a byte-exact
//! binary record or a JSON object. This crate owns both encoders and the
//! per-part wire framing; moving parts through a socket is the transport
//! layer's job.
//!
//! ## Example
//!
//! ```rust
//! use spikecast_core::{ChannelDescriptor, EventRecord, OutputFormat, TtlEvent};
//! use spikecast_protocol::codec;
//!
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
//!
//! let parts = codec::encode(&event, &channel, OutputFormat::Json);
//! assert_eq!(parts.len(), 2);
//! ```

pub mod codec;
pub mod parts;

pub use codec::{encode, SPIKE_RECORD_BASE_SIZE, TTL_RECORD_BASE_SIZE};
pub use parts::{MsgPart, PartError, MAX_PART_SIZE};
