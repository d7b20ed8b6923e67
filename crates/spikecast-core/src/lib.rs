//! # spikecast-core
//!
//! Event, channel, and metadata model for the Spikecast broadcaster.
//!
//! This crate provides the types the acquisition pipeline hands to the
//! broadcaster once per processing cycle:
//!
//! - **EventRecord** - TTL line transitions and detected spikes
//! - **ChannelDescriptor** - immutable snapshot of the producing channel
//! - **Metadata** - typed per-event attributes and the reader that renders
//!   them for JSON enrichment
//! - **OutputFormat** - raw-binary vs. JSON wire format selection
//!
//! Everything here is plain data: no sockets, no I/O, no shared state.

pub mod channel;
pub mod event;
pub mod format;
pub mod metadata;

pub use channel::ChannelDescriptor;
pub use event::{EventKind, EventRecord, SpikeEvent, TtlEvent};
pub use format::OutputFormat;
pub use metadata::{MetaValue, MetadataDescriptor, MetadataValue, ScalarType};
