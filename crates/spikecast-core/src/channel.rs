//! Channel descriptors.

use crate::metadata::MetadataDescriptor;

/// Immutable description of the channel an event was detected on.
///
/// The acquisition pipeline supplies a descriptor snapshot with every
/// dispatch; the broadcaster reads it and lets it go. It is never mutated,
/// cached, or persisted here.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    /// Globally unique channel identifier.
    pub identifier: String,
    /// Display name (the electrode name for spike channels).
    pub name: String,
    /// Name of the owning data stream.
    pub stream_name: String,
    /// Id of the processor node that produced the stream.
    pub source_node_id: u32,
    /// Stream sample rate in Hz.
    pub sample_rate: f32,
    /// Number of channels (spike channels may span several electrodes).
    pub channel_count: u32,
    /// Declared size of per-event extra data, in bytes.
    pub extra_data_size: usize,
    /// Descriptors for the metadata attached to each event, in order.
    pub metadata: Vec<MetadataDescriptor>,
}

impl ChannelDescriptor {
    /// Total declared size of the per-event metadata block, in bytes.
    #[must_use]
    pub fn event_metadata_size(&self) -> usize {
        self.metadata.iter().map(MetadataDescriptor::byte_len).sum()
    }
}
