//! Event types produced by the acquisition pipeline.
//!
//! Each event arrives together with the [`ChannelDescriptor`] of the channel
//! it was detected on; the descriptor declares the metadata layout, the event
//! carries the matching raw values.
//!
//! [`ChannelDescriptor`]: crate::channel::ChannelDescriptor

use crate::metadata::MetadataValue;

/// Event kind identifiers, sent as the leading wire discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventKind {
    Ttl = 0,
    Spike = 1,
}

impl From<EventKind> for u16 {
    fn from(kind: EventKind) -> u16 {
        kind as u16
    }
}

impl TryFrom<u16> for EventKind {
    type Error = &'static str;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventKind::Ttl),
            1 => Ok(EventKind::Spike),
            _ => Err("Invalid event kind"),
        }
    }
}

/// A digital line transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TtlEvent {
    /// Digital line the transition occurred on.
    pub line: u32,
    /// New line state.
    pub state: bool,
    /// Acquisition sample number at the transition.
    pub sample_number: i64,
    /// Raw metadata values matching the channel's descriptors, in order.
    pub metadata: Vec<MetadataValue>,
}

/// A detected action-potential waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeEvent {
    /// Sorted cluster id (0 = unsorted).
    pub sorted_id: u16,
    /// Number of channels the waveform spans.
    pub channel_count: u32,
    /// Waveform samples, channel-major: `channel_count * samples_per_channel`
    /// entries, each channel's samples contiguous.
    pub waveform: Vec<f32>,
    /// Detection threshold per channel.
    pub thresholds: Vec<f32>,
    /// Number of samples recorded before the waveform peak.
    pub pre_peak_samples: u32,
    /// Acquisition sample number at the peak.
    pub sample_number: i64,
    /// Raw metadata values matching the channel's descriptors, in order.
    pub metadata: Vec<MetadataValue>,
}

impl SpikeEvent {
    /// Number of samples stored per channel.
    #[must_use]
    pub fn samples_per_channel(&self) -> usize {
        if self.channel_count == 0 {
            0
        } else {
            self.waveform.len() / self.channel_count as usize
        }
    }
}

/// An event ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord {
    /// A digital line transition.
    Ttl(TtlEvent),
    /// A detected spike.
    Spike(SpikeEvent),
}

impl EventRecord {
    /// Get the wire discriminator kind.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventRecord::Ttl(_) => EventKind::Ttl,
            EventRecord::Spike(_) => EventKind::Spike,
        }
    }

    /// Acquisition sample number of the event.
    #[must_use]
    pub fn sample_number(&self) -> i64 {
        match self {
            EventRecord::Ttl(event) => event.sample_number,
            EventRecord::Spike(spike) => spike.sample_number,
        }
    }

    /// Raw metadata values attached to the event.
    #[must_use]
    pub fn metadata(&self) -> &[MetadataValue] {
        match self {
            EventRecord::Ttl(event) => &event.metadata,
            EventRecord::Spike(spike) => &spike.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_ids() {
        assert_eq!(u16::from(EventKind::Ttl), 0);
        assert_eq!(u16::from(EventKind::Spike), 1);
        assert_eq!(EventKind::try_from(0), Ok(EventKind::Ttl));
        assert_eq!(EventKind::try_from(1), Ok(EventKind::Spike));
        assert!(EventKind::try_from(2).is_err());
    }

    #[test]
    fn test_samples_per_channel() {
        let spike = SpikeEvent {
            sorted_id: 1,
            channel_count: 4,
            waveform: vec![0.0; 4 * 40],
            thresholds: vec![-50.0; 4],
            pre_peak_samples: 8,
            sample_number: 1000,
            metadata: Vec::new(),
        };
        assert_eq!(spike.samples_per_channel(), 40);
    }

    #[test]
    fn test_record_accessors() {
        let record = EventRecord::Ttl(TtlEvent {
            line: 3,
            state: true,
            sample_number: 42,
            metadata: Vec::new(),
        });
        assert_eq!(record.kind(), EventKind::Ttl);
        assert_eq!(record.sample_number(), 42);
        assert!(record.metadata().is_empty());
    }
}
