//! Event encoders.
//!
//! [`encode`] turns an event plus its channel descriptor into the ordered
//! parts of one outgoing message: a two-byte little-endian kind
//! discriminator part named `"type"` (0 = TTL, 1 = spike), then either a
//! byte-exact `"data"` record or a `"json"` object.
//!
//! Binary records are little-endian with fixed base layouts:
//!
//! TTL `"data"` part ([`TTL_RECORD_BASE_SIZE`] bytes, then the channel's
//! declared metadata block):
//!
//! | field | type |
//! |---|---|
//! | line | u32 |
//! | state | u32 (0 or 1) |
//! | sample_number | i64 |
//! | source_node | u32 |
//! | sample_rate | f32 |
//!
//! Spike `"data"` part ([`SPIKE_RECORD_BASE_SIZE`] bytes, then the metadata
//! block, then one f32 peak amplitude per channel):
//!
//! | field | type |
//! |---|---|
//! | sorted_id | u16 |
//! | channel_count | u32 |
//! | pre_peak_samples | u32 |
//! | sample_number | i64 |
//! | source_node | u32 |
//! | sample_rate | f32 |

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};
use spikecast_core::{
    metadata, ChannelDescriptor, EventRecord, MetaValue, MetadataValue, OutputFormat, SpikeEvent,
    TtlEvent,
};

use crate::parts::MsgPart;

/// Fixed size of the TTL binary record before the channel metadata block.
pub const TTL_RECORD_BASE_SIZE: usize = 24;

/// Fixed size of the spike binary record before the channel metadata block
/// and the per-channel amplitude block.
pub const SPIKE_RECORD_BASE_SIZE: usize = 26;

/// Encode an event into the ordered parts of one outgoing message.
///
/// Encoding does not fail: the metadata scalar-type set is closed, and
/// contract violations in the supplied data (a metadata block shorter than
/// the channel declares, a peak offset past the waveform) assert in debug
/// builds and zero-fill in release builds.
#[must_use]
pub fn encode(
    event: &EventRecord,
    channel: &ChannelDescriptor,
    format: OutputFormat,
) -> Vec<MsgPart> {
    let kind = u16::from(event.kind()).to_le_bytes();
    let discriminator = MsgPart::new("type", Bytes::copy_from_slice(&kind));

    let body = match format {
        OutputFormat::RawBinary => {
            let record = match event {
                EventRecord::Ttl(ttl) => encode_ttl_record(ttl, channel),
                EventRecord::Spike(spike) => encode_spike_record(spike, channel),
            };
            MsgPart::new("data", record)
        }
        OutputFormat::Json => MsgPart::new("json", encode_json(event, channel)),
    };

    vec![discriminator, body]
}

fn encode_ttl_record(event: &TtlEvent, channel: &ChannelDescriptor) -> Bytes {
    let size = TTL_RECORD_BASE_SIZE + channel.event_metadata_size();
    let mut buf = BytesMut::with_capacity(size);

    buf.put_u32_le(event.line);
    buf.put_u32_le(u32::from(event.state));
    buf.put_i64_le(event.sample_number);
    buf.put_u32_le(channel.source_node_id);
    buf.put_f32_le(channel.sample_rate);
    put_metadata_block(&mut buf, &event.metadata, channel);

    debug_assert_eq!(buf.len(), size);
    buf.freeze()
}

fn encode_spike_record(spike: &SpikeEvent, channel: &ChannelDescriptor) -> Bytes {
    let channels = spike.channel_count as usize;
    let size = SPIKE_RECORD_BASE_SIZE
        + channel.event_metadata_size()
        + channels * std::mem::size_of::<f32>();
    let mut buf = BytesMut::with_capacity(size);

    buf.put_u16_le(spike.sorted_id);
    buf.put_u32_le(spike.channel_count);
    buf.put_u32_le(spike.pre_peak_samples);
    buf.put_i64_le(spike.sample_number);
    buf.put_u32_le(channel.source_node_id);
    buf.put_f32_le(channel.sample_rate);
    put_metadata_block(&mut buf, &spike.metadata, channel);
    for ch in 0..channels {
        buf.put_f32_le(peak_amplitude(spike, ch));
    }

    debug_assert_eq!(buf.len(), size);
    buf.freeze()
}

/// Write the per-event metadata block.
///
/// Values go out in descriptor order, padded or truncated to each
/// descriptor's declared length, so the block size always matches the
/// channel's declaration exactly.
fn put_metadata_block(buf: &mut BytesMut, values: &[MetadataValue], channel: &ChannelDescriptor) {
    debug_assert_eq!(
        values.len(),
        channel.metadata.len(),
        "event metadata does not match the channel's descriptors"
    );
    for (index, descriptor) in channel.metadata.iter().enumerate() {
        let declared = descriptor.byte_len();
        let bytes = values
            .get(index)
            .map(|value| value.bytes.as_ref())
            .unwrap_or(&[]);
        let take = declared.min(bytes.len());
        buf.extend_from_slice(&bytes[..take]);
        buf.put_bytes(0, declared - take);
    }
}

/// Peak amplitude reported for one spike channel: the waveform sample one
/// past the declared pre-peak offset, negated.
fn peak_amplitude(spike: &SpikeEvent, channel_index: usize) -> f32 {
    let offset = spike.pre_peak_samples as usize + 1;
    debug_assert!(
        offset < spike.samples_per_channel(),
        "pre-peak offset points past the waveform"
    );
    let index = channel_index * spike.samples_per_channel() + offset;
    spike.waveform.get(index).map(|sample| -sample).unwrap_or(0.0)
}

fn encode_json(event: &EventRecord, channel: &ChannelDescriptor) -> Bytes {
    let mut fields = Map::new();
    fields.insert("stream".into(), Value::from(channel.stream_name.clone()));
    fields.insert("source_node".into(), Value::from(channel.source_node_id));
    fields.insert(
        "sample_rate".into(),
        Value::from(f64::from(channel.sample_rate)),
    );
    fields.insert("sample_number".into(), Value::from(event.sample_number()));

    match event {
        EventRecord::Ttl(ttl) => {
            fields.insert("event_type".into(), Value::from("ttl"));
            fields.insert("channel_name".into(), Value::from(channel.name.clone()));
            fields.insert("line".into(), Value::from(ttl.line));
            fields.insert("state".into(), Value::from(ttl.state));
        }
        EventRecord::Spike(spike) => {
            fields.insert("event_type".into(), Value::from("spike"));
            fields.insert("electrode".into(), Value::from(channel.name.clone()));
            fields.insert("num_channels".into(), Value::from(spike.channel_count));
            fields.insert("sorted_id".into(), Value::from(spike.sorted_id));
            for ch in 0..spike.channel_count as usize {
                fields.insert(
                    format!("amp{}", ch + 1),
                    Value::from(f64::from(peak_amplitude(spike, ch))),
                );
            }
        }
    }

    append_metadata(&mut fields, event.metadata(), channel);

    Bytes::from(Value::Object(fields).to_string())
}

fn append_metadata(
    fields: &mut Map<String, Value>,
    values: &[MetadataValue],
    channel: &ChannelDescriptor,
) {
    debug_assert_eq!(
        values.len(),
        channel.metadata.len(),
        "event metadata does not match the channel's descriptors"
    );
    for (descriptor, value) in channel.metadata.iter().zip(values) {
        let rendered = metadata::read(descriptor.scalar_type, &value.bytes, value.count);
        let json = match rendered {
            MetaValue::Text(text) | MetaValue::Scalar(text) => Value::from(text),
            MetaValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
        };
        fields.insert(descriptor.name.clone(), json);
    }
}
