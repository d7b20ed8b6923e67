//! Metrics for the broadcaster.
//!
//! Uses the `metrics` facade for instrumentation; the host application
//! installs whatever exporter it wants (or none).

use metrics::{counter, gauge};
use spikecast_core::EventKind;

/// Metric names.
pub mod names {
    pub const EVENTS_TOTAL: &str = "spikecast_events_total";
    pub const EVENT_BYTES_TOTAL: &str = "spikecast_event_bytes_total";
    pub const SEND_FAILURES_TOTAL: &str = "spikecast_send_failures_total";
    pub const RECONFIGURES_TOTAL: &str = "spikecast_reconfigures_total";
    pub const LISTENING_PORT: &str = "spikecast_listening_port";
}

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::EVENTS_TOTAL,
        "Total number of events broadcast, by kind"
    );
    metrics::describe_counter!(
        names::EVENT_BYTES_TOTAL,
        "Total encoded bytes broadcast, by kind"
    );
    metrics::describe_counter!(
        names::SEND_FAILURES_TOTAL,
        "Total number of events dropped after a send failure"
    );
    metrics::describe_counter!(
        names::RECONFIGURES_TOTAL,
        "Total number of reconfiguration attempts, by outcome"
    );
    metrics::describe_gauge!(names::LISTENING_PORT, "Currently bound port (0 = unbound)");
}

fn kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Ttl => "ttl",
        EventKind::Spike => "spike",
    }
}

/// Record a successfully sent event.
pub(crate) fn record_event(kind: EventKind, bytes: usize) {
    let kind = kind_label(kind);
    counter!(names::EVENTS_TOTAL, "kind" => kind).increment(1);
    counter!(names::EVENT_BYTES_TOTAL, "kind" => kind).increment(bytes as u64);
}

/// Record an event dropped after a send failure.
pub(crate) fn record_send_failure() {
    counter!(names::SEND_FAILURES_TOTAL).increment(1);
}

/// Record a reconfiguration attempt and the surviving port.
pub(crate) fn record_reconfigure(success: bool, port: u16) {
    let outcome = if success { "ok" } else { "error" };
    counter!(names::RECONFIGURES_TOTAL, "outcome" => outcome).increment(1);
    gauge!(names::LISTENING_PORT).set(f64::from(port));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(kind_label(EventKind::Ttl), "ttl");
        assert_eq!(kind_label(EventKind::Spike), "spike");
    }

    #[test]
    fn test_recording_without_recorder_is_a_noop() {
        // No recorder installed: all record calls must still be safe.
        init_metrics();
        record_event(EventKind::Ttl, 42);
        record_send_failure();
        record_reconfigure(true, 5557);
        record_reconfigure(false, 0);
    }
}
