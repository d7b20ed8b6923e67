//! Output format selection.

use serde::{Deserialize, Serialize};

/// Wire format for outgoing events.
///
/// Exactly one format is active at a time; it is switched by
/// reconfiguration and read on every dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Byte-exact serialized event records.
    RawBinary,
    /// JSON text objects.
    Json,
}

impl OutputFormat {
    /// Integer id used by hosts that persist the format (1 = raw binary,
    /// 2 = JSON).
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            OutputFormat::RawBinary => 1,
            OutputFormat::Json => 2,
        }
    }

    /// Look up a format by its persisted integer id.
    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(OutputFormat::RawBinary),
            2 => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}
