//! Pure comparisons between two stored messages.
//!
//! Four independent modes: line text, structured JSON, raw bytes and
//! metadata. [`MessageComparison`] runs all that apply to a pair.

pub mod hex;
pub mod json;
pub mod metadata;
pub mod text;

use serde::Serialize;

use explorer_api::MessageRecord;

pub use hex::{HexChange, HexDiff, hex_diff};
pub use json::{ChangeKind, JsonChange, JsonDiff, json_diff};
pub use metadata::{MetadataDiff, MetadataDifference, metadata_diff};
pub use text::{DiffLine, Hunk, LineKind, TextDiff, text_diff};

/// Every applicable diff between an older and a newer message.
///
/// `text` and `json` are `None` when either side lacks that decoding;
/// an unavailable mode is not the same as one with no changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageComparison {
    pub text: Option<TextDiff>,
    pub json: Option<JsonDiff>,
    pub hex: HexDiff,
    pub metadata: MetadataDiff,
}

impl MessageComparison {
    pub fn between(old: &MessageRecord, new: &MessageRecord) -> Self {
        let text = match (&old.payload_text, &new.payload_text) {
            (Some(a), Some(b)) => Some(text_diff(a, b)),
            _ => None,
        };
        let json = match (&old.payload_json, &new.payload_json) {
            (Some(a), Some(b)) => Some(json_diff(a, b)),
            _ => None,
        };
        Self {
            text,
            json,
            hex: hex_diff(&old.payload, &new.payload),
            metadata: metadata_diff(old, new),
        }
    }

    /// No available mode reports a change.
    pub fn is_identical(&self) -> bool {
        !self.text.as_ref().is_some_and(|d| d.has_changes)
            && !self.json.as_ref().is_some_and(|d| d.has_changes)
            && !self.hex.has_changes
            && !self.metadata.has_changes
    }
}
