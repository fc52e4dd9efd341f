use serde::Serialize;

use crate::json::ChangeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HexChange {
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_byte: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_byte: Option<u8>,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HexDiff {
    pub changes: Vec<HexChange>,
    pub has_changes: bool,
}

/// Offset-aligned byte comparison. Equal bytes produce no entry.
pub fn hex_diff(old: &[u8], new: &[u8]) -> HexDiff {
    let changes: Vec<HexChange> = (0..old.len().max(new.len()))
        .filter_map(|offset| {
            let (o, n) = (old.get(offset).copied(), new.get(offset).copied());
            let kind = match (o, n) {
                (None, Some(_)) => ChangeKind::Added,
                (Some(_), None) => ChangeKind::Removed,
                (Some(a), Some(b)) if a != b => ChangeKind::Changed,
                _ => return None,
            };
            Some(HexChange {
                offset,
                old_byte: o,
                new_byte: n,
                kind,
            })
        })
        .collect();

    HexDiff {
        has_changes: !changes.is_empty(),
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_new_side_reports_removals() {
        let diff = hex_diff(&[1, 2, 3], &[1]);
        let offsets: Vec<_> = diff.changes.iter().map(|c| (c.offset, c.kind)).collect();
        assert_eq!(offsets, vec![(1, ChangeKind::Removed), (2, ChangeKind::Removed)]);
        assert_eq!(diff.changes[0].new_byte, None);
    }

    #[test]
    fn equal_bytes_are_skipped() {
        let diff = hex_diff(b"abcd", b"abXd");
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].offset, 2);
    }
}
