/// Share of characters that must be printable for a payload to count as text.
const PRINTABLE_RATIO: f64 = 0.95;

/// Decoded previews of a raw payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPayload {
    /// Printable UTF-8 text. Absent for binary or mostly non-printable payloads.
    pub text: Option<String>,
    pub json: Option<serde_json::Value>,
    pub is_json: bool,
    pub is_text: bool,
    pub size: usize,
}

/// Classify raw bytes as text, JSON or binary.
///
/// Never fails: a non-UTF-8 payload simply has no text and no JSON, and
/// malformed JSON leaves `json` empty.
pub fn decode_preview(bytes: &[u8], content_type: Option<&str>) -> DecodedPayload {
    let size = bytes.len();

    let Ok(raw) = std::str::from_utf8(bytes) else {
        return DecodedPayload {
            size,
            ..Default::default()
        };
    };

    let json_hint = content_type.is_some_and(|ct| ct.contains("json"));
    let json = if json_hint || is_likely_json(bytes) {
        serde_json::from_str::<serde_json::Value>(raw).ok()
    } else {
        None
    };

    let is_text = is_printable(raw);

    DecodedPayload {
        text: is_text.then(|| raw.to_string()),
        is_json: json.is_some(),
        json,
        is_text,
        size,
    }
}

/// First and last bytes form a `{…}` or `[…]` pair.
pub fn is_likely_json(bytes: &[u8]) -> bool {
    matches!(
        (bytes.first(), bytes.last()),
        (Some(b'{'), Some(b'}')) | (Some(b'['), Some(b']'))
    )
}

/// At least 95% of the characters are ≥ U+0020 or one of tab/LF/CR.
/// The empty string is not printable.
pub fn is_printable(text: &str) -> bool {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if c as u32 >= 32 || matches!(c, '\t' | '\n' | '\r') {
            printable += 1;
        }
    }
    total > 0 && printable as f64 / total as f64 >= PRINTABLE_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_payload_has_no_text_or_json() {
        let decoded = decode_preview(&[0xff, 0xfe, 0x7b], None);
        assert_eq!(decoded.text, None);
        assert_eq!(decoded.json, None);
        assert!(!decoded.is_text);
        assert!(!decoded.is_json);
        assert_eq!(decoded.size, 3);
    }

    #[test]
    fn bracketed_payload_is_parsed_as_json() {
        let decoded = decode_preview(b"[1,2,3]", None);
        assert!(decoded.is_json);
        assert_eq!(decoded.json, Some(serde_json::json!([1, 2, 3])));
        assert_eq!(decoded.text.as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn content_type_hint_enables_json_for_scalars() {
        let decoded = decode_preview(b"42", Some("application/json"));
        assert_eq!(decoded.json, Some(serde_json::json!(42)));

        let unhinted = decode_preview(b"42", None);
        assert_eq!(unhinted.json, None);
        assert!(unhinted.is_text);
    }

    #[test]
    fn malformed_json_falls_back_to_text() {
        let decoded = decode_preview(b"{not json}", None);
        assert!(!decoded.is_json);
        assert_eq!(decoded.json, None);
        assert_eq!(decoded.text.as_deref(), Some("{not json}"));
    }

    #[test]
    fn control_heavy_text_is_not_printable() {
        // 19 printable chars out of 21 is below the threshold.
        let mut raw = String::from("{\"k\":\"abcdefghijk\"}");
        raw.insert(1, '\u{1}');
        raw.insert(2, '\u{2}');
        assert!(!is_printable(&raw));
        let decoded = decode_preview(raw.as_bytes(), None);
        assert_eq!(decoded.text, None);
        assert!(!decoded.is_text);
    }

    #[test]
    fn printable_threshold_is_inclusive() {
        let mut text = "a".repeat(19);
        text.push('\u{7}');
        assert!(is_printable(&text));
        assert!(is_printable("line one\r\n\tline two"));
        assert!(!is_printable(""));
    }
}
