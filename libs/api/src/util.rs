/// Current Unix time in milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Two upper-case hex digits, or `--` for a missing byte.
pub fn format_hex_byte(byte: Option<u8>) -> String {
    match byte {
        Some(b) => format!("{b:02X}"),
        None => "--".to_string(),
    }
}

/// `(root)` for the empty path, otherwise the segments joined with `.`.
pub fn format_json_path(path: &[String]) -> String {
    if path.is_empty() {
        return "(root)".to_string();
    }
    path.join(".")
}
