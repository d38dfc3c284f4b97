const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode an uploaded file as UTF-8, skipping a leading byte order mark.
pub fn decode_upload(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).ok()
}

/// Return at most `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Like [`truncate_chars`], but appends `...` when something was cut off.
pub fn preview(text: &str, max_chars: usize) -> String {
    let head = truncate_chars(text, max_chars);
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_upload_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("Chapter 1".as_bytes());
        assert_eq!(decode_upload(&bytes).as_deref(), Some("Chapter 1"));
    }

    #[test]
    fn test_decode_upload_rejects_invalid_utf8() {
        assert!(decode_upload(&[0xFF, 0xFE, 0x00]).is_none());
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "ééééé";
        assert_eq!(truncate_chars(text, 3), "ééé");
        assert_eq!(truncate_chars(text, 10), text);
        assert_eq!(truncate_chars("", 4), "");
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
