//! The frame separator.
//!
//! Every frame on the wire is one compact JSON message followed by
//! [`SEPARATOR`]. Compact JSON escapes every control character inside
//! strings and never emits raw whitespace between tokens, so the separator
//! cannot occur inside a serialized message.
//!
//! There is exactly one separator. `\r\n` is not treated specially: the
//! `\r` stays part of the frame, where the JSON parser skips it as
//! whitespace.

/// The byte sequence terminating every frame: a single newline.
pub const SEPARATOR: &[u8] = b"\n";

/// Returns the offset of the first complete `separator` in `haystack`
/// at or after `from`.
pub fn find(haystack: &[u8], separator: &[u8], from: usize) -> Option<usize> {
    if separator.is_empty() || haystack.len() < separator.len() || from >= haystack.len() {
        return None;
    }
    if let [single] = separator {
        return haystack[from..]
            .iter()
            .position(|b| b == single)
            .map(|pos| from + pos);
    }
    haystack[from..]
        .windows(separator.len())
        .position(|window| window == separator)
        .map(|pos| from + pos)
}

/// Returns true if `bytes` contains the separator anywhere.
pub fn contains(bytes: &[u8]) -> bool {
    find(bytes, SEPARATOR, 0).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_byte_separator() {
        assert_eq!(find(b"abc\ndef\n", SEPARATOR, 0), Some(3));
        assert_eq!(find(b"abc\ndef\n", SEPARATOR, 4), Some(7));
        assert_eq!(find(b"abc", SEPARATOR, 0), None);
    }

    #[test]
    fn finds_multi_byte_separator_only_when_complete() {
        assert_eq!(find(b"ab<END", b"<END>", 0), None);
        assert_eq!(find(b"ab<END>cd", b"<END>", 0), Some(2));
        assert_eq!(find(b"ab<END>cd<END>", b"<END>", 3), Some(9));
    }

    #[test]
    fn out_of_range_start_is_none() {
        assert_eq!(find(b"a\n", SEPARATOR, 2), None);
        assert_eq!(find(b"", SEPARATOR, 0), None);
        assert_eq!(find(b"abc", b"", 0), None);
    }

    #[test]
    fn compact_json_never_contains_separator() {
        let value = serde_json::json!({ "text": "line one\nline two\r\n", "n": [1, 2] });
        let encoded = serde_json::to_vec(&value).unwrap();
        assert!(!contains(&encoded));
    }
}
