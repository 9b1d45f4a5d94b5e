use std::collections::HashMap;

/// Blank-line separators accepted between the header block and the body,
/// in the order they are searched for.
pub const BOUNDARIES: [&str; 3] = ["\n\n", "\r\n\r\n", "\n\r\n\r"];

/// Header section and body of a raw submission, as slices of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawParts<'a> {
    /// Text before the boundary, empty when no boundary was found.
    pub headers: &'a str,

    /// Trimmed text from the boundary onwards.
    pub body: &'a str,
}

impl RawParts<'_> {
    /// Returns whether a header section was present at all.
    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }
}

/// Finds the offset of the blank line separating headers from the body.
///
/// Each separator of [`BOUNDARIES`] is searched for in turn and the first
/// one present in the input wins, even when a later separator occurs at
/// a lower offset.
///
/// # Examples
///
/// ```rust
/// assert_eq!(facade_utils::find_boundary("Subject: Hi\n\nBody"), Some(11));
/// assert_eq!(facade_utils::find_boundary("Subject: Hi\r\n\r\nBody"), Some(11));
/// assert_eq!(facade_utils::find_boundary("Subject: Hi"), None);
/// ```
pub fn find_boundary(raw: &str) -> Option<usize> {
    BOUNDARIES.iter().find_map(|boundary| raw.find(boundary))
}

/// Splits a raw submission into its header section and trimmed body.
///
/// When no boundary exists the whole input is taken as body and no
/// headers are parsed, a submission without a separator is still
/// accepted and delivered as a bare body.
///
/// # Examples
///
/// ```rust
/// let parts = facade_utils::split_raw("To: bob@example.com\n\n  Hello!  \n");
/// assert_eq!(parts.headers, "To: bob@example.com");
/// assert_eq!(parts.body, "Hello!");
///
/// let parts = facade_utils::split_raw("To: bob@example.com");
/// assert!(!parts.has_headers());
/// assert_eq!(parts.body, "To: bob@example.com");
/// ```
pub fn split_raw(raw: &str) -> RawParts<'_> {
    match find_boundary(raw) {
        Some(offset) => RawParts {
            headers: &raw[..offset],
            body: raw[offset..].trim(),
        },
        None => RawParts {
            headers: "",
            body: raw.trim(),
        },
    }
}

/// Parses a header section into a map keyed by lower-cased header name.
///
/// Each line is trimmed and split on its first colon, the key is trimmed
/// and lower-cased and the value is the trimmed remainder. Later lines
/// override earlier ones with the same key. A line without a colon is kept
/// as a key with no value, blank lines are skipped.
///
/// # Examples
///
/// ```rust
/// let headers = facade_utils::parse_headers("From: a@example.com\nSUBJECT: Hi\nbroken");
/// assert_eq!(headers["from"].as_deref(), Some("a@example.com"));
/// assert_eq!(headers["subject"].as_deref(), Some("Hi"));
/// assert_eq!(headers["broken"], None);
/// ```
pub fn parse_headers(raw: &str) -> HashMap<String, Option<String>> {
    let mut headers = HashMap::new();
    for line in raw.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) => {
                headers.insert(key.trim().to_lowercase(), Some(value.trim().to_string()));
            }
            None => {
                headers.insert(line.to_lowercase(), None);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_boundary_prefers_lf() {
        // "\n\n" is searched first, even though "\r\n\r\n" occurs earlier
        let raw = "A: 1\r\n\r\nB: 2\n\nBody";
        assert_eq!(find_boundary(raw), Some(12));
    }

    #[test]
    fn test_find_boundary_crlf() {
        let raw = "A: 1\r\nB: 2\r\n\r\nBody";
        assert_eq!(find_boundary(raw), Some(10));
    }

    #[test]
    fn test_find_boundary_reversed_crlf() {
        let raw = "A: 1\n\r\n\rBody";
        assert_eq!(find_boundary(raw), Some(4));
    }

    #[test]
    fn test_split_raw_lf() {
        let parts = split_raw("From: a@example.com\nTo: b@example.com\n\nHello\nWorld\n");
        assert_eq!(parts.headers, "From: a@example.com\nTo: b@example.com");
        assert_eq!(parts.body, "Hello\nWorld");
    }

    #[test]
    fn test_split_raw_crlf() {
        let parts = split_raw("Subject: Test\r\n\r\nBody\r\n");
        assert_eq!(parts.headers, "Subject: Test");
        assert_eq!(parts.body, "Body");
    }

    #[test]
    fn test_split_raw_without_boundary() {
        let parts = split_raw("  Subject: Test\r\nFrom: a@example.com  ");
        assert_eq!(parts.headers, "");
        assert!(!parts.has_headers());
        assert_eq!(parts.body, "Subject: Test\r\nFrom: a@example.com");
    }

    #[test]
    fn test_split_raw_empty() {
        let parts = split_raw("");
        assert_eq!(parts.headers, "");
        assert_eq!(parts.body, "");
    }

    #[test]
    fn test_parse_headers_lowercases_keys() {
        let headers = parse_headers("Header: first\nheader: second");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["header"].as_deref(), Some("second"));
    }

    #[test]
    fn test_parse_headers_crlf_lines() {
        let headers = parse_headers("From: a@example.com\r\nTo:  b@example.com \r\n");
        assert_eq!(headers["from"].as_deref(), Some("a@example.com"));
        assert_eq!(headers["to"].as_deref(), Some("b@example.com"));
    }

    #[test]
    fn test_parse_headers_keeps_value_after_first_colon() {
        let headers = parse_headers("Date: Mon, 1 Jan 2024 10:30:00 +0000");
        assert_eq!(
            headers["date"].as_deref(),
            Some("Mon, 1 Jan 2024 10:30:00 +0000")
        );
    }

    #[test]
    fn test_parse_headers_line_without_colon() {
        let headers = parse_headers("X-Flag\nSubject: Hi");
        assert!(headers.contains_key("x-flag"));
        assert_eq!(headers["x-flag"], None);
        assert_eq!(headers["subject"].as_deref(), Some("Hi"));
    }

    #[test]
    fn test_parse_headers_empty_value() {
        let headers = parse_headers("Cc:");
        assert_eq!(headers["cc"].as_deref(), Some(""));
    }
}
