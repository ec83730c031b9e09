pub type SequenceIndex = u64;

/// One URL pulled from the source, in pull order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTask {
    pub url: String,
    pub sequence: SequenceIndex,
}

impl UrlTask {
    pub fn new(url: impl Into<String>, sequence: SequenceIndex) -> Self {
        Self {
            url: url.into(),
            sequence,
        }
    }
}

/// Returns the URL carried by a raw source line, if any.
///
/// Lines are trimmed; blank lines and `#` comments carry no URL.
pub fn parse_url_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        None
    } else {
        Some(line)
    }
}
