use std::fmt;

use serde::{Serialize, Serializer};

/// Closed set of per-task failure causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    Timeout,
    ConnectionError,
    #[serde(rename = "TLSError")]
    TlsError,
    TooManyRedirects,
    ProtocolError,
    Cancelled,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Timeout,
        ErrorKind::ConnectionError,
        ErrorKind::TlsError,
        ErrorKind::TooManyRedirects,
        ErrorKind::ProtocolError,
        ErrorKind::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ConnectionError => "ConnectionError",
            ErrorKind::TlsError => "TLSError",
            ErrorKind::TooManyRedirects => "TooManyRedirects",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one task's redirect chain.
///
/// Any HTTP status that ends the chain is a `Success`, including 4xx and 5xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success { status: u16, body_len: u64 },
    Failure(ErrorKind),
}

impl Outcome {
    pub fn classification(&self) -> Classification {
        match *self {
            Outcome::Success { status, .. } => Classification::Status(status),
            Outcome::Failure(kind) => Classification::Failure(kind),
        }
    }

    pub fn body_len(&self) -> u64 {
        match *self {
            Outcome::Success { body_len, .. } => body_len,
            Outcome::Failure(_) => 0,
        }
    }
}

/// Status code or failure kind, rendered as `"200"` or `"Timeout"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    Status(u16),
    Failure(ErrorKind),
}

impl Classification {
    pub fn bucket(self) -> Bucket {
        Bucket::of(self)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Status(code) => write!(f, "{code}"),
            Classification::Failure(kind) => f.write_str(kind.as_str()),
        }
    }
}

impl Serialize for Classification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Coarse histogram class of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Success,
    Redirection,
    ClientError,
    ServerError,
    Exception,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Success,
        Bucket::Redirection,
        Bucket::ClientError,
        Bucket::ServerError,
        Bucket::Exception,
    ];

    /// Three-digit statuses map on their leading digit; everything else,
    /// including 1xx finals, lands in `Exception`.
    pub fn of(classification: Classification) -> Self {
        match classification {
            Classification::Status(code @ 100..=999) => match code / 100 {
                2 => Bucket::Success,
                3 => Bucket::Redirection,
                4 => Bucket::ClientError,
                5 => Bucket::ServerError,
                _ => Bucket::Exception,
            },
            Classification::Status(_) | Classification::Failure(_) => Bucket::Exception,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Success => "2xx",
            Bucket::Redirection => "3xx",
            Bucket::ClientError => "4xx",
            Bucket::ServerError => "5xx",
            Bucket::Exception => "Exception",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_renders_status_or_kind_name() {
        assert_eq!(Classification::Status(404).to_string(), "404");
        assert_eq!(
            Classification::Failure(ErrorKind::TlsError).to_string(),
            "TLSError"
        );
        assert_eq!(
            Classification::Failure(ErrorKind::TooManyRedirects).to_string(),
            "TooManyRedirects"
        );
    }

    #[test]
    fn buckets_follow_leading_digit() {
        assert_eq!(Bucket::of(Classification::Status(200)), Bucket::Success);
        assert_eq!(Bucket::of(Classification::Status(299)), Bucket::Success);
        assert_eq!(Bucket::of(Classification::Status(301)), Bucket::Redirection);
        assert_eq!(Bucket::of(Classification::Status(404)), Bucket::ClientError);
        assert_eq!(Bucket::of(Classification::Status(503)), Bucket::ServerError);
        assert_eq!(Bucket::of(Classification::Status(101)), Bucket::Exception);
        assert_eq!(Bucket::of(Classification::Status(42)), Bucket::Exception);
        for kind in ErrorKind::ALL {
            assert_eq!(Bucket::of(Classification::Failure(kind)), Bucket::Exception);
        }
    }

    #[test]
    fn failures_carry_no_body() {
        assert_eq!(Outcome::Failure(ErrorKind::Timeout).body_len(), 0);
        assert_eq!(
            Outcome::Success {
                status: 200,
                body_len: 17
            }
            .body_len(),
            17
        );
    }
}
