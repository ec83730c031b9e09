use std::error::Error as StdError;
use std::io;

use fetchbench_core::ErrorKind;

// Fallback for TLS failures whose typed error did not survive the chain.
const TLS_MARKERS: [&str; 6] = [
    "certificate",
    "tls",
    "ssl",
    "handshake",
    "rustls",
    "corrupt message",
];
const RESOLVE_MARKERS: [&str; 3] = [
    "dns error",
    "failed to lookup address",
    "name or service not known",
];

/// Everything the classifier looks at, extracted from a transport error.
///
/// Keeping this separate from `reqwest::Error` lets the mapping be exercised
/// without provoking real network failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureSignals {
    pub timeout: bool,
    pub connect: bool,
    /// A `rustls::Error` was found in the source chain.
    pub tls: bool,
    pub redirect: bool,
    pub io_kinds: Vec<io::ErrorKind>,
    /// Lowercased messages of the source chain, below the top-level error
    /// (whose message embeds the URL).
    pub messages: Vec<String>,
}

impl FailureSignals {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let mut signals = Self {
            timeout: err.is_timeout(),
            connect: err.is_connect(),
            redirect: err.is_redirect(),
            ..Self::default()
        };

        let mut current = err.source();
        while let Some(cause) = current {
            signals.messages.push(cause.to_string().to_ascii_lowercase());
            signals.tls |= cause.is::<rustls::Error>();
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                signals.io_kinds.push(io_err.kind());
                // io::Error::source skips its own payload, so read it directly.
                if let Some(inner) = io_err.get_ref() {
                    signals.tls |= inner.is::<rustls::Error>();
                    signals.messages.push(inner.to_string().to_ascii_lowercase());
                }
            }
            current = cause.source();
        }
        signals
    }

    fn mentions(&self, markers: &[&str]) -> bool {
        self.messages
            .iter()
            .any(|message| markers.iter().any(|marker| message.contains(marker)))
    }
}

/// Maps a transport failure to exactly one `ErrorKind`.
///
/// Checks run in a fixed order, so the result only depends on the signals.
/// `Cancelled` is never produced here; it comes from the run's cancellation token.
pub fn classify(signals: &FailureSignals) -> ErrorKind {
    if signals.timeout || signals.io_kinds.contains(&io::ErrorKind::TimedOut) {
        return ErrorKind::Timeout;
    }
    if signals.redirect {
        return ErrorKind::TooManyRedirects;
    }
    // TLS failures also surface as connect errors; check them first.
    if signals.tls || signals.mentions(&TLS_MARKERS) {
        return ErrorKind::TlsError;
    }
    if signals.connect
        || signals.io_kinds.iter().copied().any(is_connection_kind)
        || signals.mentions(&RESOLVE_MARKERS)
    {
        return ErrorKind::ConnectionError;
    }
    ErrorKind::ProtocolError
}

fn is_connection_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_messages(messages: &[&str]) -> FailureSignals {
        FailureSignals {
            messages: messages.iter().map(|m| m.to_string()).collect(),
            ..FailureSignals::default()
        }
    }

    #[test]
    fn timeout_wins_over_everything() {
        let signals = FailureSignals {
            timeout: true,
            connect: true,
            ..with_messages(&["invalid peer certificate"])
        };
        assert_eq!(classify(&signals), ErrorKind::Timeout);

        let io_timeout = FailureSignals {
            io_kinds: vec![io::ErrorKind::TimedOut],
            ..FailureSignals::default()
        };
        assert_eq!(classify(&io_timeout), ErrorKind::Timeout);
    }

    #[test]
    fn tls_failures_are_not_plain_connection_errors() {
        let signals = FailureSignals {
            connect: true,
            io_kinds: vec![io::ErrorKind::InvalidData],
            ..with_messages(&[
                "error sending request",
                "invalid peer certificate: unknownissuer",
            ])
        };
        assert_eq!(classify(&signals), ErrorKind::TlsError);
    }

    #[test]
    fn typed_tls_error_beats_the_connect_flag() {
        let signals = FailureSignals {
            connect: true,
            tls: true,
            io_kinds: vec![io::ErrorKind::Other],
            ..with_messages(&["client error (connect)"])
        };
        assert_eq!(classify(&signals), ErrorKind::TlsError);
    }

    #[test]
    fn refused_reset_and_dns_are_connection_errors() {
        let refused = FailureSignals {
            io_kinds: vec![io::ErrorKind::ConnectionRefused],
            ..FailureSignals::default()
        };
        assert_eq!(classify(&refused), ErrorKind::ConnectionError);

        let reset = FailureSignals {
            io_kinds: vec![io::ErrorKind::ConnectionReset],
            ..FailureSignals::default()
        };
        assert_eq!(classify(&reset), ErrorKind::ConnectionError);

        let dns = with_messages(&["dns error: failed to lookup address information"]);
        assert_eq!(classify(&dns), ErrorKind::ConnectionError);

        let connect = FailureSignals {
            connect: true,
            ..FailureSignals::default()
        };
        assert_eq!(classify(&connect), ErrorKind::ConnectionError);
    }

    #[test]
    fn redirect_errors_map_to_too_many_redirects() {
        let signals = FailureSignals {
            redirect: true,
            ..FailureSignals::default()
        };
        assert_eq!(classify(&signals), ErrorKind::TooManyRedirects);
    }

    #[test]
    fn unrecognized_causes_fall_back_to_protocol_error() {
        assert_eq!(classify(&FailureSignals::default()), ErrorKind::ProtocolError);
        let garbled = FailureSignals {
            io_kinds: vec![io::ErrorKind::UnexpectedEof],
            ..with_messages(&["connection closed before message completed"])
        };
        assert_eq!(classify(&garbled), ErrorKind::ProtocolError);
    }
}
