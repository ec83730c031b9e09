use std::time::Duration;

use fetchbench_core::ErrorKind;
use futures_util::StreamExt;
use reqwest::header::LOCATION;
use url::Url;

use crate::classify::{classify, FailureSignals};
use crate::settings::FetchSettings;

/// What one hop of a redirect chain produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
    /// Zero for redirect hops, whose body is never read.
    pub body_len: u64,
}

impl HopResponse {
    pub fn is_redirect(&self) -> bool {
        (300..=399).contains(&self.status)
    }

    /// Target of a 3xx response, resolved against `current`. `None` when the
    /// response is not a redirect or its `Location` is not a usable http(s) URL.
    pub fn redirect_target(&self, current: &Url) -> Option<Url> {
        if !self.is_redirect() {
            return None;
        }
        let location = self.location.as_deref()?.trim();
        if location.is_empty() {
            return None;
        }
        let next = current.join(location).ok()?;
        matches!(next.scheme(), "http" | "https").then_some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The transport capability used by the resolver.
///
/// Implementations issue a single GET and must not follow redirects
/// themselves; `budget` is the time left on the chain deadline.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, budget: Duration) -> Result<HopResponse, FetchError>;
}

/// `Fetcher` backed by one shared, pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent)
            .connect_timeout(settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| map_reqwest_error(&err))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url, budget: Duration) -> Result<HopResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(budget)
            .send()
            .await
            .map_err(|err| map_reqwest_error(&err))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let mut hop = HopResponse {
            status,
            location,
            body_len: 0,
        };
        // Only a hop that will be followed skips its body; a terminal 3xx is
        // measured like any other final response.
        if hop.redirect_target(url).is_some() {
            return Ok(hop);
        }

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(&err))?;
            hop.body_len += chunk.len() as u64;
        }
        Ok(hop)
    }
}

fn map_reqwest_error(err: &reqwest::Error) -> FetchError {
    FetchError::new(classify(&FailureSignals::from_reqwest(err)), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(status: u16, location: Option<&str>) -> HopResponse {
        HopResponse {
            status,
            location: location.map(str::to_owned),
            body_len: 0,
        }
    }

    #[test]
    fn relative_locations_resolve_against_current_url() {
        let base = Url::parse("http://a.example/dir/page").unwrap();
        assert_eq!(
            hop(302, Some("../other")).redirect_target(&base).unwrap().as_str(),
            "http://a.example/other"
        );
        assert_eq!(
            hop(301, Some("http://b.example/")).redirect_target(&base).unwrap().as_str(),
            "http://b.example/"
        );
    }

    #[test]
    fn unusable_locations_end_the_chain() {
        let base = Url::parse("http://a.example/").unwrap();
        assert_eq!(hop(302, None).redirect_target(&base), None);
        assert_eq!(hop(302, Some("  ")).redirect_target(&base), None);
        assert_eq!(hop(302, Some("mailto:x@a.example")).redirect_target(&base), None);
        assert_eq!(hop(200, Some("/elsewhere")).redirect_target(&base), None);
    }
}
