//! Fetchbench engine: bounded-concurrency fetching, redirect resolution and the run loop.
mod classify;
mod engine;
mod fetch;
mod limiter;
mod resolve;
mod settings;
mod source;

pub use classify::{classify, FailureSignals};
pub use engine::{Engine, EngineError, RecordSink, RunReport, VecSink};
pub use fetch::{FetchError, Fetcher, HopResponse, ReqwestFetcher};
pub use limiter::{Limiter, LimiterStats, Slot};
pub use resolve::RedirectResolver;
pub use settings::{EngineSettings, FetchSettings, Strategy};
pub use source::{SourceError, UrlSource, UrlStream};
pub use tokio_util::sync::CancellationToken;
