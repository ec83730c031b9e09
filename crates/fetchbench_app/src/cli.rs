use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use engine_logging::{LevelFilter, LogDestination};
use fetchbench_engine::{EngineSettings, FetchSettings, Strategy};

/// Fetch a list of URLs under a concurrency cap and summarise how it went.
///
/// Every option can also be set through the environment variable shown in
/// its help text.
#[derive(Parser, Debug)]
#[command(name = "fetchbench", version)]
pub struct Cli {
    /// File with one URL per line, or `-` for stdin.
    #[arg(default_value = "-")]
    pub input: String,

    /// Maximum number of URLs being fetched at once.
    #[arg(
        long,
        env = "CONCURRENCY",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub concurrency: u32,

    /// Deadline in seconds for one URL, covering its whole redirect chain.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "5", value_parser = parse_seconds)]
    pub request_timeout: Duration,

    /// Redirects followed before a URL is classified as TooManyRedirects.
    #[arg(long, env = "MAX_REDIRECTS", default_value_t = 5)]
    pub max_redirects: u32,

    /// User-Agent header sent on every request.
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Stop reading the input after this many URLs.
    #[arg(long, env = "LIMIT")]
    pub limit: Option<usize>,

    /// How fetches are scheduled onto the concurrency slots.
    #[arg(long, env = "STRATEGY", value_enum, default_value_t = StrategyArg::Semaphore)]
    pub strategy: StrategyArg,

    /// Output format for records and summary.
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level (off, error, warn, info, debug, trace). Logs go to stderr.
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", value_parser = parse_level)]
    pub log_level: LevelFilter,

    /// Also write logs to this file.
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Keep logs off the terminal. With `--log-file` they go to the file only.
    #[arg(long, short, env = "QUIET")]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Semaphore,
    WorkerPool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            concurrency: self.concurrency as usize,
            request_timeout: self.request_timeout,
            max_redirects: self.max_redirects,
            strategy: match self.strategy {
                StrategyArg::Semaphore => Strategy::Semaphore,
                StrategyArg::WorkerPool => Strategy::WorkerPool,
            },
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        FetchSettings {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            ..defaults
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match (&self.log_file, self.quiet) {
            (Some(path), true) => LogDestination::File(path.clone()),
            (Some(path), false) => LogDestination::Both(path.clone()),
            (None, _) => LogDestination::Terminal,
        }
    }

    /// `--quiet` without a log file silences logging altogether.
    pub fn effective_log_level(&self) -> LevelFilter {
        if self.quiet && self.log_file.is_none() {
            LevelFilter::Off
        } else {
            self.log_level
        }
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be positive, got `{raw}`"));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a log level"))
}
