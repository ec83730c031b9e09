use std::fmt;
use std::time::Duration;

/// How admitted tasks are scheduled onto the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Dispatcher acquires a slot, then spawns one task per URL holding it.
    #[default]
    Semaphore,
    /// A fixed group of `concurrency` workers drains a shared task channel.
    WorkerPool,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Semaphore => write!(f, "semaphore"),
            Strategy::WorkerPool => write!(f, "worker-pool"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub concurrency: usize,
    /// Deadline for a whole redirect chain, not reset per hop.
    pub request_timeout: Duration,
    pub max_redirects: u32,
    pub strategy: Strategy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: 10,
            request_timeout: Duration::from_secs(5),
            max_redirects: 5,
            strategy: Strategy::default(),
        }
    }
}

pub(crate) fn default_user_agent() -> String {
    format!("fetchbench/{}", env!("CARGO_PKG_VERSION"))
}
