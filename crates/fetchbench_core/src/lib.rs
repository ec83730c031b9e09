//! Fetchbench core: pure data model for fetch outcomes and the streaming summary fold.
mod aggregate;
mod outcome;
mod record;
mod task;

pub use aggregate::{fold, AggregateState, BucketCounts, Summary};
pub use outcome::{Bucket, Classification, ErrorKind, Outcome};
pub use record::ResultRecord;
pub use task::{parse_url_line, SequenceIndex, UrlTask};
