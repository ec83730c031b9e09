use std::io;
use std::path::PathBuf;

use fetchbench_core::parse_url_line;
use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;

/// Ordered, single-pass stream of URLs.
pub type UrlStream = BoxStream<'static, Result<String, SourceError>>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot open url source {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed reading url source: {0}")]
    Read(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    Path(PathBuf),
    Stdin,
    Lines(Vec<String>),
}

impl UrlSource {
    /// `-` means stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            UrlSource::Stdin
        } else {
            UrlSource::Path(PathBuf::from(arg))
        }
    }

    /// Opens the source. Only the open itself can fail here; read errors
    /// show up later as items of the stream.
    pub async fn open(self, limit: Option<usize>) -> Result<UrlStream, SourceError> {
        let lines: BoxStream<'static, io::Result<String>> = match self {
            UrlSource::Path(path) => {
                let file = match File::open(&path).await {
                    Ok(file) => file,
                    Err(source) => return Err(SourceError::Open { path, source }),
                };
                LinesStream::new(BufReader::new(file).lines()).boxed()
            }
            UrlSource::Stdin => LinesStream::new(BufReader::new(tokio::io::stdin()).lines()).boxed(),
            UrlSource::Lines(lines) => stream::iter(lines.into_iter().map(Ok)).boxed(),
        };

        let urls = lines.filter_map(|line| {
            future::ready(match line {
                Ok(line) => parse_url_line(&line).map(|url| Ok(url.to_owned())),
                Err(err) => Some(Err(SourceError::Read(err))),
            })
        });

        Ok(match limit {
            Some(limit) => urls.take(limit).boxed(),
            None => urls.boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(stream: UrlStream) -> Vec<String> {
        stream
            .map(|item| item.expect("source item"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn file_source_skips_blank_and_comment_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://a.example/\n\n# skip me\n  http://b.example/  \n").unwrap();

        let stream = UrlSource::Path(file.path().to_path_buf())
            .open(None)
            .await
            .unwrap();
        assert_eq!(
            collect(stream).await,
            vec!["http://a.example/", "http://b.example/"]
        );
    }

    #[tokio::test]
    async fn limit_counts_urls_not_lines() {
        let lines = vec!["", "http://1.example/", "#", "http://2.example/", "http://3.example/"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        let stream = UrlSource::Lines(lines).open(Some(2)).await.unwrap();
        assert_eq!(
            collect(stream).await,
            vec!["http://1.example/", "http://2.example/"]
        );
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("urls.txt");
        let err = UrlSource::Path(missing.clone()).open(None).await.err().unwrap();
        assert!(matches!(err, SourceError::Open { path, .. } if path == missing));
    }

    #[test]
    fn dash_selects_stdin() {
        assert_eq!(UrlSource::from_arg("-"), UrlSource::Stdin);
        assert_eq!(
            UrlSource::from_arg("urls.txt"),
            UrlSource::Path(PathBuf::from("urls.txt"))
        );
    }
}
