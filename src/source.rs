//! Byte sources
//!
//! A [`Source`] is classified synchronously when the stream is started, so
//! unsupported input fails before any I/O. Opening it (file, remote fetch)
//! happens on the driver task.

use crate::error::{Error, Result};
use std::fmt;
use std::future::Future;
use std::io;
use std::io::Cursor;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Boxed byte stream handed to the driver
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Future returned by [`Fetch::fetch`]
pub type FetchFuture = Pin<Box<dyn Future<Output = io::Result<ByteStream>> + Send>>;

/// Transport for `http://` and `https://` sources.
///
/// The crate carries no HTTP client; hosts plug in their own.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> FetchFuture;
}

impl<F> Fetch for F
where
    F: Fn(&str) -> FetchFuture + Send + Sync,
{
    fn fetch(&self, url: &str) -> FetchFuture {
        self(url)
    }
}

enum Kind {
    Bytes(Vec<u8>),
    File(PathBuf),
    Remote(String),
    Reader(ByteStream),
    Unsupported(String),
}

/// Where the document comes from
pub struct Source {
    kind: Kind,
}

impl Source {
    /// Classify a string: `file://` paths, `http(s)://` URLs, other URL
    /// schemes (unsupported), or else the XML document itself
    pub fn parse(input: impl Into<String>) -> Self {
        let input = input.into();
        let kind = if let Some(path) = input.strip_prefix("file://") {
            Kind::File(PathBuf::from(path))
        } else if input.starts_with("http://") || input.starts_with("https://") {
            Kind::Remote(input)
        } else if has_foreign_scheme(&input) {
            Kind::Unsupported(input)
        } else {
            Kind::Bytes(input.into_bytes())
        };
        Source { kind }
    }

    /// In-memory document
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Source {
            kind: Kind::Bytes(bytes.into()),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source {
            kind: Kind::File(path.into()),
        }
    }

    /// Any async byte stream
    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Source {
            kind: Kind::Reader(Box::new(reader)),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, Kind::Remote(_))
    }

    /// Fail early on input that can never be opened
    pub(crate) fn check(&self, can_fetch: bool) -> Result<()> {
        match &self.kind {
            Kind::Unsupported(input) => Err(Error::UnsupportedInput(format!("unrecognised URL scheme in {input:?}"))),
            Kind::Remote(url) if !can_fetch => Err(Error::UnsupportedInput(format!(
                "{url}: no fetcher registered for remote sources"
            ))),
            _ => Ok(()),
        }
    }

    /// Open the source for reading
    pub(crate) async fn open(self, fetcher: Option<&dyn Fetch>) -> Result<ByteStream> {
        match self.kind {
            Kind::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes))),
            Kind::File(path) => {
                let file = tokio::fs::File::open(&path).await.map_err(|e| {
                    Error::Source(io::Error::new(e.kind(), format!("{}: {e}", path.display())))
                })?;
                Ok(Box::new(file))
            }
            Kind::Remote(url) => match fetcher {
                Some(fetcher) => Ok(fetcher.fetch(&url).await?),
                None => Err(Error::UnsupportedInput(url)),
            },
            Kind::Reader(reader) => Ok(reader),
            Kind::Unsupported(input) => Err(Error::UnsupportedInput(input)),
        }
    }
}

/// `scheme://` prefix that is not one we can open. Markup before the
/// separator means the string is a document that merely mentions a URL.
fn has_foreign_scheme(input: &str) -> bool {
    let Some(idx) = input.find("://") else {
        return false;
    };
    let scheme = &input[..idx];
    !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl From<&str> for Source {
    fn from(input: &str) -> Self {
        Source::parse(input)
    }
}

impl From<String> for Source {
    fn from(input: String) -> Self {
        Source::parse(input)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::bytes(bytes)
    }
}

impl From<&[u8]> for Source {
    fn from(bytes: &[u8]) -> Self {
        Source::bytes(bytes)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::file(path)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Kind::File(path) => f.debug_tuple("File").field(path).finish(),
            Kind::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
            Kind::Reader(_) => f.write_str("Reader"),
            Kind::Unsupported(input) => f.debug_tuple("Unsupported").field(input).finish(),
        }
    }
}
