//! xml-object-stream - streaming subtree extraction from large XML documents
//!
//! Feed a document of any size through an incremental tokenizer and get back,
//! as soon as each one closes, the subtrees whose path matches a pattern:
//!
//! ```text
//! /library/shelf          exact ancestry
//! //shelf                 any depth
//! /library//book/title    any number of levels in between
//! ```
//!
//! Delivery modes:
//! - [`XmlObjectStream::collect`]: all results once input ends
//! - [`XmlObjectStream::for_each`]: a callback per result
//! - [`XmlObjectStream::for_each_ack`]: a callback per result plus an [`Ack`];
//!   input is not read further until every result is acknowledged
//! - [`XmlObjectStream::collect_bytes`] / [`XmlObjectStream::collect_many`]:
//!   blocking and Rayon-parallel extraction from memory
//!
//! The async modes run one driver task on the caller's tokio runtime.

pub mod config;
pub mod core;
pub mod delivery;
pub mod dom;
pub mod error;
pub mod reader;
pub mod source;
pub mod strategy;
pub mod xpath;

pub use config::Config;
pub use delivery::{Ack, Callback, Collected, Completion, Outcome};
pub use dom::{Element, Field, Node, Value};
pub use error::{Error, Result};
pub use reader::{EventHandler, PushReader, XmlEvent};
pub use source::{ByteStream, Fetch, FetchFuture, Source};
pub use strategy::{Extractor, RetentionStats};
pub use xpath::{PatternSet, Patterns};

use delivery::driver::Driver;
use delivery::sink::{EndSignal, Sink};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::Instrument;
use xpath::PatternCache;

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Entry Point
// ============================================================================

/// Configured extractor. Cheap to share; every call runs independently.
pub struct XmlObjectStream {
    config: Config,
    cache: PatternCache,
    fetcher: Option<Arc<dyn Fetch>>,
}

/// Everything a driver task needs, assembled synchronously
struct Job {
    source: Source,
    driver: Driver,
    fetcher: Option<Arc<dyn Fetch>>,
    handle: Handle,
    span: tracing::Span,
}

impl Job {
    async fn run(self) -> Result<Sink> {
        let stream = self.source.open(self.fetcher.as_deref()).await?;
        self.driver.run(stream).await
    }
}

impl XmlObjectStream {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(XmlObjectStream {
            cache: PatternCache::new(config.pattern_cache_size),
            config,
            fetcher: None,
        })
    }

    /// Register the transport used for `http://` and `https://` sources
    pub fn with_fetcher<F>(mut self, fetcher: F) -> Self
    where
        F: Fetch + 'static,
    {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compile (or fetch from cache) a pattern set under this configuration
    pub fn compile(&self, patterns: impl Into<Patterns>) -> Result<Arc<PatternSet>> {
        self.cache.get_or_compile(&patterns.into(), self.config.case_insensitive())
    }

    /// Collect every result; resolves once input ends or the source fails
    pub fn collect(&self, source: impl Into<Source>, patterns: impl Into<Patterns>) -> Result<Collected> {
        let job = self.prepare(source.into(), patterns.into(), None, "collect")?;
        let (handle, span) = (job.handle.clone(), job.span.clone());
        let task = handle.spawn(async move { job.run().await.map(Sink::into_collected) }.instrument(span));
        Ok(Collected::new(task))
    }

    /// Invoke `callback` for every result, in document order
    pub fn for_each<F>(&self, source: impl Into<Source>, patterns: impl Into<Patterns>, callback: F) -> Result<Completion>
    where
        F: FnMut(Node) + Send + 'static,
    {
        self.spawn_callbacks(source.into(), patterns.into(), Callback::each(callback), "for_each")
    }

    /// Invoke `callback` for every result with an acknowledgement token.
    /// Input stays paused while any token is outstanding.
    pub fn for_each_ack<F>(
        &self,
        source: impl Into<Source>,
        patterns: impl Into<Patterns>,
        callback: F,
    ) -> Result<Completion>
    where
        F: FnMut(Node, Ack) + Send + 'static,
    {
        self.spawn_callbacks(source.into(), patterns.into(), Callback::with_ack(callback), "for_each_ack")
    }

    /// Start a stream in the mode selected by `callback`
    pub fn run(
        &self,
        source: impl Into<Source>,
        patterns: impl Into<Patterns>,
        callback: Option<Callback>,
    ) -> Result<Outcome> {
        match callback {
            None => self.collect(source, patterns).map(Outcome::Collected),
            Some(callback) => self
                .spawn_callbacks(source.into(), patterns.into(), callback, "run")
                .map(Outcome::Completion),
        }
    }

    /// Blocking extraction from an in-memory document
    pub fn collect_bytes(&self, input: impl AsRef<[u8]>, patterns: impl Into<Patterns>) -> Result<Vec<Node>> {
        let patterns = self.compile(patterns)?;
        Ok(strategy::extract(input.as_ref(), patterns, &self.config))
    }

    /// Extract from independent documents in parallel; results in input order
    pub fn collect_many<D>(&self, documents: &[D], patterns: impl Into<Patterns>) -> Result<Vec<Vec<Node>>>
    where
        D: AsRef<[u8]> + Sync,
    {
        let patterns = self.compile(patterns)?;
        Ok(strategy::parallel::extract_parallel(documents, &patterns, &self.config))
    }

    fn spawn_callbacks(
        &self,
        source: Source,
        patterns: Patterns,
        callback: Callback,
        mode: &'static str,
    ) -> Result<Completion> {
        let job = self.prepare(source, patterns, Some(callback), mode)?;
        let (handle, span) = (job.handle.clone(), job.span.clone());
        let signal = EndSignal::new();
        let end = Arc::clone(&signal);

        let task = handle.spawn(
            async move {
                match job.run().await {
                    Ok(_) => end.end(),
                    Err(error) => {
                        tracing::error!(%error, "stream failed; end callback will not fire");
                        end.fail();
                    }
                }
            }
            .instrument(span),
        );
        Ok(Completion::new(signal, task))
    }

    /// Synchronous checks, in order: patterns, input kind, runtime
    fn prepare(&self, source: Source, patterns: Patterns, callback: Option<Callback>, mode: &'static str) -> Result<Job> {
        let compiled = self.compile(patterns)?;
        source.check(self.fetcher.is_some())?;
        let handle = Handle::try_current().map_err(|_| Error::Runtime)?;

        let span = tracing::debug_span!(
            "xml_object_stream",
            mode,
            patterns = compiled.len(),
            source = ?source,
        );
        let extractor = Extractor::new(compiled, &self.config);
        let driver = Driver::new(
            extractor,
            Sink::from_callback(callback),
            self.config.chunk_size,
            self.config.strict,
        );

        Ok(Job {
            source,
            driver,
            fetcher: self.fetcher.clone(),
            handle,
            span,
        })
    }
}

impl fmt::Debug for XmlObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlObjectStream")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            XmlObjectStream::new(Config::default().with_chunk_size(0)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_async_entry_needs_runtime() {
        let stream = XmlObjectStream::new(Config::default()).unwrap();
        assert!(matches!(stream.collect("<a/>", "/a"), Err(Error::Runtime)));
        // pattern errors win over the missing runtime
        assert!(matches!(stream.collect("<a/>", "/a/"), Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_collect_bytes_uses_cache() {
        let stream = XmlObjectStream::new(Config::default()).unwrap();
        let results = stream.collect_bytes("<a><b/><b/></a>", "/a/b").unwrap();
        assert_eq!(results.len(), 2);
        let again = stream.collect_bytes(b"<a><b/></a>", "/a/b").unwrap();
        assert_eq!(again.len(), 1);
        assert!(Arc::ptr_eq(&stream.compile("/a/b").unwrap(), &stream.compile("/a/b").unwrap()));
    }
}
