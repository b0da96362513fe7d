//! Error types

use std::io;
use thiserror::Error;

/// Errors surfaced by the public API
#[derive(Debug, Error)]
pub enum Error {
    /// A pattern is empty or malformed; raised before any I/O
    #[error("invalid pattern {0}")]
    InvalidPattern(String),

    /// The input is neither XML text, a recognised URL, nor a byte source
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The byte source failed mid-stream
    #[error("source error: {0}")]
    Source(#[from] io::Error),

    /// An async entry point was called outside a tokio runtime
    #[error("no tokio runtime available to drive the stream")]
    Runtime,

    /// The driver task panicked or was cancelled
    #[error("stream task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
