//! Extraction Strategy
//!
//! - `path`: open element names
//! - `retention`: which text survives
//! - `matching`: the event-driven extractor
//! - `parallel`: Rayon batch extraction over independent documents

pub mod matching;
pub mod parallel;
pub mod path;
pub mod retention;

pub use matching::{extract, Extractor};
pub use path::PathTracker;
pub use retention::{RetentionPolicy, RetentionStats, TextAction};
