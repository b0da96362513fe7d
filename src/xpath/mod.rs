//! Path Patterns
//!
//! The restricted XPath dialect used to select subtrees: child steps and the
//! `//` descendant gap, nothing else.

pub mod cache;
pub mod pattern;

pub use cache::PatternCache;
pub use pattern::{Classification, Pattern, PatternSet, Patterns};
