//! Path Pattern Compiler
//!
//! Compiles the restricted path dialect into segment matchers:
//!
//! ```text
//! /library/shelf          exact ancestry from the document root
//! //shelf                 a `shelf` at any depth
//! /library//book/title    any number of levels between `library` and `book`
//! ```
//!
//! A compiled pattern is a list of *runs* of literal segments separated by
//! `//` gaps. The first run is anchored at the root and the last run at the
//! current element; middle runs float. Matching a path against it is the
//! segment-level analogue of glob matching, where leftmost placement of each
//! floating run is always sufficient.

use crate::error::{Error, Result};
use std::sync::Arc;

/// One or more pattern strings, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Patterns(Vec<String>);

impl Patterns {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Patterns {
    fn from(pattern: &str) -> Self {
        Patterns(vec![pattern.to_string()])
    }
}

impl From<String> for Patterns {
    fn from(pattern: String) -> Self {
        Patterns(vec![pattern])
    }
}

impl From<&String> for Patterns {
    fn from(pattern: &String) -> Self {
        Patterns(vec![pattern.clone()])
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Patterns {
    fn from(patterns: Vec<S>) -> Self {
        Patterns(patterns.iter().map(|p| p.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>> From<&[S]> for Patterns {
    fn from(patterns: &[S]) -> Self {
        Patterns(patterns.iter().map(|p| p.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Patterns {
    fn from(patterns: [S; N]) -> Self {
        Patterns(patterns.iter().map(|p| p.as_ref().to_string()).collect())
    }
}

/// A single compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    /// Literal runs; a `//` gap sits between consecutive runs
    runs: Vec<Vec<String>>,
    case_insensitive: bool,
}

impl Pattern {
    /// Compile one pattern string
    pub fn compile(source: &str, case_insensitive: bool) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPattern(format!("{source:?}: {reason}"));

        if source.trim().is_empty() {
            return Err(invalid("pattern is empty"));
        }
        if source.ends_with('/') {
            return Err(invalid("pattern must end with an element name"));
        }

        // Relative patterns are evaluated from the document node, which makes
        // them root-anchored just like absolute ones.
        let body = source.strip_prefix('/').unwrap_or(source);

        let mut runs: Vec<Vec<String>> = vec![Vec::new()];
        let mut gap_pending = false;
        for segment in body.split('/') {
            if segment.is_empty() {
                if gap_pending {
                    return Err(invalid("empty path segment"));
                }
                gap_pending = true;
                runs.push(Vec::new());
                continue;
            }
            gap_pending = false;
            if segment.chars().any(char::is_whitespace) {
                return Err(invalid("segment contains whitespace"));
            }
            if let Some(run) = runs.last_mut() {
                run.push(segment.to_string());
            }
        }

        Ok(Pattern {
            source: source.to_string(),
            runs,
            case_insensitive,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Exact matcher: the path equals the pattern
    pub fn matches_exact<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let Some((first, rest)) = self.runs.split_first() else {
            return false;
        };
        let Some((last, middle)) = rest.split_last() else {
            return path.len() == first.len() && self.run_at(first, path, 0);
        };

        if first.len() + last.len() > path.len() {
            return false;
        }
        let tail = path.len() - last.len();
        if !self.run_at(first, path, 0) || !self.run_at(last, path, tail) {
            return false;
        }

        let mut pos = first.len();
        for run in middle {
            match (pos..=tail.saturating_sub(run.len()))
                .find(|&at| at + run.len() <= tail && self.run_at(run, path, at))
            {
                Some(at) => pos = at + run.len(),
                None => return false,
            }
        }
        true
    }

    /// Prefix matcher: the path is a strict descendant of a path matching
    /// this pattern
    pub fn matches_prefix<S: AsRef<str>>(&self, path: &[S]) -> bool {
        (1..path.len()).any(|len| self.matches_exact(&path[..len]))
    }

    fn run_at<S: AsRef<str>>(&self, run: &[String], path: &[S], at: usize) -> bool {
        path.len() >= at + run.len()
            && run
                .iter()
                .zip(&path[at..at + run.len()])
                .all(|(want, got)| self.segment_eq(want, got.as_ref()))
    }

    fn segment_eq(&self, want: &str, got: &str) -> bool {
        if !self.case_insensitive {
            return want == got;
        }
        if want.is_ascii() && got.is_ascii() {
            return want.eq_ignore_ascii_case(got);
        }
        want.chars()
            .flat_map(char::to_lowercase)
            .eq(got.chars().flat_map(char::to_lowercase))
    }
}

/// How a path relates to a compiled pattern set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    /// Index of the first pattern the path matches exactly
    pub exact: Option<usize>,
    /// The path lies strictly inside a subtree some pattern matches
    pub prefix: bool,
}

/// Ordered, immutable set of compiled patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile patterns in priority order. Fails if there are none or any is
    /// malformed.
    pub fn compile(patterns: &Patterns, case_insensitive: bool) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::InvalidPattern("at least one pattern is required".to_string()));
        }
        let patterns = patterns
            .as_slice()
            .iter()
            .map(|p| Pattern::compile(p, case_insensitive))
            .collect::<Result<Vec<_>>>()?;
        Ok(PatternSet { patterns })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// First pattern (by priority) whose exact matcher accepts `path`
    pub fn matches_exact<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        self.patterns.iter().position(|p| p.matches_exact(path))
    }

    /// True if any pattern's prefix matcher accepts `path`
    pub fn matches_prefix<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.patterns.iter().any(|p| p.matches_prefix(path))
    }

    pub fn classify<S: AsRef<str>>(&self, path: &[S]) -> Classification {
        Classification {
            exact: self.matches_exact(path),
            prefix: self.matches_prefix(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(p: &str) -> Pattern {
        Pattern::compile(p, false).unwrap()
    }

    #[test]
    fn test_absolute_pattern() {
        let p = compile("/library/shelf");
        assert!(p.matches_exact(&["library", "shelf"]));
        assert!(!p.matches_exact(&["library"]));
        assert!(!p.matches_exact(&["library", "section", "shelf"]));
        assert!(!p.matches_exact(&["library", "shelf", "book"]));
    }

    #[test]
    fn test_any_depth() {
        let p = compile("//shelf");
        assert!(p.matches_exact(&["shelf"]));
        assert!(p.matches_exact(&["library", "shelf"]));
        assert!(p.matches_exact(&["library", "section", "shelf"]));
        assert!(!p.matches_exact(&["library", "bookshelf"]));
        assert!(!p.matches_exact(&["library", "shelf", "book"]));
    }

    #[test]
    fn test_gap_in_the_middle() {
        let p = compile("/library//book/title");
        assert!(p.matches_exact(&["library", "book", "title"]));
        assert!(p.matches_exact(&["library", "shelf", "book", "title"]));
        assert!(p.matches_exact(&["library", "a", "b", "book", "title"]));
        assert!(!p.matches_exact(&["archive", "book", "title"]));
        assert!(!p.matches_exact(&["library", "title"]));
    }

    #[test]
    fn test_several_gaps() {
        let p = compile("//section//shelf");
        assert!(p.matches_exact(&["library", "section", "shelf"]));
        assert!(p.matches_exact(&["section", "x", "y", "shelf"]));
        assert!(!p.matches_exact(&["library", "shelf"]));
        // runs may not overlap
        assert!(!compile("//a//a").matches_exact(&["a"]));
        assert!(compile("//a//a").matches_exact(&["a", "a"]));
    }

    #[test]
    fn test_relative_pattern_is_root_anchored() {
        let p = compile("library/shelf");
        assert!(p.matches_exact(&["library", "shelf"]));
        assert!(!p.matches_exact(&["x", "library", "shelf"]));
    }

    #[test]
    fn test_prefix_matcher() {
        let p = compile("/library/shelf");
        assert!(!p.matches_prefix(&["library", "shelf"]));
        assert!(p.matches_prefix(&["library", "shelf", "book"]));
        assert!(p.matches_prefix(&["library", "shelf", "book", "title"]));
        assert!(!p.matches_prefix(&["library", "section"]));
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(!compile("/Library").matches_exact(&["library"]));
        let p = Pattern::compile("/Library/ÉTAGÈRE", true).unwrap();
        assert!(p.matches_exact(&["library", "étagère"]));
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["", "  ", "/", "/library/", "//", "/a///b", "/a b"] {
            assert!(
                matches!(Pattern::compile(bad, false), Err(Error::InvalidPattern(_))),
                "{bad:?} should be rejected"
            );
        }
        let none: Vec<&str> = Vec::new();
        assert!(PatternSet::compile(&Patterns::from(none), false).is_err());
    }

    #[test]
    fn test_first_pattern_wins() {
        let set = PatternSet::compile(&Patterns::from(["/library/shelf", "//shelf"]), false).unwrap();
        assert_eq!(set.matches_exact(&["library", "shelf"]), Some(0));
        assert_eq!(set.matches_exact(&["library", "section", "shelf"]), Some(1));
        assert_eq!(
            set.classify(&["library", "shelf", "book"]),
            Classification { exact: None, prefix: true }
        );
    }
}
