//! Path Tracker
//!
//! Stack of currently open element names, root first.

#[derive(Debug, Default, Clone)]
pub struct PathTracker {
    segments: Vec<String>,
}

impl PathTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: String) {
        self.segments.push(name);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Innermost open element with this name, as a stack index
    pub fn rposition(&self, name: &[u8]) -> Option<usize> {
        self.segments.iter().rposition(|s| s.as_bytes() == name)
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// `/a/b/c`, or `/` at the document node
    pub fn render(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}
