//! Retention Policy
//!
//! Decides per text event whether the current element keeps it. With
//! `free_unmatched_nodes` only elements that are a result or sit inside one
//! keep text, so memory is bounded by the matched subtrees rather than by the
//! document. The decision reads nothing but the element's classification.

use crate::dom::LiveElement;

/// What to do with a text or CDATA run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAction {
    Append,
    /// Drop the run and clear whatever the element accumulated so far
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    free_unmatched_nodes: bool,
}

impl RetentionPolicy {
    pub fn new(free_unmatched_nodes: bool) -> Self {
        RetentionPolicy { free_unmatched_nodes }
    }

    pub fn text_action(&self, element: &LiveElement) -> TextAction {
        if !self.free_unmatched_nodes || element.is_reportable() {
            TextAction::Append
        } else {
            TextAction::Discard
        }
    }

    pub fn keeps_attributes(&self, element: &LiveElement) -> bool {
        !self.free_unmatched_nodes || element.is_reportable()
    }
}

/// Text bytes currently held by live elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionStats {
    pub retained_text_bytes: usize,
    pub peak_retained_text_bytes: usize,
}

impl RetentionStats {
    pub(crate) fn retain(&mut self, bytes: usize) {
        self.retained_text_bytes += bytes;
        self.peak_retained_text_bytes = self.peak_retained_text_bytes.max(self.retained_text_bytes);
    }

    pub(crate) fn release(&mut self, bytes: usize) {
        self.retained_text_bytes = self.retained_text_bytes.saturating_sub(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::Classification;

    #[test]
    fn test_text_action() {
        let unmatched = LiveElement::new(Classification::default());
        let result = LiveElement::new(Classification { exact: Some(0), prefix: false });
        let inside = LiveElement::new(Classification { exact: None, prefix: true });

        let legacy = RetentionPolicy::new(false);
        assert_eq!(legacy.text_action(&unmatched), TextAction::Append);

        let bounded = RetentionPolicy::new(true);
        assert_eq!(bounded.text_action(&unmatched), TextAction::Discard);
        assert_eq!(bounded.text_action(&result), TextAction::Append);
        assert_eq!(bounded.text_action(&inside), TextAction::Append);
        assert!(!bounded.keeps_attributes(&unmatched));
    }

    #[test]
    fn test_stats_track_peak() {
        let mut stats = RetentionStats::default();
        stats.retain(10);
        stats.retain(5);
        stats.release(12);
        assert_eq!(stats.retained_text_bytes, 3);
        assert_eq!(stats.peak_retained_text_bytes, 15);
    }
}
