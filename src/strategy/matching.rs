//! Match Evaluator
//!
//! [`Extractor`] consumes lexical events and keeps the path tracker, the
//! live element stack and the retention policy in lockstep. Each element is
//! classified once, when it opens:
//!
//! - *result*: the first pattern (in priority order) whose exact matcher
//!   accepts the path; reported when the element closes
//! - *retained child*: its parent is a result or a retained child, which is
//!   the same as the path satisfying some prefix matcher; attached to the
//!   parent when it closes
//!
//! Both can hold at once, in which case both happen. Finished results queue
//! up in close order until the caller takes them.

use super::path::PathTracker;
use super::retention::{RetentionPolicy, RetentionStats, TextAction};
use crate::config::Config;
use crate::core::attributes::Attribute;
use crate::core::tokenizer::TokenizerError;
use crate::dom::{LiveElement, Node, Rendering, TextOptions};
use crate::reader::{EventHandler, PushReader};
use crate::xpath::{Classification, PatternSet};
use std::collections::VecDeque;
use std::sync::Arc;

/// Streaming subtree extractor
pub struct Extractor {
    patterns: Arc<PatternSet>,
    rendering: Rendering,
    text_options: TextOptions,
    retention: RetentionPolicy,
    path: PathTracker,
    stack: Vec<LiveElement>,
    ready: VecDeque<Node>,
    stats: RetentionStats,
    reported: usize,
    errors: usize,
}

impl Extractor {
    pub fn new(patterns: Arc<PatternSet>, config: &Config) -> Self {
        Extractor {
            patterns,
            rendering: if config.collapsed {
                Rendering::Collapsed
            } else {
                Rendering::Structural
            },
            text_options: TextOptions {
                trim: config.trim,
                normalize: config.normalize,
            },
            retention: RetentionPolicy::new(config.free_unmatched_nodes),
            path: PathTracker::new(),
            stack: Vec::new(),
            ready: VecDeque::new(),
            stats: RetentionStats::default(),
            reported: 0,
            errors: 0,
        }
    }

    /// Next finished result, in close order
    pub fn take_ready(&mut self) -> Option<Node> {
        self.ready.pop_front()
    }

    pub fn drain_ready(&mut self) -> impl Iterator<Item = Node> + '_ {
        self.ready.drain(..)
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Results produced so far, taken or not
    pub fn reported(&self) -> usize {
        self.reported
    }

    /// Malformed-markup errors recovered from so far
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn stats(&self) -> RetentionStats {
        self.stats
    }

    /// Current depth of open elements
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    /// End of input. Elements still open are dropped without being reported.
    pub fn finish(&mut self) {
        if !self.stack.is_empty() {
            tracing::warn!(
                depth = self.stack.len(),
                path = %self.path.render(),
                "input ended inside open elements; they are not reported"
            );
        }
        for live in self.stack.drain(..) {
            self.stats.release(live.text_len());
        }
        self.path.clear();
    }

    fn append_text(&mut self, text: &[u8]) {
        let Some(live) = self.stack.last_mut() else {
            // outside the root element
            return;
        };
        match self.retention.text_action(live) {
            TextAction::Append => {
                live.append_text(text);
                self.stats.retain(text.len());
            }
            TextAction::Discard => {
                let released = live.clear_text();
                self.stats.release(released);
            }
        }
    }

    /// Close the innermost open element
    fn close_top(&mut self) {
        let (Some(live), Some(name)) = (self.stack.pop(), self.path.pop()) else {
            tracing::error!("path tracker and element stack out of step");
            return;
        };
        self.stats.release(live.text_len());

        if !live.is_reportable() {
            return;
        }
        let result = live.result_of().is_some();
        let retained = live.is_retained_child();
        let node = live.render(&name, self.rendering, self.text_options);

        if !result {
            if let Some(parent) = self.stack.last_mut() {
                parent.attach(&name, node);
            }
            return;
        }
        if retained {
            if let Some(parent) = self.stack.last_mut() {
                parent.attach(&name, node.clone());
            }
        }
        self.push_ready(node);
    }

    fn push_ready(&mut self, node: Node) {
        self.reported += 1;
        self.ready.push_back(node);
    }
}

impl EventHandler for Extractor {
    fn open_tag(&mut self, name: &[u8], attributes: &[Attribute<'_>]) {
        let within = self.stack.last().is_some_and(LiveElement::is_reportable);
        self.path.push(String::from_utf8_lossy(name).into_owned());

        let classification = Classification {
            exact: self.patterns.matches_exact(self.path.segments()),
            prefix: within,
        };
        let mut live = LiveElement::new(classification);
        if self.retention.keeps_attributes(&live) {
            live.set_attributes(attributes);
        }
        self.stack.push(live);
    }

    fn close_tag(&mut self, name: &[u8]) {
        let Some(target) = self.path.rposition(name) else {
            tracing::warn!(
                tag = %String::from_utf8_lossy(name),
                path = %self.path.render(),
                "close tag matches no open element; ignored"
            );
            return;
        };

        if target + 1 != self.path.depth() {
            tracing::warn!(
                tag = %String::from_utf8_lossy(name),
                path = %self.path.render(),
                "close tag skips open elements; closing them implicitly"
            );
        }
        while self.path.depth() > target {
            self.close_top();
        }
    }

    fn text(&mut self, text: &[u8]) {
        self.append_text(text);
    }

    fn cdata(&mut self, data: &[u8]) {
        self.append_text(data);
    }

    fn error(&mut self, error: TokenizerError) {
        self.errors += 1;
        tracing::debug!(%error, "recovered from malformed markup");
    }
}

/// Run the whole pipeline over an in-memory document, feeding the tokenizer
/// `config.chunk_size` bytes at a time
pub fn extract(input: &[u8], patterns: Arc<PatternSet>, config: &Config) -> Vec<Node> {
    let mut reader = PushReader::new(config.strict);
    let mut extractor = Extractor::new(patterns, config);
    let mut results = Vec::new();

    for chunk in input.chunks(config.chunk_size.max(1)) {
        reader.feed(chunk, &mut extractor);
        results.extend(extractor.drain_ready());
    }
    reader.finish(&mut extractor);
    extractor.finish();
    results.extend(extractor.drain_ready());
    results
}
