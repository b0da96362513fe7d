//! Result Sink
//!
//! Three delivery modes:
//! - collecting: results gathered and handed over when input ends
//! - fire-immediate: a callback per result, no flow control
//! - fire-with-ack: a callback per result plus an [`Ack`] token; the driver
//!   stops reading while tokens are outstanding

use super::gate::{Ack, Gate};
use crate::dom::Node;
use crate::error::{Error, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

type EachFn = Box<dyn FnMut(Node) + Send>;
type AckFn = Box<dyn FnMut(Node, Ack) + Send>;
type EndFn = Box<dyn FnOnce() + Send>;

/// Per-result callback, picking the delivery mode
pub enum Callback {
    Each(EachFn),
    WithAck(AckFn),
}

impl Callback {
    pub fn each<F>(f: F) -> Self
    where
        F: FnMut(Node) + Send + 'static,
    {
        Callback::Each(Box::new(f))
    }

    pub fn with_ack<F>(f: F) -> Self
    where
        F: FnMut(Node, Ack) + Send + 'static,
    {
        Callback::WithAck(Box::new(f))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Each(_) => f.write_str("Callback::Each"),
            Callback::WithAck(_) => f.write_str("Callback::WithAck"),
        }
    }
}

/// Destination of finished results inside the driver
pub(crate) enum Sink {
    Collect(Vec<Node>),
    Each(EachFn),
    WithAck { callback: AckFn, gate: Arc<Gate> },
}

impl Sink {
    pub(crate) fn from_callback(callback: Option<Callback>) -> Self {
        match callback {
            None => Sink::Collect(Vec::new()),
            Some(Callback::Each(f)) => Sink::Each(f),
            Some(Callback::WithAck(f)) => Sink::WithAck {
                callback: f,
                gate: Gate::new(),
            },
        }
    }

    pub(crate) fn deliver(&mut self, node: Node) {
        match self {
            Sink::Collect(results) => results.push(node),
            Sink::Each(callback) => callback(node),
            Sink::WithAck { callback, gate } => {
                // issued is bumped before the callback can resume
                let ack = gate.issue();
                callback(node, ack);
            }
        }
    }

    pub(crate) fn gate(&self) -> Option<&Arc<Gate>> {
        match self {
            Sink::WithAck { gate, .. } => Some(gate),
            _ => None,
        }
    }

    pub(crate) fn into_collected(self) -> Vec<Node> {
        match self {
            Sink::Collect(results) => results,
            _ => Vec::new(),
        }
    }
}

/// Pending result list of a collecting stream
#[must_use = "futures do nothing unless polled"]
pub struct Collected {
    task: JoinHandle<Result<Vec<Node>>>,
}

impl Collected {
    pub(crate) fn new(task: JoinHandle<Result<Vec<Node>>>) -> Self {
        Collected { task }
    }
}

impl Future for Collected {
    type Output = Result<Vec<Node>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(Error::Aborted(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for Collected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collected").finish_non_exhaustive()
    }
}

enum EndState {
    Running(Option<EndFn>),
    Ended,
    Failed,
}

/// Shared end-of-stream latch between a [`Completion`] and its driver
pub(crate) struct EndSignal {
    state: Mutex<EndState>,
}

impl EndSignal {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(EndSignal {
            state: Mutex::new(EndState::Running(None)),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EndState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Input ended and every acknowledgement arrived
    pub(crate) fn end(&self) {
        let callback = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, EndState::Ended) {
                EndState::Running(callback) => callback,
                EndState::Ended => None,
                EndState::Failed => {
                    *state = EndState::Failed;
                    None
                }
            }
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    /// The byte source failed; registered end callbacks never fire
    pub(crate) fn fail(&self) {
        *self.lock() = EndState::Failed;
    }

    fn register(&self, callback: EndFn) {
        let mut state = self.lock();
        if let EndState::Running(slot) = &mut *state {
            if slot.is_some() {
                tracing::debug!("replacing previously registered end callback");
            }
            *slot = Some(callback);
            return;
        }
        let ended = matches!(*state, EndState::Ended);
        drop(state);

        if ended {
            callback();
        } else {
            tracing::debug!("stream failed; end callback will not fire");
        }
    }

    fn is_ended(&self) -> bool {
        matches!(*self.lock(), EndState::Ended)
    }
}

/// Handle to a callback-mode stream
#[must_use = "dropping the handle detaches the stream"]
pub struct Completion {
    signal: Arc<EndSignal>,
    task: JoinHandle<()>,
}

impl Completion {
    pub(crate) fn new(signal: Arc<EndSignal>, task: JoinHandle<()>) -> Self {
        Completion { signal, task }
    }

    /// Run `f` once input has ended and, in ack mode, every result has been
    /// acknowledged. Runs immediately if that already happened. Only the
    /// latest registration is kept.
    pub fn on_end<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.signal.register(Box::new(f));
    }

    pub fn is_ended(&self) -> bool {
        self.signal.is_ended()
    }

    /// Wait for the driver task. Source errors are not reported here; they
    /// are logged and leave the end callback unfired.
    pub async fn join(self) -> Result<()> {
        self.task.await.map_err(Error::Aborted)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").field("ended", &self.is_ended()).finish()
    }
}

/// What [`run`](crate::XmlObjectStream::run) started
#[derive(Debug)]
pub enum Outcome {
    Collected(Collected),
    Completion(Completion),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_end_signal_fires_once() {
        let signal = EndSignal::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        signal.register(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        signal.end();
        signal.end();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // registered after the end: fires right away
        let counter = Arc::clone(&fired);
        signal.register(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_signal_never_fires() {
        let signal = EndSignal::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        signal.register(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        signal.fail();
        signal.end();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ack_sink_issues_before_callback() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_cb = Arc::clone(&seen);
        let mut sink = Sink::from_callback(Some(Callback::with_ack(move |_node, ack| {
            seen_in_cb.fetch_add(1, Ordering::SeqCst);
            ack.resume();
        })));
        sink.deliver(Node::Value(crate::dom::Value::from("x")));
        let gate = sink.gate().unwrap();
        assert_eq!(gate.issued(), 1);
        assert!(gate.is_level());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
