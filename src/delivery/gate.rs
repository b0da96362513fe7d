//! Acknowledgement gate
//!
//! Counts results handed to an acknowledging callback (`issued`) against
//! acknowledgements received (`acknowledged`). The driver parks on the gate
//! between chunks while the two differ. Waking is a counting notification,
//! so an acknowledgement arriving before the driver parks is never lost and
//! there is no continuation slot to overwrite.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct Gate {
    issued: AtomicU64,
    acknowledged: AtomicU64,
    notify: Notify,
    parked: AtomicBool,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one more outstanding result and hand out its token
    pub fn issue(self: &Arc<Self>) -> Ack {
        self.issued.fetch_add(1, Ordering::AcqRel);
        Ack {
            gate: Some(Arc::clone(self)),
        }
    }

    fn acknowledge(&self) {
        self.acknowledged.fetch_add(1, Ordering::AcqRel);
        self.notify.notify_one();
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }

    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> u64 {
        self.issued().saturating_sub(self.acknowledged())
    }

    /// True when every issued token has been acknowledged
    pub fn is_level(&self) -> bool {
        // acknowledged first: it can only catch up with issued, never pass it
        let acknowledged = self.acknowledged();
        acknowledged >= self.issued()
    }

    /// Wait until the counters are level. Only one waiter may be parked at
    /// a time; a second one is reported and still waits correctly.
    pub async fn wait_level(&self) {
        if self.is_level() {
            return;
        }
        if self.parked.swap(true, Ordering::AcqRel) {
            tracing::error!(
                issued = self.issued(),
                acknowledged = self.acknowledged(),
                "second continuation parked on the acknowledgement gate"
            );
        }
        loop {
            let notified = self.notify.notified();
            if self.is_level() {
                break;
            }
            notified.await;
        }
        self.parked.store(false, Ordering::Release);
    }
}

/// Acknowledgement token for one delivered result.
///
/// Call [`Ack::resume`] once the result has been handled. A token dropped
/// without resuming counts as acknowledged, with a warning.
#[derive(Debug)]
#[must_use = "the stream stalls until the result is acknowledged"]
pub struct Ack {
    gate: Option<Arc<Gate>>,
}

impl Ack {
    pub fn resume(mut self) {
        if let Some(gate) = self.gate.take() {
            gate.acknowledge();
        }
    }
}

impl Drop for Ack {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.take() {
            tracing::warn!("acknowledgement dropped without resume; resuming");
            gate.acknowledge();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_counters() {
        let gate = Gate::new();
        assert!(gate.is_level());
        let a = gate.issue();
        let b = gate.issue();
        assert_eq!(gate.pending(), 2);
        a.resume();
        assert_eq!(gate.acknowledged(), 1);
        drop(b);
        assert!(gate.is_level());
        assert_eq!(gate.issued(), 2);
    }

    #[tokio::test]
    async fn test_wait_level_resumes_after_last_ack() {
        let gate = Gate::new();
        let first = gate.issue();
        let second = gate.issue();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait_level().await })
        };

        first.resume();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        second.resume();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("gate never opened")
            .unwrap();
    }

    #[tokio::test]
    async fn test_ack_before_park_is_not_lost() {
        let gate = Gate::new();
        gate.issue().resume();
        tokio::time::timeout(Duration::from_secs(1), gate.wait_level())
            .await
            .unwrap();
    }
}
