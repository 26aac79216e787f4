//! In-flight bus commands awaiting an acknowledgement from the bus adapter.
//!
//! Every command published to the bus carries a fresh correlation id. The
//! bus adapter answers on `<bus>/response/<id>`; entries nobody answers are
//! expired by a periodic sweep. Nothing is ever retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use dynabridge_domain::climate::status_is_ok;
use dynabridge_domain::id::CorrelationId;
use dynabridge_domain::time::{Timestamp, elapsed_ms, now};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A command sent and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResponse {
    pub correlation_id: CorrelationId,
    /// Diagnostic label, e.g. `area 3 setpoint`.
    pub comment: String,
    pub sent_at: Timestamp,
}

/// What an acknowledgement resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Acknowledged { comment: String, latency_ms: i64 },
    Failed {
        comment: String,
        status: String,
        latency_ms: i64,
    },
    /// No pending entry: already swept, already resolved, or never ours.
    Unknown,
}

pub struct CorrelationTracker {
    ttl: TimeDelta,
    pending: Mutex<HashMap<CorrelationId, PendingResponse>>,
}

impl CorrelationTracker {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Register a command about to be published.
    pub fn track(&self, comment: impl Into<String>) -> CorrelationId {
        self.track_at(comment, now())
    }

    /// Register a command with an explicit send time.
    pub fn track_at(&self, comment: impl Into<String>, sent_at: Timestamp) -> CorrelationId {
        let correlation_id = CorrelationId::new();
        let entry = PendingResponse {
            correlation_id,
            comment: comment.into(),
            sent_at,
        };
        self.lock().insert(correlation_id, entry);
        correlation_id
    }

    /// Settle the entry for `id` with the status the bus adapter reported.
    pub fn resolve(&self, id: CorrelationId, status: &str) -> Resolution {
        self.resolve_at(id, status, now())
    }

    pub fn resolve_at(&self, id: CorrelationId, status: &str, at: Timestamp) -> Resolution {
        let Some(entry) = self.lock().remove(&id) else {
            tracing::warn!(correlation_id = %id, "response for unknown command");
            return Resolution::Unknown;
        };

        let latency_ms = elapsed_ms(entry.sent_at, at);
        if status_is_ok(status) {
            tracing::debug!(
                correlation_id = %id,
                comment = %entry.comment,
                latency_ms,
                "command acknowledged"
            );
            Resolution::Acknowledged {
                comment: entry.comment,
                latency_ms,
            }
        } else {
            tracing::error!(
                correlation_id = %id,
                comment = %entry.comment,
                status,
                latency_ms,
                "command failed"
            );
            Resolution::Failed {
                comment: entry.comment,
                status: status.to_string(),
                latency_ms,
            }
        }
    }

    /// Forget an entry whose publish never went out.
    pub fn discard(&self, id: CorrelationId) -> Option<PendingResponse> {
        self.lock().remove(&id)
    }

    /// Remove and report every entry older than the TTL.
    pub fn sweep(&self, at: Timestamp) -> Vec<PendingResponse> {
        let mut pending = self.lock();
        let expired: Vec<CorrelationId> = pending
            .values()
            .filter(|entry| at - entry.sent_at > self.ttl)
            .map(|entry| entry.correlation_id)
            .collect();

        let expired: Vec<PendingResponse> = expired
            .into_iter()
            .filter_map(|id| pending.remove(&id))
            .collect();
        drop(pending);

        for entry in &expired {
            tracing::warn!(
                correlation_id = %entry.correlation_id,
                comment = %entry.comment,
                waited_ms = elapsed_ms(entry.sent_at, at),
                "command timed out"
            );
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: CorrelationId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Run [`sweep`](Self::sweep) every `interval` until `shutdown` turns
    /// `true` or its sender is dropped.
    pub fn spawn_sweeper(
        tracker: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let period = interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let expired = tracker.sweep(now());
                        if !expired.is_empty() {
                            tracing::debug!(count = expired.len(), "expired pending responses");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("response sweeper stopped");
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationId, PendingResponse>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> CorrelationTracker {
        CorrelationTracker::new(Duration::from_secs(10))
    }

    #[test]
    fn should_track_with_fresh_ids() {
        let tracker = tracker();
        let a = tracker.track("area 3 setpoint");
        let b = tracker.track("area 3 setpoint");

        assert_ne!(a, b);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn should_remove_entry_on_ok_and_never_time_out() {
        let tracker = tracker();
        let sent = now();
        let id = tracker.track_at("area 3 setpoint", sent);

        let resolution = tracker.resolve_at(id, "OK", sent + TimeDelta::milliseconds(40));
        assert_eq!(
            resolution,
            Resolution::Acknowledged {
                comment: "area 3 setpoint".to_string(),
                latency_ms: 40,
            }
        );
        assert!(tracker.is_empty());
        assert!(tracker.sweep(sent + TimeDelta::seconds(60)).is_empty());
    }

    #[test]
    fn should_report_failed_status() {
        let tracker = tracker();
        let sent = now();
        let id = tracker.track_at("area 3 fan mode", sent);

        let resolution = tracker.resolve_at(id, "timeout on bus", sent);
        assert!(matches!(
            resolution,
            Resolution::Failed { ref status, latency_ms: 0, .. } if status == "timeout on bus"
        ));
        assert!(!tracker.contains(id));
    }

    #[test]
    fn should_sweep_expired_entry_once() {
        let tracker = tracker();
        let sent = now();
        let id = tracker.track_at("area 3 status", sent);

        assert!(tracker.sweep(sent + TimeDelta::seconds(10)).is_empty());

        let expired = tracker.sweep(sent + TimeDelta::seconds(11));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].correlation_id, id);
        assert!(tracker.sweep(sent + TimeDelta::seconds(30)).is_empty());
        assert_eq!(tracker.resolve(id, "ok"), Resolution::Unknown);
    }

    #[test]
    fn should_keep_fresh_entries_during_sweep() {
        let tracker = tracker();
        let base = now();
        let old = tracker.track_at("old", base);
        let fresh = tracker.track_at("fresh", base + TimeDelta::seconds(8));

        let expired = tracker.sweep(base + TimeDelta::seconds(12));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].correlation_id, old);
        assert!(tracker.contains(fresh));
    }

    #[test]
    fn should_return_unknown_for_foreign_id() {
        let tracker = tracker();
        assert_eq!(
            tracker.resolve(CorrelationId::new(), "ok"),
            Resolution::Unknown
        );
    }

    #[test]
    fn should_discard_entry() {
        let tracker = tracker();
        let id = tracker.track("area 1 setpoint");

        assert!(tracker.discard(id).is_some());
        assert!(tracker.discard(id).is_none());
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_sweep_periodically_until_shutdown() {
        let tracker = Arc::new(CorrelationTracker::new(Duration::from_millis(50)));
        tracker.track_at("stale", now() - TimeDelta::seconds(5));
        let (tx, rx) = watch::channel(false);

        let handle = CorrelationTracker::spawn_sweeper(
            Arc::clone(&tracker),
            Duration::from_millis(50),
            rx,
        );
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(tracker.is_empty());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
