//! The submission queue.
//!
//! Admission, cancellation and manual retry are caller-facing; claim,
//! complete and fail are scheduler-facing. Every mutation is persisted via
//! the ledger before its event is broadcast. State lives behind one async
//! mutex so a claim is fully persisted before any other worker can observe
//! the item.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use bridge_traits::Clock;
use core_runtime::events::{CoreEvent, EventBus, QueueEvent};

use crate::error::{QueueError, Result};
use crate::item::{
    Attachment, FailureInfo, SubmissionId, SubmissionItem, SubmissionStatus,
};
use crate::ledger::SubmissionLedger;
use crate::retry::RetryDecision;

/// Tunables for the submission queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum size of a single attachment, in bytes
    pub max_attachment_bytes: u64,
    /// Aggregate attachment budget across `Queued` and `Uploading` items
    pub max_total_attachment_bytes: u64,
    /// How long `Completed` items stay visible before being purged
    pub completed_retention: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attachment_bytes: 10 * 1024 * 1024,
            max_total_attachment_bytes: 100 * 1024 * 1024,
            completed_retention: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Aggregate per-status counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounters {
    pub queued: u64,
    pub uploading: u64,
    pub completed: u64,
    pub failed: u64,
}

struct QueueState {
    items: HashMap<SubmissionId, SubmissionItem>,
    next_seq: u64,
}

impl QueueState {
    fn counters(&self) -> QueueCounters {
        let mut counters = QueueCounters::default();
        for item in self.items.values() {
            match item.status {
                SubmissionStatus::Queued => counters.queued += 1,
                SubmissionStatus::Uploading => counters.uploading += 1,
                SubmissionStatus::Completed => counters.completed += 1,
                SubmissionStatus::Failed => counters.failed += 1,
            }
        }
        counters
    }

    fn pending_attachment_bytes(&self) -> u64 {
        self.items
            .values()
            .filter(|i| {
                matches!(
                    i.status,
                    SubmissionStatus::Queued | SubmissionStatus::Uploading
                )
            })
            .map(|i| i.attachment_bytes())
            .sum()
    }
}

/// Persistent, retrying submission queue.
pub struct SubmissionQueue {
    ledger: SubmissionLedger,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: QueueConfig,
    state: Mutex<QueueState>,
}

impl SubmissionQueue {
    /// Opens the queue, reloading all persisted items from the ledger.
    ///
    /// Items that were `Uploading` at crash time reload as `Queued`: the
    /// attempt was already counted and delivery is at-least-once, so the
    /// worst case is a duplicate, never a loss.
    pub async fn open(
        ledger: SubmissionLedger,
        clock: Arc<dyn Clock>,
        events: EventBus,
        config: QueueConfig,
    ) -> Result<Self> {
        let loaded = ledger.load_all().await?;
        let now_ms = clock.unix_timestamp_millis();

        let mut items = HashMap::with_capacity(loaded.len());
        let mut next_seq = 1u64;

        for mut item in loaded {
            next_seq = next_seq.max(item.seq + 1);

            if item.status == SubmissionStatus::Uploading {
                warn!(
                    submission_id = %item.id,
                    attempt = item.attempt_count,
                    "Reloading interrupted upload as queued"
                );
                item.status = SubmissionStatus::Queued;
                item.updated_at_ms = now_ms;
                ledger.save(&item).await?;
            }

            items.insert(item.id, item);
        }

        info!(items = items.len(), "Submission queue opened");

        Ok(Self {
            ledger,
            clock,
            events,
            config,
            state: Mutex::new(QueueState { items, next_seq }),
        })
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.events.emit(CoreEvent::Queue(event));
    }

    fn emit_counters(&self, counters: QueueCounters) {
        self.emit(QueueEvent::CountersChanged {
            queued: counters.queued,
            uploading: counters.uploading,
            completed: counters.completed,
            failed: counters.failed,
        });
    }

    /// Validates and admits a submission, returning its id.
    ///
    /// The item is persisted as `Queued` before this returns; no network
    /// activity happens here.
    pub async fn submit(
        &self,
        payload: serde_json::Value,
        attachments: Vec<Attachment>,
    ) -> Result<SubmissionId> {
        for attachment in &attachments {
            attachment.validate()?;
            if attachment.size_bytes > self.config.max_attachment_bytes {
                return Err(QueueError::Capacity(format!(
                    "Attachment '{}' is {} bytes, limit is {}",
                    attachment.name, attachment.size_bytes, self.config.max_attachment_bytes
                )));
            }
        }

        let new_bytes: u64 = attachments.iter().map(|a| a.size_bytes).sum();

        let mut state = self.state.lock().await;

        let pending = state.pending_attachment_bytes();
        if pending + new_bytes > self.config.max_total_attachment_bytes {
            return Err(QueueError::Capacity(format!(
                "Aggregate attachment budget exceeded: {} pending + {} new > {} limit",
                pending, new_bytes, self.config.max_total_attachment_bytes
            )));
        }

        let now_ms = self.clock.unix_timestamp_millis();
        let seq = state.next_seq;
        let item = SubmissionItem::new(seq, payload, attachments, now_ms);
        let id = item.id;

        self.ledger.save(&item).await?;
        state.next_seq += 1;
        state.items.insert(id, item);

        info!(submission_id = %id, seq, "Submission enqueued");
        self.emit(QueueEvent::Enqueued {
            submission_id: id.to_string(),
        });
        self.emit_counters(state.counters());

        Ok(id)
    }

    /// Manually re-admits a failed submission.
    ///
    /// Works on any `Failed` item: a terminal failure gets another chance,
    /// and a retry-pending one has its backoff deadline cleared so the next
    /// attempt may start immediately. Preserves `attempt_count`.
    pub async fn retry(&self, id: SubmissionId) -> Result<()> {
        let mut state = self.state.lock().await;
        let item = state.items.get_mut(&id).ok_or(QueueError::NotFound(id))?;

        if item.status != SubmissionStatus::Failed {
            return Err(QueueError::InvalidState {
                id,
                status: item.status,
                operation: "retry",
            });
        }

        let now_ms = self.clock.unix_timestamp_millis();
        item.status = SubmissionStatus::Queued;
        item.next_attempt_at_ms = None;
        item.updated_at_ms = now_ms;
        let item = item.clone();

        self.ledger.save(&item).await?;

        info!(submission_id = %id, attempt = item.attempt_count, "Manual retry requested");
        self.emit(QueueEvent::RetryScheduled {
            submission_id: id.to_string(),
            attempt: item.attempt_count,
            next_attempt_at_ms: now_ms,
            reason: "manual retry".to_string(),
        });
        self.emit_counters(state.counters());

        Ok(())
    }

    /// Cancels a submission that has not been claimed.
    ///
    /// Only `Queued` and `Failed` items can be cancelled; an in-flight or
    /// completed item returns `InvalidState` and is left untouched.
    pub async fn cancel(&self, id: SubmissionId) -> Result<()> {
        let mut state = self.state.lock().await;
        let item = state.items.get(&id).ok_or(QueueError::NotFound(id))?;

        if !matches!(
            item.status,
            SubmissionStatus::Queued | SubmissionStatus::Failed
        ) {
            return Err(QueueError::InvalidState {
                id,
                status: item.status,
                operation: "cancel",
            });
        }

        self.ledger.remove(&id).await?;
        state.items.remove(&id);

        info!(submission_id = %id, "Submission cancelled");
        self.emit(QueueEvent::Cancelled {
            submission_id: id.to_string(),
        });
        self.emit_counters(state.counters());

        Ok(())
    }

    /// Eagerly purges one `Completed` submission.
    pub async fn clear(&self, id: SubmissionId) -> Result<()> {
        let mut state = self.state.lock().await;
        let item = state.items.get(&id).ok_or(QueueError::NotFound(id))?;

        if item.status != SubmissionStatus::Completed {
            return Err(QueueError::InvalidState {
                id,
                status: item.status,
                operation: "clear",
            });
        }

        self.ledger.remove(&id).await?;
        state.items.remove(&id);
        self.emit_counters(state.counters());

        Ok(())
    }

    /// Snapshot of all items with the given status, in FIFO admission order.
    pub async fn list_by_status(&self, status: SubmissionStatus) -> Vec<SubmissionItem> {
        let state = self.state.lock().await;
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.fifo_key());
        items
    }

    /// Returns one item by id, if present.
    pub async fn get(&self, id: SubmissionId) -> Option<SubmissionItem> {
        self.state.lock().await.items.get(&id).cloned()
    }

    /// Current per-status counts.
    pub async fn counters(&self) -> QueueCounters {
        self.state.lock().await.counters()
    }

    /// Claims the oldest eligible item for delivery.
    ///
    /// The item moves to `Uploading` with an incremented attempt count and
    /// is persisted before it is handed to the worker, so no second worker
    /// can claim it and a crash mid-flight reloads it as `Queued`.
    pub async fn claim_next_eligible(&self) -> Result<Option<SubmissionItem>> {
        let mut state = self.state.lock().await;
        let now_ms = self.clock.unix_timestamp_millis();

        let Some(id) = state
            .items
            .values()
            .filter(|i| i.is_eligible(now_ms))
            .min_by_key(|i| i.fifo_key())
            .map(|i| i.id)
        else {
            return Ok(None);
        };

        let item = state
            .items
            .get_mut(&id)
            .ok_or(QueueError::NotFound(id))?;
        item.status = SubmissionStatus::Uploading;
        item.attempt_count += 1;
        item.next_attempt_at_ms = None;
        item.updated_at_ms = now_ms;
        let claimed = item.clone();

        self.ledger.save(&claimed).await?;

        debug!(submission_id = %id, attempt = claimed.attempt_count, "Upload claimed");
        self.emit(QueueEvent::UploadStarted {
            submission_id: id.to_string(),
            attempt: claimed.attempt_count,
        });
        self.emit_counters(state.counters());

        Ok(Some(claimed))
    }

    /// Records a successful delivery.
    pub async fn mark_completed(&self, id: SubmissionId) -> Result<()> {
        let mut state = self.state.lock().await;
        let item = state.items.get_mut(&id).ok_or(QueueError::NotFound(id))?;

        let now_ms = self.clock.unix_timestamp_millis();
        item.status = SubmissionStatus::Completed;
        item.last_error = None;
        item.next_attempt_at_ms = None;
        item.completed_at_ms = Some(now_ms);
        item.updated_at_ms = now_ms;
        let item = item.clone();

        self.ledger.save(&item).await?;

        info!(submission_id = %id, attempts = item.attempt_count, "Submission delivered");
        self.emit(QueueEvent::Completed {
            submission_id: id.to_string(),
        });
        self.emit_counters(state.counters());

        Ok(())
    }

    /// Records a failed delivery attempt.
    ///
    /// Both decisions land in `Failed`: a `Delay` carries the backoff
    /// deadline the scheduler honors, `Terminal` carries none and waits for
    /// a manual retry. Either way the failure and its reason are visible
    /// under `list_by_status(Failed)` immediately.
    pub async fn mark_failed(
        &self,
        id: SubmissionId,
        failure: FailureInfo,
        decision: RetryDecision,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let item = state.items.get_mut(&id).ok_or(QueueError::NotFound(id))?;

        let now_ms = self.clock.unix_timestamp_millis();
        let reason = failure.reason.clone();
        item.last_error = Some(failure);
        item.updated_at_ms = now_ms;

        let event = match decision {
            RetryDecision::Delay(delay) => {
                let due_ms = now_ms + delay.as_millis() as i64;
                item.status = SubmissionStatus::Failed;
                item.next_attempt_at_ms = Some(due_ms);
                warn!(
                    submission_id = %id,
                    attempt = item.attempt_count,
                    next_attempt_at_ms = due_ms,
                    reason = %reason,
                    "Delivery failed, retry scheduled"
                );
                QueueEvent::RetryScheduled {
                    submission_id: id.to_string(),
                    attempt: item.attempt_count,
                    next_attempt_at_ms: due_ms,
                    reason,
                }
            }
            RetryDecision::Terminal => {
                item.status = SubmissionStatus::Failed;
                item.next_attempt_at_ms = None;
                warn!(
                    submission_id = %id,
                    attempts = item.attempt_count,
                    reason = %reason,
                    "Submission failed permanently"
                );
                QueueEvent::FailedPermanently {
                    submission_id: id.to_string(),
                    reason,
                }
            }
        };

        let item = item.clone();
        self.ledger.save(&item).await?;

        self.emit(event);
        self.emit_counters(state.counters());

        Ok(())
    }

    /// Purges `Completed` items older than the retention window.
    ///
    /// Returns the number of items removed.
    pub async fn purge_expired_completed(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let now_ms = self.clock.unix_timestamp_millis();
        let retention_ms = self.config.completed_retention.as_millis() as i64;

        let expired: Vec<SubmissionId> = state
            .items
            .values()
            .filter(|i| {
                i.status == SubmissionStatus::Completed
                    && i.completed_at_ms
                        .map_or(false, |done| done + retention_ms <= now_ms)
            })
            .map(|i| i.id)
            .collect();

        for id in &expired {
            self.ledger.remove(id).await?;
            state.items.remove(id);
        }

        if !expired.is_empty() {
            debug!(purged = expired.len(), "Expired completed submissions purged");
            self.emit_counters(state.counters());
        }

        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::FailureKind;
    use bridge_traits::{ManualClock, MemoryKeyValueStore};

    fn attachment(name: &str, size: u64) -> Attachment {
        Attachment {
            uri: format!("file:///photos/{}", name),
            mime_type: "image/jpeg".to_string(),
            name: name.to_string(),
            size_bytes: size,
        }
    }

    async fn queue_with(config: QueueConfig) -> (SubmissionQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let ledger = SubmissionLedger::new(Arc::new(MemoryKeyValueStore::new()));
        let queue = SubmissionQueue::open(ledger, clock.clone(), EventBus::new(16), config)
            .await
            .unwrap();
        (queue, clock)
    }

    async fn queue() -> (SubmissionQueue, Arc<ManualClock>) {
        queue_with(QueueConfig::default()).await
    }

    #[tokio::test]
    async fn test_submit_persists_before_returning() {
        let (queue, _clock) = queue().await;
        let id = queue
            .submit(serde_json::json!({"category": "pothole"}), vec![])
            .await
            .unwrap();

        let item = queue.get(id).await.unwrap();
        assert_eq!(item.status, SubmissionStatus::Queued);
        assert_eq!(item.attempt_count, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_attachment() {
        let (queue, _clock) = queue().await;
        let result = queue
            .submit(serde_json::json!({}), vec![attachment("", 10)])
            .await;
        assert!(matches!(result, Err(QueueError::Validation(_))));
        assert_eq!(queue.counters().await.queued, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_oversized_attachment() {
        let (queue, _clock) = queue_with(QueueConfig {
            max_attachment_bytes: 100,
            ..QueueConfig::default()
        })
        .await;

        let result = queue
            .submit(serde_json::json!({}), vec![attachment("big.jpg", 101)])
            .await;
        assert!(matches!(result, Err(QueueError::Capacity(_))));
    }

    #[tokio::test]
    async fn test_submit_enforces_aggregate_budget() {
        let (queue, _clock) = queue_with(QueueConfig {
            max_total_attachment_bytes: 150,
            ..QueueConfig::default()
        })
        .await;

        queue
            .submit(serde_json::json!({}), vec![attachment("a.jpg", 100)])
            .await
            .unwrap();

        let result = queue
            .submit(serde_json::json!({}), vec![attachment("b.jpg", 100)])
            .await;
        assert!(matches!(result, Err(QueueError::Capacity(_))));
    }

    #[tokio::test]
    async fn test_claim_follows_fifo_order() {
        let (queue, clock) = queue().await;
        let first = queue.submit(serde_json::json!({"n": 1}), vec![]).await.unwrap();
        clock.advance(Duration::from_millis(1));
        let second = queue.submit(serde_json::json!({"n": 2}), vec![]).await.unwrap();

        let claimed = queue.claim_next_eligible().await.unwrap().unwrap();
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.status, SubmissionStatus::Uploading);
        assert_eq!(claimed.attempt_count, 1);

        let claimed = queue.claim_next_eligible().await.unwrap().unwrap();
        assert_eq!(claimed.id, second);

        assert!(queue.claim_next_eligible().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seq_breaks_created_at_ties() {
        let (queue, _clock) = queue().await;
        // Manual clock does not advance, so created_at collides
        let first = queue.submit(serde_json::json!({"n": 1}), vec![]).await.unwrap();
        let _second = queue.submit(serde_json::json!({"n": 2}), vec![]).await.unwrap();

        let claimed = queue.claim_next_eligible().await.unwrap().unwrap();
        assert_eq!(claimed.id, first);
    }

    #[tokio::test]
    async fn test_retry_deadline_gates_claim() {
        let (queue, clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        queue.claim_next_eligible().await.unwrap().unwrap();
        queue
            .mark_failed(
                id,
                FailureInfo::new(FailureKind::Network, "unreachable"),
                RetryDecision::Delay(Duration::from_secs(5)),
            )
            .await
            .unwrap();

        assert!(queue.claim_next_eligible().await.unwrap().is_none());

        clock.advance(Duration::from_secs(5));
        let claimed = queue.claim_next_eligible().await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.attempt_count, 2);
    }

    #[tokio::test]
    async fn test_retry_pending_failure_is_listed_as_failed() {
        let (queue, _clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        queue.claim_next_eligible().await.unwrap().unwrap();
        queue
            .mark_failed(
                id,
                FailureInfo::new(FailureKind::Server { status: 503 }, "overloaded"),
                RetryDecision::Delay(Duration::from_secs(30)),
            )
            .await
            .unwrap();

        // The failure and its reason are visible while the backoff runs
        let failed = queue.list_by_status(SubmissionStatus::Failed).await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, id);
        assert_eq!(failed[0].last_error.as_ref().unwrap().reason, "overloaded");
        assert!(failed[0].next_attempt_at_ms.is_some());

        assert_eq!(queue.counters().await.failed, 1);
        assert!(queue
            .list_by_status(SubmissionStatus::Queued)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_manual_retry_skips_backoff_window() {
        let (queue, _clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        queue.claim_next_eligible().await.unwrap().unwrap();
        queue
            .mark_failed(
                id,
                FailureInfo::new(FailureKind::Network, "unreachable"),
                RetryDecision::Delay(Duration::from_secs(30)),
            )
            .await
            .unwrap();
        assert!(queue.claim_next_eligible().await.unwrap().is_none());

        // No clock advance: retry clears the deadline itself
        queue.retry(id).await.unwrap();
        let claimed = queue.claim_next_eligible().await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.attempt_count, 2);
    }

    #[tokio::test]
    async fn test_terminal_failure_requires_manual_retry() {
        let (queue, clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        queue.claim_next_eligible().await.unwrap().unwrap();
        queue
            .mark_failed(
                id,
                FailureInfo::new(FailureKind::Rejected { status: 400 }, "bad category"),
                RetryDecision::Terminal,
            )
            .await
            .unwrap();

        // Terminal items are never claimed
        clock.advance(Duration::from_secs(3600));
        assert!(queue.claim_next_eligible().await.unwrap().is_none());
        assert_eq!(queue.counters().await.failed, 1);

        // Manual retry preserves the attempt count
        queue.retry(id).await.unwrap();
        let claimed = queue.claim_next_eligible().await.unwrap().unwrap();
        assert_eq!(claimed.attempt_count, 2);
    }

    #[tokio::test]
    async fn test_retry_rejects_non_failed() {
        let (queue, _clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        assert!(matches!(
            queue.retry(id).await,
            Err(QueueError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_removes_queued_item() {
        let (queue, _clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        queue.cancel(id).await.unwrap();
        assert!(queue.get(id).await.is_none());
        assert!(matches!(
            queue.cancel(id).await,
            Err(QueueError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_rejects_uploading_item() {
        let (queue, _clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();
        queue.claim_next_eligible().await.unwrap().unwrap();

        let result = queue.cancel(id).await;
        assert!(matches!(result, Err(QueueError::InvalidState { .. })));
        assert_eq!(
            queue.get(id).await.unwrap().status,
            SubmissionStatus::Uploading
        );
    }

    #[tokio::test]
    async fn test_completed_items_free_attachment_budget() {
        let (queue, _clock) = queue_with(QueueConfig {
            max_total_attachment_bytes: 100,
            ..QueueConfig::default()
        })
        .await;

        let id = queue
            .submit(serde_json::json!({}), vec![attachment("a.jpg", 100)])
            .await
            .unwrap();
        queue.claim_next_eligible().await.unwrap().unwrap();
        queue.mark_completed(id).await.unwrap();

        // Budget counts Queued + Uploading only
        queue
            .submit(serde_json::json!({}), vec![attachment("b.jpg", 100)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clear_purges_completed_only() {
        let (queue, _clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        assert!(matches!(
            queue.clear(id).await,
            Err(QueueError::InvalidState { .. })
        ));

        queue.claim_next_eligible().await.unwrap().unwrap();
        queue.mark_completed(id).await.unwrap();
        queue.clear(id).await.unwrap();
        assert!(queue.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_completed() {
        let (queue, clock) = queue().await;
        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();
        queue.claim_next_eligible().await.unwrap().unwrap();
        queue.mark_completed(id).await.unwrap();

        assert_eq!(queue.purge_expired_completed().await.unwrap(), 0);

        clock.advance(Duration::from_secs(24 * 60 * 60));
        assert_eq!(queue.purge_expired_completed().await.unwrap(), 1);
        assert!(queue.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_events_are_emitted_in_mutation_order() {
        let clock = Arc::new(ManualClock::at_epoch());
        let ledger = SubmissionLedger::new(Arc::new(MemoryKeyValueStore::new()));
        let events = EventBus::new(32);
        let mut sub = events.subscribe();
        let queue =
            SubmissionQueue::open(ledger, clock, events, QueueConfig::default())
                .await
                .unwrap();

        let id = queue.submit(serde_json::json!({}), vec![]).await.unwrap();

        let first = sub.recv().await.unwrap();
        assert_eq!(
            first,
            CoreEvent::Queue(QueueEvent::Enqueued {
                submission_id: id.to_string()
            })
        );
        let second = sub.recv().await.unwrap();
        assert!(matches!(
            second,
            CoreEvent::Queue(QueueEvent::CountersChanged { queued: 1, .. })
        ));
    }
}
