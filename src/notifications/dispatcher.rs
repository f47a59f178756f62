//! Asynchronous materialization of `post.liked` events into queued notifications.
//!
//! Emitting never blocks the caller and never fails it: events go through a
//! bounded channel with `try_send`, and a full or closed channel drops the event
//! with a warning. A worker task drains the channel and writes notifications on
//! the blocking pool; store failures are logged and swallowed.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::likes::{LikeEventSink, PostLikedEvent};
use crate::server::metrics;

use super::models::NotificationKind;
use super::store::NotificationStore;

pub struct NotificationDispatcher {
    sender: mpsc::Sender<PostLikedEvent>,
}

impl NotificationDispatcher {
    /// Creates the dispatcher and spawns its worker on the current tokio runtime.
    ///
    /// The worker exits once every dispatcher handle is dropped and the queue
    /// is drained.
    pub fn spawn(
        store: Arc<dyn NotificationStore>,
        capacity: usize,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let (dispatcher, receiver) = Self::channel(capacity);
        let worker = tokio::spawn(run_worker(store, receiver));
        (Arc::new(dispatcher), worker)
    }

    fn channel(capacity: usize) -> (Self, mpsc::Receiver<PostLikedEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl LikeEventSink for NotificationDispatcher {
    fn emit(&self, event: PostLikedEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Notification queue full, dropping post.liked event for post {} (liker {})",
                    event.post_id, event.liker_user_id
                );
                metrics::record_notification_dropped("queue_full");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    "Notification worker stopped, dropping post.liked event for post {} (liker {})",
                    event.post_id, event.liker_user_id
                );
                metrics::record_notification_dropped("worker_stopped");
            }
        }
    }
}

async fn run_worker(
    store: Arc<dyn NotificationStore>,
    mut receiver: mpsc::Receiver<PostLikedEvent>,
) {
    info!("Notification dispatcher started");
    while let Some(event) = receiver.recv().await {
        let post_id = event.post_id.clone();
        let store = store.clone();
        let result = tokio::task::spawn_blocking(move || {
            store.enqueue(
                &event.post_owner_id,
                NotificationKind::PostLiked,
                event.notification_payload(),
            )
        })
        .await;

        match result {
            Ok(Ok(notification)) => {
                debug!(
                    "Queued notification {} for user {} (post {})",
                    notification.id, notification.recipient_user_id, post_id
                );
                metrics::record_notification_enqueued();
            }
            Ok(Err(err)) => {
                warn!(
                    "Failed to enqueue post.liked notification for post {}: {:#}",
                    post_id, err
                );
                metrics::record_notification_dropped("store_error");
            }
            Err(err) => {
                error!("Notification enqueue task failed for post {}: {}", post_id, err);
                metrics::record_notification_dropped("task_failed");
            }
        }
    }
    info!("Notification dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::PendingNotification;
    use anyhow::{bail, Result};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        enqueued: Mutex<Vec<(String, serde_json::Value)>>,
        fail_first: Mutex<bool>,
    }

    impl NotificationStore for RecordingStore {
        fn enqueue(
            &self,
            recipient_user_id: &str,
            kind: NotificationKind,
            payload: serde_json::Value,
        ) -> Result<PendingNotification> {
            let mut fail_first = self.fail_first.lock().unwrap();
            if *fail_first {
                *fail_first = false;
                bail!("disk full");
            }
            self.enqueued
                .lock()
                .unwrap()
                .push((recipient_user_id.to_string(), payload.clone()));
            Ok(PendingNotification {
                id: "n".to_string(),
                recipient_user_id: recipient_user_id.to_string(),
                kind,
                payload,
                read_at: None,
                created_at: 0,
            })
        }

        fn get_user_notifications(
            &self,
            _user_id: &str,
            _limit: usize,
            _offset: usize,
        ) -> Result<Vec<PendingNotification>> {
            unimplemented!()
        }

        fn count_user_notifications(&self, _user_id: &str) -> Result<usize> {
            unimplemented!()
        }

        fn mark_notification_read(
            &self,
            _notification_id: &str,
            _user_id: &str,
        ) -> Result<Option<PendingNotification>> {
            unimplemented!()
        }

        fn get_unread_count(&self, _user_id: &str) -> Result<usize> {
            unimplemented!()
        }
    }

    fn event(post_id: &str, liker: &str) -> PostLikedEvent {
        PostLikedEvent {
            post_id: post_id.to_string(),
            liker_user_id: liker.to_string(),
            post_owner_id: "owner".to_string(),
        }
    }

    #[tokio::test]
    async fn worker_materializes_events_for_post_owner() {
        let store = Arc::new(RecordingStore::default());
        let (dispatcher, worker) = NotificationDispatcher::spawn(store.clone(), 16);

        dispatcher.emit(event("p1", "bob"));
        dispatcher.emit(event("p2", "carol"));
        drop(dispatcher);
        worker.await.unwrap();

        let enqueued = store.enqueued.lock().unwrap();
        assert_eq!(enqueued.len(), 2);
        assert_eq!(enqueued[0].0, "owner");
        assert_eq!(enqueued[0].1["post_id"], "p1");
        assert_eq!(enqueued[1].1["liker_user_id"], "carol");
    }

    #[tokio::test]
    async fn store_failure_is_swallowed_and_worker_continues() {
        let store = Arc::new(RecordingStore::default());
        *store.fail_first.lock().unwrap() = true;
        let (dispatcher, worker) = NotificationDispatcher::spawn(store.clone(), 16);

        dispatcher.emit(event("p1", "bob"));
        dispatcher.emit(event("p2", "bob"));
        drop(dispatcher);
        worker.await.unwrap();

        let enqueued = store.enqueued.lock().unwrap();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].1["post_id"], "p2");
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (dispatcher, mut receiver) = NotificationDispatcher::channel(1);

        dispatcher.emit(event("p1", "bob"));
        dispatcher.emit(event("p2", "bob"));

        assert_eq!(receiver.try_recv().unwrap().post_id, "p1");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn closed_queue_drops_without_panicking() {
        let (dispatcher, receiver) = NotificationDispatcher::channel(4);
        drop(receiver);

        dispatcher.emit(event("p1", "bob"));
    }
}
