// src/engine/notify.rs

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{models::notification::NewNotification, store::ProgressionStore};

/// Emitted once per committed grade write.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeEvent {
    pub from_id: Option<i64>,
    pub student_id: i64,
    pub item_title: String,
    pub score: f64,
    pub xp_awarded: f64,
}

impl GradeEvent {
    pub fn message(&self) -> String {
        format!(
            "Your grade for \"{}\" was posted: {} (+{} XP)",
            self.item_title, self.score, self.xp_awarded
        )
    }
}

/// Sending half of the notification queue.
///
/// Delivery happens on a separate task, so nothing it does can change the
/// outcome of the grade write that emitted the event.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<GradeEvent>,
}

impl Notifier {
    pub fn spawn(store: Arc<dyn ProgressionStore>, buffer: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<GradeEvent>(buffer.max(1));

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver(store.as_ref(), event).await;
            }
            tracing::debug!("Notification queue closed");
        });

        Self { tx }
    }

    /// Queues an event without waiting. Dropped events are logged, never retried.
    pub fn emit(&self, event: GradeEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    student_id = event.student_id,
                    "Notification queue full, dropping grade notification"
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    student_id = event.student_id,
                    "Notification queue closed, dropping grade notification"
                );
            }
        }
    }
}

async fn deliver(store: &dyn ProgressionStore, event: GradeEvent) {
    let notification = NewNotification {
        from_id: event.from_id,
        student_id: event.student_id,
        content: event.message(),
    };

    match store.create_notification(notification).await {
        Ok(created) => {
            tracing::debug!(
                notification_id = created.id,
                student_id = created.student_id,
                "Grade notification stored"
            );
        }
        Err(e) => {
            tracing::warn!(
                student_id = event.student_id,
                "Failed to store grade notification: {}",
                e
            );
        }
    }
}
