use std::sync::Arc;

use anyhow::anyhow;
use entities::patients::PatientId;
use tokio::sync::mpsc;

use crate::dispatcher::{NotificationsDispatcher, NotifyPatientError};

#[derive(Debug)]
pub struct PatientNotification {
    pub patient_id: PatientId,
    pub title: String,
    pub body: String,
}

/// Handle for fire-and-forget patient notifications. Work is queued on a
/// bounded channel and drained by one worker task, so a failure ends up in
/// the logs instead of disappearing with a detached task.
#[derive(Clone)]
pub struct NotificationTasks {
    sender: mpsc::Sender<PatientNotification>,
}

impl NotificationTasks {
    pub fn spawn(dispatcher: Arc<NotificationsDispatcher>, queue_capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<PatientNotification>(queue_capacity);

        tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                let outcome = dispatcher
                    .notify_patient(
                        notification.patient_id,
                        &notification.title,
                        &notification.body,
                    )
                    .await;
                match outcome {
                    Ok(()) => {}
                    Err(NotifyPatientError::NoRegisteredDevices(patient_id)) => {
                        tracing::info!(%patient_id, "Skipping notification, patient has no devices to push to");
                    }
                    Err(err) => {
                        tracing::error!("Failed to send patient notification: {err:?}");
                    }
                }
            }
        });

        Self { sender }
    }

    /// Queues a notification. Applies backpressure when the queue is full
    /// and fails only when the worker has shut down.
    pub async fn submit(&self, notification: PatientNotification) -> anyhow::Result<()> {
        self.sender
            .send(notification)
            .await
            .map_err(|_| anyhow!("Notification worker is no longer running"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use entities::patients::PatientId;

    use crate::background::{NotificationTasks, PatientNotification};
    use crate::config::NotificationsConfig;
    use crate::delivery::MockPushGateway;
    use crate::dispatcher::NotificationsDispatcher;
    use crate::store::MockNotificationsStore;

    #[tokio::test]
    async fn test_submitted_notifications_reach_the_dispatcher() {
        let (called_tx, mut called_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut store = MockNotificationsStore::new();
        store.expect_patient_devices().returning(move |_| {
            let _ = called_tx.send(());
            Ok(vec![])
        });
        let gateway = MockPushGateway::new();
        let dispatcher = Arc::new(NotificationsDispatcher::new(
            Arc::new(store),
            Arc::new(gateway),
            NotificationsConfig {
                reminder_window_days: 7,
            },
        ));

        let tasks = NotificationTasks::spawn(dispatcher, 4);
        tasks
            .submit(PatientNotification {
                patient_id: PatientId::new(),
                title: "Question answered".to_string(),
                body: "A doctor replied to your question.".to_string(),
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), called_rx.recv())
            .await
            .expect("worker never processed the notification");
    }
}
