use std::sync::Arc;

use chrono::{DateTime, Utc};
use entities::appointments::AppointmentId;
use entities::notifications::{PushMessage, PushPriority, PushSound};
use entities::patients::PatientId;
use thiserror::Error;

use crate::config::{NotificationsConfig, MAX_MESSAGES_PER_REQUEST};
use crate::delivery::PushGateway;
use crate::render::reminder_body;
use crate::store::{AppointmentReminder, NotificationsStore};

const REMINDER_TITLE: &str = "Appointment reminder";

#[derive(Error, Debug)]
pub enum NotifyPatientError {
    #[error("patient {0} has no registered devices")]
    NoRegisteredDevices(PatientId),
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

/// Computes and sends the daily appointment reminders, and one-off
/// per-patient notifications. Stateless; every run starts from a fresh
/// query.
pub struct NotificationsDispatcher {
    store: Arc<dyn NotificationsStore>,
    gateway: Arc<dyn PushGateway>,
    config: NotificationsConfig,
}

impl NotificationsDispatcher {
    pub fn new(
        store: Arc<dyn NotificationsStore>,
        gateway: Arc<dyn PushGateway>,
        config: NotificationsConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// One reminder run: query the upcoming approved appointments, build one
    /// message per appointment addressed to all of its patient's devices,
    /// then send in gateway-sized batches. Each batch is best-effort; a
    /// failed batch is logged and the remaining batches still go out.
    #[tracing::instrument(err, skip(self), level = "info")]
    pub async fn send_daily_notifications(&self, window_days: Option<u16>) -> anyhow::Result<()> {
        let window_days = window_days.unwrap_or(self.config.reminder_window_days);
        let now = Utc::now();

        let reminders = self
            .store
            .upcoming_approved_appointments(now, window_days)
            .await?;
        let messages = group_into_messages(reminders, now);
        if messages.is_empty() {
            tracing::info!(window_days, "No appointment reminders due");
            return Ok(());
        }

        for batch in messages.chunks(MAX_MESSAGES_PER_REQUEST) {
            match self.gateway.send_batch(batch.to_vec()).await {
                Ok(receipts) => {
                    if receipts.len() != batch.len() {
                        // Known provider quirk, not a delivery failure.
                        tracing::warn!(
                            sent = batch.len(),
                            acknowledged = receipts.len(),
                            "Push gateway acknowledged a different number of messages than were sent"
                        );
                    }
                }
                Err(err) => {
                    tracing::error!("Failed to send a reminder batch: {err:?}");
                }
            }
        }

        Ok(())
    }

    /// Sends one notification to every device of a single patient, e.g. when
    /// a consultation question gets answered. Distinguishes "this patient has
    /// nothing to push to" from transport failure so callers can ignore the
    /// former.
    #[tracing::instrument(err, skip(self, title, body), level = "info")]
    pub async fn notify_patient(
        &self,
        patient_id: PatientId,
        title: &str,
        body: &str,
    ) -> Result<(), NotifyPatientError> {
        let devices = self
            .store
            .patient_devices(patient_id)
            .await
            .map_err(NotifyPatientError::Internal)?;

        let recipients = devices
            .into_iter()
            .map(|device| device.push_token)
            .filter(|token| !token.is_empty())
            .collect::<Vec<_>>();
        if recipients.is_empty() {
            return Err(NotifyPatientError::NoRegisteredDevices(patient_id));
        }

        let message = PushMessage {
            to: recipients,
            title: title.to_string(),
            body: body.to_string(),
            sound: PushSound::Default,
            priority: PushPriority::High,
        };

        // A single patient's devices are capped well below the batch limit,
        // so this is always exactly one request.
        let receipts = self
            .gateway
            .send_batch(vec![message])
            .await
            .map_err(NotifyPatientError::Internal)?;
        if receipts.len() != 1 {
            tracing::warn!(
                acknowledged = receipts.len(),
                "Push gateway acknowledged a different number of messages than were sent"
            );
        }

        Ok(())
    }
}

/// Single pass over rows ordered by appointment id: a row belonging to the
/// same appointment as the previous one only adds its token to the open
/// message; a new appointment id closes the open message and starts the
/// next one. The final message is flushed after the loop, otherwise the
/// last appointment would silently lose its reminder.
fn group_into_messages(
    reminders: Vec<AppointmentReminder>,
    now: DateTime<Utc>,
) -> Vec<PushMessage> {
    let mut messages = Vec::new();
    let mut current: Option<(AppointmentId, PushMessage)> = None;

    for reminder in reminders {
        match current.take() {
            Some((prior, mut message)) if prior == reminder.appointment_id => {
                message.to.push(reminder.push_token);
                current = Some((prior, message));
            }
            closed => {
                if let Some((_, message)) = closed {
                    messages.push(message);
                }
                current = Some((
                    reminder.appointment_id,
                    PushMessage {
                        to: vec![reminder.push_token],
                        title: REMINDER_TITLE.to_string(),
                        body: reminder_body(reminder.scheduled_for, now),
                        sound: PushSound::Default,
                        priority: PushPriority::High,
                    },
                ));
            }
        }
    }
    if let Some((_, message)) = current {
        messages.push(message);
    }

    messages
}
