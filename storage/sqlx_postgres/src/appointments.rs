use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use entities::devices::Device;
use entities::patients::PatientId;
use notifications::store::{AppointmentReminder, NotificationsStore};
use uuid::Uuid;

use crate::devices::DeviceRecord;
use crate::repository::Repository;

#[derive(sqlx::FromRow)]
struct ReminderRecord {
    appointment_id: Uuid,
    scheduled_for: DateTime<Utc>,
    patient_id: Uuid,
    device_id: Uuid,
    push_token: String,
}

impl From<ReminderRecord> for AppointmentReminder {
    fn from(record: ReminderRecord) -> Self {
        AppointmentReminder {
            appointment_id: record.appointment_id.into(),
            scheduled_for: record.scheduled_for,
            patient_id: record.patient_id.into(),
            device_id: record.device_id.into(),
            push_token: record.push_token.into(),
        }
    }
}

#[async_trait]
impl NotificationsStore for Repository {
    async fn upcoming_approved_appointments(
        &self,
        now: DateTime<Utc>,
        window_days: u16,
    ) -> anyhow::Result<Vec<AppointmentReminder>> {
        let until = now + Duration::days(i64::from(window_days));
        // Ascending appointment id keeps each appointment's rows contiguous,
        // which the dispatcher's single-pass grouping depends on.
        let records = sqlx::query_as::<_, ReminderRecord>(
            "
            SELECT a.id AS appointment_id, a.scheduled_for, a.patient_id,
                   d.id AS device_id, d.push_token
            FROM appointments a
            JOIN devices d ON d.patient_id = a.patient_id
            WHERE a.approved_at IS NOT NULL
              AND d.push_token <> ''
              AND a.scheduled_for >= $1
              AND a.scheduled_for < $2
            ORDER BY a.id ASC
            ",
        )
        .bind(now)
        .bind(until)
        .fetch_all(self.pool())
        .await
        .context("Failed to fetch upcoming approved appointments")?;

        Ok(records
            .into_iter()
            .map(AppointmentReminder::from)
            .collect())
    }

    async fn patient_devices(&self, patient_id: PatientId) -> anyhow::Result<Vec<Device>> {
        let records = sqlx::query_as::<_, DeviceRecord>(
            "
            SELECT id, patient_id, name, push_token, logged_in_at
            FROM devices
            WHERE patient_id = $1
            ORDER BY logged_in_at ASC
            ",
        )
        .bind(patient_id.inner())
        .fetch_all(self.pool())
        .await
        .context("Failed to fetch the patient's devices")?;

        Ok(records.into_iter().map(Device::from).collect())
    }
}
