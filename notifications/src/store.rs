use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::appointments::AppointmentId;
use entities::devices::{Device, DeviceId};
use entities::notifications::PushToken;
use entities::patients::PatientId;
#[cfg(test)]
use mockall::automock;

/// One row of the appointment × device projection backing the daily run.
#[derive(Debug, Clone)]
pub struct AppointmentReminder {
    pub appointment_id: AppointmentId,
    pub scheduled_for: DateTime<Utc>,
    pub patient_id: PatientId,
    pub device_id: DeviceId,
    pub push_token: PushToken,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationsStore: Send + Sync {
    /// Approved appointments scheduled within `[now, now + window_days)`,
    /// joined against their patient's devices that carry a push token.
    /// Rows come back ordered by appointment id ascending; the dispatcher's
    /// single-pass grouping relies on that ordering.
    async fn upcoming_approved_appointments(
        &self,
        now: DateTime<Utc>,
        window_days: u16,
    ) -> anyhow::Result<Vec<AppointmentReminder>>;

    async fn patient_devices(&self, patient_id: PatientId) -> anyhow::Result<Vec<Device>>;
}
