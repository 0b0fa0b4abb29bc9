use crate::notifications::PushToken;
use crate::patients::PatientId;
use chrono::{DateTime, Utc};
use shared_kernel::uuid_key;

uuid_key!(DeviceId);

/// One registered push endpoint, owned exclusively by its patient.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: DeviceId,
    pub patient_id: PatientId,
    pub name: String,
    pub push_token: PushToken,
    /// Registration time. Devices are always read oldest-first on this
    /// column; eviction removes the head of that ordering.
    pub logged_in_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewDevice {
    pub patient_id: PatientId,
    pub name: String,
    pub push_token: PushToken,
}
