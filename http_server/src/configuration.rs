use notifications::delivery::expo::ExpoConfig;
use secrecy::Secret;
use serde::Deserialize;
use shared_kernel::configuration::config;

#[derive(Deserialize)]
pub struct DeviceSettings {
    pub max_per_patient: usize,
}

#[derive(Deserialize)]
pub struct NotificationSettings {
    pub reminder_window_days: u16,
    pub queue_capacity: usize,
}

#[derive(Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: Secret<String>,
}

#[derive(Deserialize)]
pub struct Settings {
    pub devices: DeviceSettings,
    pub notifications: NotificationSettings,
    pub expo: ExpoConfig,
    pub auth: AuthSettings,
}

impl Settings {
    pub fn parse() -> anyhow::Result<Self> {
        config::<Settings>()
    }
}
