use std::sync::Arc;

use device_registry::{DeviceRegistry, DeviceRegistryConfig};
use jsonwebtoken::DecodingKey;
use notifications::background::NotificationTasks;
use notifications::config::NotificationsConfig;
use notifications::delivery::expo::ExpoPushGateway;
use notifications::dispatcher::NotificationsDispatcher;
use secrecy::ExposeSecret;
use sqlx_postgres::repository::Repository;

use crate::configuration::Settings;

pub struct Application {
    pub device_registry: DeviceRegistry,
    pub dispatcher: Arc<NotificationsDispatcher>,
    pub notification_tasks: NotificationTasks,
    pub jwt_decoding_key: DecodingKey,
}

impl Application {
    pub fn new(repository: Repository, settings: &Settings) -> Self {
        let device_registry = DeviceRegistry::new(
            Arc::new(repository.clone()),
            DeviceRegistryConfig {
                max_devices_per_patient: settings.devices.max_per_patient,
            },
        );

        let gateway = Arc::new(ExpoPushGateway::new(settings.expo.clone()));
        let dispatcher = Arc::new(NotificationsDispatcher::new(
            Arc::new(repository),
            gateway,
            NotificationsConfig {
                reminder_window_days: settings.notifications.reminder_window_days,
            },
        ));
        let notification_tasks = NotificationTasks::spawn(
            Arc::clone(&dispatcher),
            settings.notifications.queue_capacity,
        );

        let jwt_decoding_key =
            DecodingKey::from_secret(settings.auth.jwt_secret.expose_secret().as_bytes());

        Application {
            device_registry,
            dispatcher,
            notification_tasks,
            jwt_decoding_key,
        }
    }
}
