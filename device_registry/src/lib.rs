pub mod store;

use std::sync::Arc;

use entities::devices::{DeviceId, NewDevice};
use entities::notifications::PushToken;
use entities::patients::PatientId;

use crate::store::DeviceStore;

#[derive(Debug, Clone)]
pub struct DeviceRegistryConfig {
    /// Hard cap on registered devices per patient.
    pub max_devices_per_patient: usize,
}

/// Enforces the per-patient device cap. Registration is read-evict-insert
/// inside one storage transaction; the oldest device makes room when the
/// patient is at the cap.
pub struct DeviceRegistry {
    store: Arc<dyn DeviceStore>,
    config: DeviceRegistryConfig,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn DeviceStore>, config: DeviceRegistryConfig) -> Self {
        Self { store, config }
    }

    #[tracing::instrument(err, skip(self, push_token), level = "info")]
    pub async fn register_device(
        &self,
        patient_id: PatientId,
        name: String,
        push_token: PushToken,
    ) -> anyhow::Result<DeviceId> {
        let mut registration = self.store.begin_registration(patient_id).await?;

        let devices = registration.devices().await?;
        if devices.len() >= self.config.max_devices_per_patient {
            if let Some(oldest) = devices.first() {
                registration.evict(oldest.id).await?;
            }
        }

        let device_id = registration
            .insert(NewDevice {
                patient_id,
                name,
                push_token,
            })
            .await?;

        registration.commit().await?;
        Ok(device_id)
    }

    /// Used at logout. Succeeds even when the device is already gone.
    #[tracing::instrument(err, skip(self), level = "info")]
    pub async fn deregister_device(&self, device_id: DeviceId) -> anyhow::Result<()> {
        self.store.delete_device(device_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use entities::devices::{Device, DeviceId, NewDevice};
    use entities::notifications::PushToken;
    use entities::patients::PatientId;

    use crate::store::{DeviceRegistration, DeviceStore};
    use crate::{DeviceRegistry, DeviceRegistryConfig};

    /// In-memory store with staged writes: nothing is visible until commit,
    /// and each registration scope holds a per-patient lock, mirroring the
    /// transactional contract of the real store.
    #[derive(Default)]
    struct InMemoryDevices {
        devices: Arc<Mutex<HashMap<PatientId, Vec<Device>>>>,
        locks: Arc<Mutex<HashMap<PatientId, Arc<tokio::sync::Mutex<()>>>>>,
        fail_on_insert: bool,
    }

    impl InMemoryDevices {
        fn devices_of(&self, patient_id: PatientId) -> Vec<Device> {
            self.devices
                .lock()
                .unwrap()
                .get(&patient_id)
                .cloned()
                .unwrap_or_default()
        }

        fn seed(&self, patient_id: PatientId, count: usize) -> Vec<DeviceId> {
            let start = Utc::now();
            let mut guard = self.devices.lock().unwrap();
            let devices = guard.entry(patient_id).or_default();
            (0..count)
                .map(|offset| {
                    let device = Device {
                        id: DeviceId::new(),
                        patient_id,
                        name: format!("device-{offset}"),
                        push_token: PushToken::from(format!("token-{offset}")),
                        logged_in_at: start + Duration::seconds(offset as i64),
                    };
                    let id = device.id;
                    devices.push(device);
                    id
                })
                .collect()
        }
    }

    struct InMemoryRegistration {
        devices: Arc<Mutex<HashMap<PatientId, Vec<Device>>>>,
        patient_id: PatientId,
        staged_evictions: Vec<DeviceId>,
        staged_insert: Option<Device>,
        fail_on_insert: bool,
        _guard: tokio::sync::OwnedMutexGuard<()>,
    }

    #[async_trait]
    impl DeviceStore for InMemoryDevices {
        async fn begin_registration(
            &self,
            patient_id: PatientId,
        ) -> anyhow::Result<Box<dyn DeviceRegistration>> {
            let lock = {
                let mut guard = self.locks.lock().unwrap();
                Arc::clone(guard.entry(patient_id).or_default())
            };
            let _guard = lock.lock_owned().await;
            Ok(Box::new(InMemoryRegistration {
                devices: Arc::clone(&self.devices),
                patient_id,
                staged_evictions: vec![],
                staged_insert: None,
                fail_on_insert: self.fail_on_insert,
                _guard,
            }))
        }

        async fn delete_device(&self, device_id: DeviceId) -> anyhow::Result<()> {
            let mut guard = self.devices.lock().unwrap();
            for devices in guard.values_mut() {
                devices.retain(|device| device.id != device_id);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DeviceRegistration for InMemoryRegistration {
        async fn devices(&mut self) -> anyhow::Result<Vec<Device>> {
            let mut devices = {
                let guard = self.devices.lock().unwrap();
                guard.get(&self.patient_id).cloned().unwrap_or_default()
            };
            // Yield between the read and the later write so overlapping
            // registrations get a chance to interleave.
            tokio::task::yield_now().await;
            devices.sort_by_key(|device| device.logged_in_at);
            Ok(devices)
        }

        async fn evict(&mut self, device_id: DeviceId) -> anyhow::Result<()> {
            self.staged_evictions.push(device_id);
            Ok(())
        }

        async fn insert(&mut self, device: NewDevice) -> anyhow::Result<DeviceId> {
            if self.fail_on_insert {
                anyhow::bail!("insert failed");
            }
            let device = Device {
                id: DeviceId::new(),
                patient_id: device.patient_id,
                name: device.name,
                push_token: device.push_token,
                logged_in_at: Utc::now() + Duration::days(1),
            };
            let id = device.id;
            self.staged_insert = Some(device);
            Ok(id)
        }

        async fn commit(self: Box<Self>) -> anyhow::Result<()> {
            let mut guard = self.devices.lock().unwrap();
            let devices = guard.entry(self.patient_id).or_default();
            devices.retain(|device| !self.staged_evictions.contains(&device.id));
            if let Some(device) = self.staged_insert {
                devices.push(device);
            }
            Ok(())
        }
    }

    fn registry_with(store: Arc<InMemoryDevices>, max_devices: usize) -> DeviceRegistry {
        DeviceRegistry::new(
            store,
            DeviceRegistryConfig {
                max_devices_per_patient: max_devices,
            },
        )
    }

    #[tokio::test]
    async fn test_device_count_never_exceeds_the_cap() {
        let store = Arc::new(InMemoryDevices::default());
        let registry = registry_with(Arc::clone(&store), 3);
        let patient_id = PatientId::new();

        for attempt in 0..6 {
            registry
                .register_device(
                    patient_id,
                    format!("phone-{attempt}"),
                    PushToken::from(format!("token-{attempt}")),
                )
                .await
                .unwrap();
            assert!(store.devices_of(patient_id).len() <= 3);
        }

        let survivors = store.devices_of(patient_id);
        assert_eq!(survivors.len(), 3);
        let names = survivors
            .iter()
            .map(|device| device.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["phone-3", "phone-4", "phone-5"]);
    }

    #[tokio::test]
    async fn test_registering_at_the_cap_evicts_exactly_the_oldest_device() {
        let store = Arc::new(InMemoryDevices::default());
        let registry = registry_with(Arc::clone(&store), 4);
        let patient_id = PatientId::new();
        let seeded = store.seed(patient_id, 4);

        let new_id = registry
            .register_device(
                patient_id,
                "replacement".to_string(),
                PushToken::from("fresh-token".to_string()),
            )
            .await
            .unwrap();

        let survivors = store.devices_of(patient_id);
        assert_eq!(survivors.len(), 4);
        let surviving_ids = survivors.iter().map(|device| device.id).collect::<Vec<_>>();
        assert!(!surviving_ids.contains(&seeded[0]));
        assert!(surviving_ids.contains(&seeded[1]));
        assert!(surviving_ids.contains(&new_id));
    }

    #[tokio::test]
    async fn test_overlapping_registrations_never_exceed_the_cap() {
        let store = Arc::new(InMemoryDevices::default());
        let registry = registry_with(Arc::clone(&store), 3);
        let patient_id = PatientId::new();
        let seeded = store.seed(patient_id, 2);

        // Both registrations start below the cap; without per-patient
        // serialization each would read the same device count and neither
        // would evict, leaving the patient one device over.
        let first = registry.register_device(
            patient_id,
            "phone-a".to_string(),
            PushToken::from("token-a".to_string()),
        );
        let second = registry.register_device(
            patient_id,
            "phone-b".to_string(),
            PushToken::from("token-b".to_string()),
        );
        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        let survivors = store.devices_of(patient_id);
        assert_eq!(survivors.len(), 3);
        let names = survivors
            .iter()
            .map(|device| device.name.as_str())
            .collect::<Vec<_>>();
        assert!(names.contains(&"phone-a"));
        assert!(names.contains(&"phone-b"));
        assert!(!survivors.iter().any(|device| device.id == seeded[0]));
    }

    #[tokio::test]
    async fn test_registration_below_the_cap_evicts_nothing() {
        let store = Arc::new(InMemoryDevices::default());
        let registry = registry_with(Arc::clone(&store), 4);
        let patient_id = PatientId::new();
        let seeded = store.seed(patient_id, 2);

        registry
            .register_device(
                patient_id,
                "tablet".to_string(),
                PushToken::from("token".to_string()),
            )
            .await
            .unwrap();

        let survivors = store.devices_of(patient_id);
        assert_eq!(survivors.len(), 3);
        assert!(survivors.iter().any(|device| device.id == seeded[0]));
    }

    #[tokio::test]
    async fn test_deregistering_an_unknown_device_is_not_an_error() {
        let store = Arc::new(InMemoryDevices::default());
        let registry = registry_with(store, 3);

        let result = registry.deregister_device(DeviceId::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_the_eviction() {
        let store = Arc::new(InMemoryDevices {
            fail_on_insert: true,
            ..Default::default()
        });
        let registry = registry_with(Arc::clone(&store), 2);
        let patient_id = PatientId::new();
        let seeded = store.seed(patient_id, 2);

        let result = registry
            .register_device(
                patient_id,
                "phone".to_string(),
                PushToken::from("token".to_string()),
            )
            .await;

        assert!(result.is_err());
        let survivors = store.devices_of(patient_id);
        assert_eq!(survivors.len(), 2);
        assert!(survivors.iter().any(|device| device.id == seeded[0]));
    }
}
