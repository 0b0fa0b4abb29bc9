use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use device_registry::store::{DeviceRegistration, DeviceStore};
use entities::devices::{Device, DeviceId, NewDevice};
use entities::notifications::PushToken;
use entities::patients::PatientId;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repository::Repository;

#[derive(sqlx::FromRow)]
pub(crate) struct DeviceRecord {
    id: Uuid,
    patient_id: Uuid,
    name: String,
    push_token: String,
    logged_in_at: DateTime<Utc>,
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        Device {
            id: record.id.into(),
            patient_id: record.patient_id.into(),
            name: record.name,
            push_token: PushToken::from(record.push_token),
            logged_in_at: record.logged_in_at,
        }
    }
}

struct PgDeviceRegistration {
    patient_id: PatientId,
    transaction: Transaction<'static, Postgres>,
}

#[async_trait]
impl DeviceStore for Repository {
    async fn begin_registration(
        &self,
        patient_id: PatientId,
    ) -> anyhow::Result<Box<dyn DeviceRegistration>> {
        let mut transaction = self
            .pool()
            .begin()
            .await
            .context("Failed to begin device registration transaction")?;

        // Row locks on the existing devices cannot stop a concurrent INSERT
        // for the same patient, so an overlapping registration could slip a
        // row past the cap check. A transaction-scoped advisory lock keyed
        // on the patient id serializes registrations even when the patient
        // has no device rows yet; it releases on commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(patient_id.inner().to_string())
            .execute(&mut *transaction)
            .await
            .context("Failed to lock the patient's device list")?;

        Ok(Box::new(PgDeviceRegistration {
            patient_id,
            transaction,
        }))
    }

    async fn delete_device(&self, device_id: DeviceId) -> anyhow::Result<()> {
        // Zero rows affected means the device is already gone, which is fine.
        sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(device_id.inner())
            .execute(self.pool())
            .await
            .context("Failed to delete device")?;
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistration for PgDeviceRegistration {
    async fn devices(&mut self) -> anyhow::Result<Vec<Device>> {
        // The advisory lock taken in begin_registration already serializes
        // registrations; the explicit ordering is what makes eviction target
        // the oldest device rather than whatever the storage happens to
        // return.
        let records = sqlx::query_as::<_, DeviceRecord>(
            "
            SELECT id, patient_id, name, push_token, logged_in_at
            FROM devices
            WHERE patient_id = $1
            ORDER BY logged_in_at ASC
            ",
        )
        .bind(self.patient_id.inner())
        .fetch_all(&mut *self.transaction)
        .await
        .context("Failed to fetch the patient's devices")?;

        Ok(records.into_iter().map(Device::from).collect())
    }

    async fn evict(&mut self, device_id: DeviceId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(device_id.inner())
            .execute(&mut *self.transaction)
            .await
            .context("Failed to evict the oldest device")?;
        Ok(())
    }

    async fn insert(&mut self, device: NewDevice) -> anyhow::Result<DeviceId> {
        let device_id = DeviceId::new();
        sqlx::query(
            "
            INSERT INTO devices (id, patient_id, name, push_token, logged_in_at)
            VALUES ($1, $2, $3, $4, now())
            ",
        )
        .bind(device_id.inner())
        .bind(device.patient_id.inner())
        .bind(device.name)
        .bind(device.push_token.as_str().to_string())
        .execute(&mut *self.transaction)
        .await
        .context("Failed to insert the new device")?;

        Ok(device_id)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.transaction
            .commit()
            .await
            .context("Failed to commit device registration")
    }
}
