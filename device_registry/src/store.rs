use async_trait::async_trait;
use entities::devices::{Device, DeviceId, NewDevice};
use entities::patients::PatientId;

/// Storage capability the registry depends on. Implementations must scope
/// each registration to one transaction so that concurrent registrations
/// for the same patient serialize.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Opens a registration scope over one patient's devices, holding an
    /// exclusive per-patient lock until the scope commits or is dropped.
    /// A second registration for the same patient must block here, not
    /// merely on the rows it reads, or an overlapping insert could push
    /// the patient past the cap. Dropping the returned scope without
    /// committing rolls every step back.
    async fn begin_registration(
        &self,
        patient_id: PatientId,
    ) -> anyhow::Result<Box<dyn DeviceRegistration>>;

    /// Idempotent: deleting an id that no longer exists is success.
    async fn delete_device(&self, device_id: DeviceId) -> anyhow::Result<()>;
}

/// The multi-step write of a single registration. All methods operate
/// inside the same transaction.
#[async_trait]
pub trait DeviceRegistration: Send {
    /// The patient's devices ordered by registration time ascending, locked
    /// for the remainder of the scope. Eviction always targets element `[0]`
    /// of this list.
    async fn devices(&mut self) -> anyhow::Result<Vec<Device>>;

    async fn evict(&mut self, device_id: DeviceId) -> anyhow::Result<()>;

    async fn insert(&mut self, device: NewDevice) -> anyhow::Result<DeviceId>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}
