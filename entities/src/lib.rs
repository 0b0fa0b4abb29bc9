pub mod appointments;
pub mod devices;
pub mod notifications;
pub mod patients;
