mod appointments;
pub mod configuration;
mod devices;
pub mod repository;
