pub mod configuration;
pub mod http_client;
mod ids;
pub mod tracing;
