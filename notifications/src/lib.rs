pub mod background;
pub mod config;
pub mod delivery;
pub mod dispatcher;
mod render;
pub mod store;
