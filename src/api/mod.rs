pub mod client;
pub mod envelope;
pub mod events;
pub mod models;
pub mod resources;
