pub mod admin;
pub mod broadcast;
pub mod config;
pub mod constants;
pub mod engine;
pub mod events;
pub mod geometry;
pub mod metrics;
pub mod protocol;
pub mod rate_limit;
pub mod rng;
pub mod room_manager;
pub mod session;
pub mod state;
pub mod types;
