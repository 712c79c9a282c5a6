//! Bridge configuration
//!
//! The schema is plain `serde` data; the store keeps the active copy behind an
//! `ArcSwap` so engine threads can read it without taking a lock.

mod schema;
mod store;

pub use schema::{BridgeConfig, LogConfig, LogLevel, VideoConfig};
pub use store::{global, ConfigStore};
