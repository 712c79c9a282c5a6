//! rtc-bridge - frame and event bridge for a native real-time media engine
//!
//! This crate sits between a WebRTC-style engine and a control plane living
//! on the far side of a C boundary. It moves decoded video frames out to
//! boundary sinks, accepts frames pushed in as RGBA, and relays connection
//! events (ICE, media attachment, data channels, RTP, frame encryption) to a
//! flat callback table.

pub mod config;
pub mod error;
pub mod events;
pub mod ffi;
pub mod logging;
pub mod media;
pub mod observer;
pub mod ptr;
pub mod utils;
pub mod video;

pub use error::{BridgeError, Result};
