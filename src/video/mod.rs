//! Video frame bridge
//!
//! Frame buffers, RGBA/I420 conversion, and the sink/source pair that moves
//! frames between the engine's video pipeline and the boundary.

pub mod broadcaster;
pub mod buffer;
pub mod convert;
pub mod format;
pub mod frame;
pub mod sink;
pub mod source;

pub use broadcaster::{VideoBroadcaster, VideoSinkInterface, VideoSinkWants};
pub use buffer::{PlaneView, VideoFrameBuffer};
pub use format::{PixelLayout, Resolution, VideoRotation};
pub use frame::{VideoFrame, VideoFrameMetadata};
pub use sink::{FlatVideoSinkCallbacks, VideoSink, VideoSinkCallbackTable, VideoSinkCallbacks};
pub use source::{VideoSource, VideoTrackSource};
