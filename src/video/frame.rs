//! Video frame wrapper and boundary metadata

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use super::buffer::VideoFrameBuffer;
use super::format::{Resolution, VideoRotation};

/// A frame travelling through the pipeline
///
/// Cloning is cheap: the pixel buffer is shared, only the reference count
/// changes.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    buffer: Arc<VideoFrameBuffer>,
    rotation: VideoRotation,
    /// Monotonic capture time in microseconds
    timestamp_us: i64,
}

impl VideoFrame {
    /// Wrap a buffer, stamping it with the current monotonic time
    pub fn new(buffer: Arc<VideoFrameBuffer>, rotation: VideoRotation) -> Self {
        Self::with_timestamp(buffer, rotation, monotonic_us())
    }

    pub fn with_timestamp(
        buffer: Arc<VideoFrameBuffer>,
        rotation: VideoRotation,
        timestamp_us: i64,
    ) -> Self {
        Self {
            buffer,
            rotation,
            timestamp_us,
        }
    }

    pub fn buffer(&self) -> &Arc<VideoFrameBuffer> {
        &self.buffer
    }

    pub fn rotation(&self) -> VideoRotation {
        self.rotation
    }

    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn resolution(&self) -> Resolution {
        self.buffer.resolution()
    }

    /// Same timestamp, different pixels
    pub fn with_buffer(&self, buffer: Arc<VideoFrameBuffer>, rotation: VideoRotation) -> Self {
        Self::with_timestamp(buffer, rotation, self.timestamp_us)
    }

    /// Metadata handed to the boundary alongside the buffer
    pub fn metadata(&self) -> VideoFrameMetadata {
        VideoFrameMetadata {
            width: self.width(),
            height: self.height(),
            rotation: self.rotation,
        }
    }
}

/// Plain-value frame description passed across the boundary
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoFrameMetadata {
    pub width: u32,
    pub height: u32,
    pub rotation: VideoRotation,
}

/// Microseconds since the first call in this process
pub fn monotonic_us() -> i64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    i64::try_from(epoch.elapsed().as_micros()).unwrap_or(i64::MAX)
}
