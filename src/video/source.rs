//! Track source feeding outbound video

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::broadcaster::{VideoBroadcaster, VideoSinkInterface, VideoSinkWants};
use super::buffer::VideoFrameBuffer;
use super::format::VideoRotation;
use super::frame::VideoFrame;

/// Subscribable side of a track source
///
/// The engine's encoder pipeline attaches through this interface without the
/// boundary's involvement.
pub trait VideoTrackSource: Send + Sync {
    fn add_or_update_sink(&self, sink: Arc<dyn VideoSinkInterface>, wants: VideoSinkWants);

    fn remove_sink(&self, sink: &dyn VideoSinkInterface) -> bool;
}

/// Track source backed by a broadcast distribution point
///
/// Frames pushed in are delivered synchronously to every current subscriber on
/// the pushing thread.
#[derive(Default)]
pub struct VideoSource {
    broadcaster: VideoBroadcaster,
    frames_pushed: AtomicU64,
}

impl VideoSource {
    pub fn new() -> Arc<Self> {
        info!("Video source created");
        Arc::new(Self::default())
    }

    /// Distribute a boundary-provided buffer
    ///
    /// The caller keeps its reference: the frame holds a second one for the
    /// duration of delivery and any sink that wants the pixels longer clones
    /// the `Arc`.
    pub fn push_frame(&self, buffer: &Arc<VideoFrameBuffer>) {
        let frame = VideoFrame::new(buffer.clone(), VideoRotation::None);
        self.frames_pushed.fetch_add(1, Ordering::Relaxed);
        self.broadcaster.on_frame(&frame);
    }

    /// Distribute a frame produced by the engine, rotation included
    pub fn deliver_frame(&self, frame: VideoFrame) {
        self.frames_pushed.fetch_add(1, Ordering::Relaxed);
        self.broadcaster.on_frame(&frame);
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed.load(Ordering::Relaxed)
    }

    pub fn sink_count(&self) -> usize {
        self.broadcaster.sink_count()
    }

    pub fn wants_of(&self, sink: &dyn VideoSinkInterface) -> Option<VideoSinkWants> {
        self.broadcaster.wants_of(sink)
    }

    /// Detach every subscriber
    pub fn remove_all_sinks(&self) -> usize {
        let removed = self.broadcaster.remove_all();
        debug!("Removed {} sinks from video source", removed);
        removed
    }
}

impl VideoTrackSource for VideoSource {
    fn add_or_update_sink(&self, sink: Arc<dyn VideoSinkInterface>, wants: VideoSinkWants) {
        self.broadcaster.add_or_update_sink(sink, wants);
    }

    fn remove_sink(&self, sink: &dyn VideoSinkInterface) -> bool {
        self.broadcaster.remove_sink(sink)
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        debug!(
            "Video source dropped after {} frames",
            self.frames_pushed.load(Ordering::Relaxed)
        );
    }
}
