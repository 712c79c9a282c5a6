//! Frame distribution point
//!
//! `VideoBroadcaster` fans one produced frame out to every attached sink. The
//! subscriber set is guarded by a mutex that is held only while the set is
//! mutated or snapshotted; frames are delivered from the snapshot with the lock
//! released, so a sink may attach or detach sinks from inside its own
//! `on_frame` without deadlocking.
//!
//! A removed sink is flagged inactive before it leaves the set. A delivery that
//! took its snapshot before the removal skips inactive entries, which narrows
//! the remaining race to a removal that lands while that very sink's callback
//! is being entered.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::buffer::VideoFrameBuffer;
use super::convert;
use super::format::{Resolution, VideoRotation};
use super::frame::VideoFrame;

/// Receiver of video frames
///
/// `on_frame` runs on the producer's thread and must return quickly.
pub trait VideoSinkInterface: Send + Sync {
    fn on_frame(&self, frame: &VideoFrame);
}

/// What a sink asks of its source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoSinkWants {
    /// Deliver upright pixels with rotation reset to 0°
    pub rotation_applied: bool,
    /// Replace every frame with black pixels of the same geometry
    pub black_frames: bool,
}

/// Address identifying a sink, independent of the vtable
pub(crate) fn sink_addr(sink: &dyn VideoSinkInterface) -> *const () {
    sink as *const dyn VideoSinkInterface as *const ()
}

struct SinkEntry {
    sink: Arc<dyn VideoSinkInterface>,
    wants: VideoSinkWants,
    active: Arc<AtomicBool>,
}

impl SinkEntry {
    fn snapshot(&self) -> SinkEntry {
        SinkEntry {
            sink: self.sink.clone(),
            wants: self.wants,
            active: self.active.clone(),
        }
    }
}

/// Lock-protected subscriber set with snapshot delivery
#[derive(Default)]
pub struct VideoBroadcaster {
    sinks: Mutex<Vec<SinkEntry>>,
    frames_delivered: AtomicU64,
}

impl VideoBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `sink`, or update its wants if it is already attached
    pub fn add_or_update_sink(&self, sink: Arc<dyn VideoSinkInterface>, wants: VideoSinkWants) {
        let addr = sink_addr(sink.as_ref());
        let mut sinks = self.sinks.lock();
        if let Some(entry) = sinks.iter_mut().find(|e| sink_addr(e.sink.as_ref()) == addr) {
            entry.wants = wants;
            debug!("Updated sink wants: {:?}", wants);
            return;
        }
        sinks.push(SinkEntry {
            sink,
            wants,
            active: Arc::new(AtomicBool::new(true)),
        });
        debug!("Sink attached ({} total)", sinks.len());
    }

    /// Detach `sink`; returns false if it was not attached
    pub fn remove_sink(&self, sink: &dyn VideoSinkInterface) -> bool {
        let addr = sink_addr(sink);
        let mut sinks = self.sinks.lock();
        match sinks.iter().position(|e| sink_addr(e.sink.as_ref()) == addr) {
            Some(index) => {
                let entry = sinks.remove(index);
                entry.active.store(false, Ordering::Release);
                debug!("Sink detached ({} remaining)", sinks.len());
                true
            }
            None => false,
        }
    }

    /// Detach every sink, returning how many were attached
    pub fn remove_all(&self) -> usize {
        let removed: Vec<SinkEntry> = self.sinks.lock().drain(..).collect();
        for entry in &removed {
            entry.active.store(false, Ordering::Release);
        }
        removed.len()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Wants currently registered for `sink`
    pub fn wants_of(&self, sink: &dyn VideoSinkInterface) -> Option<VideoSinkWants> {
        let addr = sink_addr(sink);
        self.sinks
            .lock()
            .iter()
            .find(|e| sink_addr(e.sink.as_ref()) == addr)
            .map(|e| e.wants)
    }

    /// Total frames handed to sinks
    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered.load(Ordering::Relaxed)
    }

    /// Deliver `frame` to every attached sink, synchronously and in attach order
    pub fn on_frame(&self, frame: &VideoFrame) {
        let snapshot: Vec<SinkEntry> = self.sinks.lock().iter().map(SinkEntry::snapshot).collect();
        if snapshot.is_empty() {
            return;
        }

        let mut variants = FrameVariants::new(frame);
        for entry in snapshot {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            let Some(delivered) = variants.get(entry.wants) else {
                continue;
            };
            entry.sink.on_frame(delivered);
            self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Lazily built per-delivery copies, computed at most once each
struct FrameVariants<'a> {
    original: &'a VideoFrame,
    upright: Option<VideoFrame>,
    // Inner `None` records a black frame that could not be built.
    black: Option<Option<VideoFrame>>,
    black_upright: Option<Option<VideoFrame>>,
}

impl<'a> FrameVariants<'a> {
    fn new(original: &'a VideoFrame) -> Self {
        Self {
            original,
            upright: None,
            black: None,
            black_upright: None,
        }
    }

    /// Frame matching `wants`; `None` drops the frame for that sink
    fn get(&mut self, wants: VideoSinkWants) -> Option<&VideoFrame> {
        let original = self.original;
        let needs_rotation = wants.rotation_applied && original.rotation() != VideoRotation::None;

        match (wants.black_frames, needs_rotation) {
            (false, false) => Some(original),
            (false, true) => Some(&*self.upright.get_or_insert_with(|| upright(original))),
            (true, false) => self
                .black
                .get_or_insert_with(|| black(original, original.resolution(), original.rotation()))
                .as_ref(),
            (true, true) => self
                .black_upright
                .get_or_insert_with(|| {
                    let geometry = original.resolution().rotated(original.rotation());
                    black(original, geometry, VideoRotation::None)
                })
                .as_ref(),
        }
    }
}

fn upright(frame: &VideoFrame) -> VideoFrame {
    match convert::copy_and_rotate(frame.buffer(), frame.rotation()) {
        Ok(buffer) => frame.with_buffer(Arc::new(buffer), VideoRotation::None),
        Err(e) => {
            warn!("Failed to rotate frame for delivery: {}", e);
            frame.clone()
        }
    }
}

// Real pixels must never reach a sink that asked for black, so failure drops.
fn black(frame: &VideoFrame, geometry: Resolution, rotation: VideoRotation) -> Option<VideoFrame> {
    match VideoFrameBuffer::black_i420(geometry) {
        Ok(buffer) => Some(frame.with_buffer(Arc::new(buffer), rotation)),
        Err(e) => {
            warn!("Failed to build black frame, dropping it: {}", e);
            None
        }
    }
}
