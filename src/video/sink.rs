//! Boundary-facing video sink
//!
//! A `VideoSink` is attached to exactly one video track. For every frame the
//! track delivers it extracts a [`VideoFrameMetadata`] and hands the callback
//! one **owned** reference to the frame's buffer. The callee releases that
//! reference when it is done, either by dropping the `OwnedRc` or, on the far
//! side of the boundary, through `rtc_bridge_release_video_frame_buffer`.
//!
//! The sink keeps its track alive and the track's source holds the sink while
//! it is attached. That cycle is broken by [`VideoSink::detach`] or by stopping
//! the track.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use libc::c_void;
use tracing::info;

use super::broadcaster::{VideoSinkInterface, VideoSinkWants};
use super::buffer::VideoFrameBuffer;
use super::frame::{VideoFrame, VideoFrameMetadata};
use crate::media::{MediaStreamTrack, VideoTrack};
use crate::ptr::{Context, OwnedRc};

/// Receiver of frames leaving the engine
///
/// Called on the engine's video pipeline thread; blocking here stalls every
/// track that shares it.
pub trait VideoSinkCallbacks: Send + Sync {
    fn on_video_frame(&self, metadata: VideoFrameMetadata, buffer: OwnedRc<VideoFrameBuffer>);
}

impl<F> VideoSinkCallbacks for F
where
    F: Fn(VideoFrameMetadata, OwnedRc<VideoFrameBuffer>) + Send + Sync,
{
    fn on_video_frame(&self, metadata: VideoFrameMetadata, buffer: OwnedRc<VideoFrameBuffer>) {
        self(metadata, buffer)
    }
}

/// Flat callback table supplied across the boundary
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VideoSinkCallbackTable {
    pub on_video_frame: extern "C" fn(
        context: *mut c_void,
        metadata: VideoFrameMetadata,
        buffer_owned_rc: OwnedRc<VideoFrameBuffer>,
    ),
}

/// Adapts a flat table and its context to [`VideoSinkCallbacks`]
pub struct FlatVideoSinkCallbacks {
    context: Context,
    table: VideoSinkCallbackTable,
}

impl FlatVideoSinkCallbacks {
    pub fn new(context: Context, table: VideoSinkCallbackTable) -> Self {
        Self { context, table }
    }
}

impl VideoSinkCallbacks for FlatVideoSinkCallbacks {
    fn on_video_frame(&self, metadata: VideoFrameMetadata, buffer: OwnedRc<VideoFrameBuffer>) {
        (self.table.on_video_frame)(self.context.as_ptr(), metadata, buffer);
    }
}

/// Sink relaying one track's frames to a callback
pub struct VideoSink {
    track: Arc<VideoTrack>,
    callbacks: Box<dyn VideoSinkCallbacks>,
    frames_relayed: AtomicU64,
}

impl VideoSink {
    /// Create a sink and register it on `track`
    pub fn attach(track: &Arc<VideoTrack>, callbacks: Box<dyn VideoSinkCallbacks>) -> Arc<Self> {
        let sink = Arc::new(Self {
            track: track.clone(),
            callbacks,
            frames_relayed: AtomicU64::new(0),
        });
        track.add_or_update_sink(sink.clone(), VideoSinkWants::default());
        info!("Video sink attached to track {}", track.id());
        sink
    }

    /// Unregister from the track; returns false if already detached
    pub fn detach(&self) -> bool {
        let removed = self.track.remove_sink(self);
        if removed {
            info!("Video sink detached from track {}", self.track.id());
        }
        removed
    }

    pub fn track(&self) -> &Arc<VideoTrack> {
        &self.track
    }

    pub fn frames_relayed(&self) -> u64 {
        self.frames_relayed.load(Ordering::Relaxed)
    }
}

impl VideoSinkInterface for VideoSink {
    fn on_frame(&self, frame: &VideoFrame) {
        let metadata = frame.metadata();
        let buffer = OwnedRc::from_arc(frame.buffer().clone());
        self.callbacks.on_video_frame(metadata, buffer);
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::format::{Resolution, VideoRotation};
    use crate::video::source::VideoSource;
    use parking_lot::Mutex;
    use std::sync::Weak;

    fn track() -> Arc<VideoTrack> {
        VideoTrack::new("1", VideoSource::new())
    }

    fn buffer(width: u32, height: u32) -> Arc<VideoFrameBuffer> {
        Arc::new(VideoFrameBuffer::black_i420(Resolution::new(width, height)).unwrap())
    }

    #[test]
    fn test_frame_order_and_metadata() {
        let track = track();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let sink = VideoSink::attach(
            &track,
            Box::new(move |meta: VideoFrameMetadata, _buffer: OwnedRc<VideoFrameBuffer>| {
                recorded.lock().push((meta.width, meta.height));
            }),
        );

        for (w, h) in [(16, 16), (16, 16), (32, 16)] {
            track.source().push_frame(&buffer(w, h));
        }

        assert_eq!(*seen.lock(), vec![(16, 16), (16, 16), (32, 16)]);
        assert_eq!(sink.frames_relayed(), 3);
        assert!(sink.detach());
    }

    #[test]
    fn test_ordering_many_frames() {
        let track = track();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let sink = VideoSink::attach(
            &track,
            Box::new(move |meta: VideoFrameMetadata, _buffer: OwnedRc<VideoFrameBuffer>| {
                recorded.lock().push(meta.width);
            }),
        );

        for width in 1..=50 {
            track.source().push_frame(&buffer(width, 2));
        }

        assert_eq!(*seen.lock(), (1..=50).collect::<Vec<u32>>());
        sink.detach();
    }

    #[test]
    fn test_callback_owns_one_reference() {
        let track = track();
        let held = Arc::new(Mutex::new(Vec::new()));
        let store = held.clone();
        let sink = VideoSink::attach(
            &track,
            Box::new(move |_meta: VideoFrameMetadata, buffer: OwnedRc<VideoFrameBuffer>| {
                store.lock().push(buffer);
            }),
        );

        let buf = buffer(4, 4);
        track.source().push_frame(&buf);
        assert_eq!(Arc::strong_count(&buf), 2);

        held.lock().clear();
        assert_eq!(Arc::strong_count(&buf), 1);
        sink.detach();
    }

    #[test]
    fn test_concurrent_release_accounting() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 25;

        let track = track();
        let held = Arc::new(Mutex::new(Vec::new()));
        let store = held.clone();
        let sink = VideoSink::attach(
            &track,
            Box::new(move |_meta: VideoFrameMetadata, buffer: OwnedRc<VideoFrameBuffer>| {
                store.lock().push(buffer);
            }),
        );

        let weaks: Vec<Weak<VideoFrameBuffer>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let source = track.source().clone();
                    s.spawn(move || {
                        (0..PER_THREAD)
                            .map(|_| {
                                let buf = buffer(2, 2);
                                source.push_frame(&buf);
                                Arc::downgrade(&buf)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let mut owned: Vec<_> = std::mem::take(&mut *held.lock());
        assert_eq!(owned.len(), THREADS * PER_THREAD);
        assert!(weaks.iter().all(|w| w.strong_count() == 1));

        std::thread::scope(|s| {
            while !owned.is_empty() {
                let batch: Vec<_> = owned.drain(..PER_THREAD.min(owned.len())).collect();
                s.spawn(move || drop(batch));
            }
        });

        assert!(weaks.iter().all(|w| w.upgrade().is_none()));
        sink.detach();
    }

    #[test]
    fn test_flat_table_relay() {
        use std::sync::atomic::AtomicUsize;

        static FRAMES: AtomicUsize = AtomicUsize::new(0);
        static CONTEXT: AtomicUsize = AtomicUsize::new(0);
        static WIDTH: AtomicUsize = AtomicUsize::new(0);

        extern "C" fn on_video_frame(
            context: *mut c_void,
            metadata: VideoFrameMetadata,
            buffer: OwnedRc<VideoFrameBuffer>,
        ) {
            CONTEXT.store(context as usize, Ordering::SeqCst);
            if metadata.rotation == VideoRotation::None && !buffer.is_null() {
                WIDTH.store(metadata.width as usize, Ordering::SeqCst);
            }
            FRAMES.fetch_add(1, Ordering::SeqCst);
        }

        let track = track();
        let callbacks = FlatVideoSinkCallbacks::new(
            Context::new(0x42 as *mut c_void),
            VideoSinkCallbackTable { on_video_frame },
        );
        let sink = VideoSink::attach(&track, Box::new(callbacks));

        let buf = buffer(8, 8);
        track.source().push_frame(&buf);
        assert_eq!(FRAMES.load(Ordering::SeqCst), 1);
        assert_eq!(CONTEXT.load(Ordering::SeqCst), 0x42);
        assert_eq!(WIDTH.load(Ordering::SeqCst), 8);
        assert_eq!(Arc::strong_count(&buf), 1);
        sink.detach();
    }

    #[test]
    fn test_detach_stops_delivery() {
        let track = track();
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let sink = VideoSink::attach(
            &track,
            Box::new(move |_meta: VideoFrameMetadata, _buffer: OwnedRc<VideoFrameBuffer>| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        track.source().push_frame(&buffer(2, 2));
        assert!(sink.detach());
        assert!(!sink.detach());
        track.source().push_frame(&buffer(2, 2));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(Arc::strong_count(&sink), 1);
    }
}
