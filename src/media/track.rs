//! Audio and video tracks

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::video::broadcaster::{sink_addr, VideoSinkInterface, VideoSinkWants};
use crate::video::source::{VideoSource, VideoTrackSource};

/// Track media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Common track surface
pub trait MediaStreamTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    fn enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);
}

/// Numeric form of a track id; 0 when the id is not a `u32`
pub fn track_id_as_u32(track: &dyn MediaStreamTrack) -> u32 {
    track.id().parse().unwrap_or(0)
}

/// Encoder hint for video content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHint {
    #[default]
    None,
    /// Favour sharpness over frame rate (screen share, slides)
    Text,
}

impl From<bool> for ContentHint {
    fn from(text: bool) -> Self {
        if text {
            ContentHint::Text
        } else {
            ContentHint::None
        }
    }
}

pub struct AudioTrack {
    id: String,
    enabled: AtomicBool,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            enabled: AtomicBool::new(true),
        })
    }
}

impl MediaStreamTrack for AudioTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        debug!("Audio track {} enabled={}", self.id, enabled);
    }
}

impl fmt::Debug for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTrack")
            .field("id", &self.id)
            .field("enabled", &self.enabled())
            .finish()
    }
}

struct TrackSink {
    sink: Arc<dyn VideoSinkInterface>,
    /// What the sink asked for, before the track's own overrides
    requested: VideoSinkWants,
}

/// Video track bound to a [`VideoSource`]
///
/// While disabled, every sink registered through the track receives black
/// frames of the delivered geometry.
pub struct VideoTrack {
    id: String,
    enabled: AtomicBool,
    content_hint: RwLock<ContentHint>,
    source: Arc<VideoSource>,
    sinks: Mutex<Vec<TrackSink>>,
}

impl VideoTrack {
    pub fn new(id: impl Into<String>, source: Arc<VideoSource>) -> Arc<Self> {
        let track = Arc::new(Self {
            id: id.into(),
            enabled: AtomicBool::new(true),
            content_hint: RwLock::new(ContentHint::None),
            source,
            sinks: Mutex::new(Vec::new()),
        });
        info!("Video track {} created", track.id);
        track
    }

    pub fn source(&self) -> &Arc<VideoSource> {
        &self.source
    }

    pub fn content_hint(&self) -> ContentHint {
        *self.content_hint.read()
    }

    pub fn set_content_hint(&self, hint: ContentHint) {
        *self.content_hint.write() = hint;
        debug!("Video track {} content hint {:?}", self.id, hint);
    }

    /// Register `sink` on the source, or update its wants
    pub fn add_or_update_sink(&self, sink: Arc<dyn VideoSinkInterface>, wants: VideoSinkWants) {
        let addr = sink_addr(sink.as_ref());
        let mut sinks = self.sinks.lock();
        match sinks.iter_mut().find(|s| sink_addr(s.sink.as_ref()) == addr) {
            Some(existing) => existing.requested = wants,
            None => sinks.push(TrackSink {
                sink: sink.clone(),
                requested: wants,
            }),
        }
        self.source.add_or_update_sink(sink, self.effective(wants));
    }

    /// Unregister `sink`; false if it was not registered through this track
    pub fn remove_sink(&self, sink: &dyn VideoSinkInterface) -> bool {
        let addr = sink_addr(sink);
        let mut sinks = self.sinks.lock();
        let Some(index) = sinks.iter().position(|s| sink_addr(s.sink.as_ref()) == addr) else {
            return false;
        };
        let entry = sinks.remove(index);
        self.source.remove_sink(entry.sink.as_ref());
        true
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Track teardown: detach every sink registered through this track
    pub fn stop(&self) -> usize {
        let removed: Vec<TrackSink> = self.sinks.lock().drain(..).collect();
        for entry in &removed {
            self.source.remove_sink(entry.sink.as_ref());
        }
        if !removed.is_empty() {
            info!("Video track {} stopped, {} sinks detached", self.id, removed.len());
        }
        removed.len()
    }

    fn effective(&self, requested: VideoSinkWants) -> VideoSinkWants {
        VideoSinkWants {
            black_frames: requested.black_frames || !self.enabled(),
            ..requested
        }
    }
}

impl MediaStreamTrack for VideoTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        // Hold the sink list so a concurrent add sees either the old or new state
        let sinks = self.sinks.lock();
        if self.enabled.swap(enabled, Ordering::AcqRel) == enabled {
            return;
        }
        for entry in sinks.iter() {
            self.source
                .add_or_update_sink(entry.sink.clone(), self.effective(entry.requested));
        }
        debug!("Video track {} enabled={}", self.id, enabled);
    }
}

impl fmt::Debug for VideoTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoTrack")
            .field("id", &self.id)
            .field("enabled", &self.enabled())
            .field("content_hint", &self.content_hint())
            .field("sinks", &self.sink_count())
            .finish()
    }
}
