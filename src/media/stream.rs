use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::track::{AudioTrack, MediaStreamTrack, VideoTrack};

/// Remote media stream: a labelled group of tracks
pub struct MediaStream {
    id: String,
    audio_tracks: RwLock<Vec<Arc<AudioTrack>>>,
    video_tracks: RwLock<Vec<Arc<VideoTrack>>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            audio_tracks: RwLock::new(Vec::new()),
            video_tracks: RwLock::new(Vec::new()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn add_audio_track(&self, track: Arc<AudioTrack>) {
        self.audio_tracks.write().push(track);
    }

    pub fn add_video_track(&self, track: Arc<VideoTrack>) {
        self.video_tracks.write().push(track);
    }

    /// First video track, if the stream has any
    pub fn first_video_track(&self) -> Option<Arc<VideoTrack>> {
        self.video_tracks.read().first().cloned()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("audio_tracks", &self.audio_tracks.read().len())
            .field("video_tracks", &self.video_tracks.read().len())
            .finish()
    }
}
