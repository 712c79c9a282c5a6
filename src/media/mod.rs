//! Engine media objects as seen through the bridge
//!
//! Tracks, streams, and data channels are shared as `Arc`s; the boundary holds
//! them through the ownership-tagged pointers in [`crate::ptr`].

pub mod data_channel;
pub mod stream;
pub mod track;

pub use data_channel::{DataChannel, DataChannelObserver, DataChannelState};
pub use stream::MediaStream;
pub use track::{
    track_id_as_u32, AudioTrack, ContentHint, MediaStreamTrack, TrackKind, VideoTrack,
};
