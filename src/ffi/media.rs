//! Track, sink, source and frame buffer exports

use std::slice;
use std::sync::Arc;

use libc::c_void;
use tracing::{debug, error};

use super::{or_log, required};
use crate::config;
use crate::error::{BridgeError, Result};
use crate::media::{
    track_id_as_u32, AudioTrack, ContentHint, DataChannel, MediaStream, MediaStreamTrack,
    VideoTrack,
};
use crate::ptr::{Borrowed, BorrowedRc, Context, OwnedRc};
use crate::video::convert::{copy_and_rotate, i420_from_rgba_with_limit, write_rgba};
use crate::video::{
    FlatVideoSinkCallbacks, PixelLayout, Resolution, VideoFrameBuffer, VideoRotation, VideoSink,
    VideoSinkCallbackTable, VideoSource,
};

/// # Safety
///
/// `track` must be null or a live audio track.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_get_audio_track_id_as_u32(
    track: BorrowedRc<AudioTrack>,
) -> u32 {
    or_log("rtc_bridge_get_audio_track_id_as_u32", required(track, "track"))
        .map(|track| track_id_as_u32(track))
        .unwrap_or(0)
}

/// # Safety
///
/// `track` must be null or a live video track.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_get_video_track_id_as_u32(
    track: BorrowedRc<VideoTrack>,
) -> u32 {
    or_log("rtc_bridge_get_video_track_id_as_u32", required(track, "track"))
        .map(|track| track_id_as_u32(track))
        .unwrap_or(0)
}

/// # Safety
///
/// `track` must be null or a live audio track.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_set_audio_track_enabled(
    track: BorrowedRc<AudioTrack>,
    enabled: bool,
) {
    if let Some(track) = or_log("rtc_bridge_set_audio_track_enabled", required(track, "track")) {
        track.set_enabled(enabled);
    }
}

/// Disabling a video track turns its frames black for every sink
///
/// # Safety
///
/// `track` must be null or a live video track.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_set_video_track_enabled(
    track: BorrowedRc<VideoTrack>,
    enabled: bool,
) {
    if let Some(track) = or_log("rtc_bridge_set_video_track_enabled", required(track, "track")) {
        track.set_enabled(enabled);
    }
}

/// # Safety
///
/// `track` must be null or a live video track.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_set_video_track_content_hint(
    track: BorrowedRc<VideoTrack>,
    is_text: bool,
) {
    let track = required(track, "track");
    if let Some(track) = or_log("rtc_bridge_set_video_track_content_hint", track) {
        track.set_content_hint(ContentHint::from(is_text));
    }
}

/// Returns an owned reference to the stream's first video track, or null
///
/// # Safety
///
/// `stream` must be null or a live media stream.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_get_first_video_track(
    stream: BorrowedRc<MediaStream>,
) -> OwnedRc<VideoTrack> {
    or_log("rtc_bridge_get_first_video_track", required(stream, "stream"))
        .and_then(|stream| stream.first_video_track())
        .map(OwnedRc::from_arc)
        .unwrap_or_else(OwnedRc::null)
}

/// Attach a sink to `track`
///
/// The returned handle keeps the sink attached until it is passed to
/// [`rtc_bridge_remove_video_sink`]. Frames arrive on engine threads through
/// `callbacks.on_video_frame` with `context` as the first argument.
///
/// # Safety
///
/// `track` must be null or a live video track, `callbacks` must be null or
/// point to a valid table for the call, and `context` must stay valid until
/// the sink is removed.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_add_video_sink(
    track: BorrowedRc<VideoTrack>,
    context: *mut c_void,
    callbacks: Borrowed<VideoSinkCallbackTable>,
) -> OwnedRc<VideoSink> {
    let attach = || -> Result<Arc<VideoSink>> {
        let track = track.to_arc().ok_or(BridgeError::NullPointer("track"))?;
        let table = *callbacks
            .as_ref()
            .ok_or(BridgeError::NullPointer("callbacks"))?;
        let callbacks = FlatVideoSinkCallbacks::new(Context::new(context), table);
        Ok(VideoSink::attach(&track, Box::new(callbacks)))
    };
    or_log("rtc_bridge_add_video_sink", attach())
        .map(OwnedRc::from_arc)
        .unwrap_or_else(OwnedRc::null)
}

/// Detach the sink and release the handle
///
/// No frame is delivered to the sink's callbacks after this returns, except
/// one already in flight on another thread.
///
/// # Safety
///
/// `sink` must be null or a handle returned by [`rtc_bridge_add_video_sink`]
/// that has not been removed yet.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_remove_video_sink(sink: OwnedRc<VideoSink>) {
    let Some(sink) = sink.into_arc() else {
        error!("rtc_bridge_remove_video_sink failed: {}", BridgeError::NullPointer("sink"));
        return;
    };
    sink.detach();
}

/// # Safety
///
/// Always safe to call; the returned reference must be released with
/// [`rtc_bridge_release_video_source`].
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_create_video_source() -> OwnedRc<VideoSource> {
    OwnedRc::from_arc(VideoSource::new())
}

/// Deliver one frame to every sink of `source`
///
/// The caller keeps its own reference to `buffer`.
///
/// # Safety
///
/// `source` and `buffer` must each be null or live objects.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_push_video_frame(
    source: BorrowedRc<VideoSource>,
    buffer: BorrowedRc<VideoFrameBuffer>,
) {
    let push = || -> Result<()> {
        let source = required(source, "source")?;
        let buffer = buffer.to_arc().ok_or(BridgeError::NullPointer("buffer"))?;
        source.push_frame(&buffer);
        Ok(())
    };
    or_log("rtc_bridge_push_video_frame", push());
}

/// Create an I420 buffer from `width * height * 4` bytes of packed RGBA
///
/// Returns null for a null input, zero dimensions, or dimensions above the
/// configured maximum.
///
/// # Safety
///
/// `rgba` must be null or point to at least `width * height * 4` readable
/// bytes for the call.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_create_video_frame_buffer_from_rgba(
    width: u32,
    height: u32,
    rgba: Borrowed<u8>,
) -> OwnedRc<VideoFrameBuffer> {
    let create = || -> Result<VideoFrameBuffer> {
        if rgba.is_null() {
            return Err(BridgeError::NullPointer("rgba"));
        }
        let resolution = Resolution::new(width, height);
        let max = config::global().get().video.max_frame_dimension;
        // Geometry is checked before the length is trusted to build a slice.
        resolution.validate(max)?;
        let len = PixelLayout::Rgba.frame_size(resolution);
        let rgba = slice::from_raw_parts(rgba.as_ptr(), len);
        i420_from_rgba_with_limit(resolution, rgba, max)
    };
    or_log("rtc_bridge_create_video_frame_buffer_from_rgba", create())
        .map(|buffer| OwnedRc::from_arc(Arc::new(buffer)))
        .unwrap_or_else(OwnedRc::null)
}

/// Write `buffer` as packed RGBA into `rgba_out`
///
/// # Safety
///
/// `buffer` must be null or a live buffer, and `rgba_out` must be null or
/// point to `width * height * 4` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_convert_video_frame_buffer_to_rgba(
    buffer: BorrowedRc<VideoFrameBuffer>,
    rgba_out: *mut u8,
) {
    let convert = || -> Result<()> {
        let buffer = required(buffer, "buffer")?;
        if rgba_out.is_null() {
            return Err(BridgeError::NullPointer("rgba_out"));
        }
        let len = PixelLayout::Rgba.frame_size(buffer.resolution());
        write_rgba(buffer, slice::from_raw_parts_mut(rgba_out, len))
    };
    or_log("rtc_bridge_convert_video_frame_buffer_to_rgba", convert());
}

/// Copy `buffer` rotated clockwise by `rotation` degrees
///
/// Returns null when `rotation` is not 0, 90, 180 or 270.
///
/// # Safety
///
/// `buffer` must be null or a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_copy_and_rotate_video_frame_buffer(
    buffer: BorrowedRc<VideoFrameBuffer>,
    rotation: i32,
) -> OwnedRc<VideoFrameBuffer> {
    let rotate = || -> Result<VideoFrameBuffer> {
        let buffer = required(buffer, "buffer")?;
        copy_and_rotate(buffer, VideoRotation::from_degrees(rotation)?)
    };
    or_log("rtc_bridge_copy_and_rotate_video_frame_buffer", rotate())
        .map(|buffer| OwnedRc::from_arc(Arc::new(buffer)))
        .unwrap_or_else(OwnedRc::null)
}

macro_rules! release_fn {
    ($name:ident, $ty:ty) => {
        /// Release one owned reference; null is ignored
        ///
        /// # Safety
        ///
        /// The reference must not be used or released again.
        #[no_mangle]
        pub unsafe extern "C" fn $name(value: OwnedRc<$ty>) {
            if !value.is_null() {
                debug!("{}: {:?}", stringify!($name), value);
            }
            drop(value);
        }
    };
}

release_fn!(rtc_bridge_release_video_frame_buffer, VideoFrameBuffer);
release_fn!(rtc_bridge_release_media_stream, MediaStream);
release_fn!(rtc_bridge_release_audio_track, AudioTrack);
release_fn!(rtc_bridge_release_video_track, VideoTrack);
release_fn!(rtc_bridge_release_data_channel, DataChannel);
release_fn!(rtc_bridge_release_video_source, VideoSource);
