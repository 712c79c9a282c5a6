//! Boundary callback interface for connection events
//!
//! [`PeerConnectionObserverCallbacks`] is the safe capability interface the
//! bridge relays into. [`PeerConnectionObserverCallbackTable`] is the flat
//! `#[repr(C)]` table a foreign host supplies instead, and
//! [`FlatPeerConnectionObserverCallbacks`] adapts one to the other.
//!
//! Every method runs synchronously on the engine thread that raised the event
//! and must not block.

use libc::c_void;
use tracing::warn;

use super::types::{
    IceCandidate, IceConnectionState, IpPort, NetworkRoute, RawIceCandidate, RtpHeader,
};
use crate::media::{AudioTrack, DataChannel, MediaStream, VideoTrack};
use crate::ptr::{Borrowed, Context, OwnedRc};

/// Receiver of relayed connection events
///
/// Object-carrying events transfer one owned reference to the callee. The
/// frame encryption methods default to failing closed: a receiver that does
/// not implement them causes every protected frame to be dropped.
pub trait PeerConnectionObserverCallbacks: Send + Sync {
    fn on_ice_candidate(&self, candidate: &IceCandidate);

    fn on_ice_candidates_removed(&self, addresses: &[IpPort]);

    fn on_ice_connection_change(&self, state: IceConnectionState);

    fn on_ice_network_route_change(&self, route: NetworkRoute);

    fn on_add_stream(&self, stream: OwnedRc<MediaStream>);

    fn on_add_audio_rtp_receiver(&self, track: OwnedRc<AudioTrack>);

    fn on_add_video_rtp_receiver(&self, track: OwnedRc<VideoTrack>);

    fn on_signaling_data_channel(&self, channel: OwnedRc<DataChannel>);

    fn on_signaling_data_channel_message(&self, data: &[u8]);

    fn on_rtp_received(&self, header: RtpHeader, payload: &[u8]);

    /// Output size needed to encrypt `plaintext_size` bytes
    fn get_media_ciphertext_buffer_size(&self, _is_audio: bool, _plaintext_size: usize) -> usize {
        0
    }

    /// Encrypt into `ciphertext`, returning the bytes written
    fn encrypt_media(
        &self,
        _is_audio: bool,
        _plaintext: &[u8],
        _ciphertext: &mut [u8],
    ) -> Option<usize> {
        None
    }

    /// Output size needed to decrypt `ciphertext_size` bytes from `track_id`
    fn get_media_plaintext_buffer_size(
        &self,
        _track_id: u32,
        _is_audio: bool,
        _ciphertext_size: usize,
    ) -> usize {
        0
    }

    /// Decrypt into `plaintext`, returning the bytes written
    fn decrypt_media(
        &self,
        _track_id: u32,
        _is_audio: bool,
        _ciphertext: &[u8],
        _plaintext: &mut [u8],
    ) -> Option<usize> {
        None
    }
}

/// Flat callback table; every entry receives the registered context first
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PeerConnectionObserverCallbackTable {
    // ICE events
    pub on_ice_candidate: extern "C" fn(context: *mut c_void, candidate: Borrowed<RawIceCandidate>),
    pub on_ice_candidates_removed:
        extern "C" fn(context: *mut c_void, addresses: Borrowed<IpPort>, count: usize),
    pub on_ice_connection_change: extern "C" fn(context: *mut c_void, state: IceConnectionState),
    pub on_ice_network_route_change: extern "C" fn(context: *mut c_void, route: NetworkRoute),

    // Media events
    pub on_add_stream: extern "C" fn(context: *mut c_void, stream: OwnedRc<MediaStream>),
    pub on_add_audio_rtp_receiver: extern "C" fn(context: *mut c_void, track: OwnedRc<AudioTrack>),
    pub on_add_video_rtp_receiver: extern "C" fn(context: *mut c_void, track: OwnedRc<VideoTrack>),

    // Data channel events
    pub on_signaling_data_channel:
        extern "C" fn(context: *mut c_void, channel: OwnedRc<DataChannel>),
    pub on_signaling_data_channel_message:
        extern "C" fn(context: *mut c_void, data: Borrowed<u8>, len: usize),
    pub on_rtp_received: extern "C" fn(
        context: *mut c_void,
        payload_type: u8,
        sequence_number: u16,
        timestamp: u32,
        ssrc: u32,
        payload: Borrowed<u8>,
        len: usize,
    ),

    // Frame encryption
    pub get_media_ciphertext_buffer_size:
        extern "C" fn(context: *mut c_void, is_audio: bool, plaintext_size: usize) -> usize,
    pub encrypt_media: extern "C" fn(
        context: *mut c_void,
        is_audio: bool,
        plaintext: Borrowed<u8>,
        plaintext_size: usize,
        ciphertext_out: *mut u8,
        ciphertext_capacity: usize,
        ciphertext_size_out: *mut usize,
    ) -> bool,
    pub get_media_plaintext_buffer_size: extern "C" fn(
        context: *mut c_void,
        track_id: u32,
        is_audio: bool,
        ciphertext_size: usize,
    ) -> usize,
    pub decrypt_media: extern "C" fn(
        context: *mut c_void,
        track_id: u32,
        is_audio: bool,
        ciphertext: Borrowed<u8>,
        ciphertext_size: usize,
        plaintext_out: *mut u8,
        plaintext_capacity: usize,
        plaintext_size_out: *mut usize,
    ) -> bool,
}

/// Adapts a flat table and its context to [`PeerConnectionObserverCallbacks`]
pub struct FlatPeerConnectionObserverCallbacks {
    context: Context,
    table: PeerConnectionObserverCallbackTable,
}

impl FlatPeerConnectionObserverCallbacks {
    pub fn new(context: Context, table: PeerConnectionObserverCallbackTable) -> Self {
        Self { context, table }
    }

    fn ctx(&self) -> *mut c_void {
        self.context.as_ptr()
    }
}

impl PeerConnectionObserverCallbacks for FlatPeerConnectionObserverCallbacks {
    fn on_ice_candidate(&self, candidate: &IceCandidate) {
        let sent = candidate.with_raw(|raw| {
            (self.table.on_ice_candidate)(self.ctx(), Borrowed::from_ref(raw));
        });
        if let Err(e) = sent {
            warn!("Dropping ICE candidate: {}", e);
        }
    }

    fn on_ice_candidates_removed(&self, addresses: &[IpPort]) {
        (self.table.on_ice_candidates_removed)(
            self.ctx(),
            Borrowed::from_ptr(addresses.as_ptr()),
            addresses.len(),
        );
    }

    fn on_ice_connection_change(&self, state: IceConnectionState) {
        (self.table.on_ice_connection_change)(self.ctx(), state);
    }

    fn on_ice_network_route_change(&self, route: NetworkRoute) {
        (self.table.on_ice_network_route_change)(self.ctx(), route);
    }

    fn on_add_stream(&self, stream: OwnedRc<MediaStream>) {
        (self.table.on_add_stream)(self.ctx(), stream);
    }

    fn on_add_audio_rtp_receiver(&self, track: OwnedRc<AudioTrack>) {
        (self.table.on_add_audio_rtp_receiver)(self.ctx(), track);
    }

    fn on_add_video_rtp_receiver(&self, track: OwnedRc<VideoTrack>) {
        (self.table.on_add_video_rtp_receiver)(self.ctx(), track);
    }

    fn on_signaling_data_channel(&self, channel: OwnedRc<DataChannel>) {
        (self.table.on_signaling_data_channel)(self.ctx(), channel);
    }

    fn on_signaling_data_channel_message(&self, data: &[u8]) {
        (self.table.on_signaling_data_channel_message)(
            self.ctx(),
            Borrowed::from_ptr(data.as_ptr()),
            data.len(),
        );
    }

    fn on_rtp_received(&self, header: RtpHeader, payload: &[u8]) {
        (self.table.on_rtp_received)(
            self.ctx(),
            header.payload_type,
            header.sequence_number,
            header.timestamp,
            header.ssrc,
            Borrowed::from_ptr(payload.as_ptr()),
            payload.len(),
        );
    }

    fn get_media_ciphertext_buffer_size(&self, is_audio: bool, plaintext_size: usize) -> usize {
        (self.table.get_media_ciphertext_buffer_size)(self.ctx(), is_audio, plaintext_size)
    }

    fn encrypt_media(
        &self,
        is_audio: bool,
        plaintext: &[u8],
        ciphertext: &mut [u8],
    ) -> Option<usize> {
        let mut written = 0usize;
        let ok = (self.table.encrypt_media)(
            self.ctx(),
            is_audio,
            Borrowed::from_ptr(plaintext.as_ptr()),
            plaintext.len(),
            ciphertext.as_mut_ptr(),
            ciphertext.len(),
            &mut written,
        );
        ok.then_some(written)
    }

    fn get_media_plaintext_buffer_size(
        &self,
        track_id: u32,
        is_audio: bool,
        ciphertext_size: usize,
    ) -> usize {
        (self.table.get_media_plaintext_buffer_size)(
            self.ctx(),
            track_id,
            is_audio,
            ciphertext_size,
        )
    }

    fn decrypt_media(
        &self,
        track_id: u32,
        is_audio: bool,
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> Option<usize> {
        let mut written = 0usize;
        let ok = (self.table.decrypt_media)(
            self.ctx(),
            track_id,
            is_audio,
            Borrowed::from_ptr(ciphertext.as_ptr()),
            ciphertext.len(),
            plaintext.as_mut_ptr(),
            plaintext.len(),
            &mut written,
        );
        ok.then_some(written)
    }
}
