//! Peer connection observer bridge
//!
//! The engine raises connection events on its network, signaling, and worker
//! threads through [`PeerConnectionObserver`]. [`PeerConnectionObserverBridge`]
//! turns each one into a boundary callback on the same thread, converting
//! payloads to their boundary form and transferring one owned reference for
//! every object-carrying event.
//!
//! The bridge registers itself as message observer on signaling data channels
//! and, when frame encryption is enabled, hands the engine encryptor and
//! decryptor hooks. Those outlive the bridge itself, so they share a relay that
//! is deactivated on drop: late events are dropped and late frames fail closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::callbacks::PeerConnectionObserverCallbacks;
use super::crypto::{checked_size, FrameDecryptor, FrameEncryptor};
use super::types::{
    CandidatePairChange, IceCandidate, IceConnectionState, IceGatheringState, IpPort,
    MediaStreamTrackRef, RtpHeader, SignalingState,
};
use crate::config;
use crate::media::{DataChannel, DataChannelObserver, MediaStream, MediaStreamTrack};
use crate::ptr::OwnedRc;
use crate::utils::LogThrottler;

/// Connection events raised by the engine
pub trait PeerConnectionObserver: Send + Sync {
    fn on_ice_candidate(&self, candidate: &IceCandidate);

    fn on_ice_candidates_removed(&self, candidates: &[IceCandidate]);

    fn on_ice_connection_change(&self, state: IceConnectionState);

    fn on_ice_selected_candidate_pair_changed(&self, change: &CandidatePairChange);

    fn on_add_stream(&self, stream: Arc<MediaStream>);

    fn on_add_track(&self, track: MediaStreamTrackRef);

    fn on_data_channel(&self, channel: Arc<DataChannel>);

    fn on_rtp_packet(&self, header: RtpHeader, payload: &[u8]);

    fn on_signaling_change(&self, _state: SignalingState) {}

    fn on_renegotiation_needed(&self) {}

    fn on_ice_gathering_change(&self, _state: IceGatheringState) {}
}

struct Relay {
    callbacks: Box<dyn PeerConnectionObserverCallbacks>,
    active: AtomicBool,
    throttler: LogThrottler,
}

impl Relay {
    fn callbacks(&self) -> Option<&dyn PeerConnectionObserverCallbacks> {
        if self.active.load(Ordering::Acquire) {
            Some(self.callbacks.as_ref())
        } else {
            None
        }
    }

    fn warn_dropped(&self, key: &'static str, what: &str) {
        if let Some(suppressed) = self.throttler.check(key) {
            warn!("{} failed, frame dropped ({} similar suppressed)", what, suppressed);
        }
    }
}

impl DataChannelObserver for Relay {
    fn on_message(&self, data: &[u8]) {
        match self.callbacks() {
            Some(cb) => cb.on_signaling_data_channel_message(data),
            None => trace!("Dropping data channel message for destroyed observer"),
        }
    }
}

/// Encryptor/decryptor hooks backed by the boundary callbacks
pub struct BridgeFrameCryptor {
    relay: Arc<Relay>,
}

impl FrameEncryptor for BridgeFrameCryptor {
    fn ciphertext_size(&self, is_audio: bool, plaintext_size: usize) -> usize {
        self.relay
            .callbacks()
            .map_or(0, |cb| cb.get_media_ciphertext_buffer_size(is_audio, plaintext_size))
    }

    fn encrypt(&self, is_audio: bool, plaintext: &[u8], ciphertext: &mut [u8]) -> Option<usize> {
        let cb = self.relay.callbacks()?;
        let capacity = ciphertext.len();
        match cb.encrypt_media(is_audio, plaintext, ciphertext) {
            Some(written) => checked_size(written, capacity),
            None => {
                self.relay.warn_dropped("encrypt_media", "Frame encryption");
                None
            }
        }
    }
}

impl FrameDecryptor for BridgeFrameCryptor {
    fn plaintext_size(&self, track_id: u32, is_audio: bool, ciphertext_size: usize) -> usize {
        self.relay.callbacks().map_or(0, |cb| {
            cb.get_media_plaintext_buffer_size(track_id, is_audio, ciphertext_size)
        })
    }

    fn decrypt(
        &self,
        track_id: u32,
        is_audio: bool,
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> Option<usize> {
        let cb = self.relay.callbacks()?;
        let capacity = plaintext.len();
        match cb.decrypt_media(track_id, is_audio, ciphertext, plaintext) {
            Some(written) => checked_size(written, capacity),
            None => {
                self.relay.warn_dropped("decrypt_media", "Frame decryption");
                None
            }
        }
    }
}

/// Relay from engine connection events to boundary callbacks
pub struct PeerConnectionObserverBridge {
    relay: Arc<Relay>,
    enable_frame_encryption: bool,
}

impl PeerConnectionObserverBridge {
    pub fn new(
        callbacks: Box<dyn PeerConnectionObserverCallbacks>,
        enable_frame_encryption: bool,
    ) -> Self {
        let throttler = LogThrottler::from_config(&config::global().get().log);
        info!(
            "Peer connection observer created (frame encryption {})",
            if enable_frame_encryption { "on" } else { "off" }
        );
        Self {
            relay: Arc::new(Relay {
                callbacks,
                active: AtomicBool::new(true),
                throttler,
            }),
            enable_frame_encryption,
        }
    }

    pub fn frame_encryption_enabled(&self) -> bool {
        self.enable_frame_encryption
    }

    /// Hook for outbound media; `None` unless encryption is enabled
    pub fn frame_encryptor(&self) -> Option<Arc<dyn FrameEncryptor>> {
        self.cryptor().map(|c| c as Arc<dyn FrameEncryptor>)
    }

    /// Hook for inbound media; `None` unless encryption is enabled
    pub fn frame_decryptor(&self) -> Option<Arc<dyn FrameDecryptor>> {
        self.cryptor().map(|c| c as Arc<dyn FrameDecryptor>)
    }

    fn cryptor(&self) -> Option<Arc<BridgeFrameCryptor>> {
        self.enable_frame_encryption.then(|| {
            Arc::new(BridgeFrameCryptor {
                relay: self.relay.clone(),
            })
        })
    }
}

impl PeerConnectionObserver for PeerConnectionObserverBridge {
    fn on_ice_candidate(&self, candidate: &IceCandidate) {
        debug!("ICE candidate gathered: {}", candidate.address);
        if let Some(cb) = self.relay.callbacks() {
            cb.on_ice_candidate(candidate);
        }
    }

    fn on_ice_candidates_removed(&self, candidates: &[IceCandidate]) {
        debug!("{} ICE candidates removed", candidates.len());
        let addresses: Vec<IpPort> = candidates.iter().map(|c| c.address.into()).collect();
        if let Some(cb) = self.relay.callbacks() {
            cb.on_ice_candidates_removed(&addresses);
        }
    }

    fn on_ice_connection_change(&self, state: IceConnectionState) {
        info!("ICE connection state: {:?}", state);
        if let Some(cb) = self.relay.callbacks() {
            cb.on_ice_connection_change(state);
        }
    }

    fn on_ice_selected_candidate_pair_changed(&self, change: &CandidatePairChange) {
        let route = change.network_route();
        debug!(
            "Selected candidate pair changed ({}), local adapter {:?}",
            change.reason, route.local_adapter_type
        );
        if let Some(cb) = self.relay.callbacks() {
            cb.on_ice_network_route_change(route);
        }
    }

    fn on_add_stream(&self, stream: Arc<MediaStream>) {
        info!("Remote stream added: {}", stream.id());
        if let Some(cb) = self.relay.callbacks() {
            cb.on_add_stream(OwnedRc::from_arc(stream));
        }
    }

    fn on_add_track(&self, track: MediaStreamTrackRef) {
        let Some(cb) = self.relay.callbacks() else {
            return;
        };
        match track {
            MediaStreamTrackRef::Audio(track) => {
                info!("Audio receiver added: {}", track.id());
                cb.on_add_audio_rtp_receiver(OwnedRc::from_arc(track));
            }
            MediaStreamTrackRef::Video(track) => {
                info!("Video receiver added: {}", track.id());
                cb.on_add_video_rtp_receiver(OwnedRc::from_arc(track));
            }
        }
    }

    fn on_data_channel(&self, channel: Arc<DataChannel>) {
        info!("Signaling data channel opened: {}", channel.label());
        if let Some(cb) = self.relay.callbacks() {
            // The boundary learns of the channel before any of its messages.
            cb.on_signaling_data_channel(OwnedRc::from_arc(channel.clone()));
            channel.register_observer(self.relay.clone());
        }
    }

    fn on_rtp_packet(&self, header: RtpHeader, payload: &[u8]) {
        trace!(
            "RTP packet pt={} seq={} ssrc={} len={}",
            header.payload_type,
            header.sequence_number,
            header.ssrc,
            payload.len()
        );
        if let Some(cb) = self.relay.callbacks() {
            cb.on_rtp_received(header, payload);
        }
    }

    fn on_signaling_change(&self, state: SignalingState) {
        debug!("Signaling state: {:?}", state);
    }

    fn on_ice_gathering_change(&self, state: IceGatheringState) {
        debug!("ICE gathering state: {:?}", state);
    }
}

impl Drop for PeerConnectionObserverBridge {
    fn drop(&mut self) {
        self.relay.active.store(false, Ordering::Release);
        info!("Peer connection observer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioTrack, VideoTrack};
    use crate::observer::callbacks::{
        FlatPeerConnectionObserverCallbacks, PeerConnectionObserverCallbackTable,
    };
    use crate::observer::crypto::{decrypt_frame, encrypt_frame};
    use crate::observer::types::{AdapterType, CandidateType, NetworkRoute, RawIceCandidate};
    use crate::ptr::{Borrowed, Context};
    use crate::video::source::VideoSource;
    use libc::c_void;
    use parking_lot::Mutex;
    use std::ffi::CStr;

    const TAG: usize = 16;

    /// Boundary-side state reached through the context pointer
    #[derive(Default)]
    struct Host {
        events: Mutex<Vec<String>>,
    }

    impl Host {
        fn push(&self, event: String) {
            self.events.lock().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    fn host<'a>(context: *mut c_void) -> &'a Host {
        unsafe { &*(context as *const Host) }
    }

    extern "C" fn on_ice_candidate(ctx: *mut c_void, candidate: Borrowed<RawIceCandidate>) {
        let raw = unsafe { candidate.as_ref() };
        let sdp = raw
            .map(|r| unsafe { CStr::from_ptr(r.sdp) }.to_string_lossy().into_owned())
            .unwrap_or_default();
        host(ctx).push(format!("candidate {}", sdp));
    }

    extern "C" fn on_ice_candidates_removed(
        ctx: *mut c_void,
        addresses: Borrowed<IpPort>,
        count: usize,
    ) {
        let slice = unsafe { std::slice::from_raw_parts(addresses.as_ptr(), count) };
        let ports: Vec<String> = slice.iter().map(|a| a.port.to_string()).collect();
        host(ctx).push(format!("removed {}", ports.join(",")));
    }

    extern "C" fn on_ice_connection_change(ctx: *mut c_void, state: IceConnectionState) {
        host(ctx).push(format!("state {:?}", state));
    }

    extern "C" fn on_ice_network_route_change(ctx: *mut c_void, route: NetworkRoute) {
        host(ctx).push(format!("route {:?}", route.local_adapter_type));
    }

    extern "C" fn on_add_stream(ctx: *mut c_void, stream: OwnedRc<MediaStream>) {
        let id = stream.as_ref().map(|s| s.id().to_string()).unwrap_or_default();
        host(ctx).push(format!("stream {}", id));
    }

    extern "C" fn on_add_audio_rtp_receiver(ctx: *mut c_void, track: OwnedRc<AudioTrack>) {
        let id = track.as_ref().map(|t| t.id().to_string()).unwrap_or_default();
        host(ctx).push(format!("audio {}", id));
    }

    extern "C" fn on_add_video_rtp_receiver(ctx: *mut c_void, track: OwnedRc<VideoTrack>) {
        let id = track.as_ref().map(|t| t.id().to_string()).unwrap_or_default();
        host(ctx).push(format!("video {}", id));
    }

    extern "C" fn on_signaling_data_channel(ctx: *mut c_void, channel: OwnedRc<DataChannel>) {
        let label = channel.as_ref().map(|c| c.label().to_string()).unwrap_or_default();
        host(ctx).push(format!("channel {}", label));
    }

    extern "C" fn on_signaling_data_channel_message(
        ctx: *mut c_void,
        data: Borrowed<u8>,
        len: usize,
    ) {
        let bytes = unsafe { std::slice::from_raw_parts(data.as_ptr(), len) };
        host(ctx).push(format!("message {}", String::from_utf8_lossy(bytes)));
    }

    extern "C" fn on_rtp_received(
        ctx: *mut c_void,
        payload_type: u8,
        sequence_number: u16,
        _timestamp: u32,
        ssrc: u32,
        _payload: Borrowed<u8>,
        len: usize,
    ) {
        host(ctx).push(format!("rtp {} {} {} {}", payload_type, sequence_number, ssrc, len));
    }

    extern "C" fn get_media_ciphertext_buffer_size(
        _ctx: *mut c_void,
        _is_audio: bool,
        size: usize,
    ) -> usize {
        size + TAG
    }

    extern "C" fn encrypt_media(
        _ctx: *mut c_void,
        _is_audio: bool,
        plaintext: Borrowed<u8>,
        plaintext_size: usize,
        ciphertext_out: *mut u8,
        ciphertext_capacity: usize,
        ciphertext_size_out: *mut usize,
    ) -> bool {
        let needed = plaintext_size + TAG;
        if ciphertext_capacity < needed {
            return false;
        }
        unsafe {
            std::ptr::copy_nonoverlapping(plaintext.as_ptr(), ciphertext_out, plaintext_size);
            std::ptr::write_bytes(ciphertext_out.add(plaintext_size), 0xaa, TAG);
            *ciphertext_size_out = needed;
        }
        true
    }

    extern "C" fn get_media_plaintext_buffer_size(
        _ctx: *mut c_void,
        _track_id: u32,
        _is_audio: bool,
        size: usize,
    ) -> usize {
        size.saturating_sub(TAG)
    }

    extern "C" fn decrypt_media(
        _ctx: *mut c_void,
        _track_id: u32,
        _is_audio: bool,
        ciphertext: Borrowed<u8>,
        ciphertext_size: usize,
        plaintext_out: *mut u8,
        plaintext_capacity: usize,
        plaintext_size_out: *mut usize,
    ) -> bool {
        let Some(len) = ciphertext_size.checked_sub(TAG) else {
            return false;
        };
        if plaintext_capacity < len {
            return false;
        }
        unsafe {
            std::ptr::copy_nonoverlapping(ciphertext.as_ptr(), plaintext_out, len);
            *plaintext_size_out = len;
        }
        true
    }

    /// Claims more bytes than it was given room for
    extern "C" fn encrypt_media_overflowing(
        _ctx: *mut c_void,
        _is_audio: bool,
        _plaintext: Borrowed<u8>,
        _plaintext_size: usize,
        _ciphertext_out: *mut u8,
        ciphertext_capacity: usize,
        ciphertext_size_out: *mut usize,
    ) -> bool {
        unsafe { *ciphertext_size_out = ciphertext_capacity + 1 };
        true
    }

    fn table() -> PeerConnectionObserverCallbackTable {
        PeerConnectionObserverCallbackTable {
            on_ice_candidate,
            on_ice_candidates_removed,
            on_ice_connection_change,
            on_ice_network_route_change,
            on_add_stream,
            on_add_audio_rtp_receiver,
            on_add_video_rtp_receiver,
            on_signaling_data_channel,
            on_signaling_data_channel_message,
            on_rtp_received,
            get_media_ciphertext_buffer_size,
            encrypt_media,
            get_media_plaintext_buffer_size,
            decrypt_media,
        }
    }

    fn bridge(
        host: &Host,
        table: PeerConnectionObserverCallbackTable,
        encryption: bool,
    ) -> PeerConnectionObserverBridge {
        let context = Context::new(host as *const Host as *mut c_void);
        PeerConnectionObserverBridge::new(
            Box::new(FlatPeerConnectionObserverCallbacks::new(context, table)),
            encryption,
        )
    }

    fn candidate(address: &str, adapter_type: AdapterType) -> IceCandidate {
        IceCandidate {
            sdp_mid: "audio".to_string(),
            sdp_mline_index: 0,
            sdp: format!("candidate:1 1 udp 1 {} typ host", address),
            address: address.parse().unwrap(),
            candidate_type: CandidateType::Host,
            adapter_type,
        }
    }

    #[test]
    fn test_relays_every_event_class() {
        let host = Host::default();
        let bridge = bridge(&host, table(), false);

        bridge.on_ice_candidate(&candidate("192.0.2.1:5000", AdapterType::Ethernet));
        bridge.on_ice_candidates_removed(&[
            candidate("192.0.2.1:5000", AdapterType::Ethernet),
            candidate("[2001:db8::1]:6000", AdapterType::Wifi),
        ]);
        bridge.on_ice_connection_change(IceConnectionState::Connected);
        bridge.on_ice_selected_candidate_pair_changed(&CandidatePairChange {
            local: candidate("10.0.0.2:7000", AdapterType::Cellular4g),
            remote: candidate("198.51.100.9:7001", AdapterType::Unknown),
            last_data_received_ms: 10,
            reason: "switch".to_string(),
        });
        bridge.on_add_stream(MediaStream::new("s1"));
        bridge.on_add_track(MediaStreamTrackRef::Audio(AudioTrack::new("11")));
        bridge.on_add_track(MediaStreamTrackRef::Video(VideoTrack::new("12", VideoSource::new())));
        let channel = DataChannel::new("signaling", 1);
        bridge.on_data_channel(channel.clone());
        channel.deliver_message(b"hello");
        bridge.on_rtp_packet(
            RtpHeader {
                payload_type: 101,
                sequence_number: 7,
                timestamp: 3000,
                ssrc: 42,
            },
            &[0u8; 12],
        );
        bridge.on_renegotiation_needed();
        bridge.on_signaling_change(SignalingState::Stable);

        assert_eq!(
            host.events(),
            vec![
                "candidate candidate:1 1 udp 1 192.0.2.1:5000 typ host",
                "removed 5000,6000",
                "state Connected",
                "route Cellular4g",
                "stream s1",
                "audio 11",
                "video 12",
                "channel signaling",
                "message hello",
                "rtp 101 7 42 12",
            ]
        );
    }

    #[test]
    fn test_owned_references_released_by_callee() {
        let host = Host::default();
        let bridge = bridge(&host, table(), false);

        let stream = MediaStream::new("s");
        bridge.on_add_stream(stream.clone());
        assert_eq!(Arc::strong_count(&stream), 1);

        let track = AudioTrack::new("1");
        bridge.on_add_track(MediaStreamTrackRef::Audio(track.clone()));
        assert_eq!(Arc::strong_count(&track), 1);
    }

    #[test]
    fn test_destroyed_bridge_drops_late_events() {
        let host = Host::default();
        let channel = DataChannel::new("signaling", 1);
        {
            let bridge = bridge(&host, table(), false);
            bridge.on_data_channel(channel.clone());
            channel.deliver_message(b"before");
        }
        channel.deliver_message(b"after");

        assert_eq!(host.events(), vec!["channel signaling", "message before"]);
    }

    #[test]
    fn test_channel_event_precedes_its_messages() {
        let host = Host::default();
        let bridge = bridge(&host, table(), false);
        let channel = DataChannel::new("signaling", 2);
        assert!(!channel.deliver_message(b"early"));

        bridge.on_data_channel(channel.clone());
        channel.deliver_message(b"late");

        assert_eq!(
            host.events(),
            vec!["channel signaling", "message early", "message late"]
        );
    }

    #[test]
    fn test_encryption_hooks_only_when_enabled() {
        let host = Host::default();
        let plain = bridge(&host, table(), false);
        assert!(!plain.frame_encryption_enabled());
        assert!(plain.frame_encryptor().is_none());
        assert!(plain.frame_decryptor().is_none());

        let encrypted = bridge(&host, table(), true);
        assert!(encrypted.frame_encryptor().is_some());
        assert!(encrypted.frame_decryptor().is_some());
    }

    #[test]
    fn test_ciphertext_size_scenario() {
        let host = Host::default();
        let bridge = bridge(&host, table(), true);
        let encryptor = bridge.frame_encryptor().unwrap();

        let size = encryptor.ciphertext_size(false, 100);
        assert_eq!(size, 116);

        let plaintext = [7u8; 100];
        let mut out = [0u8; 116];
        let written = encryptor.encrypt(false, &plaintext, &mut out).unwrap();
        assert!(written <= 116);
    }

    #[test]
    fn test_encrypt_decrypt_through_table() {
        let host = Host::default();
        let bridge = bridge(&host, table(), true);
        let encryptor = bridge.frame_encryptor().unwrap();
        let decryptor = bridge.frame_decryptor().unwrap();

        let frame = b"keyframe bytes";
        let ciphertext = encrypt_frame(encryptor.as_ref(), false, frame).unwrap();
        assert_eq!(ciphertext.len(), frame.len() + TAG);

        let plaintext = decrypt_frame(decryptor.as_ref(), 9, false, &ciphertext).unwrap();
        assert_eq!(&plaintext[..], &frame[..]);

        assert!(decrypt_frame(decryptor.as_ref(), 9, false, &[0u8; 3]).is_none());
    }

    #[test]
    fn test_overflowing_encrypt_is_failure() {
        let host = Host::default();
        let mut table = table();
        table.encrypt_media = encrypt_media_overflowing;
        let bridge = bridge(&host, table, true);
        let encryptor = bridge.frame_encryptor().unwrap();

        let mut out = [0u8; 116];
        assert!(encryptor.encrypt(false, &[0u8; 100], &mut out).is_none());
    }

    #[test]
    fn test_hooks_fail_closed_after_destroy() {
        let host = Host::default();
        let bridge = bridge(&host, table(), true);
        let encryptor = bridge.frame_encryptor().unwrap();
        drop(bridge);

        assert_eq!(encryptor.ciphertext_size(false, 100), 0);
        assert!(encrypt_frame(encryptor.as_ref(), false, &[1u8; 100]).is_none());
    }
}
