//! Peer connection observer exports

use libc::c_void;
use tracing::{debug, error};

use crate::error::BridgeError;
use crate::observer::{
    FlatPeerConnectionObserverCallbacks, PeerConnectionObserverBridge,
    PeerConnectionObserverCallbackTable,
};
use crate::ptr::{Borrowed, Context, Owned};

/// Create an observer bridge relaying to `callbacks`
///
/// The engine attaches the returned object to its peer connection. When
/// `enable_frame_encryption` is set, the bridge also supplies the frame
/// encryptor and decryptor hooks. Returns null if `callbacks` is null.
///
/// # Safety
///
/// `callbacks` must be null or point to a valid table for the call. `context`
/// must stay valid until [`rtc_bridge_delete_peer_connection_observer`]
/// returns, and the table's functions must be callable from any thread.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_create_peer_connection_observer(
    context: *mut c_void,
    callbacks: Borrowed<PeerConnectionObserverCallbackTable>,
    enable_frame_encryption: bool,
) -> Owned<PeerConnectionObserverBridge> {
    let Some(table) = callbacks.as_ref() else {
        error!(
            "rtc_bridge_create_peer_connection_observer failed: {}",
            BridgeError::NullPointer("callbacks")
        );
        return Owned::null();
    };
    let callbacks = FlatPeerConnectionObserverCallbacks::new(Context::new(context), *table);
    Owned::new(PeerConnectionObserverBridge::new(
        Box::new(callbacks),
        enable_frame_encryption,
    ))
}

/// Destroy an observer bridge
///
/// Events the engine raises afterwards are dropped, and any frame encryption
/// hooks it still holds fail every frame.
///
/// # Safety
///
/// `observer` must be null or come from
/// [`rtc_bridge_create_peer_connection_observer`] and not be deleted twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_delete_peer_connection_observer(
    observer: Owned<PeerConnectionObserverBridge>,
) {
    if observer.is_null() {
        return;
    }
    debug!("Deleting peer connection observer {:?}", observer);
    drop(observer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioTrack, DataChannel, MediaStream, VideoTrack};
    use crate::observer::crypto::encrypt_frame;
    use crate::observer::{
        IceConnectionState, IpPort, NetworkRoute, PeerConnectionObserver, RawIceCandidate,
    };
    use crate::ptr::OwnedRc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(ctx: *mut c_void) -> &'static AtomicUsize {
        unsafe { &*(ctx as *const AtomicUsize) }
    }

    extern "C" fn on_ice_candidate(_ctx: *mut c_void, _candidate: Borrowed<RawIceCandidate>) {}
    extern "C" fn on_ice_candidates_removed(
        _ctx: *mut c_void,
        _addresses: Borrowed<IpPort>,
        _count: usize,
    ) {
    }
    extern "C" fn on_ice_connection_change(ctx: *mut c_void, _state: IceConnectionState) {
        counter(ctx).fetch_add(1, Ordering::SeqCst);
    }
    extern "C" fn on_ice_network_route_change(_ctx: *mut c_void, _route: NetworkRoute) {}
    extern "C" fn on_add_stream(_ctx: *mut c_void, _stream: OwnedRc<MediaStream>) {}
    extern "C" fn on_add_audio_rtp_receiver(_ctx: *mut c_void, _track: OwnedRc<AudioTrack>) {}
    extern "C" fn on_add_video_rtp_receiver(_ctx: *mut c_void, _track: OwnedRc<VideoTrack>) {}
    extern "C" fn on_signaling_data_channel(_ctx: *mut c_void, _channel: OwnedRc<DataChannel>) {}
    extern "C" fn on_signaling_data_channel_message(
        _ctx: *mut c_void,
        _data: Borrowed<u8>,
        _len: usize,
    ) {
    }
    extern "C" fn on_rtp_received(
        _ctx: *mut c_void,
        _payload_type: u8,
        _sequence_number: u16,
        _timestamp: u32,
        _ssrc: u32,
        _payload: Borrowed<u8>,
        _len: usize,
    ) {
    }
    extern "C" fn get_media_ciphertext_buffer_size(
        _ctx: *mut c_void,
        _is_audio: bool,
        size: usize,
    ) -> usize {
        size
    }
    extern "C" fn encrypt_media(
        _ctx: *mut c_void,
        _is_audio: bool,
        _plaintext: Borrowed<u8>,
        plaintext_size: usize,
        _ciphertext_out: *mut u8,
        _ciphertext_capacity: usize,
        ciphertext_size_out: *mut usize,
    ) -> bool {
        unsafe { *ciphertext_size_out = plaintext_size };
        true
    }
    extern "C" fn get_media_plaintext_buffer_size(
        _ctx: *mut c_void,
        _track_id: u32,
        _is_audio: bool,
        size: usize,
    ) -> usize {
        size
    }
    extern "C" fn decrypt_media(
        _ctx: *mut c_void,
        _track_id: u32,
        _is_audio: bool,
        _ciphertext: Borrowed<u8>,
        _ciphertext_size: usize,
        _plaintext_out: *mut u8,
        _plaintext_capacity: usize,
        _plaintext_size_out: *mut usize,
    ) -> bool {
        false
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

    #[test]
    fn test_create_relay_delete() {
        static CHANGES: AtomicUsize = AtomicUsize::new(0);
        let table = table();
        let observer = unsafe {
            rtc_bridge_create_peer_connection_observer(
                &CHANGES as *const AtomicUsize as *mut c_void,
                Borrowed::from_ref(&table),
                true,
            )
        };
        let bridge = unsafe { observer.borrow().as_ref() }.unwrap();
        assert!(bridge.frame_encryption_enabled());

        bridge.on_ice_connection_change(IceConnectionState::Connected);
        assert_eq!(CHANGES.load(Ordering::SeqCst), 1);

        let encryptor = bridge.frame_encryptor().unwrap();
        assert_eq!(
            encrypt_frame(encryptor.as_ref(), true, &[1, 2, 3]).map(|b| b.len()),
            Some(3)
        );

        unsafe { rtc_bridge_delete_peer_connection_observer(observer) };
        assert!(encrypt_frame(encryptor.as_ref(), true, &[1, 2, 3]).is_none());
    }

    #[test]
    fn test_null_table_returns_null() {
        let observer = unsafe {
            rtc_bridge_create_peer_connection_observer(
                std::ptr::null_mut(),
                Borrowed::null(),
                false,
            )
        };
        assert!(observer.is_null());
        unsafe { rtc_bridge_delete_peer_connection_observer(observer) };
    }
}
