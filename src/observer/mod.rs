//! Connection event bridge
//!
//! Relays ICE, media attachment, data channel, and RTP events from engine
//! threads to the boundary, and exposes the frame encryption hooks.

pub mod bridge;
pub mod callbacks;
pub mod crypto;
pub mod types;

pub use bridge::{BridgeFrameCryptor, PeerConnectionObserver, PeerConnectionObserverBridge};
pub use callbacks::{
    FlatPeerConnectionObserverCallbacks, PeerConnectionObserverCallbackTable,
    PeerConnectionObserverCallbacks,
};
pub use crypto::{decrypt_frame, encrypt_frame, FrameDecryptor, FrameEncryptor};
pub use types::{
    AdapterType, CandidatePairChange, CandidateType, IceCandidate, IceConnectionState,
    IceGatheringState, Ip, IpPort, MediaStreamTrackRef, NetworkRoute, RawIceCandidate, RtpHeader,
    SignalingState,
};
