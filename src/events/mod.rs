//! Observer events as an async stream
//!
//! [`ChannelObserver`] is a ready-made [`PeerConnectionObserverCallbacks`]
//! for in-process hosts: it publishes every relayed event onto an [`EventBus`]
//! so async code can consume them off the engine threads.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::trace;

use crate::media::{AudioTrack, DataChannel, MediaStream, VideoTrack};
use crate::observer::callbacks::PeerConnectionObserverCallbacks;
use crate::observer::types::{IceCandidate, IceConnectionState, IpPort, NetworkRoute, RtpHeader};
use crate::ptr::OwnedRc;

/// Event channel capacity (ring buffer size)
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One relayed connection event
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    IceCandidate(IceCandidate),
    IceCandidatesRemoved(Vec<IpPort>),
    IceConnectionChange(IceConnectionState),
    IceNetworkRouteChange(NetworkRoute),
    StreamAdded(Arc<MediaStream>),
    AudioReceiverAdded(Arc<AudioTrack>),
    VideoReceiverAdded(Arc<VideoTrack>),
    DataChannelOpened(Arc<DataChannel>),
    DataChannelMessage(Bytes),
    RtpReceived { header: RtpHeader, payload: Bytes },
}

/// Broadcast bus for observer events
///
/// # Example
///
/// ```no_run
/// use rtc_bridge::events::{ChannelObserver, EventBus};
/// use rtc_bridge::observer::PeerConnectionObserverBridge;
/// use std::sync::Arc;
///
/// let bus = Arc::new(EventBus::new());
/// let mut rx = bus.subscribe();
/// let bridge = PeerConnectionObserverBridge::new(Box::new(ChannelObserver::new(bus)), false);
///
/// tokio::spawn(async move {
///     while let Ok(event) = rx.recv().await {
///         println!("Received event: {:?}", event);
///     }
/// });
/// ```
pub struct EventBus {
    tx: broadcast::Sender<ObserverEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event to all subscribers
    ///
    /// Never blocks. With no subscribers the event is dropped.
    pub fn publish(&self, event: ObserverEvent) {
        if self.tx.send(event).is_err() {
            trace!("No event subscribers, event dropped");
        }
    }

    /// Subscribe to future events
    ///
    /// A subscriber that falls more than the channel capacity behind receives
    /// `Lagged` and misses the overwritten events.
    pub fn subscribe(&self) -> broadcast::Receiver<ObserverEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback receiver that publishes onto an [`EventBus`]
///
/// Frame encryption is not implemented here, so the trait defaults apply and
/// every protected frame is dropped.
pub struct ChannelObserver {
    bus: Arc<EventBus>,
}

impl ChannelObserver {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}

impl PeerConnectionObserverCallbacks for ChannelObserver {
    fn on_ice_candidate(&self, candidate: &IceCandidate) {
        self.bus.publish(ObserverEvent::IceCandidate(candidate.clone()));
    }

    fn on_ice_candidates_removed(&self, addresses: &[IpPort]) {
        self.bus
            .publish(ObserverEvent::IceCandidatesRemoved(addresses.to_vec()));
    }

    fn on_ice_connection_change(&self, state: IceConnectionState) {
        self.bus.publish(ObserverEvent::IceConnectionChange(state));
    }

    fn on_ice_network_route_change(&self, route: NetworkRoute) {
        self.bus.publish(ObserverEvent::IceNetworkRouteChange(route));
    }

    fn on_add_stream(&self, stream: OwnedRc<MediaStream>) {
        if let Some(stream) = stream.into_arc() {
            self.bus.publish(ObserverEvent::StreamAdded(stream));
        }
    }

    fn on_add_audio_rtp_receiver(&self, track: OwnedRc<AudioTrack>) {
        if let Some(track) = track.into_arc() {
            self.bus.publish(ObserverEvent::AudioReceiverAdded(track));
        }
    }

    fn on_add_video_rtp_receiver(&self, track: OwnedRc<VideoTrack>) {
        if let Some(track) = track.into_arc() {
            self.bus.publish(ObserverEvent::VideoReceiverAdded(track));
        }
    }

    fn on_signaling_data_channel(&self, channel: OwnedRc<DataChannel>) {
        if let Some(channel) = channel.into_arc() {
            self.bus.publish(ObserverEvent::DataChannelOpened(channel));
        }
    }

    fn on_signaling_data_channel_message(&self, data: &[u8]) {
        self.bus
            .publish(ObserverEvent::DataChannelMessage(Bytes::copy_from_slice(data)));
    }

    fn on_rtp_received(&self, header: RtpHeader, payload: &[u8]) {
        self.bus.publish(ObserverEvent::RtpReceived {
            header,
            payload: Bytes::copy_from_slice(payload),
        });
    }
}
