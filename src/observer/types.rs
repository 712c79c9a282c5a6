//! Value types carried by connection events

use std::ffi::CString;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use libc::c_char;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::{AudioTrack, VideoTrack};

/// ICE connection state as reported by the engine
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceConnectionState {
    New = 0,
    Checking = 1,
    Connected = 2,
    Completed = 3,
    Failed = 4,
    Disconnected = 5,
    Closed = 6,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceGatheringState {
    New = 0,
    Gathering = 1,
    Complete = 2,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalingState {
    Stable = 0,
    HaveLocalOffer = 1,
    HaveLocalPrAnswer = 2,
    HaveRemoteOffer = 3,
    HaveRemotePrAnswer = 4,
    Closed = 5,
}

/// Network adapter classification (bit values match the engine's)
#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    #[default]
    Unknown = 0,
    Ethernet = 1 << 0,
    Wifi = 1 << 1,
    Cellular = 1 << 2,
    Vpn = 1 << 3,
    Loopback = 1 << 4,
    Any = 1 << 5,
    Cellular2g = 1 << 6,
    Cellular3g = 1 << 7,
    Cellular4g = 1 << 8,
    Cellular5g = 1 << 9,
}

impl AdapterType {
    pub fn is_cellular(&self) -> bool {
        matches!(
            self,
            AdapterType::Cellular
                | AdapterType::Cellular2g
                | AdapterType::Cellular3g
                | AdapterType::Cellular4g
                | AdapterType::Cellular5g
        )
    }
}

/// Active network path of a connection
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRoute {
    pub local_adapter_type: AdapterType,
}

/// IP address in boundary layout: v4 addresses occupy the first 4 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ip {
    pub address: [u8; 16],
    pub v6: bool,
}

impl From<IpAddr> for Ip {
    fn from(ip: IpAddr) -> Self {
        let mut address = [0u8; 16];
        match ip {
            IpAddr::V4(v4) => {
                address[..4].copy_from_slice(&v4.octets());
                Self { address, v6: false }
            }
            IpAddr::V6(v6) => Self {
                address: v6.octets(),
                v6: true,
            },
        }
    }
}

impl From<Ip> for IpAddr {
    fn from(ip: Ip) -> Self {
        if ip.v6 {
            IpAddr::V6(Ipv6Addr::from(ip.address))
        } else {
            let [a, b, c, d, ..] = ip.address;
            IpAddr::V4(Ipv4Addr::new(a, b, c, d))
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpPort {
    pub ip: Ip,
    pub port: u16,
}

impl From<SocketAddr> for IpPort {
    fn from(addr: SocketAddr) -> Self {
        Self {
            ip: addr.ip().into(),
            port: addr.port(),
        }
    }
}

impl From<IpPort> for SocketAddr {
    fn from(ip_port: IpPort) -> Self {
        SocketAddr::new(ip_port.ip.into(), ip_port.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateType {
    Host,
    Srflx,
    Prflx,
    Relay,
}

/// A gathered ICE candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub sdp_mid: String,
    pub sdp_mline_index: i32,
    /// `candidate:` SDP attribute line
    pub sdp: String,
    pub address: SocketAddr,
    pub candidate_type: CandidateType,
    pub adapter_type: AdapterType,
}

impl IceCandidate {
    pub fn is_relayed(&self) -> bool {
        self.candidate_type == CandidateType::Relay
    }

    /// Run `f` with a boundary view of this candidate
    ///
    /// The strings inside the view live only until `f` returns.
    pub fn with_raw<R>(&self, f: impl FnOnce(&RawIceCandidate) -> R) -> Result<R> {
        let sdp_mid = CString::new(self.sdp_mid.as_str())?;
        let sdp = CString::new(self.sdp.as_str())?;
        let raw = RawIceCandidate {
            sdp_mid: sdp_mid.as_ptr(),
            sdp_mline_index: self.sdp_mline_index,
            sdp: sdp.as_ptr(),
            address: self.address.into(),
            is_relayed: self.is_relayed(),
        };
        Ok(f(&raw))
    }
}

/// Call-scoped boundary view of an [`IceCandidate`]
#[repr(C)]
#[derive(Debug)]
pub struct RawIceCandidate {
    pub sdp_mid: *const c_char,
    pub sdp_mline_index: i32,
    pub sdp: *const c_char,
    pub address: IpPort,
    pub is_relayed: bool,
}

/// Selected candidate pair switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePairChange {
    pub local: IceCandidate,
    pub remote: IceCandidate,
    pub last_data_received_ms: i64,
    pub reason: String,
}

impl CandidatePairChange {
    pub fn network_route(&self) -> NetworkRoute {
        NetworkRoute {
            local_adapter_type: self.local.adapter_type,
        }
    }
}

/// Fixed RTP header fields of a received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpHeader {
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

/// A newly negotiated remote track
#[derive(Debug, Clone)]
pub enum MediaStreamTrackRef {
    Audio(Arc<AudioTrack>),
    Video(Arc<VideoTrack>),
}
