//! Signaling data channel
//!
//! Messages that arrive before an observer is registered are held and handed
//! to the first observer, in arrival order, when it registers.

use std::fmt;
use std::mem;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Data channel lifecycle
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataChannelState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

/// Receiver of data channel traffic, called on the engine's network thread
pub trait DataChannelObserver: Send + Sync {
    fn on_message(&self, data: &[u8]);

    fn on_state_change(&self, _state: DataChannelState) {}
}

pub struct DataChannel {
    label: String,
    id: i32,
    state: RwLock<DataChannelState>,
    observer: RwLock<Option<Arc<dyn DataChannelObserver>>>,
    pending: Mutex<Vec<Bytes>>,
}

impl DataChannel {
    pub fn new(label: impl Into<String>, id: i32) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            id,
            state: RwLock::new(DataChannelState::Connecting),
            observer: RwLock::new(None),
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn state(&self) -> DataChannelState {
        *self.state.read()
    }

    /// Replace the observer; only one is registered at a time
    ///
    /// Held messages are delivered to `observer` before this returns.
    pub fn register_observer(&self, observer: Arc<dyn DataChannelObserver>) {
        // The pending lock orders the flush before any message that races it.
        let mut pending = self.pending.lock();
        *self.observer.write() = Some(observer.clone());
        debug!("Observer registered on data channel '{}'", self.label);

        for data in mem::take(&mut *pending) {
            observer.on_message(&data);
        }
    }

    /// Engine state transition
    pub fn set_state(&self, state: DataChannelState) {
        *self.state.write() = state;
        if let Some(observer) = self.current_observer() {
            observer.on_state_change(state);
        }
    }

    /// Engine receive path; false when the message is held for a later observer
    pub fn deliver_message(&self, data: &[u8]) -> bool {
        let observer = {
            let mut pending = self.pending.lock();
            match self.current_observer() {
                Some(observer) => observer,
                None => {
                    pending.push(Bytes::copy_from_slice(data));
                    trace!("Data channel '{}' holding {} bytes", self.label, data.len());
                    return false;
                }
            }
        };
        trace!("Data channel '{}' message: {} bytes", self.label, data.len());
        observer.on_message(data);
        true
    }

    fn current_observer(&self) -> Option<Arc<dyn DataChannelObserver>> {
        self.observer.read().clone()
    }
}

impl fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataChannel")
            .field("label", &self.label)
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
