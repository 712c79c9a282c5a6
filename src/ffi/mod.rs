//! Flat `extern "C"` surface
//!
//! Every pointer parameter carries its ownership in its type:
//! [`Borrowed`]/[`BorrowedRc`] are valid for the call only, while
//! [`Owned`](crate::ptr::Owned)/[`OwnedRc`](crate::ptr::OwnedRc) transfer one
//! reference that the receiver must release exactly once, through the matching
//! `rtc_bridge_release_*` or `rtc_bridge_delete_*` function.
//!
//! Failures never cross the boundary as panics. A null borrowed input or an
//! invalid argument is logged and turned into the documented sentinel (null,
//! `0`, `false`, or no effect).

pub mod media;
pub mod observer;

use std::ffi::CStr;

use libc::c_char;
use tracing::{error, info};

use crate::config::{self, BridgeConfig};
use crate::error::{BridgeError, Result};
use crate::logging;
use crate::ptr::{Borrowed, BorrowedRc};

/// Dereference a borrowed ref-counted pointer, rejecting null
///
/// # Safety
///
/// `ptr` must be null or point to a live `Arc`-managed `T` for `'a`.
pub(crate) unsafe fn required<'a, T>(ptr: BorrowedRc<T>, what: &'static str) -> Result<&'a T> {
    ptr.as_ref().ok_or(BridgeError::NullPointer(what))
}

/// Log a failed boundary call and discard the error
pub(crate) fn or_log<T>(op: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!("{} failed: {}", op, e);
            None
        }
    }
}

unsafe fn init(config_json: Borrowed<c_char>) -> Result<BridgeConfig> {
    // Null selects the defaults.
    if config_json.is_null() {
        return Ok(BridgeConfig::default());
    }
    let json = CStr::from_ptr(config_json.as_ptr())
        .to_str()
        .map_err(|_| BridgeError::Config("configuration is not valid UTF-8".to_string()))?;
    BridgeConfig::from_json(json)
}

/// Configure the bridge and install logging
///
/// Returns false, leaving the active configuration untouched, when the
/// document does not parse.
///
/// # Safety
///
/// `config_json` must be null or a NUL-terminated string valid for the call.
#[no_mangle]
pub unsafe extern "C" fn rtc_bridge_init(config_json: Borrowed<c_char>) -> bool {
    let Some(config) = or_log("rtc_bridge_init", init(config_json)) else {
        return false;
    };
    logging::init_logging(&config.log);
    info!(
        "Bridge initialised (log level {:?}, max frame dimension {})",
        config.log.level, config.video.max_frame_dimension
    );
    config::global().set(config);
    true
}
