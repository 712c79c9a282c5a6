//! Small shared utilities

pub mod throttle;

pub use throttle::LogThrottler;

use crate::error::{BridgeError, Result};

/// Allocate `len` bytes set to `fill`
///
/// Sizes come from frame geometry or from boundary size queries, so failure is
/// reported as [`BridgeError::AllocationFailed`] instead of aborting.
pub fn try_alloc(len: usize, fill: u8) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| BridgeError::AllocationFailed { bytes: len })?;
    data.resize(len, fill);
    Ok(data)
}
