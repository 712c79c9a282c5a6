//! Immutable video frame buffers
//!
//! A `VideoFrameBuffer` is shared as `Arc<VideoFrameBuffer>`; every holder of
//! the `Arc` is one reference, and the pixels are freed when the last one is
//! released. Constructors check the plane sizes against the declared geometry,
//! so a buffer whose backing storage disagrees with its dimensions can never
//! exist.

use bytes::Bytes;

use super::format::{PixelLayout, Resolution};
use crate::error::{BridgeError, Result};
use crate::utils::try_alloc;

/// Full-range luma of black
const BLACK_LUMA: u8 = 0;
/// Neutral chroma
const NEUTRAL_CHROMA: u8 = 128;

#[derive(Debug)]
enum Planes {
    I420 { y: Bytes, u: Bytes, v: Bytes },
    Rgba(Bytes),
}

/// Borrowed view of a buffer's pixel storage
#[derive(Debug, Clone, Copy)]
pub enum PlaneView<'a> {
    /// Y plane is `width` bytes per row, U and V are `ceil(width/2)` per row
    I420 {
        y: &'a [u8],
        u: &'a [u8],
        v: &'a [u8],
    },
    /// `width * 4` bytes per row
    Rgba(&'a [u8]),
}

/// Reference-counted, immutable video frame buffer
#[derive(Debug)]
pub struct VideoFrameBuffer {
    resolution: Resolution,
    planes: Planes,
}

impl VideoFrameBuffer {
    /// Create a planar I420 buffer
    pub fn i420(
        resolution: Resolution,
        y: impl Into<Bytes>,
        u: impl Into<Bytes>,
        v: impl Into<Bytes>,
    ) -> Result<Self> {
        ensure_not_empty(resolution)?;
        let (y, u, v) = (y.into(), u.into(), v.into());
        let chroma = resolution.chroma().pixels();

        check_len(resolution.pixels(), y.len())?;
        check_len(chroma, u.len())?;
        check_len(chroma, v.len())?;

        Ok(Self {
            resolution,
            planes: Planes::I420 { y, u, v },
        })
    }

    /// Create a packed RGBA buffer
    pub fn rgba(resolution: Resolution, data: impl Into<Bytes>) -> Result<Self> {
        ensure_not_empty(resolution)?;
        let data = data.into();
        check_len(PixelLayout::Rgba.frame_size(resolution), data.len())?;

        Ok(Self {
            resolution,
            planes: Planes::Rgba(data),
        })
    }

    /// Create a black I420 buffer
    pub fn black_i420(resolution: Resolution) -> Result<Self> {
        let chroma = resolution.chroma().pixels();
        Self::i420(
            resolution,
            try_alloc(resolution.pixels(), BLACK_LUMA)?,
            try_alloc(chroma, NEUTRAL_CHROMA)?,
            try_alloc(chroma, NEUTRAL_CHROMA)?,
        )
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    pub fn layout(&self) -> PixelLayout {
        match self.planes {
            Planes::I420 { .. } => PixelLayout::I420,
            Planes::Rgba(_) => PixelLayout::Rgba,
        }
    }

    /// Borrow the pixel storage
    pub fn planes(&self) -> PlaneView<'_> {
        match &self.planes {
            Planes::I420 { y, u, v } => PlaneView::I420 { y, u, v },
            Planes::Rgba(data) => PlaneView::Rgba(data),
        }
    }

    /// Total bytes of pixel storage
    pub fn size(&self) -> usize {
        self.layout().frame_size(self.resolution)
    }
}

fn ensure_not_empty(resolution: Resolution) -> Result<()> {
    if resolution.is_empty() {
        return Err(BridgeError::InvalidDimensions {
            width: resolution.width,
            height: resolution.height,
        });
    }
    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(BridgeError::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}
