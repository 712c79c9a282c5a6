//! Frame geometry, rotation and pixel layout definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BridgeError, Result};

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelLayout {
    /// Planar luma + quarter-size chroma planes (engine native)
    I420,
    /// Packed 4-channel R, G, B, A bytes (boundary friendly)
    Rgba,
}

impl PixelLayout {
    /// Expected total byte size for a given resolution
    pub fn frame_size(&self, resolution: Resolution) -> usize {
        match self {
            PixelLayout::I420 => {
                let chroma = resolution.chroma();
                resolution.pixels() + 2 * chroma.pixels()
            }
            PixelLayout::Rgba => resolution.pixels() * 4,
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelLayout::I420 => write!(f, "I420"),
            PixelLayout::Rgba => write!(f, "RGBA"),
        }
    }
}

/// Resolution (width x height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero-area resolutions cannot back a frame
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total pixels
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Geometry of a 4:2:0 chroma plane (rounded up for odd sizes)
    pub fn chroma(&self) -> Resolution {
        Resolution::new(self.width.div_ceil(2), self.height.div_ceil(2))
    }

    /// Geometry after applying `rotation`
    pub fn rotated(&self, rotation: VideoRotation) -> Resolution {
        if rotation.swaps_dimensions() {
            Resolution::new(self.height, self.width)
        } else {
            *self
        }
    }

    /// Validate against the zero-size and maximum-size rules
    pub fn validate(&self, max_dimension: u32) -> Result<()> {
        if self.is_empty() {
            return Err(BridgeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > max_dimension || self.height > max_dimension {
            return Err(BridgeError::FrameTooLarge {
                width: self.width,
                height: self.height,
                max: max_dimension,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Clockwise rotation a renderer must apply to display a frame upright
#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoRotation {
    #[default]
    None = 0,
    Clockwise90 = 90,
    Clockwise180 = 180,
    Clockwise270 = 270,
}

impl VideoRotation {
    /// Parse a rotation in degrees; only right angles are accepted
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees {
            0 => Ok(VideoRotation::None),
            90 => Ok(VideoRotation::Clockwise90),
            180 => Ok(VideoRotation::Clockwise180),
            270 => Ok(VideoRotation::Clockwise270),
            other => Err(BridgeError::InvalidRotation(other)),
        }
    }

    pub fn degrees(&self) -> i32 {
        *self as i32
    }

    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, VideoRotation::Clockwise90 | VideoRotation::Clockwise270)
    }
}

impl fmt::Display for VideoRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
