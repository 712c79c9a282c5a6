//! Pixel format conversion and rotation
//!
//! Software conversion between packed RGBA and planar I420:
//!
//! - Luma uses full-range BT.601 weights.
//! - Chroma is scaled to ±127 around 128 so that saturated primaries survive a
//!   round trip exactly.
//! - Every chroma sample is derived from the rounded mean colour of its 2×2
//!   block (partial blocks on odd edges average the pixels they have).
//!
//! All arithmetic is 16-bit fixed point with round-half-up. Every operation
//! here is pure: it reads its input and allocates exactly one new buffer.

use super::buffer::{PlaneView, VideoFrameBuffer};
use super::format::{PixelLayout, Resolution, VideoRotation};
use crate::config;
use crate::error::{BridgeError, Result};
use crate::utils::try_alloc;

const SHIFT: u32 = 16;
const HALF: i32 = 1 << (SHIFT - 1);

// RGB -> YUV
const Y_R: i32 = 19595;
const Y_G: i32 = 38470;
const Y_B: i32 = 7471;
const U_R: i32 = -10972;
const U_G: i32 = -21540;
const U_B: i32 = 32512;
const V_R: i32 = 32512;
const V_G: i32 = -27225;
const V_B: i32 = -5287;

// YUV -> RGB
const R_V: i32 = 92605;
const G_U: i32 = -22731;
const G_V: i32 = -47170;
const B_U: i32 = 117044;

#[inline]
fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

#[inline]
fn rgb_to_y(r: i32, g: i32, b: i32) -> u8 {
    clamp_u8((Y_R * r + Y_G * g + Y_B * b + HALF) >> SHIFT)
}

#[inline]
fn rgb_to_uv(r: i32, g: i32, b: i32) -> (u8, u8) {
    let u = ((U_R * r + U_G * g + U_B * b + HALF) >> SHIFT) + 128;
    let v = ((V_R * r + V_G * g + V_B * b + HALF) >> SHIFT) + 128;
    (clamp_u8(u), clamp_u8(v))
}

#[inline]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let yy = (y as i32) << SHIFT;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    [
        clamp_u8((yy + R_V * e + HALF) >> SHIFT),
        clamp_u8((yy + G_U * d + G_V * e + HALF) >> SHIFT),
        clamp_u8((yy + B_U * d + HALF) >> SHIFT),
    ]
}

/// Build an I420 buffer from packed RGBA, using the configured size limit
pub fn i420_from_rgba(resolution: Resolution, rgba: &[u8]) -> Result<VideoFrameBuffer> {
    let max = config::global().get().video.max_frame_dimension;
    i420_from_rgba_with_limit(resolution, rgba, max)
}

/// Build an I420 buffer from packed RGBA
///
/// Alpha is ignored. Fails on zero or oversized geometry, when `rgba` is not
/// exactly `width * height * 4` bytes, and when the planes cannot be allocated.
pub fn i420_from_rgba_with_limit(
    resolution: Resolution,
    rgba: &[u8],
    max_dimension: u32,
) -> Result<VideoFrameBuffer> {
    resolution.validate(max_dimension)?;
    let expected = PixelLayout::Rgba.frame_size(resolution);
    if rgba.len() != expected {
        return Err(BridgeError::BufferSizeMismatch {
            expected,
            actual: rgba.len(),
        });
    }

    let width = resolution.width as usize;
    let height = resolution.height as usize;
    let chroma = resolution.chroma();
    let (cw, ch) = (chroma.width as usize, chroma.height as usize);

    let mut y_plane = try_alloc(width * height, 0)?;
    for (dst, px) in y_plane.iter_mut().zip(rgba.chunks_exact(4)) {
        *dst = rgb_to_y(px[0] as i32, px[1] as i32, px[2] as i32);
    }

    let mut u_plane = try_alloc(cw * ch, 0)?;
    let mut v_plane = try_alloc(cw * ch, 0)?;
    for cy in 0..ch {
        for cx in 0..cw {
            let mut sum = [0i32; 3];
            let mut count = 0i32;
            for y in (cy * 2)..((cy * 2 + 2).min(height)) {
                for x in (cx * 2)..((cx * 2 + 2).min(width)) {
                    let idx = (y * width + x) * 4;
                    sum[0] += rgba[idx] as i32;
                    sum[1] += rgba[idx + 1] as i32;
                    sum[2] += rgba[idx + 2] as i32;
                    count += 1;
                }
            }
            let mean = sum.map(|s| (s + count / 2) / count);
            let (u, v) = rgb_to_uv(mean[0], mean[1], mean[2]);
            u_plane[cy * cw + cx] = u;
            v_plane[cy * cw + cx] = v;
        }
    }

    VideoFrameBuffer::i420(resolution, y_plane, u_plane, v_plane)
}

/// Write `buffer` as packed RGBA into `out`
///
/// `out` must be exactly `width * height * 4` bytes. Alpha is written as 255
/// for I420 sources; RGBA sources are copied verbatim.
pub fn write_rgba(buffer: &VideoFrameBuffer, out: &mut [u8]) -> Result<()> {
    let resolution = buffer.resolution();
    let expected = PixelLayout::Rgba.frame_size(resolution);
    if out.len() != expected {
        return Err(BridgeError::BufferSizeMismatch {
            expected,
            actual: out.len(),
        });
    }

    match buffer.planes() {
        PlaneView::Rgba(data) => out.copy_from_slice(data),
        PlaneView::I420 { y, u, v } => {
            let width = resolution.width as usize;
            let cw = resolution.chroma().width as usize;
            for (i, px) in out.chunks_exact_mut(4).enumerate() {
                let (row, col) = (i / width, i % width);
                let ci = (row / 2) * cw + col / 2;
                let [r, g, b] = yuv_to_rgb(y[i], u[ci], v[ci]);
                px.copy_from_slice(&[r, g, b, 255]);
            }
        }
    }
    Ok(())
}

/// Convert `buffer` to a freshly allocated packed RGBA vector
pub fn to_rgba(buffer: &VideoFrameBuffer) -> Result<Vec<u8>> {
    let mut out = try_alloc(PixelLayout::Rgba.frame_size(buffer.resolution()), 0)?;
    write_rgba(buffer, &mut out)?;
    Ok(out)
}

/// Copy `buffer` rotated clockwise by `rotation`
///
/// The layout is preserved; width and height swap for 90° and 270°.
pub fn copy_and_rotate(
    buffer: &VideoFrameBuffer,
    rotation: VideoRotation,
) -> Result<VideoFrameBuffer> {
    let resolution = buffer.resolution();
    let rotated = resolution.rotated(rotation);

    match buffer.planes() {
        PlaneView::Rgba(data) => {
            VideoFrameBuffer::rgba(rotated, rotate_plane(data, resolution, 4, rotation)?)
        }
        PlaneView::I420 { y, u, v } => {
            let chroma = resolution.chroma();
            VideoFrameBuffer::i420(
                rotated,
                rotate_plane(y, resolution, 1, rotation)?,
                rotate_plane(u, chroma, 1, rotation)?,
                rotate_plane(v, chroma, 1, rotation)?,
            )
        }
    }
}

fn rotate_plane(
    src: &[u8],
    geometry: Resolution,
    bpp: usize,
    rotation: VideoRotation,
) -> Result<Vec<u8>> {
    let mut dst = try_alloc(src.len(), 0)?;
    if rotation == VideoRotation::None {
        dst.copy_from_slice(src);
        return Ok(dst);
    }

    let width = geometry.width as usize;
    let height = geometry.height as usize;
    let dst_width = geometry.rotated(rotation).width as usize;

    for y in 0..height {
        for x in 0..width {
            let (dx, dy) = match rotation {
                VideoRotation::None => (x, y),
                VideoRotation::Clockwise90 => (height - 1 - y, x),
                VideoRotation::Clockwise180 => (width - 1 - x, height - 1 - y),
                VideoRotation::Clockwise270 => (y, width - 1 - x),
            };
            let s = (y * width + x) * bpp;
            let d = (dy * dst_width + dx) * bpp;
            dst[d..d + bpp].copy_from_slice(&src[s..s + bpp]);
        }
    }
    Ok(dst)
}
