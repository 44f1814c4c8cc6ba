// SPDX-License-Identifier: LGPL-3.0-or-later OR MPL-2.0
// This file is a part of `piet-raster`.
//
// `piet-raster` is free software: you can redistribute it and/or modify it under the
// terms of either:
//
// * GNU Lesser General Public License as published by the Free Software Foundation, either
//   version 3 of the License, or (at your option) any later version.
// * Mozilla Public License as published by the Mozilla Foundation, version 2.
// * The Patron License (https://github.com/notgull/piet-hardware/blob/main/LICENSE-PATRON.md)
//   for sponsors and contributors, who can ignore the copyleft provisions of the above licenses
//   for this project.
//
// `piet-raster` is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR
// PURPOSE. See the GNU Lesser General Public License or the Mozilla Public License for more
// details.
//
// You should have received a copy of the GNU Lesser General Public License and the Mozilla
// Public License along with `piet-raster`. If not, see <https://www.gnu.org/licenses/>.

//! Bitmaps and how they are sampled.

use super::blend::{composite, BlendMethod};
use super::brush::Extend;
use super::surface::Pixel;

use piet::kurbo::Size;
use piet::{Error as Pierror, ImageFormat, InterpolationMode};

use std::fmt;
use std::sync::Arc;

/// An immutable premultiplied RGBA8 bitmap.
///
/// Cloning is cheap, and clones may be read from several threads at once.
#[derive(Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    stride: usize,

    /// How many pixels of this bitmap make up one logical unit.
    scale: f64,

    data: Arc<[u8]>,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl Bitmap {
    /// Create a bitmap from tightly packed premultiplied RGBA8 data.
    pub fn new(width: u32, height: u32, scale: f64, data: Vec<u8>) -> Result<Self, Pierror> {
        Self::with_stride(width, height, width as usize * 4, scale, data)
    }

    /// Create a bitmap from premultiplied RGBA8 rows that are `stride` bytes apart.
    pub fn with_stride(
        width: u32,
        height: u32,
        stride: usize,
        scale: f64,
        data: Vec<u8>,
    ) -> Result<Self, Pierror> {
        if !(scale.is_finite() && scale > 0.0) || stride < width as usize * 4 {
            return Err(Pierror::InvalidInput);
        }
        if data.len() < stride * height as usize {
            return Err(Pierror::InvalidInput);
        }

        Ok(Self {
            width,
            height,
            stride,
            scale,
            data: data.into(),
        })
    }

    /// Create a bitmap from raw pixels in any `piet` image format.
    pub fn from_raw(
        width: u32,
        height: u32,
        buf: &[u8],
        format: ImageFormat,
        scale: f64,
    ) -> Result<Self, Pierror> {
        let count = width as usize * height as usize;
        let data: Vec<u8> = match format {
            ImageFormat::RgbaPremul => buf.get(..count * 4).ok_or(Pierror::InvalidInput)?.to_vec(),
            ImageFormat::RgbaSeparate => buf
                .get(..count * 4)
                .ok_or(Pierror::InvalidInput)?
                .chunks_exact(4)
                .flat_map(|chunk| {
                    let premul = tiny_skia::ColorU8::from_rgba(chunk[0], chunk[1], chunk[2], chunk[3])
                        .premultiply();
                    [premul.red(), premul.green(), premul.blue(), premul.alpha()]
                })
                .collect(),
            ImageFormat::Rgb => buf
                .get(..count * 3)
                .ok_or(Pierror::InvalidInput)?
                .chunks_exact(3)
                .flat_map(|chunk| [chunk[0], chunk[1], chunk[2], 0xFF])
                .collect(),
            ImageFormat::Grayscale => buf
                .get(..count)
                .ok_or(Pierror::InvalidInput)?
                .iter()
                .flat_map(|&v| [v, v, v, 0xFF])
                .collect(),
            _ => return Err(Pierror::NotSupported),
        };

        Self::new(width, height, scale, data)
    }

    /// An empty bitmap, used in place of one that couldn't be loaded.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            stride: 0,
            scale: 1.0,
            data: Arc::from(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The native pixel scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The raw premultiplied bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The size in logical units.
    pub fn logical_size(&self) -> Size {
        Size::new(
            self.width as f64 / self.scale,
            self.height as f64 / self.scale,
        )
    }

    /// Bytes held by this bitmap.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Read a single pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let start = y as usize * self.stride + x as usize * 4;
        Some(*bytemuck::from_bytes(&self.data[start..start + 4]))
    }

    /// One row of pixels.
    pub(crate) fn row(&self, y: u32) -> &[Pixel] {
        let start = y as usize * self.stride;
        bytemuck::cast_slice(&self.data[start..start + self.width as usize * 4])
    }

    /// Produce a copy of this bitmap resampled for a new scale factor.
    ///
    /// The logical size stays the same, so the pixel size changes by `new_scale / scale`.
    pub fn scaled(&self, new_scale: f64) -> Result<Bitmap, Pierror> {
        if !(new_scale.is_finite() && new_scale > 0.0) {
            return Err(Pierror::InvalidInput);
        }
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return Ok(self.clone());
        }

        let width = ((self.width as f64 / self.scale) * new_scale).round() as u32;
        let height = ((self.height as f64 / self.scale) * new_scale).round() as u32;
        if self.is_empty() || width == 0 || height == 0 {
            let mut empty = Bitmap::empty();
            empty.scale = new_scale;
            return Ok(empty);
        }

        let ratio_x = self.width as f64 / width as f64;
        let ratio_y = self.height as f64 / height as f64;
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);

        for y in 0..height {
            for x in 0..width {
                let u = (x as f64 + 0.5) * ratio_x;
                let v = (y as f64 + 0.5) * ratio_y;
                let px = self.sample(u, v, InterpolationMode::Bilinear, Extend::Pad);
                data.extend_from_slice(bytemuck::bytes_of(&px));
            }
        }

        tracing::debug!(
            "rescaled {}x{} bitmap to {}x{}",
            self.width,
            self.height,
            width,
            height
        );
        Bitmap::new(width, height, new_scale, data)
    }

    /// Sample at a fractional pixel position.
    ///
    /// Pixel centers sit at half-integer coordinates.
    pub(crate) fn sample(&self, u: f64, v: f64, filter: InterpolationMode, extend: Extend) -> Pixel {
        if self.is_empty() {
            return Pixel::TRANSPARENT;
        }

        match filter {
            InterpolationMode::NearestNeighbor => {
                let x = self.wrap(u.floor() as i64, self.width, extend);
                let y = self.wrap(v.floor() as i64, self.height, extend);
                self.pixel(x, y).unwrap_or_default()
            }

            InterpolationMode::Bilinear => {
                let u = u - 0.5;
                let v = v - 0.5;
                let (x0, y0) = (u.floor(), v.floor());
                let (fx, fy) = ((u - x0) as f32, (v - y0) as f32);
                let (x0, y0) = (x0 as i64, y0 as i64);

                let fetch = |x: i64, y: i64| {
                    let x = self.wrap(x, self.width, extend);
                    let y = self.wrap(y, self.height, extend);
                    self.pixel(x, y).unwrap_or_default().to_f32()
                };

                let p00 = fetch(x0, y0);
                let p10 = fetch(x0 + 1, y0);
                let p01 = fetch(x0, y0 + 1);
                let p11 = fetch(x0 + 1, y0 + 1);

                let mut out = [0.0; 4];
                for i in 0..4 {
                    let top = p00[i] + (p10[i] - p00[i]) * fx;
                    let bottom = p01[i] + (p11[i] - p01[i]) * fx;
                    out[i] = top + (bottom - top) * fy;
                }

                Pixel::from_f32(out)
            }
        }
    }

    fn wrap(&self, i: i64, len: u32, extend: Extend) -> u32 {
        let len = len as i64;
        let i = match extend {
            Extend::Pad => i.clamp(0, len - 1),
            Extend::Repeat => i.rem_euclid(len),
            Extend::Reflect => {
                let period = i.rem_euclid(len * 2);
                if period >= len {
                    len * 2 - 1 - period
                } else {
                    period
                }
            }
        };

        i as u32
    }
}

/// Build the bitmap drawn by a rotated composite mask.
///
/// Starts from `base`, blends `mask` over it, then copies every pixel of `top` that has
/// any coverage. The inputs are left untouched.
pub(crate) fn composite_mask(base: &Bitmap, mask: &Bitmap, top: &Bitmap) -> Result<Bitmap, Pierror> {
    let (width, height) = (base.width, base.height);
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);

    for y in 0..height {
        data.extend_from_slice(bytemuck::cast_slice(base.row(y)));
    }

    {
        let pixels: &mut [Pixel] = bytemuck::cast_slice_mut(&mut data[..]);
        for y in 0..height {
            let row = &mut pixels[y as usize * width as usize..(y as usize + 1) * width as usize];

            if y < mask.height {
                for (dst, &src) in row.iter_mut().zip(mask.row(y)) {
                    composite(BlendMethod::Clobber, dst, src, 1.0);
                }
            }

            if y < top.height {
                for (dst, &src) in row.iter_mut().zip(top.row(y)) {
                    if !src.is_transparent() {
                        *dst = src;
                    }
                }
            }
        }
    }

    Bitmap::new(width, height, base.scale, data)
}
