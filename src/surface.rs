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

//! Pixel buffers that can be drawn into.

use bytemuck::{Pod, Zeroable};
use piet::{Color, Error as Pierror};

/// A single premultiplied RGBA8 pixel.
///
/// This is the in-memory layout of every surface and bitmap in this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    /// A fully transparent pixel.
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    /// Create a pixel from already-premultiplied channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiply a straight-alpha color.
    pub fn from_color(color: Color) -> Self {
        let (r, g, b, a) = color.as_rgba8();
        let premul = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        Self::new(premul.red(), premul.green(), premul.blue(), premul.alpha())
    }

    /// Convert this pixel back into a straight-alpha color.
    pub fn to_color(self) -> Color {
        match tiny_skia::PremultipliedColorU8::from_rgba(self.r, self.g, self.b, self.a) {
            Some(premul) => {
                let color = premul.demultiply();
                Color::rgba8(color.red(), color.green(), color.blue(), color.alpha())
            }

            // Channels above alpha aren't valid premultiplied data; report them as-is.
            None => Color::rgba8(self.r, self.g, self.b, self.a),
        }
    }

    /// Is this pixel fully transparent?
    pub fn is_transparent(self) -> bool {
        self.a == 0
    }

    pub(crate) fn to_f32(self) -> [f32; 4] {
        const INV: f32 = 1.0 / 255.0;
        [
            self.r as f32 * INV,
            self.g as f32 * INV,
            self.b as f32 * INV,
            self.a as f32 * INV,
        ]
    }

    pub(crate) fn from_f32([r, g, b, a]: [f32; 4]) -> Self {
        let a = quantize(a);
        // Keep the premultiplied invariant: no channel may exceed alpha.
        Self::new(
            quantize(r).min(a),
            quantize(g).min(a),
            quantize(b).min(a),
            a,
        )
    }
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// An owned target pixel buffer.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Surface {
    /// Create a new, fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * 4;
        Self {
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    /// Wrap an existing premultiplied RGBA8 buffer.
    ///
    /// Fails with `InvalidInput` if the stride can't hold a row or the buffer can't hold
    /// every row.
    pub fn from_vec(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Result<Self, Pierror> {
        check_layout(width, height, stride, data.len())?;
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Width in device pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in device pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of two rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The raw premultiplied bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the raw premultiplied bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Read a single pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        read_pixel(&self.data, self.width, self.height, self.stride, x, y)
    }

    /// Borrow this surface as a drawing target.
    pub fn as_mut(&mut self) -> SurfaceMut<'_> {
        SurfaceMut {
            width: self.width,
            height: self.height,
            stride: self.stride,
            data: &mut self.data,
        }
    }
}

/// A borrowed target pixel buffer.
#[derive(Debug)]
pub struct SurfaceMut<'a> {
    width: u32,
    height: u32,
    stride: usize,
    data: &'a mut [u8],
}

impl<'a> SurfaceMut<'a> {
    /// Wrap a caller-owned premultiplied RGBA8 buffer.
    pub fn from_bytes(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        stride: usize,
    ) -> Result<Self, Pierror> {
        check_layout(width, height, stride, data.len())?;
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Width in device pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in device pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read a single pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        read_pixel(self.data, self.width, self.height, self.stride, x, y)
    }

    /// Get one row of pixels.
    pub(crate) fn row_mut(&mut self, y: u32) -> &mut [Pixel] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * 4;
        bytemuck::cast_slice_mut(&mut self.data[start..end])
    }

    /// Overwrite a region with a single pixel value.
    pub(crate) fn fill(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, pixel: Pixel) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 {
            return;
        }

        for y in y0..y1 {
            self.row_mut(y)[x0 as usize..x1 as usize].fill(pixel);
        }
    }

    fn reborrow(&mut self) -> SurfaceMut<'_> {
        SurfaceMut {
            width: self.width,
            height: self.height,
            stride: self.stride,
            data: &mut *self.data,
        }
    }
}

/// Something that can be drawn into.
pub trait AsSurfaceMut {
    /// Borrow the pixel buffer.
    fn as_surface_mut(&mut self) -> SurfaceMut<'_>;
}

impl AsSurfaceMut for Surface {
    fn as_surface_mut(&mut self) -> SurfaceMut<'_> {
        self.as_mut()
    }
}

impl AsSurfaceMut for SurfaceMut<'_> {
    fn as_surface_mut(&mut self) -> SurfaceMut<'_> {
        self.reborrow()
    }
}

impl<T: AsSurfaceMut + ?Sized> AsSurfaceMut for &mut T {
    fn as_surface_mut(&mut self) -> SurfaceMut<'_> {
        (**self).as_surface_mut()
    }
}

fn check_layout(width: u32, height: u32, stride: usize, len: usize) -> Result<(), Pierror> {
    let row = width as usize * 4;
    if stride < row {
        return Err(Pierror::InvalidInput);
    }

    let needed = match height {
        0 => 0,
        h => stride * (h as usize - 1) + row,
    };
    if len < needed {
        return Err(Pierror::InvalidInput);
    }

    Ok(())
}

fn read_pixel(data: &[u8], width: u32, height: u32, stride: usize, x: u32, y: u32) -> Option<Pixel> {
    if x >= width || y >= height {
        return None;
    }

    let start = y as usize * stride + x as usize * 4;
    Some(*bytemuck::from_bytes(&data[start..start + 4]))
}
