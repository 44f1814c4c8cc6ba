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

//! The patterns that fill paths.

use super::image::Bitmap;
use super::surface::Pixel;

use piet::kurbo::{Affine, Point, Vec2};
use piet::{Color, Error as Pierror, GradientStop, InterpolationMode};

use std::fmt;

/// Entries in a gradient lookup table.
pub(crate) const LUT_SIZE: usize = 512;

/// How a gradient parameter or image coordinate outside of the source is brought back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extend {
    /// Clamp to the nearest edge.
    #[default]
    Pad,

    /// Start over from the other edge.
    Repeat,

    /// Mirror back and forth.
    Reflect,
}

impl Extend {
    /// Fold a gradient parameter into `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Extend::Pad => t.clamp(0.0, 1.0),
            Extend::Repeat => t.rem_euclid(1.0),
            Extend::Reflect => {
                let folded = t.rem_euclid(2.0);
                if folded > 1.0 {
                    2.0 - folded
                } else {
                    folded
                }
            }
        }
    }
}

/// A color ramp.
#[derive(Debug, Clone)]
pub struct Gradient {
    /// Stops with non-decreasing positions.
    pub stops: Vec<GradientStop>,

    /// Maps user space into gradient space.
    ///
    /// For a linear gradient the parameter is the x coordinate in gradient space; for a
    /// radial gradient it is the distance from the origin.
    pub transform: Affine,

    pub extend: Extend,
}

impl Gradient {
    pub fn new(stops: impl Into<Vec<GradientStop>>, transform: Affine) -> Self {
        Self {
            stops: stops.into(),
            transform,
            extend: Extend::Pad,
        }
    }

    /// Use another extend mode.
    pub fn with_extend(mut self, extend: Extend) -> Self {
        self.extend = extend;
        self
    }

    fn is_valid(&self) -> bool {
        !self.stops.is_empty() && self.stops.windows(2).all(|w| w[0].pos <= w[1].pos)
    }

    /// Interpolate the stops at `t`, returning a straight-alpha color.
    pub fn color_at(&self, t: f32) -> Color {
        let stops = &self.stops;
        let first = match stops.first() {
            Some(first) => first,
            None => return Color::TRANSPARENT,
        };
        if t <= first.pos {
            return first.color;
        }

        for pair in stops.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if t <= b.pos {
                let span = b.pos - a.pos;
                if span <= f32::EPSILON {
                    return b.color;
                }

                let f = ((t - a.pos) / span) as f64;
                let (ar, ag, ab, aa) = a.color.as_rgba();
                let (br, bg, bb, ba) = b.color.as_rgba();
                return Color::rgba(
                    ar + (br - ar) * f,
                    ag + (bg - ag) * f,
                    ab + (bb - ab) * f,
                    aa + (ba - aa) * f,
                );
            }
        }

        stops.last().map_or(first.color, |last| last.color)
    }

    /// Fill `lut` with the premultiplied colors of this ramp.
    pub(crate) fn build_lut(&self, lut: &mut Vec<Pixel>) {
        lut.clear();
        lut.extend((0..LUT_SIZE).map(|i| {
            let t = i as f32 / (LUT_SIZE - 1) as f32;
            Pixel::from_color(self.color_at(t))
        }));
    }
}

/// A bitmap used as a fill.
#[derive(Clone)]
pub struct ImagePattern {
    pub bitmap: Bitmap,

    /// Maps user space into bitmap pixel space.
    pub transform: Affine,

    pub extend: Extend,
    pub filter: InterpolationMode,
}

impl fmt::Debug for ImagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter = match self.filter {
            InterpolationMode::NearestNeighbor => "NearestNeighbor",
            InterpolationMode::Bilinear => "Bilinear",
        };

        f.debug_struct("ImagePattern")
            .field("bitmap", &self.bitmap)
            .field("transform", &self.transform)
            .field("extend", &self.extend)
            .field("filter", &filter)
            .finish()
    }
}

/// The source of color for a fill or stroke.
#[derive(Debug, Clone)]
pub enum Pattern {
    Solid(Color),
    Linear(Gradient),
    Radial(Gradient),
    Image(ImagePattern),
}

impl From<Color> for Pattern {
    fn from(color: Color) -> Self {
        Pattern::Solid(color)
    }
}

impl Pattern {
    /// A linear gradient running from `start` to `end`.
    pub fn linear(
        start: impl Into<Point>,
        end: impl Into<Point>,
        stops: impl Into<Vec<GradientStop>>,
    ) -> Self {
        let (start, end) = (start.into(), end.into());
        let axis: Vec2 = end - start;
        let length = axis.hypot();

        let transform = if length <= f64::EPSILON {
            // Everything lands past the end.
            Affine::translate((1.0, 0.0)) * Affine::scale(0.0)
        } else {
            Affine::scale(1.0 / length)
                * Affine::rotate(-axis.atan2())
                * Affine::translate(-start.to_vec2())
        };

        Pattern::Linear(Gradient::new(stops, transform))
    }

    /// A radial gradient centered at `center`, reaching its last stop at `radius`.
    pub fn radial(center: impl Into<Point>, radius: f64, stops: impl Into<Vec<GradientStop>>) -> Self {
        let center = center.into();
        let transform = if radius.abs() <= f64::EPSILON {
            Affine::translate((1.0, 0.0)) * Affine::scale(0.0)
        } else {
            Affine::scale(1.0 / radius.abs()) * Affine::translate(-center.to_vec2())
        };

        Pattern::Radial(Gradient::new(stops, transform))
    }

    /// Use a bitmap as a fill, with its top left corner at the user-space origin.
    pub fn image(bitmap: Bitmap) -> Self {
        let transform = Affine::scale(bitmap.scale());
        Pattern::Image(ImagePattern {
            bitmap,
            transform,
            extend: Extend::Pad,
            filter: InterpolationMode::Bilinear,
        })
    }

    /// Change the extend mode of a gradient or image pattern.
    pub fn with_extend(self, extend: Extend) -> Self {
        match self {
            Pattern::Solid(color) => Pattern::Solid(color),
            Pattern::Linear(g) => Pattern::Linear(g.with_extend(extend)),
            Pattern::Radial(g) => Pattern::Radial(g.with_extend(extend)),
            Pattern::Image(image) => Pattern::Image(ImagePattern { extend, ..image }),
        }
    }
}

/// The kind of geometry function a gradient uses.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Geometry {
    Linear,
    Radial,
}

/// A pattern resolved for one draw call.
pub(crate) enum Paint<'a> {
    Solid(Pixel),

    Gradient {
        lut: &'a [Pixel],
        geometry: Geometry,
        extend: Extend,

        /// Device space to gradient space.
        inverse: Affine,
    },

    Image {
        pattern: &'a ImagePattern,

        /// Device space to bitmap pixels.
        inverse: Affine,
    },
}

impl<'a> Paint<'a> {
    /// Resolve `pattern` for drawing with the given user-to-device transform.
    ///
    /// `lut` is scratch space for gradient tables.
    pub(crate) fn new(
        pattern: &'a Pattern,
        device: Affine,
        lut: &'a mut Vec<Pixel>,
    ) -> Result<Paint<'a>, Pierror> {
        let device_inverse = || {
            if device.determinant().abs() <= f64::EPSILON {
                debug_assert!(false, "drawing with a non-invertible transform");
                Err(Pierror::InvalidInput)
            } else {
                Ok(device.inverse())
            }
        };

        let gradient = |gradient: &Gradient, geometry, lut: &'a mut Vec<Pixel>| {
            if !gradient.is_valid() {
                debug_assert!(false, "gradient stops are empty or out of order");
                return Err(Pierror::InvalidInput);
            }

            gradient.build_lut(lut);
            Ok(Paint::Gradient {
                lut: &lut[..],
                geometry,
                extend: gradient.extend,
                inverse: gradient.transform * device_inverse()?,
            })
        };

        match pattern {
            Pattern::Solid(color) => Ok(Paint::Solid(Pixel::from_color(*color))),
            Pattern::Linear(g) => gradient(g, Geometry::Linear, lut),
            Pattern::Radial(g) => gradient(g, Geometry::Radial, lut),
            Pattern::Image(image) => Ok(Paint::Image {
                pattern: image,
                inverse: image.transform * device_inverse()?,
            }),
        }
    }

    /// Is every pixel of this paint the same?
    pub(crate) fn solid(&self) -> Option<Pixel> {
        match self {
            Paint::Solid(pixel) => Some(*pixel),
            _ => None,
        }
    }

    /// Write the color of `out.len()` pixels starting at device pixel `(x, y)`.
    pub(crate) fn shade(&self, x: u32, y: u32, out: &mut [Pixel]) {
        match self {
            Paint::Solid(pixel) => out.fill(*pixel),

            Paint::Gradient {
                lut,
                geometry,
                extend,
                inverse,
            } => {
                for (i, slot) in out.iter_mut().enumerate() {
                    let center = Point::new(x as f64 + i as f64 + 0.5, y as f64 + 0.5);
                    let p = *inverse * center;
                    let t = match geometry {
                        Geometry::Linear => p.x,
                        Geometry::Radial => p.to_vec2().hypot(),
                    };

                    *slot = lookup(lut, extend.apply(t));
                }
            }

            Paint::Image { pattern, inverse } => {
                for (i, slot) in out.iter_mut().enumerate() {
                    let center = Point::new(x as f64 + i as f64 + 0.5, y as f64 + 0.5);
                    let p = *inverse * center;
                    *slot = pattern
                        .bitmap
                        .sample(p.x, p.y, pattern.filter, pattern.extend);
                }
            }
        }
    }
}

#[inline]
fn lookup(lut: &[Pixel], t: f64) -> Pixel {
    let index = (t * (lut.len() - 1) as f64 + 0.5) as usize;
    lut[index.min(lut.len() - 1)]
}
