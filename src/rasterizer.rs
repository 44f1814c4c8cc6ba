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

//! The coverage rasterizer.
//!
//! Each edge deposits the signed area it sweeps into an accumulation buffer. A running sum
//! along each row then gives the winding-weighted coverage of every pixel, which the fill
//! rule turns into a value between zero and one.

use super::outline::Outline;

use arrayvec::ArrayVec;
use piet::kurbo::{Point, Rect};

/// How the interior of a self-intersecting path is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillRule {
    /// Inside wherever the winding number is not zero.
    #[default]
    NonZero,

    /// Inside wherever the winding number is odd.
    EvenOdd,
}

impl FillRule {
    /// Turn an accumulated signed area into coverage.
    #[inline]
    fn coverage(self, acc: f32) -> f32 {
        match self {
            FillRule::NonZero => acc.abs().min(1.0),
            FillRule::EvenOdd => {
                let folded = acc.abs() % 2.0;
                if folded > 1.0 {
                    2.0 - folded
                } else {
                    folded
                }
            }
        }
    }
}

/// A run of covered pixels on one row.
#[derive(Debug)]
pub(crate) struct Span<'a> {
    /// Device x of the first pixel.
    pub(crate) x: u32,

    /// Device y of the row.
    pub(crate) y: u32,

    /// Coverage of each pixel, all greater than zero.
    pub(crate) coverage: &'a [f32],
}

/// The integer pixel region a draw is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    pub(crate) x0: u32,
    pub(crate) y0: u32,
    pub(crate) x1: u32,
    pub(crate) y1: u32,
}

impl Region {
    /// The pixels touched by `rect`, limited to `width` by `height`.
    pub(crate) fn covering(rect: Rect, width: u32, height: u32) -> Option<Self> {
        let clamp = |v: f64, max: u32| v.max(0.0).min(max as f64) as u32;

        let region = Region {
            x0: clamp(rect.x0.floor(), width),
            y0: clamp(rect.y0.floor(), height),
            x1: clamp(rect.x1.ceil(), width),
            y1: clamp(rect.y1.ceil(), height),
        };

        if region.x0 >= region.x1 || region.y0 >= region.y1 {
            None
        } else {
            Some(region)
        }
    }

    pub(crate) fn intersect(self, other: Region) -> Option<Region> {
        let region = Region {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };

        if region.x0 >= region.x1 || region.y0 >= region.y1 {
            None
        } else {
            Some(region)
        }
    }

    pub(crate) fn width(&self) -> usize {
        (self.x1 - self.x0) as usize
    }

    pub(crate) fn height(&self) -> usize {
        (self.y1 - self.y0) as usize
    }
}

/// Converts outlines into per-pixel coverage.
#[derive(Debug, Default)]
pub(crate) struct Rasterizer {
    /// Signed area accumulation, `width + 2` cells per row.
    acc: Vec<f32>,

    /// Coverage of the row being emitted.
    row: Vec<f32>,

    /// The region being rasterized.
    region: Option<Region>,
}

impl Rasterizer {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn stride(&self) -> usize {
        self.region.map_or(0, |r| r.width() + 2)
    }

    /// Prepare to rasterize into `region`, discarding anything accumulated before.
    pub(crate) fn reset(&mut self, region: Region) {
        self.region = Some(region);
        let len = (region.width() + 2) * region.height();
        self.acc.clear();
        self.acc.resize(len, 0.0);
    }

    /// Accumulate every contour of an outline as a closed polygon.
    pub(crate) fn add_outline(&mut self, outline: &Outline) {
        for contour in outline.contours() {
            let points = contour.points;
            if points.len() < 3 {
                continue;
            }

            for (i, &p0) in points.iter().enumerate() {
                let p1 = points[(i + 1) % points.len()];
                self.add_line(p0, p1);
            }
        }
    }

    /// Accumulate one device-space edge.
    fn add_line(&mut self, p0: Point, p1: Point) {
        let region = match self.region {
            Some(region) => region,
            None => return,
        };

        // Move into region-local coordinates.
        let origin = Point::new(region.x0 as f64, region.y0 as f64);
        let p0 = (p0 - origin).to_point();
        let p1 = (p1 - origin).to_point();
        let width = region.width() as f64;

        if (p0.y - p1.y).abs() < f64::EPSILON {
            return;
        }

        // Split the edge where it crosses the left and right borders. Parts outside are
        // replaced with vertical edges on the border, which still carry their winding.
        let mut cuts: ArrayVec<f64, 2> = ArrayVec::new();
        for border in [0.0, width] {
            if (p0.x - border) * (p1.x - border) < 0.0 {
                cuts.push((border - p0.x) / (p1.x - p0.x));
            }
        }
        if cuts.len() == 2 && cuts[0] > cuts[1] {
            cuts.swap(0, 1);
        }

        let mut points: ArrayVec<Point, 4> = ArrayVec::new();
        points.push(p0);
        points.extend(cuts.iter().map(|&t| p0.lerp(p1, t)));
        points.push(p1);

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let mid = (a.x + b.x) * 0.5;
            let x = |v: f64| {
                if mid <= 0.0 {
                    0.0
                } else if mid >= width {
                    width
                } else {
                    v.max(0.0).min(width)
                }
            };

            self.draw_line(Point::new(x(a.x), a.y), Point::new(x(b.x), b.y));
        }
    }

    /// Deposit the area of a line already limited to `0..=width` horizontally.
    fn draw_line(&mut self, p0: Point, p1: Point) {
        let stride = self.stride();
        let height = self.region.map_or(0, |r| r.height());
        if p0.y == p1.y || stride == 0 {
            return;
        }

        let (dir, p0, p1) = if p0.y < p1.y {
            (1.0f32, p0, p1)
        } else {
            (-1.0f32, p1, p0)
        };
        let (x0, y0, x1, y1) = (p0.x as f32, p0.y as f32, p1.x as f32, p1.y as f32);
        if y0 >= y1 {
            return;
        }

        let dxdy = (x1 - x0) / (y1 - y0);
        let max_x = (stride - 2) as f32;
        let mut x = x0;
        if y0 < 0.0 {
            x -= y0 * dxdy;
        }
        x = x.max(0.0).min(max_x);

        let row_start = y0.max(0.0) as usize;
        let row_end = (y1.ceil().max(0.0) as usize).min(height);

        for y in row_start..row_end {
            let line = y * stride;
            let dy = ((y + 1) as f32).min(y1) - (y as f32).max(y0);
            let xnext = (x + dxdy * dy).max(0.0).min(max_x);
            let d = dy * dir;

            let (xa, xb) = if x < xnext { (x, xnext) } else { (xnext, x) };
            let xa_floor = xa.floor();
            let xa_i = xa_floor as usize;
            let xb_ceil = xb.ceil();
            let xb_i = xb_ceil as usize;

            if xb_i <= xa_i + 1 {
                // The edge stays within one pixel column on this row.
                let xmf = 0.5 * (x + xnext) - xa_floor;
                self.acc[line + xa_i] += d - d * xmf;
                self.acc[line + xa_i + 1] += d * xmf;
            } else {
                let s = (xb - xa).recip();
                let xa_f = xa - xa_floor;
                let a0 = 0.5 * s * (1.0 - xa_f) * (1.0 - xa_f);
                let xb_f = xb - xb_ceil + 1.0;
                let am = 0.5 * s * xb_f * xb_f;

                self.acc[line + xa_i] += d * a0;
                if xb_i == xa_i + 2 {
                    self.acc[line + xa_i + 1] += d * (1.0 - a0 - am);
                } else {
                    let a1 = s * (1.5 - xa_f);
                    self.acc[line + xa_i + 1] += d * (a1 - a0);
                    for xi in xa_i + 2..xb_i - 1 {
                        self.acc[line + xi] += d * s;
                    }
                    let a2 = a1 + (xb_i - xa_i - 3) as f32 * s;
                    self.acc[line + xb_i - 1] += d * (1.0 - a2 - am);
                }
                self.acc[line + xb_i] += d * am;
            }

            x = xnext;
        }
    }

    /// Resolve the accumulated area into coverage spans, then clear the accumulation.
    pub(crate) fn for_each_span(&mut self, rule: FillRule, mut f: impl FnMut(Span<'_>)) {
        let region = match self.region.take() {
            Some(region) => region,
            None => return,
        };
        let width = region.width();
        let stride = width + 2;

        for y in 0..region.height() {
            let line = &mut self.acc[y * stride..(y + 1) * stride];
            self.row.clear();

            let mut sum = 0.0f32;
            for cell in line[..width].iter_mut() {
                sum += *cell;
                *cell = 0.0;
                self.row.push(rule.coverage(sum));
            }
            line[width..].fill(0.0);

            // Split the row into runs of nonzero coverage.
            let mut x = 0;
            while x < width {
                if self.row[x] <= f32::EPSILON {
                    x += 1;
                    continue;
                }

                let start = x;
                while x < width && self.row[x] > f32::EPSILON {
                    x += 1;
                }

                f(Span {
                    x: region.x0 + start as u32,
                    y: region.y0 + y as u32,
                    coverage: &self.row[start..x],
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(outline: &Outline, region: Region, rule: FillRule) -> Vec<f32> {
        let mut rasterizer = Rasterizer::new();
        rasterizer.reset(region);
        rasterizer.add_outline(outline);

        let mut out = vec![0.0; region.width() * region.height()];
        rasterizer.for_each_span(rule, |span| {
            let row = (span.y - region.y0) as usize * region.width();
            let col = (span.x - region.x0) as usize;
            out[row + col..row + col + span.coverage.len()].copy_from_slice(span.coverage);
        });
        out
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> [Point; 4] {
        [
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    const FULL: Region = Region {
        x0: 0,
        y0: 0,
        x1: 8,
        y1: 8,
    };

    #[test]
    fn aligned_rect_is_exact() {
        let mut outline = Outline::new();
        outline.push_polygon(rect(1.0, 2.0, 4.0, 5.0));
        let cov = raster(&outline, FULL, FillRule::NonZero);

        for y in 0..8 {
            for x in 0..8 {
                let inside = (1..4).contains(&x) && (2..5).contains(&y);
                assert_eq!(cov[y * 8 + x], if inside { 1.0 } else { 0.0 }, "{x},{y}");
            }
        }
    }

    #[test]
    fn half_pixel_edges() {
        let mut outline = Outline::new();
        outline.push_polygon(rect(0.5, 0.0, 2.5, 1.0));
        let cov = raster(&outline, FULL, FillRule::NonZero);

        assert!((cov[0] - 0.5).abs() < 1e-5);
        assert!((cov[1] - 1.0).abs() < 1e-5);
        assert!((cov[2] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn diagonal_triangle_area() {
        let mut outline = Outline::new();
        outline.push_polygon([
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ]);
        let cov = raster(&outline, FULL, FillRule::NonZero);

        let total: f32 = cov.iter().sum();
        assert!((total - 8.0).abs() < 1e-3);
        // Pixels cut by the diagonal are half covered.
        assert!((cov[3] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn fill_rules_differ_on_overlap() {
        let mut outline = Outline::new();
        outline.push_polygon(rect(0.0, 0.0, 4.0, 4.0));
        outline.push_polygon(rect(2.0, 2.0, 6.0, 6.0));

        let nonzero = raster(&outline, FULL, FillRule::NonZero);
        let evenodd = raster(&outline, FULL, FillRule::EvenOdd);

        assert_eq!(nonzero[3 * 8 + 3], 1.0);
        assert_eq!(evenodd[3 * 8 + 3], 0.0);
        assert_eq!(evenodd[8 + 1], 1.0);
    }

    #[test]
    fn edges_outside_region_keep_winding() {
        // The polygon extends past both sides of a narrow region.
        let region = Region {
            x0: 2,
            y0: 0,
            x1: 4,
            y1: 2,
        };
        let mut outline = Outline::new();
        outline.push_polygon([
            Point::new(-3.0, 0.0),
            Point::new(9.0, 0.0),
            Point::new(7.0, 2.0),
            Point::new(-1.0, 2.0),
        ]);

        let cov = raster(&outline, region, FillRule::NonZero);
        assert!(cov.iter().all(|&c| (c - 1.0).abs() < 1e-5), "{cov:?}");
    }

    #[test]
    fn region_covering_clamps() {
        assert_eq!(
            Region::covering(Rect::new(-2.0, 1.5, 30.0, 2.2), 10, 10),
            Some(Region {
                x0: 0,
                y0: 1,
                x1: 10,
                y1: 3
            })
        );
        assert_eq!(Region::covering(Rect::new(11.0, 0.0, 12.0, 1.0), 10, 10), None);
    }
}
