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

//! Expanding polylines into fillable stroke outlines.
//!
//! Every open contour becomes a single polygon running down one side of the line, around
//! the end cap, back up the other side and around the start cap, with the joins placed
//! inline. A closed contour becomes a pair of rings. Nothing overlaps along the edges, so the
//! coverage of antialiased pixels is exact.

use super::outline::{signed_area, Contour, Outline};

use kurbo::{Point, Vec2};
use piet::{LineCap, LineJoin, StrokeStyle};

use std::f64::consts::PI;

/// The default miter limit, matching `piet`.
pub const DEFAULT_MITER_LIMIT: f64 = 10.0;

/// A dash pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dash {
    /// Alternating "on" and "off" lengths.
    pub pattern: Vec<f64>,

    /// How far into the pattern each contour starts.
    pub offset: f64,
}

/// How a path is stroked.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeOptions {
    pub cap: LineCap,

    /// Miter joins carry their own limit.
    pub join: LineJoin,

    pub dash: Option<Dash>,

    /// Keep the path after stroking.
    pub preserve: bool,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            cap: LineCap::Butt,
            join: LineJoin::Miter {
                limit: DEFAULT_MITER_LIMIT,
            },
            dash: None,
            preserve: false,
        }
    }
}

impl From<&StrokeStyle> for StrokeOptions {
    fn from(style: &StrokeStyle) -> Self {
        let dash = if style.dash_pattern.is_empty() {
            None
        } else {
            Some(Dash {
                pattern: style.dash_pattern.iter().copied().collect(),
                offset: style.dash_offset,
            })
        };

        Self {
            cap: style.line_cap,
            join: style.line_join,
            dash,
            preserve: false,
        }
    }
}

impl StrokeOptions {
    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    /// The ratio of miter length to line width past which a miter turns into a bevel.
    pub fn miter_limit(&self) -> f64 {
        match self.join {
            LineJoin::Miter { limit } => limit,
            _ => DEFAULT_MITER_LIMIT,
        }
    }

    pub fn with_dash(mut self, pattern: impl Into<Vec<f64>>, offset: f64) -> Self {
        self.dash = Some(Dash {
            pattern: pattern.into(),
            offset,
        });
        self
    }

    pub fn with_preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }
}

/// A buffer for stroking a path.
#[derive(Debug, Default)]
pub(crate) struct StrokeBuffer {
    /// The output polygons.
    output: Outline,

    /// The contour being stroked with repeated points removed, forwards and backwards.
    forward: Vec<Point>,
    backward: Vec<Point>,

    /// The polygon being built, and the inner ring of a closed contour.
    outer: Vec<Point>,
    inner: Vec<Point>,
}

impl StrokeBuffer {
    /// Create a new stroke buffer.
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The stroked outline, to be filled with the non-zero rule.
    pub(crate) fn output(&self) -> &Outline {
        &self.output
    }

    /// Stroke every contour of `input` with a line `width` device pixels wide.
    ///
    /// This overwrites the previous contents of the output.
    pub(crate) fn expand(
        &mut self,
        input: &Outline,
        width: f64,
        options: &StrokeOptions,
        tolerance: f64,
    ) {
        self.output.clear();
        if !(width > 0.0) || !width.is_finite() {
            return;
        }

        let pen = Pen {
            half: width / 2.0,
            join: options.join,
            miter_limit: options.miter_limit(),
            tolerance,
        };
        for contour in input.contours() {
            self.stroke_contour(contour, &pen, options.cap);
        }
    }

    fn stroke_contour(&mut self, contour: Contour<'_>, pen: &Pen, cap: LineCap) {
        self.forward.clear();
        for &p in contour.points {
            if self.forward.last().map_or(true, |&last| direction(last, p).is_some()) {
                self.forward.push(p);
            }
        }

        let n = self.forward.len();
        if contour.closed && n > 2 && direction(self.forward[n - 1], self.forward[0]).is_none() {
            self.forward.pop();
        }

        let n = self.forward.len();
        match n {
            0 => return,
            1 => {
                // A zero-length contour still shows its caps.
                let at = self.forward[0];
                self.dot(at, pen, cap);
                return;
            }
            _ => {}
        }

        self.backward.clear();
        self.backward.extend(self.forward.iter().rev());
        self.outer.clear();

        if contour.closed && n > 2 {
            // Two rings: one on each side of the contour.
            self.inner.clear();
            pen.offset(&self.forward, true, &mut self.outer);
            pen.offset(&self.backward, true, &mut self.inner);

            let (a, b) = (signed_area(&self.outer), signed_area(&self.inner));
            let outer_area = if a.abs() >= b.abs() { a } else { -b };
            if outer_area < 0.0 {
                self.outer.reverse();
                self.inner.reverse();
            }

            self.output.push_polygon(self.outer.iter().copied());
            self.output.push_polygon(self.inner.iter().copied());
            return;
        }

        // Down one side, around the end cap, back up the other side and around the start cap.
        let (first, last) = (self.forward[0], self.forward[n - 1]);
        pen.offset(&self.forward, false, &mut self.outer);
        pen.cap(&mut self.outer, last, unit(self.forward[n - 2], last), cap);
        pen.offset(&self.backward, false, &mut self.outer);
        pen.cap(&mut self.outer, first, unit(self.forward[1], first), cap);

        push_oriented(&mut self.output, &self.outer);
    }

    /// The caps of a contour with no length.
    fn dot(&mut self, at: Point, pen: &Pen, cap: LineCap) {
        let half = pen.half;
        self.outer.clear();

        match cap {
            LineCap::Butt => return,
            LineCap::Square => self.outer.extend([
                Point::new(at.x - half, at.y - half),
                Point::new(at.x + half, at.y - half),
                Point::new(at.x + half, at.y + half),
                Point::new(at.x - half, at.y + half),
            ]),
            LineCap::Round => {
                let start = Vec2::new(half, 0.0);
                self.outer.push(at + start);
                pen.arc(&mut self.outer, at, start, 2.0 * PI);
            }
        }

        push_oriented(&mut self.output, &self.outer);
    }
}

/// The geometry of the line being drawn.
#[derive(Debug, Clone, Copy)]
struct Pen {
    half: f64,
    join: LineJoin,
    miter_limit: f64,
    tolerance: f64,
}

impl Pen {
    /// Push the left-hand offset of a polyline.
    ///
    /// Open polylines start and end with the offsets of their end points. Closed ones have a
    /// join at every vertex.
    fn offset(&self, points: &[Point], closed: bool, out: &mut Vec<Point>) {
        let n = points.len();

        if closed {
            for i in 0..n {
                self.join(out, points[(i + n - 1) % n], points[i], points[(i + 1) % n]);
            }
            return;
        }

        out.push(points[0] + normal(unit(points[0], points[1])) * self.half);
        for i in 1..n - 1 {
            self.join(out, points[i - 1], points[i], points[i + 1]);
        }
        out.push(points[n - 1] + normal(unit(points[n - 2], points[n - 1])) * self.half);
    }

    /// Push the left-hand side of the corner at `at`.
    fn join(&self, out: &mut Vec<Point>, prev: Point, at: Point, next: Point) {
        let (d0, d1) = (unit(prev, at), unit(at, next));
        let n0 = normal(d0) * self.half;
        let n1 = normal(d1) * self.half;
        let cross = d0.cross(d1);
        let dot = d0.dot(d1);

        if cross.abs() <= 1e-9 && dot > 0.0 {
            // Straight continuation.
            out.push(at + n1);
            return;
        }

        if cross > 1e-9 {
            // The inner side of the turn. Both offset edges stop where they cross, unless
            // that lies beyond the end of either segment.
            let reach = self.half * cross / (1.0 + dot);
            if reach <= (at - prev).hypot().min((next - at).hypot()) {
                out.push(at + (n0 + n1) / (1.0 + dot));
            } else {
                out.extend([at + n0, at, at + n1]);
            }
            return;
        }

        out.push(at + n0);
        match self.join {
            LineJoin::Miter { .. } => {
                if dot > -1.0 + 1e-12 && (2.0 / (1.0 + dot)).sqrt() <= self.miter_limit {
                    out.push(at + (n0 + n1) / (1.0 + dot));
                }
            }
            LineJoin::Round => {
                // A full reversal goes around the front.
                let sweep = if cross.abs() <= 1e-9 {
                    -PI
                } else {
                    cross.atan2(dot)
                };
                self.arc(out, at, n0, sweep);
            }
            LineJoin::Bevel => {}
        }
        out.push(at + n1);
    }

    /// Push a cap at `at` facing `dir`, running from the left-hand offset to the right.
    fn cap(&self, out: &mut Vec<Point>, at: Point, dir: Vec2, cap: LineCap) {
        let n = normal(dir) * self.half;
        match cap {
            LineCap::Butt => {}
            LineCap::Square => {
                let ahead = dir * self.half;
                out.extend([at + n + ahead, at - n + ahead]);
            }
            LineCap::Round => self.arc(out, at, n, -PI),
        }
    }

    /// Push the points strictly between `center + from` and that point turned by `sweep`.
    fn arc(&self, out: &mut Vec<Point>, center: Point, from: Vec2, sweep: f64) {
        let full = circle_segments(self.half, self.tolerance) as f64;
        let steps = (full * sweep.abs() / (2.0 * PI)).ceil().max(1.0) as usize;

        out.extend((1..steps).map(|i| {
            let (sin, cos) = (sweep * i as f64 / steps as f64).sin_cos();
            center + Vec2::new(from.x * cos - from.y * sin, from.x * sin + from.y * cos)
        }));
    }
}

/// Add a polygon wound in the positive direction.
fn push_oriented(output: &mut Outline, points: &[Point]) {
    if signed_area(points) >= 0.0 {
        output.push_polygon(points.iter().copied());
    } else {
        output.push_polygon(points.iter().rev().copied());
    }
}

fn direction(a: Point, b: Point) -> Option<Vec2> {
    let d = b - a;
    let len = d.hypot();
    if len <= f64::EPSILON {
        None
    } else {
        Some(d / len)
    }
}

/// The unit direction from `a` to `b`, which must be distinct.
fn unit(a: Point, b: Point) -> Vec2 {
    let d = b - a;
    d / d.hypot()
}

/// The left-hand unit normal of a unit direction.
fn normal(dir: Vec2) -> Vec2 {
    Vec2::new(-dir.y, dir.x)
}

/// Segments needed for a circle to stay within `tolerance` of the true curve.
fn circle_segments(radius: f64, tolerance: f64) -> usize {
    if radius <= tolerance {
        return 8;
    }

    let step = 2.0 * (1.0 - tolerance / radius).acos();
    ((2.0 * PI / step).ceil() as usize).clamp(8, 256)
}
