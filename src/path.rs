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

//! The path under construction.
//!
//! Every point is mapped into device space as soon as it is added, so later changes to the
//! transform never affect segments that are already in the path.

use super::transform::scale_factor;

use piet::kurbo::{Affine, BezPath, PathEl, Point, Shape};

use std::f64::consts::TAU;

/// Accumulates the segments of the current path in device coordinates.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathBuilder {
    /// The path, already in device space.
    path: BezPath,
}

impl PathBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Remove every segment.
    pub(crate) fn clear(&mut self) {
        self.path.truncate(0);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.path.elements().is_empty()
    }

    /// The device-space path.
    pub(crate) fn path(&self) -> &BezPath {
        &self.path
    }

    pub(crate) fn move_to(&mut self, transform: Affine, p: Point) {
        self.path.move_to(transform * p);
    }

    pub(crate) fn line_to(&mut self, transform: Affine, p: Point) {
        if self.is_empty() {
            self.move_to(transform, p);
        } else {
            self.path.line_to(transform * p);
        }
    }

    pub(crate) fn curve_to(&mut self, transform: Affine, c1: Point, c2: Point, end: Point) {
        if self.is_empty() {
            self.path.move_to(transform * c1);
        }

        self.path
            .curve_to(transform * c1, transform * c2, transform * end);
    }

    pub(crate) fn close_path(&mut self) {
        if !self.is_empty() {
            self.path.close_path();
        }
    }

    /// Add a circular arc.
    ///
    /// Angles are in degrees and sweep toward increasing angle, wrapping once around if the
    /// end is below the start. The arc is split into line segments; the step shrinks as the
    /// device-space radius grows so that the facets stay below a fraction of a pixel. The
    /// first point joins the existing path with a line.
    pub(crate) fn arc_to(
        &mut self,
        transform: Affine,
        center: Point,
        radius: f64,
        start_deg: f64,
        end_deg: f64,
    ) {
        let mut start = start_deg.to_radians();
        let mut end = end_deg.to_radians();

        if (end - start).abs() >= TAU {
            start = 0.0;
            end = TAU;
        } else if end < start {
            end += TAU;
        }

        let step = arc_step(radius.abs(), scale_factor(&transform));
        let at = |angle: f64| {
            let (sin, cos) = angle.sin_cos();
            transform * Point::new(center.x + cos * radius, center.y + sin * radius)
        };

        let first = at(start);
        if self.is_empty() {
            self.path.move_to(first);
        } else {
            self.path.line_to(first);
        }

        let mut angle = start + step;
        while angle < end - step / 4.0 {
            self.path.line_to(at(angle));
            angle += step;
        }

        self.path.line_to(at(end));
    }

    /// Append an arbitrary shape as one or more closed subpaths.
    pub(crate) fn add_shape(&mut self, transform: Affine, shape: impl Shape, tolerance: f64) {
        for el in shape.path_elements(tolerance) {
            match el {
                PathEl::MoveTo(p) => self.path.move_to(transform * p),
                PathEl::LineTo(p) => self.path.line_to(transform * p),
                PathEl::QuadTo(c, p) => self.path.quad_to(transform * c, transform * p),
                PathEl::CurveTo(c1, c2, p) => {
                    self.path
                        .curve_to(transform * c1, transform * c2, transform * p)
                }
                PathEl::ClosePath => self.path.close_path(),
            }
        }
    }
}

/// The angle between two arc points for a device-space radius.
fn arc_step(radius: f64, scale: f64) -> f64 {
    let device_radius = radius * scale;
    if device_radius <= f64::EPSILON {
        return TAU;
    }

    let step = (device_radius / (device_radius + 0.125)).acos() * 2.0;
    step.max(1e-4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use piet::kurbo::Rect;

    fn points(builder: &PathBuilder) -> Vec<Point> {
        builder
            .path()
            .elements()
            .iter()
            .filter_map(|el| match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn points_are_transformed_on_insertion() {
        let mut builder = PathBuilder::new();
        builder.move_to(Affine::translate((5.0, 0.0)), Point::new(1.0, 1.0));
        builder.line_to(Affine::scale(2.0), Point::new(1.0, 1.0));

        assert_eq!(
            points(&builder),
            vec![Point::new(6.0, 1.0), Point::new(2.0, 2.0)]
        );
    }

    #[test]
    fn arc_gets_finer_with_scale() {
        let mut small = PathBuilder::new();
        small.arc_to(Affine::IDENTITY, Point::ZERO, 10.0, 0.0, 90.0);
        let mut large = PathBuilder::new();
        large.arc_to(Affine::scale(8.0), Point::ZERO, 10.0, 0.0, 90.0);

        assert!(points(&large).len() > points(&small).len());

        let end = *points(&small).last().unwrap();
        assert!((end.x - 0.0).abs() < 1e-9);
        assert!((end.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn arc_wraps_when_end_is_before_start() {
        let mut builder = PathBuilder::new();
        builder.arc_to(Affine::IDENTITY, Point::ZERO, 10.0, 270.0, 90.0);

        // Sweeps through 0 degrees, so it passes the positive x axis.
        assert!(points(&builder).iter().any(|p| p.x > 9.9));
    }

    #[test]
    fn arc_joins_existing_path() {
        let mut builder = PathBuilder::new();
        builder.move_to(Affine::IDENTITY, Point::new(-5.0, -5.0));
        builder.arc_to(Affine::IDENTITY, Point::ZERO, 1.0, 0.0, 180.0);

        let moves = builder
            .path()
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::MoveTo(_)))
            .count();
        assert_eq!(moves, 1);
    }

    #[test]
    fn clear_empties() {
        let mut builder = PathBuilder::new();
        builder.add_shape(Affine::IDENTITY, Rect::new(0.0, 0.0, 1.0, 1.0), 0.1);
        assert!(!builder.is_empty());
        builder.clear();
        assert!(builder.is_empty());
        assert!(builder.path().elements().is_empty());
    }
}
