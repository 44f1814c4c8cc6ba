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

//! Flattened polylines.

use piet::kurbo::{BezPath, PathEl, Point, Rect};

/// Points closer than this are merged.
const MERGE_EPSILON: f64 = 1e-9;

/// A set of polylines in device space.
///
/// Points for every contour live in one buffer so the outline can be reused between draws
/// without reallocating.
#[derive(Debug, Clone, Default)]
pub(crate) struct Outline {
    points: Vec<Point>,
    contours: Vec<Span>,

    /// Start of the contour being built, if any.
    open: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    closed: bool,
}

/// A single polyline of an [`Outline`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Contour<'a> {
    pub(crate) points: &'a [Point],
    pub(crate) closed: bool,
}

impl<'a> Contour<'a> {
    /// Iterate over the segments, including the closing one for closed contours.
    pub(crate) fn segments(&self) -> impl Iterator<Item = (Point, Point)> + 'a {
        let points = self.points;
        let closing = match (self.closed, points.first(), points.last()) {
            (true, Some(&first), Some(&last)) if points.len() > 2 => Some((last, first)),
            _ => None,
        };

        points
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .chain(closing)
    }
}

impl Outline {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
        self.contours.clear();
        self.open = None;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub(crate) fn contours(&self) -> impl Iterator<Item = Contour<'_>> + '_ {
        self.contours.iter().map(move |span| Contour {
            points: &self.points[span.start..span.end],
            closed: span.closed,
        })
    }

    /// Start a new contour, finishing the previous one as open.
    pub(crate) fn begin(&mut self) {
        self.finish(false);
        self.open = Some(self.points.len());
    }

    /// Add a point to the contour being built.
    pub(crate) fn push(&mut self, point: Point) {
        let start = match self.open {
            Some(start) => start,
            None => {
                self.begin();
                self.points.len()
            }
        };

        if self.points.len() > start {
            if let Some(last) = self.points.last() {
                if (last.x - point.x).abs() < MERGE_EPSILON
                    && (last.y - point.y).abs() < MERGE_EPSILON
                {
                    return;
                }
            }
        }

        self.points.push(point);
    }

    /// Finish the contour being built.
    pub(crate) fn finish(&mut self, closed: bool) {
        let start = match self.open.take() {
            Some(start) => start,
            None => return,
        };

        let mut end = self.points.len();
        if closed && end - start > 1 {
            let first = self.points[start];
            let last = self.points[end - 1];
            if (first.x - last.x).abs() < MERGE_EPSILON && (first.y - last.y).abs() < MERGE_EPSILON
            {
                self.points.pop();
                end -= 1;
            }
        }

        if end > start {
            self.contours.push(Span { start, end, closed });
        }
    }

    /// Add a closed polygon.
    pub(crate) fn push_polygon(&mut self, points: impl IntoIterator<Item = Point>) {
        self.begin();
        for point in points {
            self.push(point);
        }
        self.finish(true);
    }

    /// Drop the contour being built.
    fn discard(&mut self) {
        if let Some(start) = self.open.take() {
            self.points.truncate(start);
        }
    }

    /// Flatten a path into this outline.
    ///
    /// A subpath made of a lone move has no segments and is left out.
    pub(crate) fn extend_from_path(&mut self, path: &BezPath, tolerance: f64) {
        let mut subpath_start = None;
        let mut has_segment = false;

        piet::kurbo::flatten(path.elements().iter().copied(), tolerance, |el| match el {
            PathEl::MoveTo(p) => {
                if !has_segment {
                    self.discard();
                }
                self.begin();
                self.push(p);
                subpath_start = Some(p);
                has_segment = false;
            }
            PathEl::LineTo(p) => {
                if self.open.is_none() {
                    // A segment after a close starts over from the subpath's first point.
                    self.begin();
                    if let Some(start) = subpath_start {
                        self.push(start);
                    }
                }
                self.push(p);
                has_segment = true;
            }
            PathEl::ClosePath => {
                if has_segment {
                    self.finish(true);
                } else {
                    self.discard();
                }
            }
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {
                unreachable!("flattening only produces lines")
            }
        });

        if !has_segment {
            self.discard();
        }
        self.finish(false);
    }

    /// The bounding box of every point.
    pub(crate) fn bounds(&self) -> Option<Rect> {
        let mut iter = self.contours().flat_map(|c| c.points.iter().copied());
        let first = iter.next()?;
        Some(iter.fold(Rect::from_points(first, first), |rect, p| {
            rect.union_pt(p)
        }))
    }
}

/// Twice the signed area of a polygon.
pub(crate) fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use piet::kurbo::{Circle, Shape};

    #[test]
    fn flattens_curves() {
        let mut outline = Outline::new();
        let circle = Circle::new((0.0, 0.0), 10.0).into_path(0.1);
        outline.extend_from_path(&circle, 0.1);

        let contours: Vec<_> = outline.contours().collect();
        assert_eq!(contours.len(), 1);
        assert!(contours[0].closed);
        assert!(contours[0].points.len() > 8);
    }

    #[test]
    fn duplicate_closing_point_is_dropped() {
        let mut outline = Outline::new();
        outline.push_polygon([
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ]);

        let contour = outline.contours().next().unwrap();
        assert_eq!(contour.points.len(), 3);
        assert_eq!(contour.segments().count(), 3);
    }

    #[test]
    fn open_contours_have_no_closing_segment() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((5.0, 0.0));
        path.line_to((5.0, 5.0));

        let mut outline = Outline::new();
        outline.extend_from_path(&path, 0.1);
        let contour = outline.contours().next().unwrap();
        assert!(!contour.closed);
        assert_eq!(contour.segments().count(), 2);
        assert_eq!(outline.bounds(), Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn area_sign_follows_orientation() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert_eq!(signed_area(&square), 8.0);

        let mut reversed = square;
        reversed.reverse();
        assert_eq!(signed_area(&reversed), -8.0);
    }

    #[test]
    fn lone_moves_are_dropped() {
        let mut path = BezPath::new();
        path.move_to((5.0, 5.0));
        path.move_to((15.0, 15.0));
        path.line_to((18.0, 15.0));
        path.move_to((2.0, 2.0));

        let mut outline = Outline::new();
        outline.extend_from_path(&path, 0.1);
        let contours: Vec<_> = outline.contours().collect();
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0].points,
            &[Point::new(15.0, 15.0), Point::new(18.0, 15.0)]
        );
    }

    #[test]
    fn zero_length_segment_is_kept() {
        let mut path = BezPath::new();
        path.move_to((5.0, 5.0));
        path.line_to((5.0, 5.0));

        let mut outline = Outline::new();
        outline.extend_from_path(&path, 0.1);
        let contour = outline.contours().next().unwrap();
        assert_eq!(contour.points, &[Point::new(5.0, 5.0)]);
    }
}
