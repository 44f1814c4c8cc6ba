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

//! Splitting polylines into dashes.

use super::outline::Outline;

/// A buffer for holding the result of a dash operation.
#[derive(Debug, Default)]
pub(crate) struct DashBuffer {
    /// The dashed polylines. Every contour is open.
    output: Outline,

    /// Dash pattern buffer, always of even length.
    pattern: Vec<f64>,
}

impl DashBuffer {
    /// Create an empty dash buffer.
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn output(&self) -> &Outline {
        &self.output
    }

    /// Split `input` into its "on" dashes.
    ///
    /// An odd-length `dashes` is read twice so that "on" and "off" keep alternating. The
    /// pattern restarts at `offset` on every contour. Returns `false` and leaves the output
    /// empty if the pattern can't be used, in which case the caller should stroke `input`
    /// undashed.
    pub(crate) fn apply(&mut self, input: &Outline, dashes: &[f64], offset: f64) -> bool {
        self.output.clear();
        self.pattern.clear();
        self.pattern.extend_from_slice(dashes);
        if self.pattern.len() % 2 == 1 {
            self.pattern.extend_from_slice(dashes);
        }

        let total: f64 = self.pattern.iter().sum();
        if self.pattern.iter().any(|d| !d.is_finite() || *d < 0.0) || total <= f64::EPSILON {
            tracing::warn!("ignoring unusable dash pattern {:?}", dashes);
            return false;
        }

        // Find where in the pattern the offset lands. A zero-length dash at the very start
        // is kept, so that it still draws its caps.
        let mut phase = offset.rem_euclid(total);
        let mut start_index = 0;
        while phase > 0.0 && phase >= self.pattern[start_index] {
            phase -= self.pattern[start_index];
            start_index = (start_index + 1) % self.pattern.len();
        }

        for contour in input.contours() {
            let mut index = start_index;
            let mut remaining = self.pattern[index] - phase;
            let mut on = index % 2 == 0;

            if on {
                self.output.begin();
                if let Some(&first) = contour.points.first() {
                    self.output.push(first);
                }
            }

            for (mut a, b) in contour.segments() {
                let mut length = (b - a).hypot();

                while length > remaining {
                    // The current dash ends partway along this segment.
                    let t = remaining / length;
                    let split = a.lerp(b, t);
                    length -= remaining;
                    a = split;

                    if on {
                        self.output.push(split);
                        self.output.finish(false);
                    } else {
                        self.output.begin();
                        self.output.push(split);
                    }

                    index = (index + 1) % self.pattern.len();
                    remaining = self.pattern[index];
                    on = !on;
                }

                remaining -= length;
                if on {
                    self.output.push(b);
                }
            }

            if on {
                self.output.finish(false);
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piet::kurbo::Point;

    fn line(length: f64) -> Outline {
        let mut outline = Outline::new();
        outline.begin();
        outline.push(Point::new(0.0, 0.0));
        outline.push(Point::new(length, 0.0));
        outline.finish(false);
        outline
    }

    fn dash_ranges(buffer: &DashBuffer) -> Vec<(f64, f64)> {
        buffer
            .output()
            .contours()
            .map(|c| {
                let first = c.points[0].x;
                let last = c.points[c.points.len() - 1].x;
                ((first * 1e6).round() / 1e6, (last * 1e6).round() / 1e6)
            })
            .collect()
    }

    #[test]
    fn simple_dashes() {
        let mut buffer = DashBuffer::new();
        assert!(buffer.apply(&line(10.0), &[2.0, 1.0], 0.0));
        assert_eq!(
            dash_ranges(&buffer),
            vec![(0.0, 2.0), (3.0, 5.0), (6.0, 8.0), (9.0, 10.0)]
        );
    }

    #[test]
    fn offset_shifts_pattern() {
        let mut buffer = DashBuffer::new();
        buffer.apply(&line(10.0), &[2.0, 1.0], 1.0);
        assert_eq!(
            dash_ranges(&buffer),
            vec![(0.0, 1.0), (2.0, 4.0), (5.0, 7.0), (8.0, 10.0)]
        );

        // Landing in an "off" gap starts with nothing drawn.
        buffer.apply(&line(10.0), &[2.0, 1.0], 2.5);
        assert_eq!(dash_ranges(&buffer)[0], (0.5, 2.5));
    }

    #[test]
    fn odd_pattern_is_doubled() {
        let mut odd = DashBuffer::new();
        let mut doubled = DashBuffer::new();
        odd.apply(&line(40.0), &[3.0, 1.0, 2.0], 0.5);
        doubled.apply(&line(40.0), &[3.0, 1.0, 2.0, 3.0, 1.0, 2.0], 0.5);

        assert_eq!(dash_ranges(&odd), dash_ranges(&doubled));
        // 3 on, 1 off, 2 on, 3 off, ...
        assert_eq!(dash_ranges(&odd)[1], (3.5, 5.5));
    }

    #[test]
    fn dashes_follow_corners() {
        let mut outline = Outline::new();
        outline.push_polygon([
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ]);

        let mut buffer = DashBuffer::new();
        buffer.apply(&outline, &[6.0, 2.0], 0.0);
        let first = buffer.output().contours().next().unwrap();
        assert_eq!(
            first.points,
            &[
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 2.0)
            ]
        );
        // The closing edge is dashed too.
        assert_eq!(buffer.output().contours().count(), 2);
    }

    #[test]
    fn unusable_patterns_are_rejected() {
        let mut buffer = DashBuffer::new();
        assert!(!buffer.apply(&line(10.0), &[0.0, 0.0], 0.0));
        assert!(!buffer.apply(&line(10.0), &[1.0, -1.0], 0.0));
        assert!(buffer.output().is_empty());
    }

    #[test]
    fn leading_zero_length_dash_is_kept() {
        let mut buffer = DashBuffer::new();
        assert!(buffer.apply(&line(10.0), &[0.0, 4.0], 0.0));
        assert_eq!(
            dash_ranges(&buffer),
            vec![(0.0, 0.0), (4.0, 4.0), (8.0, 8.0)]
        );
        assert!(buffer.output().contours().all(|c| c.points.len() == 1));
    }
}
