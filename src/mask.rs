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

//! The clip region.
//!
//! Rectangular clips are applied to geometry before rasterization. Any other clip shape is
//! rendered into a coverage mask which scales the coverage of later draws.

use super::outline::Outline;
use super::rasterizer::{FillRule, Rasterizer, Region};

use piet::kurbo::{Point, Rect};
use tinyvec::TinyVec;

use std::rc::Rc;

/// A per-pixel coverage mask the size of the target.
#[derive(Debug, Clone)]
pub(crate) struct ClipMask {
    width: u32,
    data: Vec<u8>,

    /// The smallest region holding every nonzero value.
    bounds: Option<Region>,
}

impl ClipMask {
    /// Render an outline into a new mask.
    fn render(
        outline: &Outline,
        rule: FillRule,
        rasterizer: &mut Rasterizer,
        width: u32,
        height: u32,
    ) -> Self {
        let mut mask = ClipMask {
            width,
            data: vec![0; width as usize * height as usize],
            bounds: None,
        };

        let region = outline
            .bounds()
            .and_then(|rect| Region::covering(rect, width, height));
        if let Some(region) = region {
            rasterizer.reset(region);
            rasterizer.add_outline(outline);
            rasterizer.for_each_span(rule, |span| {
                let start = span.y as usize * width as usize + span.x as usize;
                for (dst, &c) in mask.data[start..start + span.coverage.len()]
                    .iter_mut()
                    .zip(span.coverage)
                {
                    *dst = (c.min(1.0) * 255.0 + 0.5) as u8;
                }
            });
            mask.bounds = Some(region);
        }

        mask
    }

    /// Multiply this mask by another one of the same size.
    fn intersect(&mut self, other: &ClipMask) {
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a = ((*a as u32 * b as u32 + 127) / 255) as u8;
        }

        self.bounds = match (self.bounds, other.bounds) {
            (Some(a), Some(b)) => a.intersect(b),
            _ => None,
        };
    }

    /// Coverage of `len` pixels starting at `(x, y)`.
    pub(crate) fn row(&self, x: u32, y: u32, len: usize) -> &[u8] {
        let start = y as usize * self.width as usize + x as usize;
        &self.data[start..start + len]
    }

    #[cfg(test)]
    fn at(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// The clip state of one saved level.
#[derive(Debug, Clone, Default)]
pub(crate) struct Clip {
    /// Device-space rectangle everything is limited to.
    rect: Option<Rect>,

    /// Coverage mask for non-rectangular clips.
    mask: Option<Rc<ClipMask>>,
}

impl Clip {
    pub(crate) fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub(crate) fn mask(&self) -> Option<&ClipMask> {
        self.mask.as_deref()
    }

    /// The pixels drawing can reach, or `None` if the clip is empty.
    pub(crate) fn bounds(&self, width: u32, height: u32) -> Option<Region> {
        let mut region = Region::covering(
            Rect::new(0.0, 0.0, width as f64, height as f64),
            width,
            height,
        )?;

        if let Some(rect) = self.rect {
            region = region.intersect(Region::covering(rect, width, height)?)?;
        }
        if let Some(mask) = &self.mask {
            region = region.intersect(mask.bounds?)?;
        }

        Some(region)
    }

    /// Limit drawing to a device-space rectangle.
    pub(crate) fn intersect_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.rect = Some(match self.rect {
            Some(current) => {
                let inter = current.intersect(rect);
                if inter.width() <= 0.0 || inter.height() <= 0.0 {
                    Rect::ZERO
                } else {
                    inter
                }
            }
            None => rect,
        });
    }

    /// Limit drawing to the inside of an outline.
    pub(crate) fn intersect_outline(
        &mut self,
        outline: &Outline,
        rule: FillRule,
        rasterizer: &mut Rasterizer,
        width: u32,
        height: u32,
    ) {
        let new = ClipMask::render(outline, rule, rasterizer, width, height);
        match &mut self.mask {
            Some(mask) => Rc::make_mut(mask).intersect(&new),
            None => self.mask = Some(Rc::new(new)),
        }
    }
}

/// The clip of the current level, plus every saved one beneath it.
#[derive(Debug, Clone)]
pub(crate) struct ClipStack {
    clips: TinyVec<[Clip; 1]>,
}

impl Default for ClipStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipStack {
    pub(crate) fn new() -> Self {
        Self {
            clips: TinyVec::from([Clip::default()]),
        }
    }

    pub(crate) fn current(&self) -> &Clip {
        &self.clips[self.clips.len() - 1]
    }

    pub(crate) fn current_mut(&mut self) -> &mut Clip {
        let last = self.clips.len() - 1;
        &mut self.clips[last]
    }

    /// Save the current clip. Clips added afterwards are dropped by the matching `restore`.
    pub(crate) fn save(&mut self) {
        let current = self.current().clone();
        self.clips.push(current);
    }

    /// Go back to the clip at the matching `save`. Returns `false` if nothing was saved.
    pub(crate) fn restore(&mut self) -> bool {
        if self.clips.len() <= 1 {
            return false;
        }

        self.clips.pop();
        true
    }

    /// Remove the clip at the current level.
    pub(crate) fn reset(&mut self) {
        *self.current_mut() = Clip::default();
    }
}

/// A buffer for clipping outlines against the clip rectangle.
#[derive(Debug, Default)]
pub(crate) struct ClipBuffer {
    output: Outline,
    front: Vec<Point>,
    back: Vec<Point>,
}

impl ClipBuffer {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Intersect every contour of `input` with the clip rectangle.
    ///
    /// Each contour is treated as a closed polygon and clipped on its own, which keeps the
    /// winding number of every point inside the rectangle. Without a clip rectangle the
    /// input is passed through.
    pub(crate) fn apply<'a>(&'a mut self, input: &'a Outline, clip: &Clip) -> &'a Outline {
        let rect = match clip.rect() {
            Some(rect) => rect,
            None => return input,
        };

        // Nothing to do if the outline already fits.
        if let Some(bounds) = input.bounds() {
            if rect.contains(bounds.origin()) && rect.contains(Point::new(bounds.x1, bounds.y1)) {
                return input;
            }
        }

        self.output.clear();
        for contour in input.contours() {
            self.front.clear();
            self.front.extend_from_slice(contour.points);

            for edge in 0..4 {
                self.back.clear();
                clip_edge(&self.front, &mut self.back, rect, edge);
                std::mem::swap(&mut self.front, &mut self.back);
            }

            if self.front.len() >= 3 {
                self.output.push_polygon(self.front.iter().copied());
            }
        }

        &self.output
    }
}

/// One Sutherland-Hodgman pass against a single side of `rect`.
fn clip_edge(input: &[Point], output: &mut Vec<Point>, rect: Rect, edge: u8) {
    let inside = |p: Point| match edge {
        0 => p.x >= rect.x0,
        1 => p.x <= rect.x1,
        2 => p.y >= rect.y0,
        _ => p.y <= rect.y1,
    };
    let cross = |a: Point, b: Point| {
        let t = match edge {
            0 => (rect.x0 - a.x) / (b.x - a.x),
            1 => (rect.x1 - a.x) / (b.x - a.x),
            2 => (rect.y0 - a.y) / (b.y - a.y),
            _ => (rect.y1 - a.y) / (b.y - a.y),
        };
        let mut p = a.lerp(b, t);
        // Land exactly on the boundary.
        match edge {
            0 => p.x = rect.x0,
            1 => p.x = rect.x1,
            2 => p.y = rect.y0,
            _ => p.y = rect.y1,
        }
        p
    };

    let mut prev = match input.last() {
        Some(&prev) => prev,
        None => return,
    };

    for &cur in input {
        match (inside(prev), inside(cur)) {
            (true, true) => output.push(cur),
            (true, false) => output.push(cross(prev, cur)),
            (false, true) => {
                output.push(cross(prev, cur));
                output.push(cur);
            }
            (false, false) => {}
        }
        prev = cur;
    }
}
