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

//! The stack of user transforms.

use piet::kurbo::Affine;
use piet::Error as Pierror;
use tinyvec::TinyVec;

/// One saved transform.
#[derive(Debug, Clone, Copy)]
struct Frame(Affine);

impl Default for Frame {
    fn default() -> Self {
        Self(Affine::IDENTITY)
    }
}

/// The current transform, plus every transform saved beneath it.
///
/// Points are mapped to device space by `scale(display_scale) * current`, so the display
/// scale always applies last and evenly on both axes.
#[derive(Debug, Clone)]
pub(crate) struct TransformStack {
    /// The saved transforms. The last one is the current one; there is always at least one.
    frames: TinyVec<[Frame; 1]>,

    /// The device scale factor.
    display_scale: f64,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    pub(crate) fn new() -> Self {
        Self {
            frames: TinyVec::from([Frame::default()]),
            display_scale: 1.0,
        }
    }

    /// The current user transform.
    pub(crate) fn current(&self) -> Affine {
        self.top().0
    }

    /// The transform from user space all the way into device pixels.
    pub(crate) fn device(&self) -> Affine {
        Affine::scale(self.display_scale) * self.current()
    }

    /// Save the current transform, then compose `delta` onto it.
    pub(crate) fn push(&mut self, delta: Affine) {
        let next = self.current() * delta;
        self.frames.push(Frame(next));
    }

    /// Compose `delta` onto the current transform without saving.
    pub(crate) fn concat(&mut self, delta: Affine) {
        let slot = self.top_mut();
        slot.0 *= delta;
    }

    /// Return to the transform that was current before the matching `push`.
    pub(crate) fn pop(&mut self) -> Result<(), Pierror> {
        if self.frames.len() <= 1 {
            return Err(Pierror::StackUnbalance);
        }

        self.frames.pop();
        Ok(())
    }

    pub(crate) fn display_scale(&self) -> f64 {
        self.display_scale
    }

    pub(crate) fn set_display_scale(&mut self, scale: f64) -> Result<(), Pierror> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Pierror::InvalidInput);
        }

        self.display_scale = scale;
        Ok(())
    }

    fn top(&self) -> &Frame {
        // The bottom frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

/// Approximate uniform scale of a transform, used to pick tessellation density.
pub(crate) fn scale_factor(transform: &Affine) -> f64 {
    transform.determinant().abs().sqrt()
}
