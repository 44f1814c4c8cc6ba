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

//! Compositing source pixels onto the target.

use super::surface::Pixel;

/// How a source pixel is combined with the pixel already in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMethod {
    /// Source over destination.
    #[default]
    Clobber,

    /// Channel-wise sum, saturating at full intensity.
    Add,

    /// Brighten the destination to reflect the source.
    ColorDodge,

    /// No particular method; behaves like [`BlendMethod::Clobber`].
    None,
}

/// A blend method together with a weight that scales the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub method: BlendMethod,

    /// Between zero and one.
    pub weight: f32,
}

impl Default for Blend {
    fn default() -> Self {
        Self {
            method: BlendMethod::Clobber,
            weight: 1.0,
        }
    }
}

impl Blend {
    /// Create a new blend, clamping the weight into `[0, 1]`.
    pub fn new(method: BlendMethod, weight: f32) -> Self {
        let weight = if weight.is_nan() {
            0.0
        } else {
            weight.clamp(0.0, 1.0)
        };

        Self { method, weight }
    }

    /// Resolve an optional blend into the one to use.
    pub(crate) fn resolve(blend: Option<&Blend>) -> Blend {
        blend.copied().map_or_else(Blend::default, |b| Blend::new(b.method, b.weight))
    }
}

/// Composite `src` onto `dst`, with `src` scaled by `cover`.
///
/// `cover` folds in antialiasing coverage, clipping and blend weight.
#[inline]
pub(crate) fn composite(method: BlendMethod, dst: &mut Pixel, src: Pixel, cover: f32) {
    if src.a == 0 && matches!(method, BlendMethod::Clobber | BlendMethod::None) {
        return;
    }
    if cover <= 0.0 {
        return;
    }

    // Fully opaque source over anything is a plain copy.
    if cover >= 1.0 && src.a == 0xFF && matches!(method, BlendMethod::Clobber | BlendMethod::None)
    {
        *dst = src;
        return;
    }

    let cover = cover.min(1.0);
    let [sr, sg, sb, sa] = src.to_f32().map(|c| c * cover);
    let [dr, dg, db, da] = dst.to_f32();

    let out = match method {
        BlendMethod::Clobber | BlendMethod::None => {
            let inv = 1.0 - sa;
            [sr + dr * inv, sg + dg * inv, sb + db * inv, sa + da * inv]
        }

        BlendMethod::Add => [
            (sr + dr).min(1.0),
            (sg + dg).min(1.0),
            (sb + db).min(1.0),
            (sa + da).min(1.0),
        ],

        BlendMethod::ColorDodge => {
            let channel = |sc: f32, dc: f32| {
                if sc * da + dc * sa >= sa * da {
                    sa * da + sc * (1.0 - da) + dc * (1.0 - sa)
                } else {
                    dc * sa / (1.0 - sc / sa) + sc * (1.0 - da) + dc * (1.0 - sa)
                }
            };

            [
                channel(sr, dr),
                channel(sg, dg),
                channel(sb, db),
                sa + da - sa * da,
            ]
        }
    };

    *dst = Pixel::from_f32(out);
}

/// Composite a row of source pixels with per-pixel coverage.
pub(crate) fn composite_span(
    method: BlendMethod,
    dst: &mut [Pixel],
    src: &[Pixel],
    coverage: &[f32],
    weight: f32,
) {
    for ((d, &s), &c) in dst.iter_mut().zip(src).zip(coverage) {
        composite(method, d, s, c * weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_source_over_is_copy() {
        let mut dst = Pixel::new(10, 20, 30, 40);
        composite(BlendMethod::Clobber, &mut dst, Pixel::new(200, 0, 0, 255), 1.0);
        assert_eq!(dst, Pixel::new(200, 0, 0, 255));
    }

    #[test]
    fn translucent_source_over_is_exact_on_clear() {
        let mut dst = Pixel::TRANSPARENT;
        let src = Pixel::new(17, 33, 65, 129);
        composite(BlendMethod::None, &mut dst, src, 1.0);
        assert_eq!(dst, src);
    }

    #[test]
    fn weight_scales_source() {
        let mut dst = Pixel::TRANSPARENT;
        composite(BlendMethod::Clobber, &mut dst, Pixel::new(255, 255, 255, 255), 0.5);
        assert_eq!(dst, Pixel::new(128, 128, 128, 128));
    }

    #[test]
    fn add_saturates() {
        let mut dst = Pixel::new(200, 100, 0, 255);
        composite(BlendMethod::Add, &mut dst, Pixel::new(100, 100, 0, 255), 1.0);
        assert_eq!(dst, Pixel::new(255, 200, 0, 255));
    }

    #[test]
    fn color_dodge_brightens() {
        let mut dst = Pixel::new(100, 100, 100, 255);
        composite(
            BlendMethod::ColorDodge,
            &mut dst,
            Pixel::new(128, 128, 128, 255),
            1.0,
        );
        assert!(dst.r > 100);
        assert_eq!(dst.a, 255);

        // Dodging with black leaves the destination alone.
        let mut dst = Pixel::new(100, 50, 25, 255);
        composite(BlendMethod::ColorDodge, &mut dst, Pixel::new(0, 0, 0, 255), 1.0);
        assert_eq!(dst, Pixel::new(100, 50, 25, 255));
    }

    #[test]
    fn weight_is_clamped() {
        assert_eq!(Blend::new(BlendMethod::Add, 3.0).weight, 1.0);
        assert_eq!(Blend::new(BlendMethod::Add, -1.0).weight, 0.0);
        assert_eq!(Blend::resolve(None), Blend::default());
    }
}
