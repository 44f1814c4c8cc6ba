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

//! A software rasterizer for [`piet`]-style vector drawing.
//!
//! This crate turns paths, gradients and bitmaps into pixels on a premultiplied RGBA8
//! buffer owned by the caller. It does not need a GPU, a windowing system or any platform
//! graphics library, which makes it useful for plugin user interfaces, headless rendering
//! and tests.
//!
//! To use, create a [`Cache`] once and keep it around; it holds the scratch buffers that
//! drawing needs. For every frame, call [`Cache::render_context`] with the target
//! [`Surface`] (or anything else implementing [`AsSurfaceMut`]) to get a [`RenderContext`].
//! Build a path with [`RenderContext::move_to`] and friends, then [`fill`] or [`stroke`] it.
//!
//! Drawing calls never fail outright. Like a [`piet::RenderContext`], the context remembers
//! the first thing that went wrong and reports it through [`RenderContext::status`].
//!
//! ## Implementation
//!
//! Points are mapped into device space as they are added to the path. Drawing flattens the
//! path into polylines, optionally dashes and strokes them, trims them to the clip
//! rectangle and accumulates their signed area into a coverage buffer. Each covered run of
//! pixels is then shaded by the pattern and composited onto the target.
//!
//! The context is meant to be used from a single thread. [`Bitmap`]s are immutable and may
//! be shared between threads.
//!
//! [`fill`]: RenderContext::fill
//! [`stroke`]: RenderContext::stroke

#![forbid(unsafe_code, rust_2018_idioms)]

pub use piet;
use piet::kurbo::{Affine, Point, Rect, Shape, Vec2};
use piet::{Color, Error as Pierror, InterpolationMode};

use std::error::Error as StdError;
use std::fmt;
use std::mem;

mod blend;
mod brush;
mod dash;
mod image;
mod mask;
mod outline;
mod path;
mod rasterizer;
mod resources;
mod stroke;
mod surface;
mod transform;

pub use self::blend::{Blend, BlendMethod};
pub use self::brush::{Extend, Gradient, ImagePattern, Pattern};
pub use self::image::Bitmap;
pub use self::rasterizer::FillRule;
pub use self::resources::{BitmapCache, BitmapLoader, PngLoader, Unsupported};
pub use self::stroke::{Dash, StrokeOptions, DEFAULT_MITER_LIMIT};
pub use self::surface::{AsSurfaceMut, Pixel, Surface, SurfaceMut};

use self::blend::composite_span;
use self::brush::Paint;
use self::dash::DashBuffer;
use self::mask::{Clip, ClipBuffer, ClipStack};
use self::outline::Outline;
use self::path::PathBuilder;
use self::rasterizer::{Rasterizer, Region};
use self::stroke::StrokeBuffer;
use self::transform::{scale_factor, TransformStack};

/// Default curve flattening tolerance, in device pixels.
const DEFAULT_TOLERANCE: f64 = 0.25;

/// How a path is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillOptions {
    pub rule: FillRule,

    /// Keep the path after filling.
    pub preserve: bool,
}

impl FillOptions {
    pub fn with_rule(mut self, rule: FillRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }
}

/// Scratch buffers reused between draws and between frames.
#[derive(Debug, Default)]
pub struct Cache {
    /// The flattened current path.
    outline: Outline,

    /// The result of dashing `outline`.
    dash: DashBuffer,

    /// The result of stroking.
    stroke: StrokeBuffer,

    /// The dash pattern in device units.
    dashes: Vec<f64>,

    /// Gradient lookup table.
    lut: Vec<Pixel>,

    scratch: Scratch,
}

/// The buffers needed to turn an outline into pixels.
#[derive(Debug, Default)]
struct Scratch {
    clip: ClipBuffer,
    rasterizer: Rasterizer,

    /// Shaded source pixels for one span.
    shade: Vec<Pixel>,

    /// Final coverage for one span.
    cover: Vec<f32>,
}

impl Cache {
    /// Create a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start drawing onto `target`.
    pub fn render_context<T: AsSurfaceMut>(&mut self, target: T) -> RenderContext<'_, T> {
        RenderContext {
            cache: self,
            target,
            path: PathBuilder::new(),
            transforms: TransformStack::new(),
            clips: ClipStack::new(),
            status: Ok(()),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// The drawing context for one target.
pub struct RenderContext<'a, T> {
    /// Scratch space.
    cache: &'a mut Cache,

    /// The buffer being drawn into.
    target: T,

    /// The current path, in device space.
    path: PathBuilder,

    /// The user transform and the display scale.
    transforms: TransformStack,

    /// The clip, saved alongside the transform.
    clips: ClipStack,

    /// The first error of the frame.
    status: Result<(), Pierror>,

    /// Curve flattening tolerance in device pixels.
    tolerance: f64,
}

impl<T: fmt::Debug> fmt::Debug for RenderContext<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("target", &self.target)
            .field("transform", &self.transforms.current())
            .field("display_scale", &self.transforms.display_scale())
            .finish_non_exhaustive()
    }
}

macro_rules! leap {
    ($self:expr, $e:expr) => {{
        match $e {
            Ok(v) => v,
            Err(e) => {
                if $self.status.is_ok() {
                    $self.status = Err(e);
                }
                return;
            }
        }
    }};
}

impl<'a, T: AsSurfaceMut> RenderContext<'a, T> {
    /// Return the first error since the last call, and reset it.
    pub fn status(&mut self) -> Result<(), Pierror> {
        mem::replace(&mut self.status, Ok(()))
    }

    /// Get the target back.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Get a mutable reference to the target.
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Stop drawing and return the target.
    pub fn into_target(self) -> T {
        self.target
    }

    /// Record an error, keeping the first one.
    fn fail(&mut self, error: Pierror) {
        if self.status.is_ok() {
            self.status = Err(error);
        }
    }

    /// Size of the target in device pixels.
    fn size(&mut self) -> (u32, u32) {
        let target = self.target.as_surface_mut();
        (target.width(), target.height())
    }

    /// Set the device scale factor.
    ///
    /// The scale multiplies every coordinate after the user transform, so that a scale of
    /// two draws everything at twice the pixel size. It only affects points added after the
    /// call.
    pub fn set_display_scale(&mut self, scale: f64) {
        if !(scale.is_finite() && scale > 0.0) {
            tracing::warn!("ignoring invalid display scale {}", scale);
        }

        leap!(self, self.transforms.set_display_scale(scale));
    }

    pub fn display_scale(&self) -> f64 {
        self.transforms.display_scale()
    }

    /// Set the curve flattening tolerance, in device pixels.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            tracing::warn!("ignoring invalid tolerance {}", tolerance);
            self.fail(Pierror::InvalidInput);
            return;
        }

        self.tolerance = tolerance;
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Save the transform and the clip.
    pub fn save(&mut self) -> Result<(), Pierror> {
        self.transforms.push(Affine::IDENTITY);
        self.clips.save();
        Ok(())
    }

    /// Go back to the transform and clip at the last [`save`](Self::save).
    ///
    /// Fails with [`piet::Error::StackUnbalance`] if nothing was saved, leaving everything as
    /// it was.
    pub fn restore(&mut self) -> Result<(), Pierror> {
        self.transforms.pop()?;
        self.clips.restore();
        Ok(())
    }

    /// Compose `transform` onto the current transform.
    ///
    /// Like every other transform change, this does not move points already in the path.
    pub fn transform(&mut self, transform: Affine) {
        self.transforms.concat(transform);
    }

    /// The current user transform, not including the display scale.
    pub fn current_transform(&self) -> Affine {
        self.transforms.current()
    }

    /// Discard the current path.
    pub fn begin_path(&mut self) {
        self.path.clear();
    }

    pub fn move_to(&mut self, p: impl Into<Point>) {
        self.path.move_to(self.transforms.device(), p.into());
    }

    /// Add a line to the path. An empty path starts at `p` instead.
    pub fn line_to(&mut self, p: impl Into<Point>) {
        self.path.line_to(self.transforms.device(), p.into());
    }

    /// Add a cubic Bézier curve to the path.
    pub fn curve_to(&mut self, c1: impl Into<Point>, c2: impl Into<Point>, end: impl Into<Point>) {
        self.path.curve_to(
            self.transforms.device(),
            c1.into(),
            c2.into(),
            end.into(),
        );
    }

    /// Add a circular arc, joined to the existing path by a straight line.
    ///
    /// Angles are in degrees, measured clockwise from the positive x axis (since y points
    /// down). The arc always sweeps toward increasing angles.
    pub fn arc_to(&mut self, center: impl Into<Point>, radius: f64, start_deg: f64, end_deg: f64) {
        self.path.arc_to(
            self.transforms.device(),
            center.into(),
            radius,
            start_deg,
            end_deg,
        );
    }

    pub fn close_path(&mut self) {
        self.path.close_path();
    }

    /// Add a whole shape, such as a rectangle or a circle, to the path.
    pub fn add_shape(&mut self, shape: impl Shape) {
        let device = self.transforms.device();
        let tolerance = self.tolerance / scale_factor(&device).max(f64::EPSILON);
        self.path.add_shape(device, shape, tolerance);
    }

    /// Fill the current path.
    pub fn fill(&mut self, pattern: &Pattern, options: &FillOptions, blend: Option<&Blend>) {
        let device = self.transforms.device();
        let Cache {
            outline,
            lut,
            scratch,
            ..
        } = &mut *self.cache;

        outline.clear();
        outline.extend_from_path(self.path.path(), self.tolerance);
        if !options.preserve {
            self.path.clear();
        }

        if outline.is_empty() {
            tracing::trace!("filling an empty path");
            return;
        }

        let paint = leap!(self, Paint::new(pattern, device, lut));
        let mut target = self.target.as_surface_mut();
        scratch.draw(
            &mut target,
            self.clips.current(),
            outline,
            options.rule,
            &paint,
            Blend::resolve(blend),
        );
    }

    /// Stroke the current path with a line `thickness` user units wide.
    pub fn stroke(
        &mut self,
        pattern: &Pattern,
        thickness: f64,
        options: &StrokeOptions,
        blend: Option<&Blend>,
    ) {
        let device = self.transforms.device();
        let scale = scale_factor(&device);
        let width = thickness * scale;
        let Cache {
            outline,
            dash,
            stroke,
            dashes,
            lut,
            scratch,
        } = &mut *self.cache;

        outline.clear();
        outline.extend_from_path(self.path.path(), self.tolerance);
        if !options.preserve {
            self.path.clear();
        }

        if !(width > 0.0 && width.is_finite()) {
            tracing::trace!("skipping stroke with width {}", width);
            return;
        }

        let mut source: &Outline = outline;
        if let Some(style) = &options.dash {
            dashes.clear();
            dashes.extend(style.pattern.iter().map(|len| len * scale));
            if dash.apply(outline, dashes, style.offset * scale) {
                source = dash.output();
            }
        }

        stroke.expand(source, width, options, self.tolerance);
        if stroke.output().is_empty() {
            return;
        }

        let paint = leap!(self, Paint::new(pattern, device, lut));
        let mut target = self.target.as_surface_mut();
        scratch.draw(
            &mut target,
            self.clips.current(),
            stroke.output(),
            FillRule::NonZero,
            &paint,
            Blend::resolve(blend),
        );
    }

    /// Limit drawing to a rectangle in user space, on top of the current clip.
    pub fn clip_rect(&mut self, rect: Rect) {
        let device = self.transforms.device();

        if is_axis_aligned(&device) {
            self.clips
                .current_mut()
                .intersect_rect(device.transform_rect_bbox(rect));
            return;
        }

        // A rotated rectangle needs a mask.
        let (width, height) = self.size();
        let Cache {
            outline, scratch, ..
        } = &mut *self.cache;
        outline.clear();
        outline.push_polygon(corners(rect).iter().map(|&p| device * p));
        self.clips.current_mut().intersect_outline(
            outline,
            FillRule::NonZero,
            &mut scratch.rasterizer,
            width,
            height,
        );
    }

    /// Limit drawing to the inside of the current path, then clear the path.
    pub fn clip_path(&mut self, rule: FillRule) {
        let (width, height) = self.size();
        let Cache {
            outline, scratch, ..
        } = &mut *self.cache;

        outline.clear();
        outline.extend_from_path(self.path.path(), self.tolerance);
        self.path.clear();

        self.clips.current_mut().intersect_outline(
            outline,
            rule,
            &mut scratch.rasterizer,
            width,
            height,
        );
    }

    /// Remove the clip set since the last save.
    pub fn reset_clip(&mut self) {
        self.clips.reset();
    }

    /// Fill a region with a color, ignoring the clip and blending.
    ///
    /// `region` is in device pixels, rounded outwards. `None` clears the whole target.
    pub fn clear(&mut self, region: Option<Rect>, color: Color) {
        let pixel = Pixel::from_color(color);
        let mut target = self.target.as_surface_mut();
        let (width, height) = (target.width(), target.height());
        let full = Rect::new(0.0, 0.0, width as f64, height as f64);

        if let Some(region) = Region::covering(region.unwrap_or(full), width, height) {
            target.fill(region.x0, region.y0, region.x1, region.y1, pixel);
        }
    }

    /// Read back a device pixel as a straight-alpha color.
    ///
    /// Pixels outside of the target read as transparent.
    pub fn pixel(&mut self, x: u32, y: u32) -> Color {
        self.target
            .as_surface_mut()
            .pixel(x, y)
            .map_or(Color::TRANSPARENT, Pixel::to_color)
    }

    /// Draw part of a bitmap into `dest`.
    ///
    /// `src_offset` is the point of the bitmap, in its logical units, that lands on the top
    /// left corner of `dest`. Only the part of `dest` that the bitmap actually covers is
    /// drawn.
    pub fn draw_bitmap(
        &mut self,
        bitmap: &Bitmap,
        dest: Rect,
        src_offset: (i32, i32),
        blend: Option<&Blend>,
    ) {
        if bitmap.is_empty() {
            tracing::trace!("skipping empty bitmap");
            return;
        }

        let dest = dest.abs();
        let src = Vec2::new(src_offset.0 as f64, src_offset.1 as f64);
        let extent = Rect::from_origin_size(dest.origin() - src, bitmap.logical_size());
        let visible = dest.intersect(extent);
        if visible.width() <= 0.0 || visible.height() <= 0.0 {
            return;
        }

        let to_bitmap =
            Affine::scale(bitmap.scale()) * Affine::translate(src - dest.origin().to_vec2());
        let device = self.transforms.device();
        let blend = Blend::resolve(blend);

        if self.blit(bitmap, visible, to_bitmap, device, blend) {
            return;
        }

        let image = ImagePattern {
            bitmap: bitmap.clone(),
            transform: to_bitmap,
            extend: Extend::Pad,
            filter: InterpolationMode::Bilinear,
        };
        self.draw_image_rect(image, visible, Affine::IDENTITY, blend);
    }

    /// Combine three bitmaps into one and draw it rotated.
    ///
    /// `mask` is blended over `base`, then every pixel of `top` with nonzero alpha replaces
    /// what is beneath it. The result is placed with its top left corner at `(x, y)` and
    /// turned `angle_deg` degrees clockwise about its center. None of the inputs change.
    pub fn draw_rotated_mask(
        &mut self,
        base: &Bitmap,
        mask: &Bitmap,
        top: &Bitmap,
        x: f64,
        y: f64,
        angle_deg: f64,
        blend: Option<&Blend>,
    ) {
        if !angle_deg.is_finite() {
            tracing::warn!("cannot rotate a mask by {} degrees", angle_deg);
            self.fail(Pierror::InvalidInput);
            return;
        }

        let combined = leap!(self, self::image::composite_mask(base, mask, top));
        if combined.is_empty() {
            return;
        }

        let size = combined.logical_size();
        let (half_w, half_h) = (size.width / 2.0, size.height / 2.0);
        let placement = Affine::translate((x + half_w, y + half_h))
            * Affine::rotate(angle_deg.to_radians())
            * Affine::translate((-half_w, -half_h));

        let image = ImagePattern {
            transform: Affine::scale(combined.scale()) * placement.inverse(),
            bitmap: combined,
            extend: Extend::Pad,
            filter: InterpolationMode::Bilinear,
        };
        self.draw_image_rect(
            image,
            Rect::from_origin_size(Point::ZERO, size),
            placement,
            Blend::resolve(blend),
        );
    }

    /// Copy bitmap rows straight onto the target if no resampling is needed.
    ///
    /// Returns `false` if the draw has to go through the general path.
    fn blit(
        &mut self,
        bitmap: &Bitmap,
        visible: Rect,
        to_bitmap: Affine,
        device: Affine,
        blend: Blend,
    ) -> bool {
        if device.determinant().abs() <= f64::EPSILON {
            return false;
        }

        // Device pixels to bitmap pixels.
        let [a, b, c, d, e, f] = (to_bitmap * device.inverse()).as_coeffs();
        let is_translation = (a - 1.0).abs() <= 1e-9
            && (d - 1.0).abs() <= 1e-9
            && b.abs() <= 1e-9
            && c.abs() <= 1e-9
            && is_integer(e)
            && is_integer(f);
        let dest = device.transform_rect_bbox(visible);
        let clip = self.clips.current();
        if !is_translation
            || !is_pixel_aligned(dest)
            || !clip.rect().map_or(true, is_pixel_aligned)
        {
            return false;
        }

        tracing::trace!("drawing bitmap through the pixel-aligned path");

        let (tx, ty) = (e.round() as i64, f.round() as i64);
        let mut target = self.target.as_surface_mut();
        let (width, height) = (target.width(), target.height());
        let region = match Region::covering(dest, width, height)
            .zip(clip.bounds(width, height))
            .and_then(|(dest, bounds)| dest.intersect(bounds))
        {
            Some(region) => region,
            None => return true,
        };

        let cover = &mut self.cache.scratch.cover;
        for y in region.y0..region.y1 {
            let sy = y as i64 + ty;
            if sy < 0 || sy >= bitmap.height() as i64 {
                continue;
            }

            // Keep to the columns the bitmap has.
            let x0 = (region.x0 as i64).max(-tx);
            let x1 = (region.x1 as i64).min(bitmap.width() as i64 - tx);
            if x0 >= x1 {
                continue;
            }

            let len = (x1 - x0) as usize;
            let sx = (x0 + tx) as usize;
            let src = &bitmap.row(sy as u32)[sx..sx + len];

            cover.clear();
            match clip.mask() {
                Some(mask) => cover.extend(
                    mask.row(x0 as u32, y, len)
                        .iter()
                        .map(|&m| m as f32 / 255.0),
                ),
                None => cover.resize(len, 1.0),
            }

            let row = &mut target.row_mut(y)[x0 as usize..x1 as usize];
            composite_span(blend.method, row, src, cover, blend.weight);
        }

        true
    }

    /// Fill `rect`, placed into user space by `placement`, with an image.
    fn draw_image_rect(&mut self, image: ImagePattern, rect: Rect, placement: Affine, blend: Blend) {
        let device = self.transforms.device() * placement;
        let pattern = Pattern::Image(image);
        let Cache {
            outline,
            lut,
            scratch,
            ..
        } = &mut *self.cache;

        outline.clear();
        outline.push_polygon(corners(rect).iter().map(|&p| device * p));

        let paint = leap!(
            self,
            Paint::new(&pattern, self.transforms.device(), lut)
        );
        let mut target = self.target.as_surface_mut();
        scratch.draw(
            &mut target,
            self.clips.current(),
            outline,
            FillRule::NonZero,
            &paint,
            blend,
        );
    }
}

impl Scratch {
    /// Rasterize `outline` and composite `paint` through its coverage.
    fn draw(
        &mut self,
        target: &mut SurfaceMut<'_>,
        clip: &Clip,
        outline: &Outline,
        rule: FillRule,
        paint: &Paint<'_>,
        blend: Blend,
    ) {
        let Scratch {
            clip: clip_buffer,
            rasterizer,
            shade,
            cover,
        } = self;
        let (width, height) = (target.width(), target.height());

        let bounds = match clip.bounds(width, height) {
            Some(bounds) => bounds,
            None => {
                tracing::trace!("everything is clipped out");
                return;
            }
        };

        if paint.solid().map_or(false, Pixel::is_transparent) {
            tracing::trace!("skipping draw with a transparent color");
            return;
        }

        let outline = clip_buffer.apply(outline, clip);
        let region = match outline
            .bounds()
            .and_then(|rect| Region::covering(rect, width, height))
            .and_then(|region| region.intersect(bounds))
        {
            Some(region) => region,
            None => return,
        };

        rasterizer.reset(region);
        rasterizer.add_outline(outline);
        rasterizer.for_each_span(rule, |span| {
            let len = span.coverage.len();

            cover.clear();
            cover.extend_from_slice(span.coverage);
            if let Some(mask) = clip.mask() {
                for (c, &m) in cover.iter_mut().zip(mask.row(span.x, span.y, len)) {
                    *c *= m as f32 / 255.0;
                }
            }

            shade.resize(len, Pixel::TRANSPARENT);
            paint.shade(span.x, span.y, shade);

            let start = span.x as usize;
            let row = &mut target.row_mut(span.y)[start..start + len];
            composite_span(blend.method, row, shade, cover, blend.weight);
        });
    }
}

/// The corners of a rectangle, clockwise in a y-down space.
fn corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

/// Does this transform keep rectangles as axis-aligned rectangles?
fn is_axis_aligned(transform: &Affine) -> bool {
    let [a, b, c, d, _, _] = transform.as_coeffs();
    (b.abs() <= f64::EPSILON && c.abs() <= f64::EPSILON)
        || (a.abs() <= f64::EPSILON && d.abs() <= f64::EPSILON)
}

fn is_integer(v: f64) -> bool {
    (v - v.round()).abs() <= 1e-6
}

fn is_pixel_aligned(rect: Rect) -> bool {
    is_integer(rect.x0) && is_integer(rect.y0) && is_integer(rect.x1) && is_integer(rect.y1)
}

trait ResultExt<T, E: StdError + 'static> {
    fn piet_err(self) -> Result<T, Pierror>;
}

impl<T, E: StdError + 'static> ResultExt<T, E> for Result<T, E> {
    fn piet_err(self) -> Result<T, Pierror> {
        self.map_err(|e| Pierror::BackendError(Box::new(LibraryError(e))))
    }
}

struct LibraryError<E>(E);

impl<E: fmt::Debug> fmt::Debug for LibraryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<E: fmt::Display> fmt::Display for LibraryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E: StdError> StdError for LibraryError<E> {}
