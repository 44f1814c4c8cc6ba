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

//! An example with a basic usage of the library.
//!
//! Draws a few shapes and writes the result to `basics.png`, or to the path given as the
//! first argument.

use piet::kurbo::{Affine, Circle, Point, Rect, RoundedRect};
use piet::{Color, GradientStop, LineCap, LineJoin};
use piet_raster::{
    AsSurfaceMut, Bitmap, Blend, BlendMethod, Cache, Extend, FillOptions, FillRule, Pattern,
    Pixel, RenderContext, StrokeOptions, Surface,
};

const WIDTH: u32 = 400;
const HEIGHT: u32 = 400;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "basics.png".to_string());

    let mut surface = Surface::new(WIDTH, HEIGHT);
    let mut cache = Cache::new();

    {
        let mut ctx = cache.render_context(&mut surface);

        // Clear the screen to a light blue.
        ctx.clear(None, Color::rgb8(0x87, 0xce, 0xeb));

        // A red star with a black outline.
        add_star(&mut ctx, Point::new(120.0, 120.0), 40.0, 90.0);
        ctx.fill(
            &Pattern::from(Color::rgb8(0xff, 0x00, 0x00)),
            &FillOptions::default().with_preserve(true),
            None,
        );
        ctx.stroke(
            &Pattern::from(Color::BLACK),
            5.0,
            &StrokeOptions::default().with_join(LineJoin::Round),
            None,
        );

        // A rotated, gradient-filled rounded rectangle.
        let stops = vec![
            GradientStop {
                pos: 0.0,
                color: Color::rgb8(0x00, 0xff, 0x00),
            },
            GradientStop {
                pos: 1.0,
                color: Color::rgb8(0x00, 0x00, 0xff),
            },
        ];
        ctx.save()?;
        ctx.transform(Affine::translate((290.0, 110.0)) * Affine::rotate(0.3));
        ctx.add_shape(RoundedRect::new(-70.0, -50.0, 70.0, 50.0, 15.0));
        ctx.fill(
            &Pattern::linear((-70.0, 0.0), (0.0, 0.0), stops.clone()).with_extend(Extend::Reflect),
            &FillOptions::default(),
            None,
        );
        ctx.restore()?;

        // A dashed circle, clipped to the lower half.
        ctx.save()?;
        ctx.clip_rect(Rect::new(0.0, 290.0, WIDTH as f64, HEIGHT as f64));
        ctx.add_shape(Circle::new((110.0, 290.0), 70.0));
        ctx.stroke(
            &Pattern::radial((110.0, 290.0), 80.0, stops),
            8.0,
            &StrokeOptions::default()
                .with_cap(LineCap::Round)
                .with_dash(vec![20.0, 10.0, 5.0], 0.0),
            None,
        );
        ctx.restore()?;

        // A checkerboard bitmap, drawn once as is and once through a rotated mask.
        let checker = checkerboard(32, 8)?;
        ctx.draw_bitmap(&checker, Rect::new(240.0, 240.0, 272.0, 272.0), (0, 0), None);

        let mask = solid(32, Pixel::new(0x40, 0x00, 0x00, 0x40))?;
        let top = solid(32, Pixel::TRANSPARENT)?;
        ctx.draw_rotated_mask(
            &checker,
            &mask,
            &top,
            300.0,
            300.0,
            30.0,
            Some(&Blend::new(BlendMethod::Clobber, 0.8)),
        );

        // An even-odd pentagram on top, added with an additive blend.
        add_star(&mut ctx, Point::new(300.0, 340.0), 20.0, 45.0);
        ctx.fill(
            &Pattern::from(Color::rgba8(0x40, 0x40, 0x40, 0xff)),
            &FillOptions::default().with_rule(FillRule::EvenOdd),
            Some(&Blend::new(BlendMethod::Add, 1.0)),
        );

        ctx.status()?;
    }

    // Everything drawn is opaque over an opaque background, so the premultiplied pixels
    // are also straight-alpha pixels.
    let image = image::RgbaImage::from_raw(WIDTH, HEIGHT, surface.into_vec())
        .ok_or("surface has the wrong size")?;
    image.save(&output)?;
    tracing::info!("wrote {}", output);

    Ok(())
}

fn add_star<T: AsSurfaceMut>(
    ctx: &mut RenderContext<'_, T>,
    center: Point,
    inner_radius: f64,
    outer_radius: f64,
) {
    let point_from_polar = |radius: f64, angle: f64| {
        let x = center.x + radius * angle.cos();
        let y = center.y + radius * angle.sin();
        Point::new(x, y)
    };

    let one_fifth_circle = std::f64::consts::PI * 2.0 / 5.0;

    ctx.begin_path();
    for i in 0..5 {
        let angle = one_fifth_circle * i as f64;
        ctx.line_to(point_from_polar(outer_radius, angle));
        ctx.line_to(point_from_polar(inner_radius, angle + one_fifth_circle / 2.0));
    }
    ctx.close_path();
}

fn checkerboard(side: u32, cell: u32) -> Result<Bitmap, piet::Error> {
    let mut data = Vec::with_capacity((side * side * 4) as usize);
    for y in 0..side {
        for x in 0..side {
            let dark = (x / cell + y / cell) % 2 == 0;
            let v = if dark { 0x20 } else { 0xe0 };
            data.extend_from_slice(&[v, v, v, 0xff]);
        }
    }

    Bitmap::new(side, side, 1.0, data)
}

fn solid(side: u32, pixel: Pixel) -> Result<Bitmap, piet::Error> {
    let data = (0..side * side)
        .flat_map(|_| [pixel.r, pixel.g, pixel.b, pixel.a])
        .collect();
    Bitmap::new(side, side, 1.0, data)
}
