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

use piet::kurbo::{Affine, Rect};
use piet::{Color, ImageFormat};
use piet_raster::*;

const RED: Pixel = Pixel::new(255, 0, 0, 255);
const BLUE: Pixel = Pixel::new(0, 0, 255, 255);

fn at(surface: &Surface, x: u32, y: u32) -> Pixel {
    surface.pixel(x, y).unwrap()
}

fn close(a: Pixel, b: Pixel) -> bool {
    let d = |x: u8, y: u8| (x as i16 - y as i16).abs() <= 1;
    d(a.r, b.r) && d(a.g, b.g) && d(a.b, b.b) && d(a.a, b.a)
}

fn solid(width: u32, height: u32, pixel: Pixel) -> Bitmap {
    let data = (0..width * height)
        .flat_map(|_| [pixel.r, pixel.g, pixel.b, pixel.a])
        .collect();
    Bitmap::new(width, height, 1.0, data).unwrap()
}

/// A 4x3 bitmap where every pixel is different, some of them translucent.
fn gradient_bitmap() -> Bitmap {
    let mut data = Vec::new();
    for y in 0..3u8 {
        for x in 0..4u8 {
            let a = 255 - y * 60 - x * 10;
            data.extend_from_slice(&[x * 20 % a, y * 30 % a, 7, a]);
        }
    }
    Bitmap::new(4, 3, 1.0, data).unwrap()
}

#[test]
fn aligned_draw_is_a_copy() {
    let bitmap = gradient_bitmap();
    let mut surface = Surface::new(16, 16);
    let mut cache = Cache::new();

    {
        let mut ctx = cache.render_context(&mut surface);
        ctx.draw_bitmap(&bitmap, Rect::new(5.0, 6.0, 9.0, 9.0), (0, 0), None);
        ctx.status().unwrap();
    }

    for y in 0..3 {
        for x in 0..4 {
            assert_eq!(
                at(&surface, 5 + x, 6 + y),
                bitmap.pixel(x, y).unwrap(),
                "pixel ({}, {})",
                x,
                y
            );
        }
    }
    assert_eq!(at(&surface, 4, 6), Pixel::TRANSPARENT);
    assert_eq!(at(&surface, 9, 8), Pixel::TRANSPARENT);
    assert_eq!(at(&surface, 5, 9), Pixel::TRANSPARENT);
}

#[test]
fn source_offset_picks_the_region() {
    let bitmap = gradient_bitmap();
    let mut surface = Surface::new(8, 8);
    let mut cache = Cache::new();

    {
        let mut ctx = cache.render_context(&mut surface);
        // Wider than what is left of the bitmap, so only 3x2 pixels show up.
        ctx.draw_bitmap(&bitmap, Rect::new(0.0, 0.0, 6.0, 6.0), (1, 1), None);
    }

    assert_eq!(at(&surface, 0, 0), bitmap.pixel(1, 1).unwrap());
    assert_eq!(at(&surface, 2, 1), bitmap.pixel(3, 2).unwrap());
    assert_eq!(at(&surface, 3, 0), Pixel::TRANSPARENT);
    assert_eq!(at(&surface, 0, 2), Pixel::TRANSPARENT);
}

#[test]
fn aligned_draw_respects_blend_and_clip() {
    let bitmap = solid(4, 4, RED);
    let mut surface = Surface::new(8, 8);
    let mut cache = Cache::new();

    {
        let mut ctx = cache.render_context(&mut surface);
        ctx.clear(None, Color::rgb8(0, 0, 255));
        ctx.clip_rect(Rect::new(0.0, 0.0, 2.0, 8.0));
        ctx.draw_bitmap(
            &bitmap,
            Rect::new(0.0, 0.0, 4.0, 4.0),
            (0, 0),
            Some(&Blend::new(BlendMethod::Add, 1.0)),
        );
    }

    assert_eq!(at(&surface, 1, 1), Pixel::new(255, 0, 255, 255));
    assert_eq!(at(&surface, 3, 1), BLUE);
}

#[test]
fn scaled_draw_is_resampled() {
    let green = Pixel::new(0, 255, 0, 255);
    let bitmap = solid(2, 2, green);
    let mut surface = Surface::new(8, 8);
    let mut cache = Cache::new();

    {
        let mut ctx = cache.render_context(&mut surface);
        ctx.transform(Affine::scale(2.0));
        ctx.draw_bitmap(&bitmap, Rect::new(0.0, 0.0, 2.0, 2.0), (0, 0), None);
        ctx.status().unwrap();
    }

    assert_eq!(at(&surface, 0, 0), green);
    assert_eq!(at(&surface, 3, 3), green);
    assert_eq!(at(&surface, 4, 4), Pixel::TRANSPARENT);
}

#[test]
fn high_density_bitmaps_keep_their_logical_size() {
    let bitmap = solid(8, 8, RED).scaled(2.0).unwrap();
    assert_eq!((bitmap.width(), bitmap.height()), (16, 16));
    assert_eq!(bitmap.logical_size().width, 8.0);

    let mut surface = Surface::new(20, 20);
    let mut cache = Cache::new();
    {
        let mut ctx = cache.render_context(&mut surface);
        ctx.set_display_scale(2.0);
        ctx.draw_bitmap(&bitmap, Rect::new(1.0, 1.0, 9.0, 9.0), (0, 0), None);
        ctx.status().unwrap();
    }

    assert_eq!(at(&surface, 2, 2), RED);
    assert_eq!(at(&surface, 17, 17), RED);
    assert_eq!(at(&surface, 18, 18), Pixel::TRANSPARENT);
    assert_eq!(at(&surface, 1, 1), Pixel::TRANSPARENT);
}

#[test]
fn raw_formats_are_premultiplied() {
    let bitmap =
        Bitmap::from_raw(1, 1, &[255, 255, 255, 128], ImageFormat::RgbaSeparate, 1.0).unwrap();
    assert_eq!(bitmap.pixel(0, 0), Some(Pixel::new(128, 128, 128, 128)));

    let gray = Bitmap::from_raw(2, 1, &[0, 255], ImageFormat::Grayscale, 1.0).unwrap();
    assert_eq!(gray.pixel(1, 0), Some(Pixel::new(255, 255, 255, 255)));
}

#[test]
fn rotated_mask_layers_and_turns() {
    let base = solid(4, 4, BLUE);
    let mask = solid(4, 4, Pixel::TRANSPARENT);
    let top = {
        let mut data = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                let px = if x < 2 && y < 2 { RED } else { Pixel::TRANSPARENT };
                data.extend_from_slice(&[px.r, px.g, px.b, px.a]);
            }
        }
        Bitmap::new(4, 4, 1.0, data).unwrap()
    };

    let mut cache = Cache::new();
    let mut draw = |angle: f64| {
        let mut surface = Surface::new(10, 10);
        let mut ctx = cache.render_context(&mut surface);
        ctx.draw_rotated_mask(&base, &mask, &top, 2.0, 2.0, angle, None);
        ctx.status().unwrap();
        drop(ctx);
        surface
    };

    let upright = draw(0.0);
    assert_eq!(at(&upright, 2, 2), RED);
    assert_eq!(at(&upright, 5, 5), BLUE);
    assert_eq!(at(&upright, 1, 1), Pixel::TRANSPARENT);
    assert_eq!(at(&upright, 6, 6), Pixel::TRANSPARENT);

    // Half a turn about the center moves the red corner to the bottom right.
    let turned = draw(180.0);
    assert!(close(at(&turned, 5, 5), RED));
    assert!(close(at(&turned, 2, 2), BLUE));

    // The inputs are left alone.
    assert_eq!(base.pixel(0, 0), Some(BLUE));
    assert_eq!(top.pixel(3, 3), Some(Pixel::TRANSPARENT));
}

#[test]
fn missing_bitmaps_become_placeholders() {
    let mut cache = BitmapCache::new(1 << 16);
    let bitmap = cache.load(&Unsupported, "knob.png", 1.0);
    assert!(bitmap.is_empty());

    let mut surface = Surface::new(4, 4);
    let mut raster = Cache::new();
    let mut ctx = raster.render_context(&mut surface);
    ctx.draw_bitmap(&bitmap, Rect::new(0.0, 0.0, 4.0, 4.0), (0, 0), None);
    ctx.status().unwrap();
    drop(ctx);

    assert!(surface.data().iter().all(|&b| b == 0));
}

#[test]
fn png_files_load_through_the_cache() {
    let dir = std::env::temp_dir().join(format!("piet-raster-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
        .save(dir.join("knob.png"))
        .unwrap();

    let loader = PngLoader::new(&dir);
    let mut cache = BitmapCache::new(1 << 16);

    let knob = cache.load(&loader, "knob.png", 1.0);
    assert_eq!((knob.width(), knob.height()), (2, 2));
    assert_eq!(knob.pixel(1, 1), Some(RED));

    // No @2x file, so the 1x file is resampled.
    let knob2x = cache.load(&loader, "knob.png", 2.0);
    assert_eq!((knob2x.width(), knob2x.height()), (4, 4));
    assert_eq!(cache.len(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}
