//! Sprite atlas building: decode every PNG in the sprite directory,
//! premultiply alpha, and shelf-pack the lot into one shared texture with a
//! name-to-region table keyed by file name.

use std::path::Path;

use anyhow::{Context, Result, bail};
use image::RgbaImage;
use perch_render::{AtlasRegion, PixelRect};

/// Widest shelf before the packer wraps to a new row.
const MAX_SHELF_WIDTH: u32 = 2048;

/// One decoded texture plus its region table, ready for GPU upload.
pub struct AtlasSource {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub regions: Vec<AtlasRegion>,
}

pub fn build_atlas(dir: &Path) -> Result<AtlasSource> {
    let mut sprites: Vec<(String, RgbaImage)> = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading sprite directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .context("sprite file name is not valid UTF-8")?;
        let mut image = image::open(&path)
            .with_context(|| format!("decoding {}", path.display()))?
            .to_rgba8();
        premultiply_alpha(&mut image);
        sprites.push((name, image));
    }
    if sprites.is_empty() {
        bail!("no PNG sprites found in {}", dir.display());
    }
    // Deterministic packing regardless of directory iteration order.
    sprites.sort_by(|a, b| a.0.cmp(&b.0));

    let sizes: Vec<(u32, u32)> = sprites.iter().map(|(_, img)| img.dimensions()).collect();
    let (width, height, placements) = pack_shelves(&sizes, MAX_SHELF_WIDTH);

    let mut atlas = RgbaImage::new(width, height);
    let mut regions = Vec::with_capacity(sprites.len());
    for ((name, sprite), (x, y)) in sprites.into_iter().zip(placements) {
        let (w, h) = sprite.dimensions();
        image::imageops::replace(&mut atlas, &sprite, i64::from(x), i64::from(y));
        regions.push(AtlasRegion {
            name,
            rect: PixelRect { x, y, w, h },
        });
    }
    Ok(AtlasSource {
        width,
        height,
        pixels: atlas.into_raw(),
        regions,
    })
}

/// The overlay swapchain composites premultiplied alpha, so bake the
/// multiplication into the texel data once at load time.
fn premultiply_alpha(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let a = u16::from(pixel[3]);
        for channel in 0..3 {
            pixel[channel] = ((u16::from(pixel[channel]) * a + 127) / 255) as u8;
        }
    }
}

/// Row-based packer: items flow left to right in input order and wrap into a
/// new shelf when the row would exceed `max_width`. Returns the atlas
/// dimensions and one top-left placement per item.
fn pack_shelves(sizes: &[(u32, u32)], max_width: u32) -> (u32, u32, Vec<(u32, u32)>) {
    let mut placements = Vec::with_capacity(sizes.len());
    let mut atlas_width = 0u32;
    let mut shelf_top = 0u32;
    let mut shelf_height = 0u32;
    let mut cursor_x = 0u32;
    for &(w, h) in sizes {
        if cursor_x > 0 && cursor_x + w > max_width {
            shelf_top += shelf_height;
            shelf_height = 0;
            cursor_x = 0;
        }
        placements.push((cursor_x, shelf_top));
        cursor_x += w;
        shelf_height = shelf_height.max(h);
        atlas_width = atlas_width.max(cursor_x);
    }
    (atlas_width, shelf_top + shelf_height, placements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlaps(a: (u32, u32, u32, u32), b: (u32, u32, u32, u32)) -> bool {
        a.0 < b.0 + b.2 && b.0 < a.0 + a.2 && a.1 < b.1 + b.3 && b.1 < a.1 + a.3
    }

    #[test]
    fn placements_fit_and_do_not_overlap() {
        let sizes = [(40, 30), (40, 50), (40, 20), (100, 10), (10, 10)];
        let (width, height, placements) = pack_shelves(&sizes, 100);
        let rects: Vec<_> = placements
            .iter()
            .zip(&sizes)
            .map(|(&(x, y), &(w, h))| (x, y, w, h))
            .collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(a.0 + a.2 <= width && a.1 + a.3 <= height, "rect {a:?} escapes atlas");
            for b in &rects[i + 1..] {
                assert!(!overlaps(*a, *b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn single_sprite_is_a_tight_fit() {
        let (width, height, placements) = pack_shelves(&[(64, 48)], 2048);
        assert_eq!((width, height), (64, 48));
        assert_eq!(placements, vec![(0, 0)]);
    }

    #[test]
    fn oversized_sprite_gets_its_own_shelf() {
        let (width, _, placements) = pack_shelves(&[(10, 10), (300, 20)], 100);
        assert_eq!(placements[1], (0, 10));
        assert_eq!(width, 300);
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut image = RgbaImage::from_pixel(1, 1, image::Rgba([255, 128, 0, 128]));
        premultiply_alpha(&mut image);
        let pixel = image.get_pixel(0, 0);
        assert_eq!(pixel[0], 128);
        assert_eq!(pixel[1], 64);
        assert_eq!(pixel[2], 0);
        assert_eq!(pixel[3], 128);
    }
}
