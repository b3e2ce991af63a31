use glam::Mat4;

/// A rectangle in atlas pixel coordinates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A named region of the shared atlas texture, stored as a scale + offset
/// pair in normalized texture coordinates. Plain value type: copying a
/// sprite never extends or shortens the atlas texture's lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    scale: [f32; 2],
    offset: [f32; 2],
}

impl Sprite {
    /// Normalize a pixel rectangle against the atlas dimensions.
    pub fn from_pixel_rect(atlas_width: u32, atlas_height: u32, rect: PixelRect) -> Self {
        let w = atlas_width as f32;
        let h = atlas_height as f32;
        Self {
            scale: [rect.w as f32 / w, rect.h as f32 / h],
            offset: [rect.x as f32 / w, rect.y as f32 / h],
        }
    }

    /// The (scale.xy, offset.xy) vector uploaded per instance.
    pub fn scale_offset(&self) -> [f32; 4] {
        [self.scale[0], self.scale[1], self.offset[0], self.offset[1]]
    }
}

/// One instance to render: sprite region plus model matrix. Rebuilt by the
/// application layer every frame; draw order is array order.
#[derive(Clone, Copy, Debug)]
pub struct SpriteDrawable {
    pub sprite: Sprite,
    pub transform: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_rect_normalizes_against_atlas_dimensions() {
        let sprite = Sprite::from_pixel_rect(256, 128, PixelRect { x: 64, y: 32, w: 128, h: 64 });
        assert_eq!(sprite.scale_offset(), [0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn full_atlas_region_is_identity() {
        let sprite = Sprite::from_pixel_rect(512, 512, PixelRect { x: 0, y: 0, w: 512, h: 512 });
        assert_eq!(sprite.scale_offset(), [1.0, 1.0, 0.0, 0.0]);
    }
}
