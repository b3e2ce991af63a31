use std::collections::HashMap;

use crate::context::GraphicsContext;
use crate::error::RenderError;
use crate::sprite::{PixelRect, Sprite};

/// One named region of the atlas source image, in pixel coordinates.
#[derive(Clone, Debug)]
pub struct AtlasRegion {
    pub name: String,
    pub rect: PixelRect,
}

/// The name-to-sprite table supplied by the asset layer. Populated once at
/// startup, read-only thereafter.
#[derive(Debug, Default)]
pub struct SpriteMap {
    sprites: HashMap<String, Sprite>,
}

impl SpriteMap {
    pub fn from_regions(atlas_width: u32, atlas_height: u32, regions: &[AtlasRegion]) -> Self {
        let sprites = regions
            .iter()
            .map(|region| {
                let sprite = Sprite::from_pixel_rect(atlas_width, atlas_height, region.rect);
                (region.name.clone(), sprite)
            })
            .collect();
        Self { sprites }
    }

    /// An absent name is a configuration error on the caller's side; no
    /// placeholder sprite is substituted.
    pub fn get(&self, name: &str) -> Result<Sprite, RenderError> {
        self.sprites
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::UnknownSprite(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sprites.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// The shared sprite texture: one GPU texture, one shader-visible view, one
/// bind group consumed by every sprite draw. Must outlive every draw that
/// references its sprites; created after the graphics context, released
/// before it.
pub struct SpriteAtlas {
    map: SpriteMap,
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl SpriteAtlas {
    /// Upload a decoded RGBA image (premultiplied alpha) and build the
    /// sprite table from its region list.
    pub fn new(
        ctx: &GraphicsContext,
        width: u32,
        height: u32,
        rgba: &[u8],
        regions: &[AtlasRegion],
    ) -> Self {
        assert_eq!(
            rgba.len() as u64,
            u64::from(width) * u64::from(height) * 4,
            "atlas pixel data does not match its dimensions"
        );
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = ctx.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("sprite-atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue().write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite-atlas-bg"),
            layout: ctx.atlas_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(ctx.point_sampler()),
                },
            ],
        });
        log::info!("sprite atlas: {width}x{height}, {} region(s)", regions.len());
        Self {
            map: SpriteMap::from_regions(width, height, regions),
            _texture: texture,
            bind_group,
        }
    }

    pub fn get(&self, name: &str) -> Result<Sprite, RenderError> {
        self.map.get(name)
    }

    /// All registered sprite names, sorted for deterministic iteration.
    pub fn sprite_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.names().map(str::to_owned).collect();
        names.sort();
        names
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_region_map() -> SpriteMap {
        SpriteMap::from_regions(
            64,
            64,
            &[AtlasRegion {
                name: "a.png".into(),
                rect: PixelRect { x: 0, y: 0, w: 32, h: 32 },
            }],
        )
    }

    #[test]
    fn lookup_returns_the_named_region() {
        let map = one_region_map();
        let sprite = map.get("a.png").unwrap();
        assert_eq!(sprite.scale_offset(), [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn lookup_of_missing_name_fails() {
        let map = one_region_map();
        let err = map.get("missing.png").unwrap_err();
        assert!(matches!(err, RenderError::UnknownSprite(name) if name == "missing.png"));
    }
}
