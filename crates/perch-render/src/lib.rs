//! perch-render: GPU core for the multi-monitor sprite overlay.
//!
//! Owns the wgpu device, one presentation surface per physical display, the
//! shared camera and instance buffers, and the instanced sprite pipeline.
//! A single render thread drives everything through [`GraphicsContext`].

/// Re-export wgpu for downstream crates while avoiding direct dependency leakage.
pub use wgpu;

mod animation;
mod atlas;
mod camera;
mod context;
mod error;
mod mesh;
mod sprite;
mod surface;

#[cfg(debug_assertions)]
mod lines;

pub use animation::Animation;
pub use atlas::{AtlasRegion, SpriteAtlas, SpriteMap};
pub use camera::{Camera, overlay_projection};
pub use context::{GraphicsContext, MAX_INSTANCES};
pub use error::{RenderError, fatal};
pub use mesh::{Mesh, Vertex};
pub use sprite::{PixelRect, Sprite, SpriteDrawable};
pub use surface::{FrameTarget, OverlayHost, ScreenSurface, Surface, SurfaceRegistry};

#[cfg(debug_assertions)]
pub use lines::{LineBatch, MAX_LINE_VERTICES};
