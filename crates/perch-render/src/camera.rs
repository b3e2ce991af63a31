use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::surface::ScreenSurface;

/// One draw call's view parameters. Ephemeral: built per surface per frame
/// and never retained by the renderer.
#[derive(Clone, Copy)]
pub struct Camera<'a> {
    pub view: Mat4,
    pub proj: Mat4,
    pub target: &'a ScreenSurface,
}

impl<'a> Camera<'a> {
    /// Camera for one screen surface: orthographic span of
    /// `[-aspect, aspect] x [1, -1]` (y-down, matching the quad winding).
    pub fn screen(target: &'a ScreenSurface, view: Mat4) -> Self {
        let (width, height) = target.dimensions();
        let aspect = width as f32 / height.max(1) as f32;
        Self { view, proj: overlay_projection(aspect), target }
    }
}

pub fn overlay_projection(aspect: f32) -> Mat4 {
    Mat4::orthographic_rh(-aspect, aspect, 1.0, -1.0, -1.0, 1.0)
}

/// GPU layout of the shared camera constant buffer: two column-major mat4s.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl From<&Camera<'_>> for CameraUniform {
    fn from(camera: &Camera<'_>) -> Self {
        Self {
            view: camera.view.to_cols_array_2d(),
            proj: camera.proj.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_uniform_is_two_mat4s() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 128);
    }

    #[test]
    fn projection_maps_aspect_extents_to_clip_edges() {
        let proj = overlay_projection(2.0);
        let right = proj.project_point3(glam::Vec3::new(2.0, 0.0, 0.0));
        let top = proj.project_point3(glam::Vec3::new(0.0, -1.0, 0.0));
        assert!((right.x - 1.0).abs() < 1e-6);
        assert!((top.y - 1.0).abs() < 1e-6);
    }
}
