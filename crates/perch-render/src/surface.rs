use std::collections::HashMap;
use std::sync::Arc;

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::window::{Window, WindowId};

use crate::error::fatal;

/// One overlay window handed over by the window-system layer: the leaked
/// window itself plus its placement on the desktop.
pub struct OverlayHost {
    pub window: &'static Window,
    pub position: PhysicalPosition<i32>,
    pub primary: bool,
}

/// Prefer a non-sRGB surface format: sprites are authored in sRGB and
/// sampled raw, matching the unorm swapchains the overlay composites with.
pub(crate) fn choose_overlay_format(
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
) -> wgpu::TextureFormat {
    let caps = surface.get_capabilities(adapter);
    caps.formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .unwrap_or(caps.formats[0])
}

/// Surface configuration for a compositor-bound overlay chain. The primary
/// surface presents with vsync so the render loop is paced by exactly one
/// wait; secondaries present immediately to stay aligned with it.
pub(crate) fn make_overlay_config(
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    format: wgpu::TextureFormat,
    size: PhysicalSize<u32>,
    vsync: bool,
) -> wgpu::SurfaceConfiguration {
    let caps = surface.get_capabilities(adapter);
    let present_mode = if vsync {
        wgpu::PresentMode::Fifo
    } else {
        [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
            .into_iter()
            .find(|m| caps.present_modes.contains(m))
            .unwrap_or(wgpu::PresentMode::Fifo)
    };
    // Premultiplied alpha is what makes the chain composite as a transparent
    // layered region instead of an opaque rectangle.
    let alpha_mode = [
        wgpu::CompositeAlphaMode::PreMultiplied,
        wgpu::CompositeAlphaMode::PostMultiplied,
    ]
    .into_iter()
    .find(|m| caps.alpha_modes.contains(m))
    .unwrap_or(caps.alpha_modes[0]);
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width,
        height: size.height,
        present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 1,
    }
}

/// One acquired swapchain image plus its render view.
pub struct FrameTarget {
    texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl FrameTarget {
    pub fn present(self) {
        self.texture.present();
    }
}

/// One presentable output bound to one window. Move-only by construction:
/// the presentation chain is a non-duplicable resource.
pub struct Surface {
    window: &'static Window,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: Arc<wgpu::Device>,
}

impl Surface {
    pub(crate) fn new(
        window: &'static Window,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        device: Arc<wgpu::Device>,
    ) -> Self {
        surface.configure(&device, &config);
        Self { window, surface, config, device }
    }

    pub fn window(&self) -> &Window {
        self.window
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Reconfigure the chain for new pixel dimensions. Must not be called
    /// while a frame acquired from this surface is still being recorded;
    /// configuration failures surface at the next acquire, which retries.
    pub fn resize_swapchain(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        log::debug!("resized swapchain to {}x{}", size.width, size.height);
    }

    /// Acquire the current back buffer. Lost or outdated chains are
    /// reconfigured and retried once; a frame that still cannot be acquired
    /// is skipped. Out-of-memory is unrecoverable.
    pub fn acquire(&self) -> Option<FrameTarget> {
        if self.config.width == 0 || self.config.height == 0 {
            return None;
        }
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                match self.surface.get_current_texture() {
                    Ok(texture) => texture,
                    Err(err) => {
                        log::warn!("skipping frame on {:?}: {err}", self.id());
                        return None;
                    }
                }
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("swapchain acquire timed out on {:?}", self.id());
                return None;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                fatal("presentation", "out of memory acquiring swapchain image")
            }
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Some(FrameTarget { texture, view })
    }
}

/// A [`Surface`] bound into the desktop compositor as one physical monitor's
/// always-on-top transparent output. The compositor binding itself lives in
/// the premultiplied alpha configuration plus the overlay attributes of the
/// window; this type additionally records the monitor placement.
pub struct ScreenSurface {
    inner: Surface,
    position: PhysicalPosition<i32>,
    primary: bool,
}

impl ScreenSurface {
    pub(crate) fn new(inner: Surface, position: PhysicalPosition<i32>, primary: bool) -> Self {
        Self { inner, position, primary }
    }

    pub fn position(&self) -> PhysicalPosition<i32> {
        self.position
    }

    /// Whether this surface paces the render loop via vsync presentation.
    pub fn is_primary(&self) -> bool {
        self.primary
    }
}

impl std::ops::Deref for ScreenSurface {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        &self.inner
    }
}

impl std::ops::DerefMut for ScreenSurface {
    fn deref_mut(&mut self) -> &mut Surface {
        &mut self.inner
    }
}

/// Window-handle to surface-slot index. Surfaces live in a stable vec owned
/// by the graphics context; this map supports O(1) routing of window events
/// to the owning surface and is erased on destruction, never left dangling.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    slots: HashMap<WindowId, usize>,
}

impl SurfaceRegistry {
    pub fn insert(&mut self, window: WindowId, slot: usize) {
        self.slots.insert(window, slot);
    }

    pub fn get(&self, window: WindowId) -> Option<usize> {
        self.slots.get(&window).copied()
    }

    pub fn remove(&mut self, window: WindowId) -> Option<usize> {
        self.slots.remove(&window)
    }

    /// Re-point an entry after its surface moved to a new slot.
    pub fn reslot(&mut self, window: WindowId, slot: usize) {
        if let Some(entry) = self.slots.get_mut(&window) {
            *entry = slot;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_live_surfaces() {
        let mut registry = SurfaceRegistry::default();
        let id = unsafe { WindowId::dummy() };
        assert_eq!(registry.get(id), None);
        assert!(registry.is_empty());

        registry.insert(id, 3);
        assert_eq!(registry.get(id), Some(3));
        assert_eq!(registry.len(), 1);

        registry.reslot(id, 0);
        assert_eq!(registry.get(id), Some(0));

        assert_eq!(registry.remove(id), Some(0));
        assert_eq!(registry.get(id), None);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn reslot_ignores_unknown_windows() {
        let mut registry = SurfaceRegistry::default();
        registry.reslot(unsafe { WindowId::dummy() }, 7);
        assert!(registry.is_empty());
    }
}
