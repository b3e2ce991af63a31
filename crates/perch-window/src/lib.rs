//! perch-window: winit glue for the overlay.
//!
//! Responsibilities:
//! - Enumerate physical monitors and create one borderless, transparent,
//!   always-on-top window covering each.
//! - Run the OS message pump on the main thread.
//! - Forward surface events (resize, destroy) to the render thread over a
//!   channel drained between frames, and signal shutdown through a single
//!   atomic flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use anyhow::{Context, Result};
use perch_render::OverlayHost;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{WindowBuilder, WindowId, WindowLevel};

/// One discovered physical display.
#[derive(Clone, Copy, Debug)]
pub struct MonitorSpec {
    pub position: PhysicalPosition<i32>,
    pub size: PhysicalSize<u32>,
    pub primary: bool,
}

/// Everything the render thread needs to hear from the message pump besides
/// the shutdown flag.
#[derive(Clone, Copy, Debug)]
pub enum SurfaceEvent {
    Resized { window: WindowId, size: PhysicalSize<u32> },
    Destroyed { window: WindowId },
}

/// Cooperative cancellation token: set by the pump when the OS asks us to
/// go away, polled by the render loop once per frame.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// List every physical display known to the window system.
pub fn enumerate_monitors(event_loop: &EventLoop<()>) -> Vec<MonitorSpec> {
    let primary = event_loop.primary_monitor();
    event_loop
        .available_monitors()
        .map(|monitor| MonitorSpec {
            position: monitor.position(),
            size: monitor.size(),
            primary: primary.as_ref() == Some(&monitor),
        })
        .collect()
}

/// Create one overlay window per monitor: borderless popup covering the
/// monitor, layered above everything, transparent, and (optionally) letting
/// clicks fall through to whatever is underneath. Windows start hidden; the
/// graphics context reveals them once every surface is live.
pub fn create_overlay_windows(
    event_loop: &EventLoop<()>,
    monitors: &[MonitorSpec],
    click_through: bool,
) -> Result<Vec<OverlayHost>> {
    let mut hosts = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        let window = WindowBuilder::new()
            .with_title("perch")
            .with_decorations(false)
            .with_resizable(false)
            .with_transparent(true)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_position(monitor.position)
            .with_inner_size(monitor.size)
            .with_visible(false)
            .build(event_loop)
            .context("creating overlay window")?;
        if click_through {
            if let Err(err) = window.set_cursor_hittest(false) {
                log::warn!("cursor passthrough unavailable: {err}");
            }
        }
        // Surfaces need the window for the life of the process.
        let window: &'static winit::window::Window = Box::leak(Box::new(window));
        log::debug!(
            "overlay window at {},{} ({}x{}){}",
            monitor.position.x,
            monitor.position.y,
            monitor.size.width,
            monitor.size.height,
            if monitor.primary { " [primary]" } else { "" }
        );
        hosts.push(OverlayHost {
            window,
            position: monitor.position,
            primary: monitor.primary,
        });
    }
    Ok(hosts)
}

/// Run the message pump until the OS closes one of the overlay windows.
/// Resize and destroy notifications are forwarded to the render thread; a
/// dropped receiver means the render thread is already gone, which is fine
/// during teardown.
pub fn run_event_pump(event_loop: EventLoop<()>, events: Sender<SurfaceEvent>) -> Result<()> {
    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        if let Event::WindowEvent { window_id, event } = event {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    let _ = events.send(SurfaceEvent::Destroyed { window: window_id });
                    elwt.exit();
                }
                WindowEvent::Resized(size) => {
                    let _ = events.send(SurfaceEvent::Resized { window: window_id, size });
                }
                _ => {}
            }
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_flag_starts_clear_and_latches() {
        let flag = ShutdownFlag::new();
        assert!(!flag.is_requested());
        let observer = flag.clone();
        flag.request();
        assert!(observer.is_requested());
    }
}
