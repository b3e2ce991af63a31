//! Process bootstrap: config, overlay windows, graphics context, atlas, then
//! a render thread driving the per-monitor draw loop while the main thread
//! runs the OS message pump. Shutdown is cooperative: the pump sets a flag,
//! the render thread notices it within a frame, and resources unwind in
//! dependency order (atlas before context).

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

use anyhow::Result;
use glam::{Mat4, Vec3};
use perch_config::PerchConfig;
use perch_render::{Animation, Camera, GraphicsContext, SpriteAtlas, SpriteDrawable, fatal};
use perch_window::{ShutdownFlag, SurfaceEvent};

mod assets;

fn main() -> Result<()> {
    env_logger::init();
    let config = PerchConfig::load_or_default();

    let event_loop = winit::event_loop::EventLoop::new()?;
    let monitors = perch_window::enumerate_monitors(&event_loop);
    log::info!("discovered {} monitor(s)", monitors.len());
    let hosts = perch_window::create_overlay_windows(
        &event_loop,
        &monitors,
        config.overlay.click_through,
    )?;

    let ctx = GraphicsContext::new(hosts);

    let source = assets::build_atlas(&config.atlas.path)
        .unwrap_or_else(|err| fatal("sprite atlas", format!("{err:#}")));
    let atlas = SpriteAtlas::new(&ctx, source.width, source.height, &source.pixels, &source.regions);

    let shutdown = ShutdownFlag::new();
    let (events_tx, events_rx) = std::sync::mpsc::channel();

    let render_shutdown = shutdown.clone();
    let frame_rate = config.animation.frame_rate;
    let render_thread = std::thread::Builder::new()
        .name("perch-render".into())
        .spawn(move || render_loop(ctx, atlas, events_rx, render_shutdown, frame_rate))?;

    // Blocks until the OS tears one of the overlay windows down.
    perch_window::run_event_pump(event_loop, events_tx)?;

    shutdown.request();
    render_thread
        .join()
        .expect("render thread panicked");
    log::info!("clean shutdown");
    Ok(())
}

/// The render thread: animation update, per-surface draw, per-surface
/// present, polling the shutdown flag once per iteration. Surface events
/// from the pump are drained between frames, so the render thread stays the
/// sole mutator of surface state.
fn render_loop(
    mut ctx: GraphicsContext,
    atlas: SpriteAtlas,
    events: Receiver<SurfaceEvent>,
    shutdown: ShutdownFlag,
    frame_rate: f32,
) {
    let frames: Vec<_> = atlas
        .sprite_names()
        .iter()
        .filter_map(|name| atlas.get(name).ok())
        .collect();
    let mut animations: Vec<Animation> = (0..3)
        .map(|phase| Animation::new(frames.clone(), frame_rate, phase))
        .collect();

    #[cfg(debug_assertions)]
    let mut line_batch = perch_render::LineBatch::default();

    let mut last_tick = Instant::now();
    while !shutdown.is_requested() {
        loop {
            match events.try_recv() {
                Ok(SurfaceEvent::Resized { window, size }) => ctx.handle_resize(window, size),
                Ok(SurfaceEvent::Destroyed { window }) => {
                    ctx.remove_surface(window);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if ctx.surface_count() == 0 {
            log::info!("all surfaces gone, stopping render loop");
            break;
        }

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;

        for animation in &mut animations {
            animation.update(dt);
        }
        let drawables: Vec<SpriteDrawable> = animations
            .iter()
            .enumerate()
            .map(|(i, animation)| SpriteDrawable {
                sprite: animation.current_frame(),
                transform: Mat4::from_translation(Vec3::new(i as f32 - 1.0, 0.0, 0.0))
                    * Mat4::from_scale(Vec3::splat(0.6)),
            })
            .collect();

        let mut presents = Vec::with_capacity(ctx.surfaces().len());
        for surface in ctx.surfaces() {
            let Some(frame) = surface.acquire() else {
                continue;
            };
            let camera = Camera::screen(surface, Mat4::IDENTITY);
            ctx.draw_sprites(&camera, &frame.view, &atlas, &drawables);

            #[cfg(debug_assertions)]
            {
                use glam::{Vec2, Vec4};
                for drawable in &drawables {
                    let center = drawable.transform.transform_point3(Vec3::ZERO);
                    line_batch.rect(
                        Vec2::new(center.x - 0.3, center.y - 0.3),
                        Vec2::new(center.x + 0.3, center.y + 0.3),
                        Vec4::new(0.0, 1.0, 0.0, 1.0),
                    );
                }
                ctx.draw_lines(&camera, &frame.view, &mut line_batch);
            }

            presents.push(frame);
        }
        // The primary surface was configured with vsync, so presenting it
        // paces the whole loop; the rest follow immediately.
        for frame in presents {
            frame.present();
        }
    }

    // Atlas resources release before the context that created them.
    drop(atlas);
    drop(ctx);
}
