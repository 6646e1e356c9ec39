//! Arcade Core entry point
//!
//! Native builds run Meteor Storm headless with a scripted pilot and log the
//! outcome. The web build mounts it on the `#canvas` element.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use web_sys::{EventTarget, KeyboardEvent};

    use arcade_core::EngineConfig;
    use arcade_core::demo::{MeteorStorm, Tag};
    use arcade_core::error::EngineError;
    use arcade_core::platform::web::{self, CanvasSurface, DomInput, WebTickSource};
    use arcade_core::renderer::{ShapeRenderer, kind_style};
    use arcade_core::session::Session;

    pub fn run() -> Result<(), EngineError> {
        let config = EngineConfig::load();
        let window = web::window()?;
        let seed = window.performance().map(|p| (p.now() * 1000.0) as u64).unwrap_or(0);

        let canvas = web::canvas_by_id("canvas")?;
        let surface = CanvasSurface::new(&canvas)?;
        let mut host = DomInput::new(canvas)?;
        let source = WebTickSource::new()?;
        let target = source.target();

        let renderer = ShapeRenderer::new(surface, kind_style::<Tag>);
        let session = Session::mount(
            &config,
            MeteorStorm::resolver(),
            MeteorStorm::new(seed),
            source,
            &mut host,
            renderer,
        )?;
        let session = Rc::new(RefCell::new(session));

        {
            let weak = Rc::downgrade(&session);
            target.connect(move |token, now| {
                if let Some(session) = weak.upgrade() {
                    session.borrow_mut().frame(token, now);
                }
            });
        }

        let window_target: &EventTarget = window.as_ref();

        // P / Escape pause, R restarts
        let controls = {
            let weak = Rc::downgrade(&session);
            DomInput::listen(window_target, "keydown", move |event| {
                let Some(key) = event.dyn_ref::<KeyboardEvent>().map(|k| k.key()) else {
                    return;
                };
                let Some(session) = weak.upgrade() else { return };
                let Ok(mut session) = session.try_borrow_mut() else { return };
                match key.as_str() {
                    "p" | "P" | "Escape" => {
                        session.toggle_pause();
                    }
                    "r" | "R" => {
                        if let Err(err) = session.reset() {
                            log::error!("Reset failed: {err}");
                        }
                    }
                    _ => {}
                }
            })?
        };
        session
            .borrow_mut()
            .on_unmount("control keys", move || drop(controls));

        // Owns the session for the lifetime of the page
        let unload = {
            let session = session.clone();
            DomInput::listen(window_target, "pagehide", move |_| {
                if let Ok(mut session) = session.try_borrow_mut() {
                    session.unmount();
                }
            })?
        };
        std::mem::forget(unload);

        log::info!("Meteor Storm mounted");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Logger init failed: {err}").into());
    }

    log::info!("Arcade Core starting...");
    if let Err(err) = wasm_game::run() {
        log::error!("Startup failed: {err}");
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use arcade_core::EngineConfig;
    use arcade_core::demo::{MeteorStorm, Tag};
    use arcade_core::error::EngineError;
    use arcade_core::platform::headless::{HeadlessInput, ManualTickSource};
    use arcade_core::platform::input::RawInput;
    use arcade_core::renderer::{MeshSurface, ShapeRenderer, kind_style};
    use arcade_core::session::Session;

    /// Simulated host frame rate
    const HOST_HZ: f64 = 60.0;
    const DEFAULT_FRAMES: u64 = 3600;
    /// Frames between pilot direction changes
    const SWEEP: u64 = 90;

    pub fn run() -> Result<(), EngineError> {
        let frames = std::env::args()
            .nth(1)
            .and_then(|arg| arg.parse().ok())
            .unwrap_or(DEFAULT_FRAMES);
        let config = EngineConfig::load();

        let source = ManualTickSource::new();
        let probe = source.probe();
        let mut host = HeadlessInput::new();
        let renderer = ShapeRenderer::new(MeshSurface::new(), kind_style::<Tag>);
        let mut session = Session::mount(
            &config,
            MeteorStorm::resolver(),
            MeteorStorm::new(0xa11ce),
            source,
            &mut host,
            renderer,
        )?;

        host.emit(RawInput::KeyDown(" ".into()));
        let mut frame = 0;
        while frame < frames {
            let Some(token) = probe.current() else {
                break;
            };
            if frame % SWEEP == 0 {
                let (release, press) = if (frame / SWEEP) % 2 == 0 { ("d", "a") } else { ("a", "d") };
                host.emit(RawInput::KeyUp(release.into()));
                host.emit(RawInput::KeyDown(press.into()));
            }
            session.frame(token, frame as f64 / HOST_HZ);
            frame += 1;

            if frame % 600 == 0 {
                let world = session.world();
                log::info!(
                    "frame {}: wave {} ({:?}), {} entities, score {}",
                    frame,
                    world.director.wave(),
                    world.director.phase(),
                    world.store.len(),
                    session.game().score
                );
            }
        }

        let bytes = session.renderer().surface().bytes().len();
        {
            let world = session.world();
            let game = session.game();
            log::info!(
                "Finished after {} frames / {} ticks: {:?}, wave {}, score {}, lives {}, last frame {} vertex bytes",
                frame,
                world.tick,
                world.phase,
                world.director.wave(),
                game.score,
                game.lives,
                bytes
            );
        }
        session.unmount();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Arcade Core (native) starting...");

    if let Err(err) = native::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
