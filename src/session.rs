//! A mounted game
//!
//! [`Session`] wires one [`Game`] to a tick loop, an input sampler, a renderer
//! and a teardown stack. Hosts forward their tick events to
//! [`Session::frame`]; everything else happens inside.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::platform::input::{InputHost, InputSampler, InputSink, create_input_sampler};
use crate::platform::scheduler::{LoopHandle, TickContext, TickSource, TickToken};
use crate::platform::stats::FrameStats;
use crate::platform::teardown::Teardown;
use crate::renderer::{RenderAdapter, render};
use crate::sim::collision::Resolver;
use crate::sim::tick::{TickReport, tick};
use crate::sim::world::{Game, Phase, World};

type TickCallback = Box<dyn FnMut(&mut TickContext)>;

struct Core<G: Game> {
    world: World<G::Payload>,
    game: G,
    input: InputSampler,
    last: TickReport,
}

pub struct Session<G: Game, S: TickSource, R> {
    core: Rc<RefCell<Core<G>>>,
    handle: LoopHandle<S, TickCallback>,
    renderer: R,
    stats: FrameStats,
    teardown: Teardown,
    mounted: bool,
    /// Input detach failed while the core was borrowed; retried on unmount and drop
    input_pending: bool,
}

impl<G, S, R> Session<G, S, R>
where
    G: Game + 'static,
    G::Payload: 'static,
    S: TickSource,
    R: RenderAdapter<G::Payload>,
{
    /// Validate `config`, attach input, populate the world and start ticking
    ///
    /// On error nothing stays registered with the host.
    pub fn mount<H: InputHost + ?Sized>(
        config: &EngineConfig,
        resolver: Resolver,
        mut game: G,
        source: S,
        host: &mut H,
        renderer: R,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let input = create_input_sampler(host)?;
        let mut world = World::from_config(config, resolver);
        game.on_reset(&mut world);

        let core = Rc::new(RefCell::new(Core {
            world,
            game,
            input,
            last: TickReport::default(),
        }));
        let mut handle = LoopHandle::new(source, Self::tick_callback(core.clone()), config.tick);
        handle.start()?;
        log::info!("Session mounted ({:?}, {:?} quality)", config.tick, config.quality);

        Ok(Self {
            core,
            handle,
            renderer,
            stats: FrameStats::new(),
            teardown: Teardown::new(),
            mounted: true,
            input_pending: false,
        })
    }

    fn tick_callback(core: Rc<RefCell<Core<G>>>) -> TickCallback {
        Box::new(move |ctx: &mut TickContext| {
            let Ok(mut core) = core.try_borrow_mut() else {
                log::warn!("Tick {} skipped: world borrowed", ctx.tick);
                return;
            };
            let Core {
                world,
                game,
                input,
                last,
            } = &mut *core;
            let snapshot = input.snapshot();
            *last = tick(world, game, &snapshot, ctx.dt);
            if world.phase.is_over() {
                log::info!("{:?} after {} ticks; stopping loop", world.phase, world.tick);
                ctx.stop();
            }
        })
    }

    /// Host tick event: run due ticks, then draw; returns ticks run
    pub fn frame(&mut self, token: TickToken, now: f64) -> usize {
        if !self.mounted {
            return 0;
        }
        let ran = self.handle.fire(token, now);
        let core = self.core.borrow();
        render(&core.world, &mut self.renderer);
        self.stats.record(now);
        ran
    }

    pub fn toggle_pause(&mut self) -> Phase {
        self.core.borrow_mut().world.toggle_pause()
    }

    /// Start over at wave 1; restarts the loop if the game had ended
    pub fn reset(&mut self) -> Result<(), EngineError> {
        if !self.mounted {
            return Err(EngineError::Host("session is unmounted".into()));
        }
        {
            let mut core = self.core.borrow_mut();
            let Core { world, game, last, .. } = &mut *core;
            world.reset();
            game.on_reset(world);
            *last = TickReport::default();
        }
        self.stats.reset();
        log::info!("Session reset");
        self.handle.start()
    }

    /// Register a cleanup to run on unmount
    pub fn on_unmount(&mut self, name: impl Into<String>, cleanup: impl FnOnce() + 'static) {
        self.teardown.register(name, cleanup);
    }

    /// Stop the loop, detach input and run every cleanup; safe to call repeatedly
    pub fn unmount(&mut self) {
        if !self.mounted {
            self.release_input();
            return;
        }
        self.mounted = false;
        self.handle.stop();
        self.input_pending = true;
        self.release_input();
        let failed = self.teardown.run_all();
        if failed > 0 {
            log::warn!("Session unmounted with {} failed cleanups", failed);
        } else {
            log::info!("Session unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn phase(&self) -> Phase {
        self.core.borrow().world.phase
    }

    /// Borrow the world; must be released before the next [`Session::frame`]
    pub fn world(&self) -> Ref<'_, World<G::Payload>> {
        Ref::map(self.core.borrow(), |core| &core.world)
    }

    pub fn world_mut(&self) -> RefMut<'_, World<G::Payload>> {
        RefMut::map(self.core.borrow_mut(), |core| &mut core.world)
    }

    pub fn game(&self) -> Ref<'_, G> {
        Ref::map(self.core.borrow(), |core| &core.game)
    }

    /// Report of the most recent tick
    pub fn last_report(&self) -> TickReport {
        self.core.borrow().last.clone()
    }

    /// Feed synthetic input (replays, bots, tests)
    pub fn input_sink(&self) -> InputSink {
        self.core.borrow().input.sink()
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn source(&self) -> &S {
        self.handle.source()
    }

    /// Ticks run since mount
    pub fn ticks(&self) -> u64 {
        self.handle.ticks()
    }
}

impl<G: Game, S: TickSource, R> Session<G, S, R> {
    /// Detach host input unless the core is borrowed, in which case it stays pending
    fn release_input(&mut self) {
        if !self.input_pending {
            return;
        }
        match self.core.try_borrow_mut() {
            Ok(mut core) => {
                core.input.cleanup();
                self.input_pending = false;
            }
            Err(_) => log::warn!("Input still attached: world borrowed, retrying on next unmount"),
        }
    }
}

impl<G: Game, S: TickSource, R> Drop for Session<G, S, R> {
    fn drop(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.handle.stop();
            self.input_pending = true;
            self.release_input();
            self.teardown.run_all();
        } else {
            self.release_input();
        }
    }
}
