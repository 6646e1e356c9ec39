//! Input sampling
//!
//! Hosts push [`RawInput`] events into an [`InputSink`]; the game polls the
//! matching [`InputSampler`] once per tick. Each session creates its own
//! sampler and tears it down on unmount, so no key state outlives a game.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use glam::Vec2;

use crate::error::EngineError;
use crate::sim::tick::InputSnapshot;

/// Host-neutral input event
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    KeyDown(String),
    KeyUp(String),
    PointerMove { x: f32, y: f32 },
    PointerDown { button: u16 },
    PointerUp { button: u16 },
    /// Focus lost: the host will not deliver the matching key-ups
    Blur,
}

/// Held keys and buttons plus the last pointer position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    keys: BTreeSet<String>,
    buttons: BTreeSet<u16>,
    pointer: Option<Vec2>,
}

impl InputState {
    pub fn apply(&mut self, event: &RawInput) {
        match event {
            RawInput::KeyDown(key) => {
                self.keys.insert(key.to_lowercase());
            }
            RawInput::KeyUp(key) => {
                self.keys.remove(&key.to_lowercase());
            }
            RawInput::PointerMove { x, y } => self.pointer = Some(Vec2::new(*x, *y)),
            RawInput::PointerDown { button } => {
                self.buttons.insert(*button);
            }
            RawInput::PointerUp { button } => {
                self.buttons.remove(button);
            }
            RawInput::Blur => {
                self.keys.clear();
                self.buttons.clear();
            }
        }
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.keys.contains(&key.to_lowercase())
    }

    pub fn is_button_down(&self, button: u16) -> bool {
        self.buttons.contains(&button)
    }

    pub fn pointer_position(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            keys: self.keys.clone(),
            buttons: self.buttons.clone(),
            pointer: self.pointer,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: InputState,
    open: bool,
}

/// Host-facing end of a sampler
///
/// Clones share state. Once the sampler is cleaned up the sink is closed and
/// late events are dropped.
#[derive(Debug, Clone)]
pub struct InputSink {
    shared: Rc<RefCell<Shared>>,
}

impl InputSink {
    pub(crate) fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                state: InputState::default(),
                open: true,
            })),
        }
    }

    /// Deliver one event; returns false if the sink is closed
    pub fn send(&self, event: RawInput) -> bool {
        let Ok(mut shared) = self.shared.try_borrow_mut() else {
            log::warn!("Input event {:?} dropped: sampler busy", event);
            return false;
        };
        if !shared.open {
            return false;
        }
        shared.state.apply(&event);
        true
    }

    pub fn is_open(&self) -> bool {
        self.shared.borrow().open
    }

    fn close(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.open = false;
        shared.state.clear();
    }
}

/// A registered host listener; dropping it unregisters the listener
pub trait Subscription {
    /// Host event name, for logging
    fn event(&self) -> &str;
}

/// Raw keyboard/pointer event source
pub trait InputHost {
    /// Register listeners that forward host events into `sink`
    fn subscribe(&mut self, sink: InputSink) -> Result<Vec<Box<dyn Subscription>>, EngineError>;
}

/// Polling interface over one session's input
pub struct InputSampler {
    sink: InputSink,
    subscriptions: Vec<Box<dyn Subscription>>,
    attached: bool,
}

/// Subscribe a fresh sampler to `host`
pub fn create_input_sampler<H: InputHost + ?Sized>(host: &mut H) -> Result<InputSampler, EngineError> {
    let sink = InputSink::new();
    let subscriptions = host.subscribe(sink.clone())?;
    log::debug!(
        "Input sampler attached ({})",
        subscriptions.iter().map(|s| s.event()).collect::<Vec<_>>().join(", ")
    );
    Ok(InputSampler {
        sink,
        subscriptions,
        attached: true,
    })
}

impl InputSampler {
    pub fn is_pressed(&self, key: &str) -> bool {
        self.sink.shared.borrow().state.is_pressed(key)
    }

    pub fn is_button_down(&self, button: u16) -> bool {
        self.sink.shared.borrow().state.is_button_down(button)
    }

    pub fn pointer_position(&self) -> Option<Vec2> {
        self.sink.shared.borrow().state.pointer_position()
    }

    /// Immutable copy for one tick
    pub fn snapshot(&self) -> InputSnapshot {
        self.sink.shared.borrow().state.snapshot()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// A sink feeding this sampler, for pushing synthetic events
    pub fn sink(&self) -> InputSink {
        self.sink.clone()
    }

    /// Unregister every listener and forget all state; safe to call repeatedly
    pub fn cleanup(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        let count = self.subscriptions.len();
        self.subscriptions.clear();
        self.sink.close();
        log::debug!("Input sampler detached ({} listeners)", count);
    }
}

impl Drop for InputSampler {
    fn drop(&mut self) {
        self.cleanup();
    }
}
