//! Platform abstraction layer
//!
//! Handles host differences for:
//! - Ticks (interval timers, display-sync callbacks)
//! - Input events
//! - Teardown of host registrations
//! - Frame rate monitoring
//!
//! The `headless` host is always available; `web` only on wasm32.

pub mod headless;
pub mod input;
pub mod scheduler;
pub mod stats;
pub mod teardown;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use headless::{HeadlessInput, ManualTickSource};
pub use input::{InputHost, InputSampler, InputSink, InputState, RawInput, Subscription};
pub use scheduler::{LoopHandle, LoopOptions, TickContext, TickMode, TickSource, TickToken};
pub use stats::FrameStats;
pub use teardown::Teardown;
