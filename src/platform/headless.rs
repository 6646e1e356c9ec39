//! Headless host
//!
//! In-process tick source and input host used by native runs and tests. The
//! driver decides when ticks fire and which events arrive.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use super::input::{InputHost, InputSink, RawInput, Subscription};
use super::scheduler::{TickMode, TickSource, TickToken};
use crate::error::EngineError;

#[derive(Debug, Default)]
struct TickRegistry {
    next: u64,
    active: BTreeSet<u64>,
    arms: usize,
    fail_next: bool,
}

/// Tick source driven by hand
#[derive(Debug, Clone, Default)]
pub struct ManualTickSource {
    registry: Rc<RefCell<TickRegistry>>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Another handle on the same registrations, usable after the source moved into a loop
    pub fn probe(&self) -> Self {
        self.clone()
    }

    /// Registrations currently armed
    pub fn active(&self) -> usize {
        self.registry.borrow().active.len()
    }

    /// Most recently armed registration still active
    pub fn current(&self) -> Option<TickToken> {
        self.registry.borrow().active.iter().next_back().copied().map(TickToken)
    }

    /// Total successful `arm` calls
    pub fn arm_count(&self) -> usize {
        self.registry.borrow().arms
    }

    /// Make the next `arm` fail, as a host without timers would
    pub fn fail_next_arm(&mut self) {
        self.registry.borrow_mut().fail_next = true;
    }
}

impl TickSource for ManualTickSource {
    fn arm(&mut self, _mode: TickMode) -> Result<TickToken, EngineError> {
        let mut registry = self.registry.borrow_mut();
        if std::mem::take(&mut registry.fail_next) {
            return Err(EngineError::Host("tick source unavailable".into()));
        }
        registry.next += 1;
        let token = registry.next;
        registry.active.insert(token);
        registry.arms += 1;
        Ok(TickToken(token))
    }

    fn disarm(&mut self, token: TickToken) {
        self.registry.borrow_mut().active.remove(&token.0);
    }
}

type Listeners = Rc<RefCell<Vec<(u64, InputSink)>>>;

/// Input host that forwards events pushed by the driver
#[derive(Debug, Default)]
pub struct HeadlessInput {
    listeners: Listeners,
    next: u64,
    fail_next: bool,
}

impl HeadlessInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every subscribed sink; returns how many accepted it
    pub fn emit(&self, event: RawInput) -> usize {
        let sinks: Vec<InputSink> = self.listeners.borrow().iter().map(|(_, s)| s.clone()).collect();
        sinks.into_iter().filter(|s| s.send(event.clone())).count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn fail_next_subscribe(&mut self) {
        self.fail_next = true;
    }
}

struct HeadlessListener {
    id: u64,
    listeners: Weak<RefCell<Vec<(u64, InputSink)>>>,
}

impl Subscription for HeadlessListener {
    fn event(&self) -> &str {
        "headless"
    }
}

impl Drop for HeadlessListener {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl InputHost for HeadlessInput {
    fn subscribe(&mut self, sink: InputSink) -> Result<Vec<Box<dyn Subscription>>, EngineError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(EngineError::Host("input host unavailable".into()));
        }
        self.next += 1;
        self.listeners.borrow_mut().push((self.next, sink));
        Ok(vec![Box::new(HeadlessListener {
            id: self.next,
            listeners: Rc::downgrade(&self.listeners),
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_tokens_are_unique() {
        let mut source = ManualTickSource::new();
        let a = source.arm(TickMode::DisplaySync).unwrap();
        let b = source.arm(TickMode::DisplaySync).unwrap();
        assert_ne!(a, b);
        assert_eq!(source.current(), Some(b));
        source.disarm(b);
        source.disarm(b);
        assert_eq!(source.current(), Some(a));
        assert_eq!(source.active(), 1);
    }

    #[test]
    fn test_emit_reaches_every_listener() {
        let mut host = HeadlessInput::new();
        let _subs = host.subscribe(InputSink::new()).unwrap();
        assert_eq!(host.listener_count(), 1);
        assert_eq!(host.emit(RawInput::Blur), 1);
    }
}
