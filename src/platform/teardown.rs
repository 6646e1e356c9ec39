//! Cleanup registry
//!
//! Collects the cleanup closures a mounted game accumulates (timers, listeners,
//! host handles) and runs each exactly once on unmount, newest first.

use std::panic::{AssertUnwindSafe, catch_unwind};

type Cleanup = Box<dyn FnOnce()>;

/// LIFO stack of one-shot cleanups
#[derive(Default)]
pub struct Teardown {
    cleanups: Vec<(String, Cleanup)>,
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("pending", &self.cleanups.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, cleanup: impl FnOnce() + 'static) {
        self.cleanups.push((name.into(), Box::new(cleanup)));
    }

    pub fn len(&self) -> usize {
        self.cleanups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleanups.is_empty()
    }

    /// Run every pending cleanup, newest first; returns how many panicked
    ///
    /// A panicking cleanup is logged and does not stop the rest.
    pub fn run_all(&mut self) -> usize {
        let mut failed = 0;
        while let Some((name, cleanup)) = self.cleanups.pop() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(cleanup)) {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::warn!("Cleanup '{name}' panicked: {reason}");
                failed += 1;
            } else {
                log::debug!("Cleanup '{name}' done");
            }
        }
        failed
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.run_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_runs_newest_first_once() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut teardown = Teardown::new();
        for name in ["timer", "listeners", "audio"] {
            let order = order.clone();
            teardown.register(name, move || order.borrow_mut().push(name));
        }
        assert_eq!(teardown.len(), 3);

        assert_eq!(teardown.run_all(), 0);
        assert_eq!(teardown.run_all(), 0);
        assert!(teardown.is_empty());
        assert_eq!(*order.borrow(), vec!["audio", "listeners", "timer"]);
    }

    #[test]
    fn test_panicking_cleanup_does_not_stop_others() {
        let ran = Rc::new(RefCell::new(0));
        let mut teardown = Teardown::new();
        {
            let ran = ran.clone();
            teardown.register("first", move || *ran.borrow_mut() += 1);
        }
        teardown.register("broken", || panic!("listener already gone"));
        {
            let ran = ran.clone();
            teardown.register("last", move || *ran.borrow_mut() += 1);
        }

        assert_eq!(teardown.run_all(), 1);
        assert_eq!(*ran.borrow(), 2);
    }

    #[test]
    fn test_drop_runs_pending() {
        let ran = Rc::new(RefCell::new(false));
        {
            let mut teardown = Teardown::new();
            let ran = ran.clone();
            teardown.register("flag", move || *ran.borrow_mut() = true);
        }
        assert!(*ran.borrow());
    }
}
