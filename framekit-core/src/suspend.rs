//! Reference-counted scoped suspension

use std::cell::Cell;
use std::rc::Rc;

/// Nesting counter behind `suspend_updates()`
///
/// Each call to [`SuspendCounter::suspend`] returns a guard; the counter is
/// suspended while at least one guard is alive. Guards decrement on drop, so
/// the previous state comes back even when the guarded code unwinds.
#[derive(Debug, Clone, Default)]
pub struct SuspendCounter {
    depth: Rc<Cell<usize>>,
}

impl SuspendCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a suspended scope
    #[must_use = "the scope ends when the guard is dropped"]
    pub fn suspend(&self) -> SuspendGuard {
        self.depth.set(self.depth.get() + 1);
        SuspendGuard {
            depth: Rc::clone(&self.depth),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.depth.get() > 0
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }
}

/// Guard returned by [`SuspendCounter::suspend`]
#[derive(Debug)]
pub struct SuspendGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Sets a boolean flag for the lifetime of the guard and restores the
/// previous value afterwards
#[derive(Debug)]
pub struct FlagGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> FlagGuard<'a> {
    pub fn set(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_suspension() {
        let counter = SuspendCounter::new();
        assert!(!counter.is_suspended());

        let outer = counter.suspend();
        {
            let _inner = counter.clone().suspend();
            assert_eq!(counter.depth(), 2);
        }
        assert!(counter.is_suspended());
        drop(outer);
        assert!(!counter.is_suspended());
    }

    #[test]
    fn test_suspension_restored_on_unwind() {
        let counter = SuspendCounter::new();
        let inner = counter.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = inner.suspend();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!counter.is_suspended());
    }

    #[test]
    fn test_flag_guard_restores_previous() {
        let flag = Cell::new(false);
        {
            let _a = FlagGuard::set(&flag);
            assert!(flag.get());
            {
                let _b = FlagGuard::set(&flag);
            }
            assert!(flag.get());
        }
        assert!(!flag.get());
    }
}
