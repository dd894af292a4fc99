// Shutdown bookkeeping.
// Resources that must be released on every exit path are handed to a
// `Cleanup` guard as `Held` slots. Running the guard (explicitly or on
// drop, including during unwinding) releases them in reverse registration
// order, exactly once.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

/// A resource owned by the frame loop but releasable by [`Cleanup`].
pub struct Held<T>(Rc<RefCell<Option<T>>>);

impl<T> Clone for Held<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> Held<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(Some(value))))
    }

    /// Borrow the resource, or `None` once it was released.
    pub fn get_mut(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.0.borrow_mut(), Option::as_mut).ok()
    }

    pub fn is_released(&self) -> bool {
        self.0.borrow().is_none()
    }

    /// Drop the resource now. Later calls do nothing.
    pub fn release(&self) -> bool {
        self.0.borrow_mut().take().is_some()
    }
}

type Action = Box<dyn FnOnce()>;

#[derive(Default)]
pub struct Cleanup {
    actions: Vec<(&'static str, Action)>,
    done: bool,
}

impl Cleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, action: impl FnOnce() + 'static) {
        self.actions.push((name, Box::new(action)));
    }

    /// Wrap `value` in a [`Held`] slot that this guard releases.
    pub fn hold<T: 'static>(&mut self, name: &'static str, value: T) -> Held<T> {
        let held = Held::new(value);
        let slot = held.clone();
        self.register(name, move || {
            slot.release();
        });
        held
    }

    pub fn has_run(&self) -> bool {
        self.done
    }

    /// Release everything, newest first. Safe to call any number of times.
    pub fn run(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        while let Some((name, action)) = self.actions.pop() {
            tracing::info!("releasing {name}");
            action();
        }
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.run();
    }
}
