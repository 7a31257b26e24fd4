//! Window event observers
//!
//! A publish/subscribe relation between the window and interested
//! parties. Registration is non-owning: the hub keeps weak references,
//! so subscribing never extends an observer's lifetime, and an observer
//! that is dropped without unsubscribing is pruned at the next dispatch.
//! Removal on destruction is the observer's responsibility.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec2;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Receiver of window events.
///
/// All handlers default to no-ops so observers implement only what they
/// care about. No particular delivery thread is promised; the engine
/// delivers on whichever thread runs its event loop.
pub trait WindowObserver {
    /// A keyboard key changed state
    fn on_key(&mut self, _key: KeyCode, _state: ElementState) {}

    /// The cursor moved to a new position in window coordinates
    fn on_cursor_moved(&mut self, _position: Vec2) {}

    /// A mouse button changed state
    fn on_mouse_button(&mut self, _button: MouseButton, _state: ElementState) {}

    /// The window was resized; the renderer's framebuffer has already
    /// been rebuilt for the new size when this fires
    fn on_resize(&mut self, _width: u32, _height: u32) {}
}

/// Shared ownership wrapper observers are registered through
pub type SharedObserver = Rc<RefCell<dyn WindowObserver>>;

/// Non-owning registry of window observers
#[derive(Default)]
pub struct ObserverHub {
    observers: Vec<Weak<RefCell<dyn WindowObserver>>>,
}

impl ObserverHub {
    /// Create an empty hub
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Registering the same observer twice is a
    /// no-op.
    pub fn subscribe(&mut self, observer: &SharedObserver) {
        let weak = Rc::downgrade(observer);
        if !self.observers.iter().any(|w| Weak::ptr_eq(w, &weak)) {
            self.observers.push(weak);
        }
    }

    /// Remove an observer registration
    pub fn unsubscribe(&mut self, observer: &SharedObserver) {
        let weak = Rc::downgrade(observer);
        self.observers.retain(|w| !Weak::ptr_eq(w, &weak));
    }

    /// Number of live registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Check whether no live observers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upgrade live registrations and drop dead ones
    fn live(&mut self) -> Vec<SharedObserver> {
        self.observers.retain(|w| w.strong_count() > 0);
        self.observers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Deliver a key event to every live observer
    pub fn notify_key(&mut self, key: KeyCode, state: ElementState) {
        for observer in self.live() {
            observer.borrow_mut().on_key(key, state);
        }
    }

    /// Deliver a cursor position to every live observer
    pub fn notify_cursor_moved(&mut self, position: Vec2) {
        for observer in self.live() {
            observer.borrow_mut().on_cursor_moved(position);
        }
    }

    /// Deliver a mouse button event to every live observer
    pub fn notify_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        for observer in self.live() {
            observer.borrow_mut().on_mouse_button(button, state);
        }
    }

    /// Deliver a resize to every live observer
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        for observer in self.live() {
            observer.borrow_mut().on_resize(width, height);
        }
    }
}
