//! Core engine module
//!
//! The engine struct, its configuration, frame timing, and the window
//! observer hub.

mod engine;
mod observer;
mod time;

pub use engine::{Engine, EngineConfig, EngineContext, EngineError, Game};
pub use observer::{ObserverHub, SharedObserver, WindowObserver};
pub use time::Time;
