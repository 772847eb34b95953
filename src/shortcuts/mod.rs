//! Shortcut registry: value types, actions, observation, and dispatch.

pub mod action;
pub mod monitor;
pub mod observation;
pub mod persistence;
pub mod types;

pub use action::{ActionHandler, ActionTarget, ShortcutAction};
pub use monitor::{KeyEventType, MonitorDelegate, ShortcutMonitor};
pub use observation::{ShortcutPublisher, ShortcutUpdate, Subscription};
pub use types::{Modifiers, Shortcut, ShortcutParseError};

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod monitor_tests;
