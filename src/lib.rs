//! Shortcut action monitoring.
//!
//! Maps keyboard shortcuts to prioritized lists of actions and dispatches
//! incoming key events to them. Several actions may share one shortcut;
//! the most recently associated enabled action gets the first chance to
//! handle an event, and earlier ones are consulted only if it declines.
//!
//! Two monitor flavors share the registry core:
//! - [`GlobalShortcutMonitor`] registers shortcuts as system-wide hotkeys.
//! - [`LocalShortcutMonitor`] handles events decoded from the process's
//!   own event stream.
//!
//! ```no_run
//! use shortcut_monitor::{KeyEventType, Shortcut, ShortcutMonitor};
//!
//! let monitor = ShortcutMonitor::new();
//! let shortcut = Shortcut::parse("cmd+shift+k")?;
//! monitor.add_handler(shortcut, KeyEventType::Down, |_| {
//!     println!("palette!");
//!     true
//! });
//! assert!(monitor.handle_shortcut(&shortcut, KeyEventType::Down, None));
//! # Ok::<(), shortcut_monitor::MonitorError>(())
//! ```

pub mod error;
pub mod global_monitor;
pub mod local_monitor;
pub mod logging;
pub mod shortcuts;

pub use error::{LogResultExt, MonitorError, Result};
pub use global_monitor::GlobalShortcutMonitor;
pub use local_monitor::LocalShortcutMonitor;
pub use shortcuts::{
    ActionHandler, ActionTarget, KeyEventType, Modifiers, MonitorDelegate, Shortcut,
    ShortcutAction, ShortcutMonitor, ShortcutParseError, ShortcutPublisher, ShortcutUpdate,
    Subscription,
};
pub use shortcuts::persistence::{default_overrides_path, ShortcutOverrides};
