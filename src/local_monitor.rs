//! In-process shortcut monitoring.
//!
//! [`LocalShortcutMonitor`] handles shortcuts recognized from the
//! application's own event stream rather than from a system-wide hook.
//! The embedding event loop decodes its native key events into
//! [`Shortcut`] values and hands them in with the responder it considers
//! current; identifier-based actions without a stored target are resolved
//! against that responder.

use std::ops::Deref;

use crate::shortcuts::{
    ActionTarget, KeyEventType, Shortcut, ShortcutAction, ShortcutMonitor,
};

pub struct LocalShortcutMonitor {
    monitor: ShortcutMonitor,
}

impl LocalShortcutMonitor {
    pub fn new() -> Self {
        Self {
            monitor: ShortcutMonitor::new(),
        }
    }

    pub fn monitor(&self) -> &ShortcutMonitor {
        &self.monitor
    }

    /// Feed one decoded key event in. Returns whether an action performed
    /// it; callers propagate unhandled events to their default handling.
    pub fn handle_event(
        &self,
        shortcut: &Shortcut,
        kind: KeyEventType,
        target: Option<&dyn ActionTarget>,
    ) -> bool {
        self.monitor.handle_shortcut(shortcut, kind, target)
    }

    /// Standard editing shortcuts (cut, copy, paste, select-all, undo,
    /// redo), dispatched by identifier to the event's target.
    pub fn clipboard_shortcuts() -> Self {
        Self::with_standard_actions(&[
            ("cmd+x", "cut"),
            ("cmd+c", "copy"),
            ("cmd+v", "paste"),
            ("cmd+a", "select-all"),
            ("cmd+z", "undo"),
            ("cmd+shift+z", "redo"),
        ])
    }

    /// Standard window management shortcuts.
    pub fn window_shortcuts() -> Self {
        Self::with_standard_actions(&[
            ("cmd+w", "close-window"),
            ("cmd+m", "minimize-window"),
            ("ctrl+cmd+f", "toggle-fullscreen"),
        ])
    }

    /// Standard application shortcuts.
    pub fn app_shortcuts() -> Self {
        Self::with_standard_actions(&[
            ("cmd+h", "hide"),
            ("cmd+alt+h", "hide-others"),
            ("cmd+q", "quit"),
        ])
    }

    fn with_standard_actions(bindings: &[(&str, &str)]) -> Self {
        let monitor = Self::new();
        for (shortcut, identifier) in bindings {
            // The preset tables parse by construction.
            let shortcut = Shortcut::parse(shortcut)
                .expect("preset shortcut strings are well formed");
            let action = ShortcutAction::with_identifier(Some(shortcut), *identifier, 0);
            monitor.monitor.add_action(&action, KeyEventType::Down);
        }
        monitor
    }
}

impl Default for LocalShortcutMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for LocalShortcutMonitor {
    type Target = ShortcutMonitor;

    fn deref(&self) -> &Self::Target {
        &self.monitor
    }
}
