//! System-wide shortcut monitoring.
//!
//! [`GlobalShortcutMonitor`] keeps a [`ShortcutMonitor`] in sync with the
//! OS hotkey registry: whenever the monitor's shortcut set gains or loses
//! a shortcut, the corresponding hotkey is registered or unregistered with
//! the system. A background thread translates incoming hotkey events into
//! monitor dispatch.
//!
//! Registration is paused and resumed with a balanced counter, so nested
//! subsystems (a shortcut capture UI, a modal mode) can each suspend
//! global handling without coordinating with one another.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers as HotKeyModifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{LogResultExt, MonitorError, Result};
use crate::shortcuts::{KeyEventType, Modifiers, MonitorDelegate, Shortcut, ShortcutMonitor};

struct GlobalState {
    /// Shortcuts the monitor wants registered, whether or not registration
    /// is currently paused.
    hotkeys: HashMap<Shortcut, HotKey>,
    id_to_shortcut: HashMap<u32, Shortcut>,
    pause_count: u32,
}

struct GlobalShared {
    manager: Mutex<GlobalHotKeyManager>,
    state: Mutex<GlobalState>,
    started: AtomicBool,
}

impl GlobalShared {
    fn shortcut_added(&self, shortcut: &Shortcut) {
        let Some(hotkey) = hotkey_for_shortcut(shortcut) else {
            warn!(
                shortcut = %shortcut.to_canonical_string(),
                "shortcut cannot be registered as a system hotkey; it will only \
                 receive events handed in directly"
            );
            return;
        };
        let register_now = {
            let mut state = self.state.lock();
            state.hotkeys.insert(*shortcut, hotkey);
            state.id_to_shortcut.insert(hotkey.id(), *shortcut);
            state.pause_count == 0
        };
        if register_now {
            self.register(shortcut, hotkey).warn_on_err();
        }
    }

    fn shortcut_removed(&self, shortcut: &Shortcut) {
        let removed = {
            let mut state = self.state.lock();
            let hotkey = state.hotkeys.remove(shortcut);
            if let Some(hotkey) = hotkey {
                state.id_to_shortcut.remove(&hotkey.id());
            }
            hotkey.map(|h| (h, state.pause_count == 0))
        };
        if let Some((hotkey, active)) = removed {
            if active {
                self.manager.lock().unregister(hotkey).warn_on_err();
            }
            debug!(
                shortcut = %shortcut.to_canonical_string(),
                "unregistered global hotkey"
            );
        }
    }

    fn register(&self, shortcut: &Shortcut, hotkey: HotKey) -> Result<()> {
        self.manager
            .lock()
            .register(hotkey)
            .map_err(|source| MonitorError::HotkeyRegistration {
                shortcut: shortcut.to_canonical_string(),
                source,
            })?;
        debug!(
            shortcut = %shortcut.to_canonical_string(),
            id = hotkey.id(),
            "registered global hotkey"
        );
        Ok(())
    }

    fn register_all(&self) {
        let hotkeys: Vec<(Shortcut, HotKey)> = {
            let state = self.state.lock();
            state.hotkeys.iter().map(|(s, h)| (*s, *h)).collect()
        };
        for (shortcut, hotkey) in hotkeys {
            self.register(&shortcut, hotkey).warn_on_err();
        }
    }

    fn unregister_all(&self) {
        let hotkeys: Vec<HotKey> = {
            let state = self.state.lock();
            state.hotkeys.values().copied().collect()
        };
        let manager = self.manager.lock();
        for hotkey in hotkeys {
            manager.unregister(hotkey).warn_on_err();
        }
    }
}

struct GlobalDelegate {
    shared: Weak<GlobalShared>,
}

impl MonitorDelegate for GlobalDelegate {
    fn did_add_shortcut(&self, shortcut: &Shortcut) {
        if let Some(shared) = self.shared.upgrade() {
            shared.shortcut_added(shortcut);
        }
    }

    fn did_remove_shortcut(&self, shortcut: &Shortcut) {
        if let Some(shared) = self.shared.upgrade() {
            shared.shortcut_removed(shortcut);
        }
    }
}

/// A [`ShortcutMonitor`] whose shortcuts are registered with the OS as
/// system-wide hotkeys.
///
/// Derefs to the inner monitor, so actions are added and removed through
/// the usual registry API. Call [`GlobalShortcutMonitor::start`] once to
/// spawn the event thread.
pub struct GlobalShortcutMonitor {
    monitor: ShortcutMonitor,
    shared: Arc<GlobalShared>,
}

impl GlobalShortcutMonitor {
    /// Create the monitor. Fails when the platform refuses a hotkey
    /// manager, e.g. in a headless session.
    pub fn new() -> Result<Arc<Self>> {
        let manager = GlobalHotKeyManager::new().map_err(MonitorError::HotkeyInit)?;
        let shared = Arc::new(GlobalShared {
            manager: Mutex::new(manager),
            state: Mutex::new(GlobalState {
                hotkeys: HashMap::new(),
                id_to_shortcut: HashMap::new(),
                pause_count: 0,
            }),
            started: AtomicBool::new(false),
        });
        let monitor = ShortcutMonitor::new();
        monitor.set_delegate(Some(Arc::new(GlobalDelegate {
            shared: Arc::downgrade(&shared),
        })));
        Ok(Arc::new(Self { monitor, shared }))
    }

    pub fn monitor(&self) -> &ShortcutMonitor {
        &self.monitor
    }

    /// Spawn the background thread that feeds OS hotkey events into the
    /// monitor. Subsequent calls are no-ops.
    pub fn start(self: &Arc<Self>) {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let monitor = self.monitor.clone();
        let shared = Arc::downgrade(&self.shared);
        std::thread::spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let shortcut = shared.state.lock().id_to_shortcut.get(&event.id).copied();
                drop(shared);
                let Some(shortcut) = shortcut else {
                    continue;
                };
                let kind = match event.state {
                    HotKeyState::Pressed => KeyEventType::Down,
                    HotKeyState::Released => KeyEventType::Up,
                };
                monitor.handle_shortcut(&shortcut, kind, None);
            }
        });
    }

    /// Suspend system-wide handling. Balanced with [`Self::resume`]; only
    /// the first pause actually unregisters the hotkeys.
    pub fn pause(&self) {
        let first = {
            let mut state = self.shared.state.lock();
            state.pause_count += 1;
            state.pause_count == 1
        };
        if first {
            debug!("pausing global shortcut monitoring");
            self.shared.unregister_all();
        }
    }

    /// Undo one [`Self::pause`]. Handling resumes when every pause has been
    /// balanced. Unbalanced calls are ignored with a warning.
    pub fn resume(&self) {
        let last = {
            let mut state = self.shared.state.lock();
            if state.pause_count == 0 {
                warn!("resume called on a monitor that is not paused");
                return;
            }
            state.pause_count -= 1;
            state.pause_count == 0
        };
        if last {
            debug!("resuming global shortcut monitoring");
            self.shared.register_all();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().pause_count > 0
    }
}

impl Deref for GlobalShortcutMonitor {
    type Target = ShortcutMonitor;

    fn deref(&self) -> &Self::Target {
        &self.monitor
    }
}

/// Translate a shortcut into an OS-registrable hotkey. Modifier-only
/// shortcuts and keys without a `Code` equivalent yield `None`.
fn hotkey_for_shortcut(shortcut: &Shortcut) -> Option<HotKey> {
    let code = match shortcut.key_name()? {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "space" => Code::Space,
        "enter" => Code::Enter,
        "tab" => Code::Tab,
        "escape" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" => Code::Delete,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "semicolon" => Code::Semicolon,
        "quote" => Code::Quote,
        "comma" => Code::Comma,
        "period" => Code::Period,
        "slash" => Code::Slash,
        "backslash" => Code::Backslash,
        "bracketleft" => Code::BracketLeft,
        "bracketright" => Code::BracketRight,
        "minus" => Code::Minus,
        "equal" => Code::Equal,
        "backquote" => Code::Backquote,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        _ => return None,
    };

    let mut mods = HotKeyModifiers::empty();
    if shortcut.modifiers.contains(Modifiers::COMMAND) {
        mods |= HotKeyModifiers::META;
    }
    if shortcut.modifiers.contains(Modifiers::CONTROL) {
        mods |= HotKeyModifiers::CONTROL;
    }
    if shortcut.modifiers.contains(Modifiers::OPTION) {
        mods |= HotKeyModifiers::ALT;
    }
    if shortcut.modifiers.contains(Modifiers::SHIFT) {
        mods |= HotKeyModifiers::SHIFT;
    }

    Some(HotKey::new(
        if mods.is_empty() { None } else { Some(mods) },
        code,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotkey_conversion_covers_common_shortcuts() {
        for s in ["cmd+k", "ctrl+alt+delete", "shift+f5", "cmd+shift+space"] {
            let shortcut = Shortcut::parse(s).unwrap();
            assert!(hotkey_for_shortcut(&shortcut).is_some(), "{s}");
        }
    }

    #[test]
    fn modifier_only_shortcut_is_not_registrable() {
        let shortcut = Shortcut::parse("cmd+shift").unwrap();
        assert!(hotkey_for_shortcut(&shortcut).is_none());
    }

    // GlobalHotKeyManager needs an OS connection, which CI rarely has, so
    // these only assert behavior when construction succeeds.

    #[test]
    fn pause_resume_is_balanced() {
        let Ok(monitor) = GlobalShortcutMonitor::new() else {
            return;
        };
        assert!(!monitor.is_paused());
        monitor.pause();
        monitor.pause();
        assert!(monitor.is_paused());
        monitor.resume();
        assert!(monitor.is_paused());
        monitor.resume();
        assert!(!monitor.is_paused());

        // Unbalanced resume is tolerated.
        monitor.resume();
        assert!(!monitor.is_paused());
    }

    #[test]
    fn actions_flow_through_the_inner_monitor() {
        let Ok(monitor) = GlobalShortcutMonitor::new() else {
            return;
        };
        let shortcut = Shortcut::parse("cmd+shift+f9").unwrap();
        let action = monitor.add_handler(shortcut, KeyEventType::Down, |_| true);
        assert_eq!(monitor.shortcuts(), vec![shortcut]);
        monitor.remove_action(&action);
        assert!(monitor.shortcuts().is_empty());
    }
}
