//! Shortcut registry with recency-ordered dispatch.
//!
//! The monitor maps shortcuts to ordered lists of candidate actions, per
//! key event kind. Several actions may claim the same shortcut; dispatch
//! tries the most recently associated action first and walks backwards
//! until one reports that it performed the event.
//!
//! Recency is a single key: adding an action, re-adding it, and rebinding
//! its shortcut (directly or through observation) all move it to the
//! most-recent slot of its bucket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::action::{ActionTarget, ShortcutAction};
use super::types::Shortcut;

/// Kind of key event an action is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyEventType {
    Down,
    Up,
}

impl KeyEventType {
    pub const ALL: [KeyEventType; 2] = [KeyEventType::Down, KeyEventType::Up];

    fn index(self) -> usize {
        match self {
            KeyEventType::Down => 0,
            KeyEventType::Up => 1,
        }
    }
}

/// Observer of a monitor's shortcut set.
///
/// The callbacks bracket only the transition between "no actions at all"
/// and "at least one action" for a shortcut, across both event kinds.
/// Intermediate adds and removes while the shortcut stays present fire
/// nothing.
///
/// Do not mutate the monitor's actions from within a callback: debug
/// builds assert, release builds misbehave.
pub trait MonitorDelegate: Send + Sync {
    fn will_add_shortcut(&self, _shortcut: &Shortcut) {}
    fn did_add_shortcut(&self, _shortcut: &Shortcut) {}
    fn will_remove_shortcut(&self, _shortcut: &Shortcut) {}
    fn did_remove_shortcut(&self, _shortcut: &Shortcut) {}
}

/// Action identity inside the registry: the allocation address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct ActionKey(usize);

fn action_key(action: &Arc<ShortcutAction>) -> ActionKey {
    ActionKey(Arc::as_ptr(action) as usize)
}

type Bucket = SmallVec<[Arc<ShortcutAction>; 1]>;

struct MonitorInner {
    /// Per event kind: shortcut -> actions, least-recent first.
    buckets: [HashMap<Shortcut, Bucket>; 2],
    /// Per event kind: which shortcut each action is currently filed under.
    associations: [HashMap<ActionKey, Shortcut>; 2],
    delegate: Option<Arc<dyn MonitorDelegate>>,
}

impl MonitorInner {
    fn is_present(&self, shortcut: &Shortcut) -> bool {
        self.buckets.iter().any(|map| map.contains_key(shortcut))
    }

    fn remove_from_bucket(&mut self, index: usize, shortcut: &Shortcut, key: ActionKey) {
        if let Some(bucket) = self.buckets[index].get_mut(shortcut) {
            bucket.retain(|a| action_key(a) != key);
            if bucket.is_empty() {
                self.buckets[index].remove(shortcut);
            }
        }
    }
}

struct MonitorShared {
    inner: Mutex<MonitorInner>,
    notifying: AtomicBool,
    /// Identifies this monitor's listener registration on actions.
    listener_id: u64,
}

static NEXT_MONITOR_ID: AtomicU64 = AtomicU64::new(1);

/// The shortcut-to-action registry.
///
/// Cheap to clone; clones share the same registry. One logical owner at a
/// time is expected: the internal lock keeps the structure coherent when
/// an event-source thread hands events in, but no cross-operation ordering
/// is promised under concurrent mutation.
#[derive(Clone)]
pub struct ShortcutMonitor {
    shared: Arc<MonitorShared>,
}

impl ShortcutMonitor {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                inner: Mutex::new(MonitorInner {
                    buckets: [HashMap::new(), HashMap::new()],
                    associations: [HashMap::new(), HashMap::new()],
                    delegate: None,
                }),
                notifying: AtomicBool::new(false),
                listener_id: NEXT_MONITOR_ID.fetch_add(1, Ordering::Relaxed),
            }),
        }
    }

    pub fn set_delegate(&self, delegate: Option<Arc<dyn MonitorDelegate>>) {
        self.shared.inner.lock().delegate = delegate;
    }

    /// Add an action for a key event kind.
    ///
    /// The action lands at the most-recent position of its shortcut's
    /// bucket; re-adding an already-present action moves it there instead
    /// of duplicating it. An action without a shortcut is silently ignored.
    pub fn add_action(&self, action: &Arc<ShortcutAction>, kind: KeyEventType) {
        self.assert_not_in_callback();
        let Some(shortcut) = action.shortcut() else {
            debug!(action = ?action, "add_action ignored: action has no shortcut");
            return;
        };
        let index = kind.index();
        let key = action_key(action);

        let gained = !self.shared.inner.lock().is_present(&shortcut);
        if gained {
            self.notify(|d| d.will_add_shortcut(&shortcut));
        }
        {
            let mut inner = self.shared.inner.lock();
            if let Some(current) = inner.associations[index].get(&key).copied() {
                // Already filed under this kind: lift it out so the push
                // below becomes a move to the most-recent slot.
                inner.remove_from_bucket(index, &current, key);
            }
            inner
                .buckets[index]
                .entry(shortcut)
                .or_default()
                .push(Arc::clone(action));
            inner.associations[index].insert(key, shortcut);
        }
        self.attach_listener(action);
        if gained {
            self.notify(|d| d.did_add_shortcut(&shortcut));
        }
    }

    /// Remove an action from one event kind's bucket only.
    pub fn remove_action_for_key_event(&self, action: &Arc<ShortcutAction>, kind: KeyEventType) {
        self.assert_not_in_callback();
        let index = kind.index();
        let key = action_key(action);

        let (shortcut, lost) = {
            let inner = self.shared.inner.lock();
            let Some(shortcut) = inner.associations[index].get(&key).copied() else {
                return;
            };
            let only_occupant = inner.buckets[index]
                .get(&shortcut)
                .map(|b| b.len() == 1 && b.iter().all(|a| action_key(a) == key))
                .unwrap_or(false);
            let other = inner.buckets[1 - index].contains_key(&shortcut);
            (shortcut, only_occupant && !other)
        };

        if lost {
            self.notify(|d| d.will_remove_shortcut(&shortcut));
        }
        let detach = {
            let mut inner = self.shared.inner.lock();
            inner.remove_from_bucket(index, &shortcut, key);
            inner.associations[index].remove(&key);
            !inner.associations[1 - index].contains_key(&key)
        };
        if detach {
            action.remove_shortcut_listener(self.shared.listener_id);
        }
        if lost {
            self.notify(|d| d.did_remove_shortcut(&shortcut));
        }
    }

    /// Remove an action from the monitor entirely, for both event kinds.
    pub fn remove_action(&self, action: &Arc<ShortcutAction>) {
        for kind in KeyEventType::ALL {
            self.remove_action_for_key_event(action, kind);
        }
    }

    /// Remove every action from the monitor.
    pub fn remove_all_actions(&self) {
        self.assert_not_in_callback();
        let shortcuts = self.shortcuts();
        for shortcut in &shortcuts {
            self.notify(|d| d.will_remove_shortcut(shortcut));
        }
        {
            let mut inner = self.shared.inner.lock();
            for action in inner
                .buckets
                .iter()
                .flat_map(|map| map.values().flatten())
            {
                action.remove_shortcut_listener(self.shared.listener_id);
            }
            for map in &mut inner.buckets {
                map.clear();
            }
            for map in &mut inner.associations {
                map.clear();
            }
        }
        for shortcut in &shortcuts {
            self.notify(|d| d.did_remove_shortcut(shortcut));
        }
    }

    /// All actions registered for a key event kind, in no particular order.
    pub fn actions_for_key_event(&self, kind: KeyEventType) -> Vec<Arc<ShortcutAction>> {
        let inner = self.shared.inner.lock();
        inner.buckets[kind.index()]
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// All actions in the monitor, deduplicated across event kinds.
    pub fn actions(&self) -> Vec<Arc<ShortcutAction>> {
        let inner = self.shared.inner.lock();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for map in &inner.buckets {
            for action in map.values().flatten() {
                if seen.insert(action_key(action)) {
                    out.push(Arc::clone(action));
                }
            }
        }
        out
    }

    /// All shortcuts with at least one action under either event kind.
    pub fn shortcuts(&self) -> Vec<Shortcut> {
        let inner = self.shared.inner.lock();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for map in &inner.buckets {
            for shortcut in map.keys() {
                if seen.insert(*shortcut) {
                    out.push(*shortcut);
                }
            }
        }
        out
    }

    /// Enabled actions for a shortcut and event kind, least-recent first.
    pub fn enabled_actions_for_shortcut(
        &self,
        shortcut: &Shortcut,
        kind: KeyEventType,
    ) -> Vec<Arc<ShortcutAction>> {
        let inner = self.shared.inner.lock();
        inner.buckets[kind.index()]
            .get(shortcut)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|a| a.is_enabled())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Dispatch an incoming event.
    ///
    /// Enabled candidates are tried most-recent first until one reports it
    /// performed the event. Returns whether any did; callers use this to
    /// decide between swallowing and propagating the native event.
    ///
    /// Actions whose stored target has been dropped (when no explicit
    /// target was supplied) are removed from the monitor after dispatch.
    pub fn handle_shortcut(
        &self,
        shortcut: &Shortcut,
        kind: KeyEventType,
        target: Option<&dyn ActionTarget>,
    ) -> bool {
        let candidates = self.enabled_actions_for_shortcut(shortcut, kind);
        let mut reap: Vec<Arc<ShortcutAction>> = Vec::new();
        let mut performed = false;
        for action in candidates.iter().rev() {
            if action.perform(target) {
                performed = true;
                break;
            }
            if target.is_none() && action.target_is_dead() {
                reap.push(Arc::clone(action));
            }
        }
        for action in reap {
            debug!(action = ?action, "removing action whose target was dropped");
            self.remove_action(&action);
        }
        trace!(
            shortcut = %shortcut.to_canonical_string(),
            kind = ?kind,
            candidates = candidates.len(),
            performed,
            "dispatched shortcut"
        );
        performed
    }

    /// Convenience: create a handler-based action and add it for `kind`.
    pub fn add_handler<F>(
        &self,
        shortcut: Shortcut,
        kind: KeyEventType,
        handler: F,
    ) -> Arc<ShortcutAction>
    where
        F: Fn(&ShortcutAction) -> bool + Send + Sync + 'static,
    {
        let action = ShortcutAction::with_handler(Some(shortcut), handler);
        self.add_action(&action, kind);
        action
    }

    /// React to an action's shortcut changing while it is registered:
    /// move it out of every bucket under the old shortcut and, when a new
    /// shortcut is set, into the most-recent slot under the new one for
    /// every event kind it was registered for. A cleared shortcut removes
    /// the action from the monitor.
    fn handle_shortcut_change(
        &self,
        action: &Arc<ShortcutAction>,
        old: Option<Shortcut>,
        new: Option<Shortcut>,
    ) {
        self.assert_not_in_callback();
        let key = action_key(action);

        let (kinds, old_shortcut, lost) = {
            let inner = self.shared.inner.lock();
            let kinds: SmallVec<[usize; 2]> = (0..2)
                .filter(|&i| inner.associations[i].contains_key(&key))
                .collect();
            if kinds.is_empty() {
                return;
            }
            // The associations track the action's previous shortcut; `old`
            // is what the action itself reported.
            let old_shortcut = old
                .or_else(|| kinds.first().and_then(|&i| inner.associations[i].get(&key).copied()));
            let lost = old_shortcut
                .map(|o| {
                    !inner.buckets.iter().any(|map| {
                        map.get(&o)
                            .map(|b| b.iter().any(|a| action_key(a) != key))
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false);
            (kinds, old_shortcut, lost)
        };

        if let Some(old_shortcut) = old_shortcut {
            if lost {
                self.notify(|d| d.will_remove_shortcut(&old_shortcut));
            }
            {
                let mut inner = self.shared.inner.lock();
                for &i in &kinds {
                    inner.remove_from_bucket(i, &old_shortcut, key);
                    inner.associations[i].remove(&key);
                }
            }
            if lost {
                self.notify(|d| d.did_remove_shortcut(&old_shortcut));
            }
        }

        match new {
            Some(new_shortcut) => {
                let gained = !self.shared.inner.lock().is_present(&new_shortcut);
                if gained {
                    self.notify(|d| d.will_add_shortcut(&new_shortcut));
                }
                {
                    let mut inner = self.shared.inner.lock();
                    for &i in &kinds {
                        inner
                            .buckets[i]
                            .entry(new_shortcut)
                            .or_default()
                            .push(Arc::clone(action));
                        inner.associations[i].insert(key, new_shortcut);
                    }
                }
                if gained {
                    self.notify(|d| d.did_add_shortcut(&new_shortcut));
                }
            }
            None => {
                action.remove_shortcut_listener(self.shared.listener_id);
            }
        }
    }

    fn attach_listener(&self, action: &Arc<ShortcutAction>) {
        let weak = Arc::downgrade(&self.shared);
        action.add_shortcut_listener(
            self.shared.listener_id,
            Arc::new(move |action, old, new| {
                if let Some(shared) = weak.upgrade() {
                    ShortcutMonitor { shared }.handle_shortcut_change(action, old, new);
                }
            }),
        );
    }

    fn notify(&self, f: impl Fn(&dyn MonitorDelegate)) {
        let delegate = self.shared.inner.lock().delegate.clone();
        if let Some(delegate) = delegate {
            self.shared.notifying.store(true, Ordering::SeqCst);
            f(&*delegate);
            self.shared.notifying.store(false, Ordering::SeqCst);
        }
    }

    fn assert_not_in_callback(&self) {
        debug_assert!(
            !self.shared.notifying.load(Ordering::SeqCst),
            "actions must not be mutated from within shortcut lifecycle callbacks"
        );
    }
}

impl Default for ShortcutMonitor {
    fn default() -> Self {
        Self::new()
    }
}
