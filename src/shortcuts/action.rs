//! A connection between a shortcut and a behavior.
//!
//! A [`ShortcutAction`] pairs a (mutable) shortcut with either a handler
//! closure or a target reference plus a method identifier. Targets are held
//! weakly: the registry never owns a target's lifetime, and a dead target
//! simply means the action reports "not performed".
//!
//! Both handler and target implementations return a boolean saying whether
//! the action was actually performed. This is what lets a monitor walk a
//! list of candidates for the same shortcut until one claims the event.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::observation::{ShortcutPublisher, Subscription};
use super::types::Shortcut;

/// Receiver of shortcut actions.
///
/// A target adopts this trait once instead of implementing a distinct
/// method per action; the implementation may use the action's identifier
/// and tag to distinguish senders. `validate_action` is consulted before
/// every invocation and may veto it, e.g. while a mode is active that makes
/// the action meaningless.
pub trait ActionTarget: Send + Sync {
    /// Perform the action. Return `true` only if it was actually performed.
    fn perform_shortcut_action(&self, action: &ShortcutAction) -> bool;

    /// Whether the action should currently be performed at all.
    fn validate_action(&self, _action: &ShortcutAction) -> bool {
        true
    }
}

/// Handler closure form of an action's behavior.
pub type ActionHandler = Arc<dyn Fn(&ShortcutAction) -> bool + Send + Sync>;

enum Invocation {
    Handler(ActionHandler),
    /// Selector-style dispatch: an optional stored target. When absent, a
    /// target must be supplied at perform time.
    Target(Option<Weak<dyn ActionTarget>>),
}

pub(crate) type ShortcutListener =
    Arc<dyn Fn(&Arc<ShortcutAction>, Option<Shortcut>, Option<Shortcut>) + Send + Sync>;

struct ActionState {
    shortcut: Option<Shortcut>,
    invocation: Invocation,
    observation: Option<Subscription>,
}

/// An identity object binding a shortcut to a behavior.
///
/// Always used through `Arc`; two handles are the same action iff they
/// point at the same allocation.
pub struct ShortcutAction {
    identifier: Option<String>,
    tag: i64,
    enabled: AtomicBool,
    state: Mutex<ActionState>,
    listeners: Mutex<Vec<(u64, ShortcutListener)>>,
}

impl ShortcutAction {
    fn new(shortcut: Option<Shortcut>, invocation: Invocation, identifier: Option<String>, tag: i64) -> Arc<Self> {
        Arc::new(Self {
            identifier,
            tag,
            enabled: AtomicBool::new(true),
            state: Mutex::new(ActionState {
                shortcut,
                invocation,
                observation: None,
            }),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// A handler-based action bound to the given shortcut.
    pub fn with_handler<F>(shortcut: Option<Shortcut>, handler: F) -> Arc<Self>
    where
        F: Fn(&ShortcutAction) -> bool + Send + Sync + 'static,
    {
        Self::new(shortcut, Invocation::Handler(Arc::new(handler)), None, 0)
    }

    /// A target-based action. The target is held weakly.
    pub fn with_target(
        shortcut: Option<Shortcut>,
        target: Weak<dyn ActionTarget>,
        identifier: impl Into<String>,
        tag: i64,
    ) -> Arc<Self> {
        Self::new(
            shortcut,
            Invocation::Target(Some(target)),
            Some(identifier.into()),
            tag,
        )
    }

    /// An action with a method identifier but no stored target; a target
    /// must be supplied at dispatch time.
    pub fn with_identifier(
        shortcut: Option<Shortcut>,
        identifier: impl Into<String>,
        tag: i64,
    ) -> Arc<Self> {
        Self::new(shortcut, Invocation::Target(None), Some(identifier.into()), tag)
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn tag(&self) -> i64 {
        self.tag
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn shortcut(&self) -> Option<Shortcut> {
        self.state.lock().shortcut
    }

    /// Set the shortcut directly. Cancels any active observation.
    pub fn set_shortcut(self: &Arc<Self>, shortcut: Option<Shortcut>) {
        let observation = self.state.lock().observation.take();
        drop(observation);
        self.apply_shortcut(shortcut);
    }

    /// Track a published shortcut value. Each update is resolved and pushed
    /// through the same machinery as a direct `set_shortcut`; an `Absent`
    /// or undecodable update clears the shortcut. Replaces any previous
    /// observation.
    pub fn observe(self: &Arc<Self>, publisher: &ShortcutPublisher) {
        let weak = Arc::downgrade(self);
        // Subscribing delivers the current value synchronously, so the
        // state lock must not be held across this call.
        let subscription = publisher.subscribe(move |update| {
            if let Some(action) = weak.upgrade() {
                action.apply_shortcut(update.resolve());
            }
        });
        self.state.lock().observation = Some(subscription);
    }

    fn apply_shortcut(self: &Arc<Self>, shortcut: Option<Shortcut>) {
        let old = {
            let mut state = self.state.lock();
            if state.shortcut == shortcut {
                return;
            }
            std::mem::replace(&mut state.shortcut, shortcut)
        };
        let listeners: Vec<ShortcutListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for listener in listeners {
            listener(self, old, shortcut);
        }
    }

    /// Perform the action against `target`, or against the stored target
    /// when `target` is `None`.
    ///
    /// Disabled actions return `false` immediately. Handler-based actions
    /// ignore the target entirely. Target-based actions are performed only
    /// if a live target can be resolved and its `validate_action` approves.
    pub fn perform(&self, target: Option<&dyn ActionTarget>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        enum Resolved {
            Handler(ActionHandler),
            Target(Option<Weak<dyn ActionTarget>>),
        }
        let resolved = {
            let state = self.state.lock();
            match &state.invocation {
                Invocation::Handler(handler) => Resolved::Handler(Arc::clone(handler)),
                Invocation::Target(stored) => Resolved::Target(stored.clone()),
            }
        };
        // Invocations run outside the state lock; handlers and targets are
        // free to inspect the action.
        match resolved {
            Resolved::Handler(handler) => handler(self),
            Resolved::Target(stored) => {
                let stored_live = stored.and_then(|weak| weak.upgrade());
                let receiver: Option<&dyn ActionTarget> = match (target, stored_live.as_deref()) {
                    (Some(explicit), _) => Some(explicit),
                    (None, stored) => stored,
                };
                match receiver {
                    Some(t) => t.validate_action(self) && t.perform_shortcut_action(self),
                    None => false,
                }
            }
        }
    }

    /// Whether the action depends on a stored target that has been dropped.
    /// Such actions can never perform again on their own and are reaped by
    /// the monitor after dispatch.
    pub(crate) fn target_is_dead(&self) -> bool {
        match &self.state.lock().invocation {
            Invocation::Target(Some(weak)) => weak.upgrade().is_none(),
            _ => false,
        }
    }

    pub(crate) fn add_shortcut_listener(&self, id: u64, listener: ShortcutListener) {
        let mut listeners = self.listeners.lock();
        if !listeners.iter().any(|(existing, _)| *existing == id) {
            listeners.push((id, listener));
        }
    }

    pub(crate) fn remove_shortcut_listener(&self, id: u64) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }
}

impl fmt::Debug for ShortcutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutAction")
            .field("identifier", &self.identifier)
            .field("tag", &self.tag)
            .field("enabled", &self.is_enabled())
            .field("shortcut", &self.shortcut())
            .finish()
    }
}
