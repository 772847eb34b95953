//! Subscription-based shortcut observation.
//!
//! An action may track a shortcut that lives somewhere else, typically a
//! user preference. The owner of that value holds a [`ShortcutPublisher`]
//! and calls [`ShortcutPublisher::set`] whenever it changes; the observing
//! action receives every update and reruns the monitor's add/remove
//! machinery with the resolved shortcut.
//!
//! The publisher accepts the shortcut in any of the shapes persisted
//! configurations come in: the value itself, the legacy map
//! representation, the byte-serialized form, or an explicit absence.

use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;

use super::types::Shortcut;

/// A single observed update. `Absent` (and any update that fails to
/// decode) resolves to no shortcut, which clears the observer's binding.
#[derive(Clone, Debug)]
pub enum ShortcutUpdate {
    Value(Shortcut),
    Dict(serde_json::Map<String, serde_json::Value>),
    Encoded(Vec<u8>),
    Absent,
}

impl ShortcutUpdate {
    /// Decode the update into a concrete shortcut, if it holds one.
    pub fn resolve(&self) -> Option<Shortcut> {
        match self {
            Self::Value(shortcut) => Some(*shortcut),
            Self::Dict(map) => Shortcut::from_dict(map),
            Self::Encoded(bytes) => Shortcut::decode(bytes),
            Self::Absent => None,
        }
    }
}

type Observer = Arc<dyn Fn(&ShortcutUpdate) + Send + Sync>;

struct PublisherInner {
    current: ShortcutUpdate,
    subscriber: Option<(u64, Observer)>,
    next_id: u64,
}

/// Publishes shortcut updates to at most one subscriber.
///
/// Subscribing replaces any previous subscriber; the returned
/// [`Subscription`] cancels on drop. The current value is delivered
/// immediately on subscription so observers need no separate initial read.
#[derive(Clone)]
pub struct ShortcutPublisher {
    inner: Arc<Mutex<PublisherInner>>,
}

impl ShortcutPublisher {
    pub fn new() -> Self {
        Self::with_value(ShortcutUpdate::Absent)
    }

    pub fn with_value(value: ShortcutUpdate) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PublisherInner {
                current: value,
                subscriber: None,
                next_id: 0,
            })),
        }
    }

    /// The most recently published update.
    pub fn get(&self) -> ShortcutUpdate {
        self.inner.lock().current.clone()
    }

    /// Publish a new value, notifying the subscriber if one is attached.
    pub fn set(&self, value: ShortcutUpdate) {
        let observer = {
            let mut inner = self.inner.lock();
            inner.current = value.clone();
            inner.subscriber.as_ref().map(|(_, f)| Arc::clone(f))
        };
        // Invoke outside the lock: the observer may read the publisher back.
        if let Some(observer) = observer {
            observer(&value);
        }
    }

    /// Attach a subscriber, replacing any existing one, and deliver the
    /// current value to it.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ShortcutUpdate) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(f);
        let (id, current) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscriber = Some((id, Arc::clone(&observer)));
            (id, inner.current.clone())
        };
        observer(&current);
        Subscription {
            publisher: Arc::downgrade(&self.inner),
            id,
        }
    }
}

impl Default for ShortcutPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an active observation. Dropping it detaches the subscriber,
/// unless a newer subscription has already replaced it.
pub struct Subscription {
    publisher: Weak<Mutex<PublisherInner>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.publisher.upgrade() {
            let mut inner = inner.lock();
            if matches!(inner.subscriber, Some((id, _)) if id == self.id) {
                inner.subscriber = None;
            }
        }
    }
}
