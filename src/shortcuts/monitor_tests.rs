use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::action::{ActionTarget, ShortcutAction};
use super::monitor::{KeyEventType, MonitorDelegate, ShortcutMonitor};
use super::observation::{ShortcutPublisher, ShortcutUpdate};
use super::types::Shortcut;

fn cmd_k() -> Shortcut {
    Shortcut::parse("cmd+k").unwrap()
}

fn cmd_j() -> Shortcut {
    Shortcut::parse("cmd+j").unwrap()
}

/// Handler action that records each invocation in a shared order log and
/// returns a fixed verdict.
fn logged_action(
    label: &'static str,
    shortcut: Shortcut,
    performs: bool,
    log: &Arc<Mutex<Vec<&'static str>>>,
) -> Arc<ShortcutAction> {
    let log = Arc::clone(log);
    ShortcutAction::with_handler(Some(shortcut), move |_| {
        log.lock().push(label);
        performs
    })
}

#[derive(Default)]
struct RecordingDelegate {
    events: Mutex<Vec<(&'static str, Shortcut)>>,
}

impl RecordingDelegate {
    fn events(&self) -> Vec<(&'static str, Shortcut)> {
        self.events.lock().clone()
    }
}

impl MonitorDelegate for RecordingDelegate {
    fn will_add_shortcut(&self, shortcut: &Shortcut) {
        self.events.lock().push(("will_add", *shortcut));
    }

    fn did_add_shortcut(&self, shortcut: &Shortcut) {
        self.events.lock().push(("did_add", *shortcut));
    }

    fn will_remove_shortcut(&self, shortcut: &Shortcut) {
        self.events.lock().push(("will_remove", *shortcut));
    }

    fn did_remove_shortcut(&self, shortcut: &Shortcut) {
        self.events.lock().push(("did_remove", *shortcut));
    }
}

struct DroppableTarget {
    performed: AtomicUsize,
}

impl ActionTarget for DroppableTarget {
    fn perform_shortcut_action(&self, _action: &ShortcutAction) -> bool {
        self.performed.fetch_add(1, Ordering::SeqCst);
        true
    }
}

fn same_action(a: &Arc<ShortcutAction>, b: &Arc<ShortcutAction>) -> bool {
    Arc::ptr_eq(a, b)
}

#[test]
fn add_action_without_shortcut_is_a_no_op() {
    let monitor = ShortcutMonitor::new();
    let action = ShortcutAction::with_handler(None, |_| true);
    monitor.add_action(&action, KeyEventType::Down);
    assert!(monitor.actions().is_empty());
    assert!(monitor.shortcuts().is_empty());
}

#[test]
fn actions_are_ordered_by_recency_without_duplicates() {
    let monitor = ShortcutMonitor::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = logged_action("a", cmd_k(), false, &log);
    let b = logged_action("b", cmd_k(), false, &log);
    let c = logged_action("c", cmd_k(), false, &log);
    monitor.add_action(&a, KeyEventType::Down);
    monitor.add_action(&b, KeyEventType::Down);
    monitor.add_action(&c, KeyEventType::Down);

    let bucket = monitor.enabled_actions_for_shortcut(&cmd_k(), KeyEventType::Down);
    assert_eq!(bucket.len(), 3);
    assert!(same_action(&bucket[0], &a));
    assert!(same_action(&bucket[1], &b));
    assert!(same_action(&bucket[2], &c));

    // Re-adding moves to the most-recent slot instead of duplicating.
    monitor.add_action(&a, KeyEventType::Down);
    let bucket = monitor.enabled_actions_for_shortcut(&cmd_k(), KeyEventType::Down);
    assert_eq!(bucket.len(), 3);
    assert!(same_action(&bucket[0], &b));
    assert!(same_action(&bucket[1], &c));
    assert!(same_action(&bucket[2], &a));
}

#[test]
fn dispatch_tries_most_recent_first_and_stops_at_first_performer() {
    let monitor = ShortcutMonitor::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _a = logged_action("a", cmd_k(), true, &log);
    let b = logged_action("b", cmd_k(), true, &log);
    let c = logged_action("c", cmd_k(), false, &log);
    monitor.add_action(&_a, KeyEventType::Down);
    monitor.add_action(&b, KeyEventType::Down);
    monitor.add_action(&c, KeyEventType::Down);

    // c is most recent but declines; b performs; a is never consulted.
    assert!(monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, None));
    assert_eq!(&*log.lock(), &["c", "b"]);
}

#[test]
fn dispatch_walks_all_the_way_back_to_the_least_recent() {
    let monitor = ShortcutMonitor::new();
    let cmd_a = Shortcut::new(Some(0x00), crate::shortcuts::Modifiers::COMMAND);
    let log = Arc::new(Mutex::new(Vec::new()));
    let h1 = logged_action("h1", cmd_a, true, &log);
    let h2 = logged_action("h2", cmd_a, false, &log);
    let h3 = logged_action("h3", cmd_a, false, &log);
    monitor.add_action(&h1, KeyEventType::Down);
    monitor.add_action(&h2, KeyEventType::Down);
    monitor.add_action(&h3, KeyEventType::Down);

    // Only the least-recent action performs; both newer ones must be
    // consulted (and decline) first.
    assert!(monitor.handle_shortcut(&cmd_a, KeyEventType::Down, None));
    assert_eq!(&*log.lock(), &["h3", "h2", "h1"]);
}

#[test]
fn dispatch_reports_false_when_no_action_performs() {
    let monitor = ShortcutMonitor::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = logged_action("a", cmd_k(), false, &log);
    monitor.add_action(&a, KeyEventType::Down);

    assert!(!monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, None));
    assert!(!monitor.handle_shortcut(&cmd_j(), KeyEventType::Down, None));
}

#[test]
fn disabled_actions_are_skipped_entirely() {
    let monitor = ShortcutMonitor::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = logged_action("a", cmd_k(), true, &log);
    let b = logged_action("b", cmd_k(), true, &log);
    monitor.add_action(&a, KeyEventType::Down);
    monitor.add_action(&b, KeyEventType::Down);
    b.set_enabled(false);

    assert!(monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, None));
    assert_eq!(&*log.lock(), &["a"]);
    assert_eq!(
        monitor
            .enabled_actions_for_shortcut(&cmd_k(), KeyEventType::Down)
            .len(),
        1
    );
}

#[test]
fn key_event_kinds_are_independent() {
    let monitor = ShortcutMonitor::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let down = logged_action("down", cmd_k(), true, &log);
    let up = logged_action("up", cmd_k(), true, &log);
    monitor.add_action(&down, KeyEventType::Down);
    monitor.add_action(&up, KeyEventType::Up);

    assert!(monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, None));
    assert_eq!(&*log.lock(), &["down"]);
    assert!(monitor.handle_shortcut(&cmd_k(), KeyEventType::Up, None));
    assert_eq!(&*log.lock(), &["down", "up"]);

    assert_eq!(monitor.actions_for_key_event(KeyEventType::Down).len(), 1);
    assert_eq!(monitor.actions_for_key_event(KeyEventType::Up).len(), 1);
    assert_eq!(monitor.actions().len(), 2);
    assert_eq!(monitor.shortcuts(), vec![cmd_k()]);
}

#[test]
fn delegate_fires_exactly_once_per_presence_transition() {
    let monitor = ShortcutMonitor::new();
    let delegate = Arc::new(RecordingDelegate::default());
    monitor.set_delegate(Some(delegate.clone()));

    let log = Arc::new(Mutex::new(Vec::new()));
    let a = logged_action("a", cmd_k(), true, &log);
    let b = logged_action("b", cmd_k(), true, &log);

    monitor.add_action(&a, KeyEventType::Down);
    assert_eq!(
        delegate.events(),
        vec![("will_add", cmd_k()), ("did_add", cmd_k())]
    );

    // Same shortcut again, other kind too: presence unchanged, no events.
    monitor.add_action(&b, KeyEventType::Down);
    monitor.add_action(&a, KeyEventType::Up);
    assert_eq!(delegate.events().len(), 2);

    // Removing a from Down only: still present under Up, no events.
    monitor.remove_action_for_key_event(&a, KeyEventType::Down);
    assert_eq!(delegate.events().len(), 2);

    monitor.remove_action(&b);
    assert_eq!(delegate.events().len(), 2);

    // Last occupant gone across both kinds.
    monitor.remove_action(&a);
    assert_eq!(
        delegate.events()[2..],
        [("will_remove", cmd_k()), ("did_remove", cmd_k())]
    );
}

#[test]
fn remove_all_actions_notifies_each_shortcut() {
    let monitor = ShortcutMonitor::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = logged_action("a", cmd_k(), true, &log);
    let b = logged_action("b", cmd_j(), true, &log);
    monitor.add_action(&a, KeyEventType::Down);
    monitor.add_action(&b, KeyEventType::Up);

    let delegate = Arc::new(RecordingDelegate::default());
    monitor.set_delegate(Some(delegate.clone()));
    monitor.remove_all_actions();

    assert!(monitor.actions().is_empty());
    assert!(monitor.shortcuts().is_empty());
    let events = delegate.events();
    assert_eq!(events.len(), 4);
    for shortcut in [cmd_k(), cmd_j()] {
        assert!(events.contains(&("will_remove", shortcut)));
        assert!(events.contains(&("did_remove", shortcut)));
    }

    // Removed actions no longer feed changes back into the monitor.
    a.set_shortcut(Some(cmd_j()));
    assert!(monitor.actions().is_empty());
}

#[test]
fn rebinding_moves_action_between_buckets() {
    let monitor = ShortcutMonitor::new();
    let delegate = Arc::new(RecordingDelegate::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let resident = logged_action("resident", cmd_j(), false, &log);
    let mover = logged_action("mover", cmd_k(), true, &log);
    monitor.add_action(&resident, KeyEventType::Down);
    monitor.add_action(&mover, KeyEventType::Down);
    monitor.set_delegate(Some(delegate.clone()));

    mover.set_shortcut(Some(cmd_j()));

    // cmd+k lost its only occupant; cmd+j was already present.
    assert_eq!(
        delegate.events(),
        vec![("will_remove", cmd_k()), ("did_remove", cmd_k())]
    );

    // The mover lands at the most-recent slot of its new bucket.
    let bucket = monitor.enabled_actions_for_shortcut(&cmd_j(), KeyEventType::Down);
    assert_eq!(bucket.len(), 2);
    assert!(same_action(&bucket[0], &resident));
    assert!(same_action(&bucket[1], &mover));
    assert!(monitor
        .enabled_actions_for_shortcut(&cmd_k(), KeyEventType::Down)
        .is_empty());

    assert!(monitor.handle_shortcut(&cmd_j(), KeyEventType::Down, None));
    assert_eq!(&*log.lock(), &["mover"]);
}

#[test]
fn rebinding_applies_to_every_registered_kind() {
    let monitor = ShortcutMonitor::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let action = logged_action("x", cmd_k(), true, &log);
    monitor.add_action(&action, KeyEventType::Down);
    monitor.add_action(&action, KeyEventType::Up);

    action.set_shortcut(Some(cmd_j()));

    for kind in KeyEventType::ALL {
        assert!(monitor.enabled_actions_for_shortcut(&cmd_k(), kind).is_empty());
        assert_eq!(monitor.enabled_actions_for_shortcut(&cmd_j(), kind).len(), 1);
    }
}

#[test]
fn clearing_the_shortcut_removes_the_action_for_good() {
    let monitor = ShortcutMonitor::new();
    let delegate = Arc::new(RecordingDelegate::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let action = logged_action("x", cmd_k(), true, &log);
    monitor.add_action(&action, KeyEventType::Down);
    monitor.set_delegate(Some(delegate.clone()));

    action.set_shortcut(None);
    assert!(monitor.actions().is_empty());
    assert_eq!(
        delegate.events(),
        vec![("will_remove", cmd_k()), ("did_remove", cmd_k())]
    );

    // Detached: giving the action a shortcut again does not re-register it.
    action.set_shortcut(Some(cmd_j()));
    assert!(monitor.actions().is_empty());
}

#[test]
fn observed_absence_removes_the_action() {
    let monitor = ShortcutMonitor::new();
    let publisher = ShortcutPublisher::with_value(ShortcutUpdate::Value(cmd_k()));
    let log = Arc::new(Mutex::new(Vec::new()));
    let action = logged_action("x", cmd_k(), true, &log);
    action.observe(&publisher);
    monitor.add_action(&action, KeyEventType::Down);

    publisher.set(ShortcutUpdate::Value(cmd_j()));
    assert!(monitor.handle_shortcut(&cmd_j(), KeyEventType::Down, None));

    publisher.set(ShortcutUpdate::Absent);
    assert!(monitor.actions().is_empty());

    // A later published value updates the action but not the monitor.
    publisher.set(ShortcutUpdate::Value(cmd_k()));
    assert_eq!(action.shortcut(), Some(cmd_k()));
    assert!(monitor.actions().is_empty());
}

#[test]
fn undecodable_observed_update_clears_like_absence() {
    let monitor = ShortcutMonitor::new();
    let publisher = ShortcutPublisher::with_value(ShortcutUpdate::Value(cmd_k()));
    let log = Arc::new(Mutex::new(Vec::new()));
    let action = logged_action("x", cmd_k(), true, &log);
    action.observe(&publisher);
    monitor.add_action(&action, KeyEventType::Down);

    publisher.set(ShortcutUpdate::Encoded(b"not a shortcut".to_vec()));
    assert_eq!(action.shortcut(), None);
    assert!(monitor.actions().is_empty());
}

#[test]
fn dead_target_actions_are_reaped_after_dispatch() {
    let monitor = ShortcutMonitor::new();
    let target = Arc::new(DroppableTarget {
        performed: AtomicUsize::new(0),
    });
    let action = ShortcutAction::with_target(
        Some(cmd_k()),
        Arc::downgrade(&target) as Weak<dyn ActionTarget>,
        "doomed.action",
        0,
    );
    monitor.add_action(&action, KeyEventType::Down);

    assert!(monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, None));
    assert_eq!(monitor.actions().len(), 1);

    drop(target);
    assert!(!monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, None));
    assert!(monitor.actions().is_empty());
}

#[test]
fn explicit_dispatch_target_keeps_dead_target_actions() {
    let monitor = ShortcutMonitor::new();
    let stored = Arc::new(DroppableTarget {
        performed: AtomicUsize::new(0),
    });
    let action = ShortcutAction::with_target(
        Some(cmd_k()),
        Arc::downgrade(&stored) as Weak<dyn ActionTarget>,
        "redirected.action",
        0,
    );
    monitor.add_action(&action, KeyEventType::Down);
    drop(stored);

    let explicit = DroppableTarget {
        performed: AtomicUsize::new(0),
    };
    assert!(monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, Some(&explicit)));
    assert_eq!(explicit.performed.load(Ordering::SeqCst), 1);
    // An explicit target can still drive the action, so it stays registered.
    assert_eq!(monitor.actions().len(), 1);
}

#[test]
fn add_handler_registers_and_returns_the_action() {
    let monitor = ShortcutMonitor::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    let action = monitor.add_handler(cmd_k(), KeyEventType::Down, move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        true
    });

    assert!(monitor.handle_shortcut(&cmd_k(), KeyEventType::Down, None));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(action.shortcut(), Some(cmd_k()));
}

#[test]
fn modifier_only_shortcuts_participate_like_any_other() {
    let monitor = ShortcutMonitor::new();
    let flags_only = Shortcut::parse("cmd+shift").unwrap();
    assert_eq!(flags_only.key_code, None);

    let log = Arc::new(Mutex::new(Vec::new()));
    let action = logged_action("flags", flags_only, true, &log);
    monitor.add_action(&action, KeyEventType::Down);

    assert!(monitor.handle_shortcut(&flags_only, KeyEventType::Down, None));
    assert_eq!(&*log.lock(), &["flags"]);
}
