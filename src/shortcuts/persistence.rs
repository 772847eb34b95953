//! User shortcut customization persistence.
//!
//! Loads and saves user shortcut overrides as JSON. Format:
//! `HashMap<identifier, Option<String>>` where:
//! - `Some(shortcut_string)` = user override to a new shortcut
//! - `None` (null in JSON) = user unbound this action

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use super::monitor::ShortcutMonitor;
use super::types::Shortcut;

/// User shortcut overrides, keyed by action identifier.
///
/// Stored in ~/.shortcut-monitor/shortcuts.json
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShortcutOverrides {
    #[serde(default)]
    pub overrides: HashMap<String, Option<String>>,
}

impl ShortcutOverrides {
    /// Load overrides from a JSON file.
    ///
    /// Returns empty overrides if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let overrides: Self = serde_json::from_str(&content)?;
        Ok(overrides)
    }

    /// Save overrides to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), MonitorError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides to a monitor by rebinding every registered action
    /// whose identifier has an entry. A `None` entry unbinds the action,
    /// which removes it from the monitor.
    ///
    /// Invalid shortcut strings are collected and returned; valid entries
    /// are still applied.
    pub fn apply_to_monitor(&self, monitor: &ShortcutMonitor) -> Vec<MonitorError> {
        let mut errors = Vec::new();
        for action in monitor.actions() {
            let Some(identifier) = action.identifier() else {
                continue;
            };
            let Some(entry) = self.overrides.get(identifier) else {
                continue;
            };
            match entry {
                None => action.set_shortcut(None),
                Some(shortcut_str) => match Shortcut::parse(shortcut_str) {
                    Ok(shortcut) => action.set_shortcut(Some(shortcut)),
                    Err(source) => errors.push(MonitorError::InvalidShortcut {
                        identifier: identifier.to_string(),
                        shortcut: shortcut_str.clone(),
                        source,
                    }),
                },
            }
        }
        errors
    }

    /// Snapshot the bindings of every identified action in a monitor.
    pub fn from_monitor(monitor: &ShortcutMonitor) -> Self {
        let mut overrides = HashMap::new();
        for action in monitor.actions() {
            if let Some(identifier) = action.identifier() {
                overrides.insert(
                    identifier.to_string(),
                    action.shortcut().map(|s| s.to_canonical_string()),
                );
            }
        }
        Self { overrides }
    }

    pub fn set(&mut self, identifier: impl Into<String>, shortcut: Option<String>) {
        self.overrides.insert(identifier.into(), shortcut);
    }

    /// Remove an override (revert to default).
    pub fn remove(&mut self, identifier: &str) {
        self.overrides.remove(identifier);
    }

    pub fn get(&self, identifier: &str) -> Option<&Option<String>> {
        self.overrides.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Default path for shortcut overrides.
pub fn default_overrides_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".shortcut-monitor")
        .join("shortcuts.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::{KeyEventType, ShortcutAction};
    use tempfile::tempdir;

    #[test]
    fn load_nonexistent_returns_empty() {
        let result = ShortcutOverrides::load(Path::new("/nonexistent/path/shortcuts.json"));
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("shortcuts.json");

        let mut overrides = ShortcutOverrides::default();
        overrides.set("test.action", Some("cmd+k".to_string()));
        overrides.set("test.unbound", None);

        overrides.save(&path).unwrap();

        let loaded = ShortcutOverrides::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("test.action"), Some(&Some("cmd+k".to_string())));
        assert_eq!(loaded.get("test.unbound"), Some(&None));
    }

    #[test]
    fn apply_rebinds_matching_actions() {
        let monitor = ShortcutMonitor::new();
        let action = ShortcutAction::with_identifier(
            Some(Shortcut::parse("cmd+k").unwrap()),
            "test.action",
            0,
        );
        monitor.add_action(&action, KeyEventType::Down);

        let mut overrides = ShortcutOverrides::default();
        overrides.set("test.action", Some("cmd+j".to_string()));
        overrides.set("test.unrelated", Some("cmd+p".to_string()));

        let errors = overrides.apply_to_monitor(&monitor);
        assert!(errors.is_empty());
        assert_eq!(action.shortcut(), Some(Shortcut::parse("cmd+j").unwrap()));
        assert_eq!(monitor.shortcuts(), vec![Shortcut::parse("cmd+j").unwrap()]);
    }

    #[test]
    fn apply_null_unbinds_action() {
        let monitor = ShortcutMonitor::new();
        let action = ShortcutAction::with_identifier(
            Some(Shortcut::parse("cmd+k").unwrap()),
            "test.action",
            0,
        );
        monitor.add_action(&action, KeyEventType::Down);

        let mut overrides = ShortcutOverrides::default();
        overrides.set("test.action", None);

        let errors = overrides.apply_to_monitor(&monitor);
        assert!(errors.is_empty());
        assert_eq!(action.shortcut(), None);
        assert!(monitor.actions().is_empty());
    }

    #[test]
    fn apply_invalid_shortcut_returns_error_and_keeps_binding() {
        let monitor = ShortcutMonitor::new();
        let original = Shortcut::parse("cmd+k").unwrap();
        let action = ShortcutAction::with_identifier(Some(original), "test.action", 0);
        monitor.add_action(&action, KeyEventType::Down);

        let mut overrides = ShortcutOverrides::default();
        overrides.set("test.action", Some("invalid+shortcut+xyz".to_string()));

        let errors = overrides.apply_to_monitor(&monitor);
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            MonitorError::InvalidShortcut { identifier, .. } => {
                assert_eq!(identifier, "test.action");
            }
            other => panic!("expected InvalidShortcut, got {other:?}"),
        }
        assert_eq!(action.shortcut(), Some(original));
    }

    #[test]
    fn from_monitor_snapshots_identified_actions() {
        let monitor = ShortcutMonitor::new();
        let named = ShortcutAction::with_identifier(
            Some(Shortcut::parse("cmd+shift+p").unwrap()),
            "palette.open",
            0,
        );
        monitor.add_action(&named, KeyEventType::Down);
        let anonymous =
            ShortcutAction::with_handler(Some(Shortcut::parse("cmd+1").unwrap()), |_| true);
        monitor.add_action(&anonymous, KeyEventType::Down);

        let overrides = ShortcutOverrides::from_monitor(&monitor);
        assert_eq!(overrides.len(), 1);
        assert_eq!(
            overrides.get("palette.open"),
            Some(&Some("cmd+shift+p".to_string()))
        );
    }

    #[test]
    fn json_format_is_readable() {
        let mut overrides = ShortcutOverrides::default();
        overrides.set("nav.up", Some("cmd+k".to_string()));
        overrides.set("edit.copy", None);

        let json = serde_json::to_string_pretty(&overrides).unwrap();
        assert!(json.contains("nav.up"));
        assert!(json.contains("cmd+k"));
        assert!(json.contains("null"));
    }
}
