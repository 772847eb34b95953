//! Core shortcut value types.
//!
//! This module provides:
//! - `Shortcut` - A keyboard shortcut (key code + modifier flags)
//! - `Modifiers` - Modifier key flags (cmd, ctrl, alt, shift)
//! - `ShortcutParseError` - Detailed parse errors for user feedback
//!
//! A `Shortcut` is an immutable value: identity is defined solely by the
//! key code and the modifier flags. Display strings are derived and never
//! participate in equality or hashing. A shortcut may have no key code at
//! all (`key_code == None`), which describes a modifier-only combination
//! such as holding `⌥` alone.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors that can occur when parsing a shortcut string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutParseError {
    #[error("shortcut string is empty")]
    Empty,
    #[error("shortcut has no key, only modifiers")]
    MissingKey,
    #[error("unknown token '{0}' in shortcut")]
    UnknownToken(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

bitflags! {
    /// Modifier keys for a shortcut.
    ///
    /// `COMMAND` is the platform accelerator: Command (⌘) on macOS,
    /// Super/Win elsewhere.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        const COMMAND = 1 << 0;
        const OPTION  = 1 << 1;
        const CONTROL = 1 << 2;
        const SHIFT   = 1 << 3;
    }
}

impl Modifiers {
    pub fn any(&self) -> bool {
        !self.is_empty()
    }

    pub fn none(&self) -> bool {
        self.is_empty()
    }
}

impl Serialize for Modifiers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for Modifiers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Ok(Modifiers::from_bits_truncate(bits))
    }
}

/// A keyboard shortcut: a virtual key code plus a set of modifier flags.
///
/// Key codes follow the ANSI layout (`'a'` is 0). `key_code == None` is a
/// modifier-only shortcut; it cannot be registered as a system-wide hotkey
/// but in-process sources may deliver it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shortcut {
    pub key_code: Option<u16>,
    pub modifiers: Modifiers,
}

impl Shortcut {
    pub fn new(key_code: Option<u16>, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            modifiers,
        }
    }

    /// Build a shortcut from a key name ("k", "space", "f5", ...).
    pub fn from_key_name(name: &str, modifiers: Modifiers) -> Result<Self, ShortcutParseError> {
        let canonical = canonicalize_key(name);
        match key_code_for_name(&canonical) {
            Some(code) => Ok(Self {
                key_code: Some(code),
                modifiers,
            }),
            None => Err(ShortcutParseError::UnknownKey(name.to_string())),
        }
    }

    /// The canonical name of the key, if the key code maps to a known key.
    pub fn key_name(&self) -> Option<&'static str> {
        self.key_code.and_then(key_name_for_code)
    }

    /// Parse strings like "cmd+shift+k" or "ctrl alt delete".
    ///
    /// A string made of modifier tokens only yields a modifier-only
    /// shortcut (no key code).
    pub fn parse(s: &str) -> Result<Self, ShortcutParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let normalized = s.replace('+', " ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        if parts.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let mut modifiers = Modifiers::empty();
        let mut key_part: Option<&str> = None;

        for part in &parts {
            let part_lower = part.to_lowercase();
            match part_lower.as_str() {
                "cmd" | "command" | "meta" | "super" | "win" | "⌘" | "mod" => {
                    modifiers |= Modifiers::COMMAND
                }
                "ctrl" | "control" | "ctl" | "^" => modifiers |= Modifiers::CONTROL,
                "alt" | "opt" | "option" | "⌥" => modifiers |= Modifiers::OPTION,
                "shift" | "shft" | "⇧" => modifiers |= Modifiers::SHIFT,
                _ => {
                    if key_part.is_some() {
                        return Err(ShortcutParseError::UnknownToken(part.to_string()));
                    }
                    key_part = Some(part);
                }
            }
        }

        match key_part {
            Some(key) => Self::from_key_name(key, modifiers),
            None if modifiers.any() => Ok(Self {
                key_code: None,
                modifiers,
            }),
            None => Err(ShortcutParseError::MissingKey),
        }
    }

    /// Platform-style display, e.g. `⌃⌥⇧⌘K`.
    pub fn display(&self) -> String {
        let mut s = String::new();
        if self.modifiers.contains(Modifiers::CONTROL) {
            s.push('⌃');
        }
        if self.modifiers.contains(Modifiers::OPTION) {
            s.push('⌥');
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            s.push('⇧');
        }
        if self.modifiers.contains(Modifiers::COMMAND) {
            s.push('⌘');
        }
        if let Some(name) = self.key_name() {
            s.push_str(&key_display(name));
        } else if let Some(code) = self.key_code {
            s.push_str(&format!("<{}>", code));
        }
        s
    }

    /// Stable textual form, e.g. `alt+cmd+k`. Used for persistence and logs.
    pub fn to_canonical_string(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.modifiers.contains(Modifiers::OPTION) {
            parts.push("alt");
        }
        if self.modifiers.contains(Modifiers::COMMAND) {
            parts.push("cmd");
        }
        if self.modifiers.contains(Modifiers::CONTROL) {
            parts.push("ctrl");
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            parts.push("shift");
        }
        let key;
        if let Some(name) = self.key_name() {
            parts.push(name);
        } else if let Some(code) = self.key_code {
            key = code.to_string();
            parts.push(&key);
        }
        parts.join("+")
    }

    /// Legacy map representation: `{"keyCode": <number|null>, "modifierFlags": <bits>}`.
    pub fn to_dict(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert(
            "keyCode".to_string(),
            match self.key_code {
                Some(code) => serde_json::Value::from(code),
                None => serde_json::Value::Null,
            },
        );
        map.insert(
            "modifierFlags".to_string(),
            serde_json::Value::from(self.modifiers.bits()),
        );
        map
    }

    /// Decode the legacy map representation. Returns `None` when the map
    /// lacks the expected entries or holds values of the wrong shape.
    pub fn from_dict(map: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let key_code = match map.get("keyCode")? {
            serde_json::Value::Null => None,
            serde_json::Value::Number(n) => Some(u16::try_from(n.as_u64()?).ok()?),
            _ => return None,
        };
        let bits = map.get("modifierFlags")?.as_u64()?;
        Some(Self {
            key_code,
            modifiers: Modifiers::from_bits_truncate(u32::try_from(bits).ok()?),
        })
    }

    /// Byte-serialized form (JSON).
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("shortcut serialization is infallible")
    }

    /// Decode the byte-serialized form.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Canonicalize a key name to the internal standard form.
pub fn canonicalize_key(key: &str) -> String {
    let key_lower = key.to_lowercase();
    match key_lower.as_str() {
        "arrowup" | "uparrow" => "up",
        "arrowdown" | "downarrow" => "down",
        "arrowleft" | "leftarrow" => "left",
        "arrowright" | "rightarrow" => "right",
        "return" => "enter",
        "esc" => "escape",
        "back" => "backspace",
        "del" => "delete",
        "/" | "forwardslash" => "slash",
        "\\" => "backslash",
        ";" => "semicolon",
        "'" | "apostrophe" => "quote",
        "," => "comma",
        "." | "dot" => "period",
        "[" | "leftbracket" => "bracketleft",
        "]" | "rightbracket" => "bracketright",
        "-" | "dash" | "hyphen" => "minus",
        "=" | "equals" => "equal",
        "`" | "backtick" | "grave" => "backquote",
        "pgup" => "pageup",
        "pgdn" | "pgdown" => "pagedown",
        _ => return key_lower,
    }
    .to_string()
}

fn key_display(name: &str) -> String {
    match name {
        "enter" => "↵",
        "escape" => "⎋",
        "tab" => "⇥",
        "space" => "␣",
        "backspace" => "⌫",
        "delete" => "⌦",
        "up" => "↑",
        "down" => "↓",
        "left" => "←",
        "right" => "→",
        "home" => "↖",
        "end" => "↘",
        "pageup" => "⇞",
        "pagedown" => "⇟",
        k => return k.to_uppercase(),
    }
    .to_string()
}

/// ANSI-layout virtual key code for a canonical key name.
pub fn key_code_for_name(name: &str) -> Option<u16> {
    let code = match name {
        "a" => 0x00,
        "s" => 0x01,
        "d" => 0x02,
        "f" => 0x03,
        "h" => 0x04,
        "g" => 0x05,
        "z" => 0x06,
        "x" => 0x07,
        "c" => 0x08,
        "v" => 0x09,
        "b" => 0x0B,
        "q" => 0x0C,
        "w" => 0x0D,
        "e" => 0x0E,
        "r" => 0x0F,
        "y" => 0x10,
        "t" => 0x11,
        "1" => 0x12,
        "2" => 0x13,
        "3" => 0x14,
        "4" => 0x15,
        "6" => 0x16,
        "5" => 0x17,
        "equal" => 0x18,
        "9" => 0x19,
        "7" => 0x1A,
        "minus" => 0x1B,
        "8" => 0x1C,
        "0" => 0x1D,
        "bracketright" => 0x1E,
        "o" => 0x1F,
        "u" => 0x20,
        "bracketleft" => 0x21,
        "i" => 0x22,
        "p" => 0x23,
        "enter" => 0x24,
        "l" => 0x25,
        "j" => 0x26,
        "quote" => 0x27,
        "k" => 0x28,
        "semicolon" => 0x29,
        "backslash" => 0x2A,
        "comma" => 0x2B,
        "slash" => 0x2C,
        "n" => 0x2D,
        "m" => 0x2E,
        "period" => 0x2F,
        "tab" => 0x30,
        "space" => 0x31,
        "backquote" => 0x32,
        "backspace" => 0x33,
        "escape" => 0x35,
        "f5" => 0x60,
        "f6" => 0x61,
        "f7" => 0x62,
        "f3" => 0x63,
        "f8" => 0x64,
        "f9" => 0x65,
        "f11" => 0x67,
        "f10" => 0x6D,
        "f12" => 0x6F,
        "home" => 0x73,
        "pageup" => 0x74,
        "delete" => 0x75,
        "f4" => 0x76,
        "end" => 0x77,
        "f2" => 0x78,
        "pagedown" => 0x79,
        "f1" => 0x7A,
        "left" => 0x7B,
        "right" => 0x7C,
        "down" => 0x7D,
        "up" => 0x7E,
        _ => return None,
    };
    Some(code)
}

/// Canonical key name for an ANSI-layout virtual key code.
pub fn key_name_for_code(code: u16) -> Option<&'static str> {
    let name = match code {
        0x00 => "a",
        0x01 => "s",
        0x02 => "d",
        0x03 => "f",
        0x04 => "h",
        0x05 => "g",
        0x06 => "z",
        0x07 => "x",
        0x08 => "c",
        0x09 => "v",
        0x0B => "b",
        0x0C => "q",
        0x0D => "w",
        0x0E => "e",
        0x0F => "r",
        0x10 => "y",
        0x11 => "t",
        0x12 => "1",
        0x13 => "2",
        0x14 => "3",
        0x15 => "4",
        0x16 => "6",
        0x17 => "5",
        0x18 => "equal",
        0x19 => "9",
        0x1A => "7",
        0x1B => "minus",
        0x1C => "8",
        0x1D => "0",
        0x1E => "bracketright",
        0x1F => "o",
        0x20 => "u",
        0x21 => "bracketleft",
        0x22 => "i",
        0x23 => "p",
        0x24 => "enter",
        0x25 => "l",
        0x26 => "j",
        0x27 => "quote",
        0x28 => "k",
        0x29 => "semicolon",
        0x2A => "backslash",
        0x2B => "comma",
        0x2C => "slash",
        0x2D => "n",
        0x2E => "m",
        0x2F => "period",
        0x30 => "tab",
        0x31 => "space",
        0x32 => "backquote",
        0x33 => "backspace",
        0x35 => "escape",
        0x60 => "f5",
        0x61 => "f6",
        0x62 => "f7",
        0x63 => "f3",
        0x64 => "f8",
        0x65 => "f9",
        0x67 => "f11",
        0x6D => "f10",
        0x6F => "f12",
        0x73 => "home",
        0x74 => "pageup",
        0x75 => "delete",
        0x76 => "f4",
        0x77 => "end",
        0x78 => "f2",
        0x79 => "pagedown",
        0x7A => "f1",
        0x7B => "left",
        0x7C => "right",
        0x7D => "down",
        0x7E => "up",
        _ => return None,
    };
    Some(name)
}
