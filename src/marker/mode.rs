//! Marker modes and the input events that move between them.
//! Holding Control/Meta enters marking; releasing it (or the pointer) commits.

use serde::Serialize;

/// `Marking`: input extends the selection. `Selecting`: the selection is
/// final and every change is translated right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMode {
    Marking,
    #[default]
    Selecting,
}

impl std::fmt::Display for MarkerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerMode::Marking => write!(f, "mark"),
            MarkerMode::Selecting => write!(f, "select"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Control,
    Meta,
    Other(String),
}

impl Key {
    /// Keys that hold the tracker in marking mode.
    #[inline]
    pub fn is_marking_modifier(&self) -> bool {
        matches!(self, Key::Control | Key::Meta)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match name {
            "Control" => Key::Control,
            "Meta" => Key::Meta,
            other => Key::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    PointerDown,
    PointerUp,
}
