//! Word marking inside subtitle lines and translate-on-commit.

pub mod mode;
pub mod tracker;
pub mod word_id;

pub use mode::{InputEvent, Key, MarkerMode};
pub use tracker::{Anchor, MarkedItem, SelectionState, SelectionTracker};
pub use word_id::{sequential_id, word_id};
