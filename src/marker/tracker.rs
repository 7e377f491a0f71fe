//! Selection tracker: the ordered set of marked words, the mode machine, and
//! the commit that translates the selected phrase.
//!
//! The tracker is a cheap cloneable handle. Every change is published as a
//! [`SelectionState`] snapshot on a watch channel for the rendering layer.
//! Commits run as Tokio tasks. Outside a runtime a commit is skipped with a
//! warning and the marks are still applied.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::mode::{InputEvent, MarkerMode};
use super::word_id::{sort_key, word_id};
use crate::cancellation::CommitGenerations;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::translate::{PhraseInput, TranslateService};

/// Screen rectangle of a marked word. Carried for the renderer, never read here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkedItem {
    pub id: String,
    pub text: String,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionState {
    pub mode: MarkerMode,
    /// Pointer held down while marking.
    pub pointer_held: bool,
    /// Ascending by sort key; ties in insertion order.
    pub items: Vec<MarkedItem>,
    pub context: String,
    /// Last accepted translation per committed phrase.
    pub translations: HashMap<String, String>,
}

impl SelectionState {
    pub fn is_marking_mode(&self) -> bool {
        self.mode == MarkerMode::Marking
    }

    pub fn selected_phrase(&self) -> String {
        self.items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }
}

struct Shared {
    state: Mutex<SelectionState>,
    updates: watch::Sender<SelectionState>,
    generations: CommitGenerations,
    service: Arc<TranslateService>,
    metrics: Arc<MetricsRegistry>,
}

impl Shared {
    fn publish(&self) {
        let snapshot = self.state.lock().clone();
        self.updates.send_replace(snapshot);
    }
}

#[derive(Clone)]
pub struct SelectionTracker {
    shared: Arc<Shared>,
}

impl SelectionTracker {
    pub fn new(service: Arc<TranslateService>, metrics: Arc<MetricsRegistry>) -> Self {
        let (updates, _) = watch::channel(SelectionState::default());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SelectionState::default()),
                updates,
                generations: CommitGenerations::new(),
                service,
                metrics,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> SelectionState {
        self.shared.state.lock().clone()
    }

    pub fn mode(&self) -> MarkerMode {
        self.shared.state.lock().mode
    }

    pub fn is_marking_mode(&self) -> bool {
        self.shared.state.lock().is_marking_mode()
    }

    /// Pointer currently held down.
    pub fn is_marking(&self) -> bool {
        self.shared.state.lock().pointer_held
    }

    pub fn selected_phrase(&self) -> String {
        self.shared.state.lock().selected_phrase()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.shared.state.lock().is_selected(id)
    }

    pub fn translation_for(&self, phrase: &str) -> Option<String> {
        self.shared.state.lock().translations.get(phrase).cloned()
    }

    fn transition(&self, next: MarkerMode) {
        let prev = {
            let mut state = self.shared.state.lock();
            std::mem::replace(&mut state.mode, next)
        };
        if prev != next {
            info!(from = %prev, to = %next, "marker_mode_transition");
        }
        self.shared.publish();
    }

    pub fn enter_marking(&self) {
        self.transition(MarkerMode::Marking);
    }

    /// Finalize the selection and translate it.
    pub fn exit_marking(&self) -> Option<JoinHandle<()>> {
        self.transition(MarkerMode::Selecting);
        self.commit_selection()
    }

    /// Add a word unless its id is already marked. Outside marking mode the
    /// new selection is committed at once and the commit handle returned.
    pub fn add_item(
        &self,
        id: impl Into<String>,
        text: impl Into<String>,
        anchor: Anchor,
    ) -> Option<JoinHandle<()>> {
        let id = id.into();
        let commit_now = {
            let mut state = self.shared.state.lock();
            if state.is_selected(&id) {
                return None;
            }
            state.items.push(MarkedItem {
                id,
                text: text.into(),
                anchor,
            });
            state.items.sort_by_key(|item| sort_key(&item.id));
            !state.is_marking_mode()
        };
        self.shared.publish();
        commit_now.then(|| self.commit_selection()).flatten()
    }

    /// [`add_item`](Self::add_item) with the id derived from the word position.
    pub fn mark_word(
        &self,
        line: u32,
        word_index: u32,
        text: impl Into<String>,
        anchor: Anchor,
    ) -> Option<JoinHandle<()>> {
        self.add_item(word_id(line, word_index), text, anchor)
    }

    /// Drop all marks. The mode is left as is.
    pub fn clear(&self) {
        self.shared.state.lock().items.clear();
        self.shared.publish();
    }

    /// Replace the context. Existing marks are kept.
    pub fn set_context(&self, context: impl Into<String>) {
        self.shared.state.lock().context = context.into();
        self.shared.publish();
    }

    pub fn handle_input(&self, event: InputEvent) -> Option<JoinHandle<()>> {
        match event {
            InputEvent::KeyDown(key) if key.is_marking_modifier() => {
                self.enter_marking();
                None
            }
            InputEvent::KeyUp(key) if key.is_marking_modifier() => {
                self.is_marking_mode().then(|| self.exit_marking()).flatten()
            }
            InputEvent::PointerDown => {
                self.shared.state.lock().pointer_held = true;
                self.shared.publish();
                None
            }
            InputEvent::PointerUp => {
                let commit = self.is_marking_mode().then(|| self.exit_marking()).flatten();
                self.shared.state.lock().pointer_held = false;
                self.shared.publish();
                commit
            }
            _ => None,
        }
    }

    /// Translate the current phrase in the current context. Failures are
    /// logged and dropped; results from superseded commits are discarded.
    /// Returns `None` when called outside a Tokio runtime.
    pub fn commit_selection(&self) -> Option<JoinHandle<()>> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "no tokio runtime, selection commit skipped");
                return None;
            }
        };
        // Snapshot and generation are taken together so commit order matches
        // the order of the selections they translate.
        let (phrase, context, guard) = {
            let state = self.shared.state.lock();
            let guard = self.shared.generations.advance();
            (state.selected_phrase(), state.context.clone(), guard)
        };
        let shared = Arc::clone(&self.shared);
        debug!(generation = guard.generation(), %phrase, "selection_committed");

        Some(runtime.spawn(async move {
            let request = PhraseInput::List(vec![phrase.clone()]);
            let result = tokio::select! {
                result = shared.service.fetch_simple_translation(request, &context) => result,
                _ = guard.token().cancelled() => {
                    debug!(generation = guard.generation(), "selection_commit_cancelled");
                    return;
                }
            };

            let translated = match result {
                Ok(translated) => translated,
                Err(e) => {
                    warn!(error = %e, %phrase, "selection translation failed");
                    return;
                }
            };

            {
                let mut state = shared.state.lock();
                if !guard.should_publish() {
                    shared.metrics.increment(metric_names::COMMIT_STALE);
                    debug!(generation = guard.generation(), %phrase, "stale_commit_discarded");
                    return;
                }
                state.translations.insert(phrase, translated);
            }
            shared.publish();
        }))
    }

    /// Abort every in-flight commit.
    pub fn cancel_pending(&self) {
        self.shared.generations.cancel_all();
    }
}
