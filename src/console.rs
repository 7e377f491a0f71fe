//! Page history of the in-page console overlay (word detail, settings).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsolePage {
    Empty,
    WordDetail,
    Settings,
}

impl ConsolePage {
    pub fn is_main(self) -> bool {
        matches!(self, ConsolePage::Empty | ConsolePage::WordDetail)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    pub page: ConsolePage,
    pub params: Option<Value>,
}

/// Where the overlay router should go: the page plus its params as
/// base64-encoded JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub page: ConsolePage,
    pub data: String,
}

impl Route {
    fn for_entry(entry: &PageEntry) -> Self {
        let json = entry
            .params
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_else(|| "null".to_string());
        Self {
            page: entry.page,
            data: STANDARD.encode(json),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsoleNavigator {
    active: bool,
    history: Vec<PageEntry>,
}

impl ConsoleNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Show `page` (or toggle visibility when `active` is false) and record it
    /// unless it repeats the current entry.
    pub fn toggle(&mut self, page: ConsolePage, params: Option<Value>, active: bool) -> Route {
        self.active = active || !self.active;
        let entry = PageEntry { page, params };
        if self.history.last() != Some(&entry) {
            self.history.push(entry.clone());
        }
        debug!(page = ?page, active = self.active, depth = self.history.len(), "console_navigate");
        Route::for_entry(&entry)
    }

    /// Step back one page. `None` at the root.
    pub fn go_back(&mut self) -> Option<Route> {
        if self.history.len() <= 1 {
            return None;
        }
        self.history.pop();
        self.history.last().map(Route::for_entry)
    }

    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1
    }

    pub fn is_on_main_page(&self) -> bool {
        self.history.last().map_or(true, |entry| entry.page.is_main())
    }

    pub fn current(&self) -> Option<&PageEntry> {
        self.history.last()
    }

    pub fn reset_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_consecutive_pages_are_recorded_once() {
        let mut nav = ConsoleNavigator::new();
        let params = Some(json!({ "phrase": "run out" }));
        nav.toggle(ConsolePage::WordDetail, params.clone(), true);
        nav.toggle(ConsolePage::WordDetail, params, true);
        assert!(!nav.can_go_back());

        nav.toggle(ConsolePage::WordDetail, Some(json!({ "phrase": "give up" })), true);
        assert!(nav.can_go_back());
    }

    #[test]
    fn back_returns_previous_route() {
        let mut nav = ConsoleNavigator::new();
        nav.toggle(ConsolePage::WordDetail, Some(json!({ "phrase": "cat" })), true);
        nav.toggle(ConsolePage::Settings, None, true);
        assert!(!nav.is_on_main_page());

        let route = nav.go_back().unwrap();
        assert_eq!(route.page, ConsolePage::WordDetail);
        let decoded = STANDARD.decode(route.data).unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&decoded).unwrap(),
            json!({ "phrase": "cat" })
        );
        assert!(nav.is_on_main_page());
        assert!(nav.go_back().is_none());
    }

    #[test]
    fn toggle_without_active_flips_visibility() {
        let mut nav = ConsoleNavigator::new();
        nav.toggle(ConsolePage::Empty, None, false);
        assert!(nav.is_active());
        nav.toggle(ConsolePage::Empty, None, false);
        assert!(!nav.is_active());
        nav.toggle(ConsolePage::Empty, None, true);
        assert!(nav.is_active());
    }

    #[test]
    fn empty_history_counts_as_main_page() {
        let mut nav = ConsoleNavigator::new();
        assert!(nav.is_on_main_page());
        nav.toggle(ConsolePage::Settings, None, true);
        nav.reset_history();
        assert!(nav.is_on_main_page());
        assert!(nav.current().is_none());
    }
}
