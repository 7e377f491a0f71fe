//! In-memory translation cache with TTL.
//! Key: blake3 over (type, target title, text, context), each field length-prefixed;
//! list text is joined by `|` first.
//! No size bound; expired entries are purged lazily before every lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use super::{PhraseInput, TranslationKind, TranslationOutput};
use crate::clock::{Clock, SystemClock};

/// Default TTL: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CacheEntry {
    result: TranslationOutput,
    /// Epoch milliseconds.
    timestamp: u64,
}

pub struct TranslationCache {
    inner: Mutex<HashMap<[u8; 32], CacheEntry>>,
    ttl_millis: u64,
    clock: Arc<dyn Clock>,
}

impl TranslationCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl_millis: ttl.as_millis() as u64,
            clock,
        }
    }

    /// Human-readable key `{type}_{title}_{text}_{context}`, for logs and
    /// external stores. Not unique when fields contain `_`; lookups hash
    /// each field separately.
    pub fn compose_key(
        kind: TranslationKind,
        target_title: &str,
        text: &PhraseInput,
        context: &str,
    ) -> String {
        format!("{}_{}_{}_{}", kind, target_title, text.joined(), context)
    }

    fn hashed_key(
        kind: TranslationKind,
        target_title: &str,
        text: &PhraseInput,
        context: &str,
    ) -> [u8; 32] {
        let joined = text.joined();
        let mut hasher = blake3::Hasher::new();
        for field in [kind.as_str(), target_title, joined.as_str(), context] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        *hasher.finalize().as_bytes()
    }

    fn is_expired(&self, entry: &CacheEntry, now: u64) -> bool {
        now.saturating_sub(entry.timestamp) >= self.ttl_millis
    }

    /// Look up a cached result. `None` if absent or expired.
    pub fn get(
        &self,
        kind: TranslationKind,
        target_title: &str,
        text: &PhraseInput,
        context: &str,
    ) -> Option<TranslationOutput> {
        self.purge_expired();
        let key = Self::hashed_key(kind, target_title, text, context);
        let now = self.clock.now_millis();
        let cache = self.inner.lock();
        let entry = cache.get(&key)?;
        if self.is_expired(entry, now) {
            return None;
        }
        debug!(kind = %kind, "translation_cache_hit");
        Some(entry.result.clone())
    }

    /// Insert or overwrite a result stamped with the current time.
    pub fn put(
        &self,
        kind: TranslationKind,
        target_title: &str,
        text: &PhraseInput,
        context: &str,
        result: TranslationOutput,
    ) {
        let key = Self::hashed_key(kind, target_title, text, context);
        let timestamp = self.clock.now_millis();
        self.inner.lock().insert(key, CacheEntry { result, timestamp });
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut cache = self.inner.lock();
        let before = cache.len();
        cache.retain(|_, entry| now.saturating_sub(entry.timestamp) < self.ttl_millis);
        let removed = before - cache.len();
        if removed > 0 {
            debug!(removed, remaining = cache.len(), "translation_cache_purged");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(clock: &Arc<ManualClock>) -> TranslationCache {
        TranslationCache::with_clock(DEFAULT_TTL, clock.clone())
    }

    fn simple(text: &str) -> TranslationOutput {
        TranslationOutput::Simple(text.to_string())
    }

    #[test]
    fn entry_is_served_until_ttl_and_absent_from_ttl_on() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = cache(&clock);
        let text = PhraseInput::from("w1 w2");
        cache.put(TranslationKind::Simple, "German", &text, "ctx", simple("Zwei Worte"));

        clock.advance(DEFAULT_TTL - Duration::from_millis(1));
        assert_eq!(
            cache.get(TranslationKind::Simple, "German", &text, "ctx"),
            Some(simple("Zwei Worte"))
        );

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get(TranslationKind::Simple, "German", &text, "ctx"), None);
        assert!(cache.is_empty(), "lookup purges the expired entry");
    }

    #[test]
    fn translation_kinds_never_collide() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        let text = PhraseInput::from("cat");
        cache.put(TranslationKind::Simple, "French", &text, "a cat", simple("chat"));
        assert_eq!(cache.get(TranslationKind::Detailed, "French", &text, "a cat"), None);
        assert!(cache.get(TranslationKind::Simple, "French", &text, "a cat").is_some());
    }

    #[test]
    fn language_and_context_are_part_of_the_key() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        let text = PhraseInput::from("cat");
        cache.put(TranslationKind::Simple, "French", &text, "a cat", simple("chat"));
        assert_eq!(cache.get(TranslationKind::Simple, "Spanish", &text, "a cat"), None);
        assert_eq!(cache.get(TranslationKind::Simple, "French", &text, "the cat"), None);
    }

    #[test]
    fn single_element_list_shares_key_with_scalar() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        let list = PhraseInput::List(vec!["w1 w2".into()]);
        cache.put(TranslationKind::Simple, "German", &list, "", simple("Zwei Worte"));
        assert_eq!(
            cache.get(TranslationKind::Simple, "German", &PhraseInput::from("w1 w2"), ""),
            Some(simple("Zwei Worte"))
        );
    }

    #[test]
    fn put_overwrites_and_restamps() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        let text = PhraseInput::from("dog");
        cache.put(TranslationKind::Simple, "German", &text, "", simple("Hund"));
        clock.advance(Duration::from_secs(23 * 3600));
        cache.put(TranslationKind::Simple, "German", &text, "", simple("der Hund"));
        clock.advance(Duration::from_secs(2 * 3600));
        assert_eq!(
            cache.get(TranslationKind::Simple, "German", &text, ""),
            Some(simple("der Hund"))
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        cache.put(TranslationKind::Simple, "German", &"old".into(), "", simple("alt"));
        clock.advance(Duration::from_secs(12 * 3600));
        cache.put(TranslationKind::Simple, "German", &"new".into(), "", simple("neu"));
        clock.advance(Duration::from_secs(12 * 3600));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(TranslationKind::Simple, "German", &"new".into(), "")
            .is_some());
    }

    #[test]
    fn underscores_cannot_shift_text_into_context() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        cache.put(TranslationKind::Simple, "German", &"a_b".into(), "c", simple("X"));
        assert_eq!(cache.get(TranslationKind::Simple, "German", &"a".into(), "b_c"), None);
        assert_eq!(
            cache.get(TranslationKind::Simple, "German", &"a_b".into(), "c"),
            Some(simple("X"))
        );
    }

    #[test]
    fn underscores_cannot_shift_title_into_text() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        cache.put(TranslationKind::Simple, "Old_Norse", &"word".into(), "", simple("orð"));
        assert_eq!(cache.get(TranslationKind::Simple, "Old", &"Norse_word".into(), ""), None);
    }

    #[test]
    fn composite_key_format_is_stable() {
        let key = TranslationCache::compose_key(
            TranslationKind::Detailed,
            "German",
            &PhraseInput::List(vec!["a".into(), "b".into()]),
            "a b c",
        );
        assert_eq!(key, "detailed_German_a|b_a b c");
    }
}
