//! Commit generations: every commit advances a shared counter, and a
//! resolving commit may only write if its generation is still the latest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

pub struct CommitGenerations {
    generation: Arc<AtomicU64>,
    root: RwLock<CancellationToken>,
}

impl Default for CommitGenerations {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitGenerations {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            root: RwLock::new(CancellationToken::new()),
        }
    }

    /// Start a new generation. Earlier guards become stale but keep running.
    pub fn advance(&self) -> GenerationGuard {
        let token = self.root.read().child_token();
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationGuard {
            generation: Arc::clone(&self.generation),
            my_generation,
            token,
        }
    }

    /// Cancel every outstanding guard and invalidate its generation.
    pub fn cancel_all(&self) {
        let mut root = self.root.write();
        root.cancel();
        *root = CancellationToken::new();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Checked by a task before it publishes its result.
#[derive(Clone)]
pub struct GenerationGuard {
    generation: Arc<AtomicU64>,
    my_generation: u64,
    token: CancellationToken,
}

impl GenerationGuard {
    #[inline]
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.my_generation
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[inline]
    pub fn should_publish(&self) -> bool {
        !self.is_cancelled() && self.is_current()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.my_generation
    }
}
