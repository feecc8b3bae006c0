//! Idle-expiring cache of parsed command lines.
//!
//! Agents tend to parse the same command line several times in a row (rewrite,
//! then analyze, then extract sub-commands), so trees are kept until the cache
//! has gone untouched for the configured idle window. Any access pushes the
//! deadline back; when it passes, every entry is dropped at once.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tree_sitter::Tree;

use crate::shell::ShellLanguage;

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that required a parse
    pub misses: u64,
    /// Entries currently cached
    pub size: usize,
    /// Entries dropped by idle expiry
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Trees are keyed by the exact text, never a hash of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    language: ShellLanguage,
    text: String,
}

impl CacheKey {
    fn new(language: ShellLanguage, text: &str) -> Self {
        Self {
            language,
            text: text.to_owned(),
        }
    }
}

#[derive(Default)]
struct CacheState {
    trees: HashMap<CacheKey, Tree>,
    idle_timer: Option<JoinHandle<()>>,
    /// Bumped on every re-arm so a superseded timer never clears fresh entries.
    generation: u64,
    stats: CacheStats,
}

impl CacheState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.idle_timer.take() {
            timer.abort();
        }
    }
}

/// Cache of syntax trees keyed by `(language, command line)`.
///
/// The idle timer runs on the ambient tokio runtime. Outside a runtime the
/// cache still works but never expires on its own.
pub struct SyntaxTreeCache {
    state: Arc<Mutex<CacheState>>,
    idle: Duration,
}

impl SyntaxTreeCache {
    pub fn new(idle: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            idle,
        }
    }

    pub fn idle_window(&self) -> Duration {
        self.idle
    }

    /// Tree previously stored for exactly this text, if any.
    ///
    /// Both hits and misses count as activity and restart the idle window.
    pub fn get(&self, language: ShellLanguage, text: &str) -> Option<Tree> {
        let mut state = self.state.lock();
        let tree = state.trees.get(&CacheKey::new(language, text)).cloned();
        if tree.is_some() {
            state.stats.hits += 1;
        } else {
            state.stats.misses += 1;
        }
        self.rearm(&mut state);
        tree
    }

    pub fn set(&self, language: ShellLanguage, text: &str, tree: Tree) {
        let mut state = self.state.lock();
        state.trees.insert(CacheKey::new(language, text), tree);
        state.stats.size = state.trees.len();
        self.rearm(&mut state);
    }

    /// Drop every entry and cancel the idle timer.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.trees.clear();
        state.stats.size = 0;
        state.cancel_timer();
    }

    pub fn len(&self) -> usize {
        self.state.lock().trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().trees.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    fn rearm(&self, state: &mut CacheState) {
        state.cancel_timer();
        state.generation = state.generation.wrapping_add(1);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::trace!("no tokio runtime; syntax tree cache will not expire");
            return;
        };

        let generation = state.generation;
        let idle = self.idle;
        let weak: Weak<Mutex<CacheState>> = Arc::downgrade(&self.state);
        state.idle_timer = Some(runtime.spawn(async move {
            tokio::time::sleep(idle).await;
            let Some(state) = weak.upgrade() else {
                return;
            };
            let mut state = state.lock();
            if state.generation != generation {
                return;
            }
            let evicted = state.trees.len();
            state.trees.clear();
            state.stats.size = 0;
            state.stats.evictions += evicted as u64;
            state.idle_timer = None;
            tracing::trace!(evicted, "syntax tree cache expired after idle window");
        }));
    }
}

impl Drop for SyntaxTreeCache {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.cancel_timer();
        state.trees.clear();
    }
}

impl std::fmt::Debug for SyntaxTreeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTreeCache")
            .field("idle", &self.idle)
            .field("stats", &self.stats())
            .finish()
    }
}
