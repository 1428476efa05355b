//! Time-boxed lookup of host theme variables.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub const THEME_TTL: Duration = Duration::from_secs(30);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Where theme variables come from (computed styles in a browser host).
pub trait ThemeSource: Send + Sync {
    /// Raw value of a CSS custom property, `None` when unset.
    fn variable(&self, name: &str) -> Option<String>;
}

impl ThemeSource for HashMap<String, String> {
    fn variable(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A theme with no variables; every lookup yields its fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTheme;

impl ThemeSource for NoTheme {
    fn variable(&self, _name: &str) -> Option<String> {
        None
    }
}

struct Cached {
    values: HashMap<String, Option<String>>,
    filled_at: Option<Instant>,
}

/// Shared, read-mostly cache in front of a [`ThemeSource`]. The whole map is
/// dropped once it is older than the TTL.
pub struct CssVarCache {
    source: Box<dyn ThemeSource>,
    clock: Box<dyn Clock>,
    ttl: Duration,
    cached: Mutex<Cached>,
}

impl CssVarCache {
    pub fn new(source: impl ThemeSource + 'static) -> Self {
        Self::with_clock(source, SystemClock)
    }

    pub fn with_clock(source: impl ThemeSource + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            source: Box::new(source),
            clock: Box::new(clock),
            ttl: THEME_TTL,
            cached: Mutex::new(Cached {
                values: HashMap::new(),
                filled_at: None,
            }),
        }
    }

    /// Variable value, or `fallback` when the theme does not set it.
    pub fn lookup(&self, name: &str, fallback: &str) -> String {
        let now = self.clock.now();
        let mut cached = self.cached.lock();
        let expired = cached
            .filled_at
            .is_none_or(|at| now.saturating_duration_since(at) > self.ttl);
        if expired {
            cached.values.clear();
            cached.filled_at = Some(now);
        }
        cached
            .values
            .entry(name.to_string())
            .or_insert_with(|| {
                self.source
                    .variable(name)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Theme primary color.
    pub fn primary(&self) -> String {
        self.lookup("--primary-color", "#03a9f4")
    }
}

impl Default for CssVarCache {
    fn default() -> Self {
        Self::new(NoTheme)
    }
}

impl std::fmt::Debug for CssVarCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CssVarCache").field("ttl", &self.ttl).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        reads: Arc<AtomicUsize>,
        value: Arc<Mutex<String>>,
    }

    impl ThemeSource for Counting {
        fn variable(&self, _name: &str) -> Option<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Some(self.value.lock().clone())
        }
    }

    #[test]
    fn values_are_reused_until_expiry() {
        let reads = Arc::new(AtomicUsize::new(0));
        let value = Arc::new(Mutex::new(" #ff0000 ".to_string()));
        let clock = ManualClock::default();
        let cache = CssVarCache::with_clock(
            Counting {
                reads: reads.clone(),
                value: value.clone(),
            },
            clock.clone(),
        );

        assert_eq!(cache.primary(), "#ff0000");
        *value.lock() = "#00ff00".to_string();
        clock.advance(Duration::from_secs(29));
        assert_eq!(cache.primary(), "#ff0000");
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.primary(), "#00ff00");
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unset_variables_fall_back() {
        let cache = CssVarCache::default();
        assert_eq!(cache.lookup("--missing", "#555"), "#555");
    }
}
