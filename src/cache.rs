//! A bounded, idle-expiring cache for glyph outline paths a rasterizer
//! would otherwise re-derive from font program bytes on every glyph
//! (§5 "Caching"). This core never produces outlines itself — it's a
//! cache any `RenderTarget` can plug font-shaping output into, keyed by
//! `(font identity, glyph id)`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::render_target::Path;

pub const DEFAULT_CAPACITY: usize = 10_000;
pub const DEFAULT_IDLE_EXPIRY: Duration = Duration::from_secs(10 * 60);

struct Entry {
    path: Path,
    last_used: Instant,
}

/// An LRU-by-idle-time bounded cache. `capacity` evicts the
/// least-recently-used entry once full; `idle_expiry` additionally
/// drops entries nobody has touched in a while on `get`/`insert`, so a
/// long-running process interpreting many documents doesn't hold every
/// glyph it ever rendered.
pub struct GlyphPathCache {
    inner: Mutex<HashMap<(u64, u32), Entry>>,
    capacity: usize,
    idle_expiry: Duration,
}

impl GlyphPathCache {
    pub fn new(capacity: usize, idle_expiry: Duration) -> GlyphPathCache {
        GlyphPathCache { inner: Mutex::new(HashMap::new()), capacity, idle_expiry }
    }

    pub fn get(&self, font_id: u64, glyph_id: u32) -> Option<Path> {
        let mut guard = self.inner.lock().unwrap();
        self.evict_expired(&mut guard);
        let entry = guard.get_mut(&(font_id, glyph_id))?;
        entry.last_used = Instant::now();
        Some(entry.path.clone())
    }

    pub fn insert(&self, font_id: u64, glyph_id: u32, path: Path) {
        let mut guard = self.inner.lock().unwrap();
        self.evict_expired(&mut guard);
        if guard.len() >= self.capacity {
            self.evict_lru(&mut guard);
        }
        guard.insert((font_id, glyph_id), Entry { path, last_used: Instant::now() });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, guard: &mut HashMap<(u64, u32), Entry>) {
        let now = Instant::now();
        let expiry = self.idle_expiry;
        guard.retain(|_, e| now.duration_since(e.last_used) < expiry);
    }

    fn evict_lru(&self, guard: &mut HashMap<(u64, u32), Entry>) {
        if let Some((&key, _)) = guard.iter().min_by_key(|(_, e)| e.last_used) {
            guard.remove(&key);
        }
    }
}

impl Default for GlyphPathCache {
    fn default() -> GlyphPathCache {
        GlyphPathCache::new(DEFAULT_CAPACITY, DEFAULT_IDLE_EXPIRY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_roundtrips() {
        let cache = GlyphPathCache::default();
        let mut path = Path::default();
        path.move_to(0.0, 0.0);
        cache.insert(1, 65, path.clone());
        assert_eq!(cache.get(1, 65), Some(path));
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = GlyphPathCache::new(2, DEFAULT_IDLE_EXPIRY);
        cache.insert(1, 1, Path::default());
        cache.insert(1, 2, Path::default());
        // touch (1,1) so (1,2) becomes least-recently-used
        cache.get(1, 1);
        cache.insert(1, 3, Path::default());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(1, 2).is_none());
        assert!(cache.get(1, 1).is_some());
    }

    #[test]
    fn idle_entries_expire() {
        let cache = GlyphPathCache::new(DEFAULT_CAPACITY, Duration::from_millis(0));
        cache.insert(1, 1, Path::default());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(1, 1).is_none());
    }
}
