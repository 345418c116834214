use std::collections::HashMap;
use std::sync::Arc;

use crate::loader::FloatImage;

/// Half-width of the index window kept resident around the viewed image.
pub const BUFF: usize = 10;

// ---------------------------------------------------------------------------
// Index-keyed image cache with a sliding residency window
// ---------------------------------------------------------------------------

/// Decoded images keyed by list index. Entries are created lazily when an
/// index is first visited and dropped again once navigation moves the
/// residency window past them, so long sequences stay bounded while small
/// back-and-forth navigation never re-decodes.
pub struct ImageCache {
    images: HashMap<usize, Arc<FloatImage>>,
    window: usize,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::with_window(BUFF)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            images: HashMap::new(),
            window,
        }
    }

    /// Wrap a signed index request onto the image list.
    pub fn resolve(index: i64, count: usize) -> usize {
        debug_assert!(count > 0);
        index.rem_euclid(count as i64) as usize
    }

    pub fn get(&self, index: usize) -> Option<Arc<FloatImage>> {
        self.images.get(&index).cloned()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.images.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Insert the image decoded for `index` and retire the window-edge
    /// entries it displaces. The inserted index itself is never a target.
    pub fn insert(&mut self, index: usize, image: Arc<FloatImage>, count: usize) {
        self.images.insert(index, image);
        if let Some((lo, hi)) = eviction_targets(index, self.window, count) {
            self.images.remove(&lo);
            self.images.remove(&hi);
        }
    }
}

/// The two indices that fall off the residency window once `index` becomes
/// current, or `None` while the whole list fits (`count <= 2 * window`).
pub fn eviction_targets(index: usize, window: usize, count: usize) -> Option<(usize, usize)> {
    if count <= 2 * window {
        return None;
    }
    let count = count as i64;
    let lo = (index as i64 - window as i64).rem_euclid(count) as usize;
    let hi = (index as i64 + window as i64).rem_euclid(count) as usize;
    Some((lo, hi))
}
