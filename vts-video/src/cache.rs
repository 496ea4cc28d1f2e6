//! Frame Cache: fixed-capacity LRU keyed by `(frame, standard, colorspace)`,
//! per `spec.md` §4.4. Built on the `lru` crate, the way
//! `examples/other_examples/887850ea_hawk90-bitvue__crates-bitvue-core-src-stream_state.rs.rs`'s
//! `FrameModel` wraps `lru::LruCache<usize, CachedFrame>`.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use vts_format::{Colorspace, VideoStandard};

use crate::FrameBuffer;

pub const DEFAULT_CAPACITY: usize = 30;

pub type CacheKey = (usize, VideoStandard, Colorspace);

pub struct FrameCache {
    inner: LruCache<CacheKey, Arc<FrameBuffer>>,
}

impl FrameCache {
    pub fn new(capacity: usize) -> Self {
        FrameCache {
            inner: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
        }
    }

    /// A hit moves the entry to most-recently-used.
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<FrameBuffer>> {
        self.inner.get(key).cloned()
    }

    /// Insertion evicts the least-recently-used entry when at capacity.
    pub fn put(&mut self, key: CacheKey, frame: Arc<FrameBuffer>) {
        self.inner.put(key, frame);
    }

    /// Cleared atomically on format or source change, per `spec.md` §3/§4.4.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        FrameCache::new(DEFAULT_CAPACITY)
    }
}
