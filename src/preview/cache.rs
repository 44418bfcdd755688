//! LRU cache for rendered pages

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::request::RenderParams;
use super::types::RenderedPage;

/// Cache key for rendered pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page number (1-based)
    pub page: u32,
    /// Target width (stored as thousandths for stable hashing)
    pub width_thousandths: u32,
}

impl CacheKey {
    /// Create a cache key from render parameters
    #[must_use]
    pub fn from_params(page: u32, params: &RenderParams) -> Self {
        Self {
            page,
            width_thousandths: (params.target_width.max(0.0) * 1_000.0) as u32,
        }
    }
}

/// LRU cache for rendered page data
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<RenderedPage>>,
}

impl PageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached page, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<RenderedPage>> {
        self.cache.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a page into the cache, returning an Arc to the data
    pub fn insert(&mut self, key: CacheKey, data: RenderedPage) -> Arc<RenderedPage> {
        let arc = Arc::new(data);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Clear all cached pages
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::types::{PageImage, PageSize};

    fn params(target_width: f32) -> RenderParams {
        RenderParams { target_width }
    }

    fn page_data(page: u32) -> RenderedPage {
        RenderedPage {
            page,
            original: PageSize::new(600.0, 800.0),
            rendered: PageSize::new(300.0, 400.0),
            image: PageImage {
                pixels: vec![255; 12],
                width_px: 2,
                height_px: 2,
            },
        }
    }

    #[test]
    fn width_is_part_of_the_key() {
        let mut cache = PageCache::new(10);
        cache.insert(CacheKey::from_params(1, &params(300.0)), page_data(1));

        assert!(cache.contains(&CacheKey::from_params(1, &params(300.0))));
        assert!(!cache.contains(&CacheKey::from_params(1, &params(301.5))));
        assert!(cache.get(&CacheKey::from_params(1, &params(300.0))).is_some());
    }

    #[test]
    fn lru_eviction() {
        let mut cache = PageCache::new(2);
        for page in 1..=3 {
            cache.insert(CacheKey::from_params(page, &params(300.0)), page_data(page));
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::from_params(1, &params(300.0))));
        assert!(cache.contains(&CacheKey::from_params(3, &params(300.0))));
    }

    #[test]
    fn invalidate_all_empties_cache() {
        let mut cache = PageCache::new(0);
        cache.insert(CacheKey::from_params(1, &params(300.0)), page_data(1));
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
