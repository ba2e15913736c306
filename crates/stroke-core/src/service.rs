//! Catalog level service.
//!
//! Resolves a catalog index to its level, consulting the override table for the
//! accepted variant and memoizing results in a bounded LRU cache. The cache is owned
//! by the service, so several services with different seeds or tables can coexist.

use crate::generator::{GenerateError, GeneratedLevel, LevelGenerator};
use crate::overrides::OverrideTable;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

pub struct LevelService {
    generator: LevelGenerator,
    overrides: OverrideTable,
    cache: LruCache<u32, Arc<GeneratedLevel>>,
}

impl LevelService {
    pub fn new(generator: LevelGenerator, overrides: OverrideTable) -> Self {
        Self::with_capacity(generator, overrides, DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(generator: LevelGenerator, overrides: OverrideTable, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            generator,
            overrides,
            cache: LruCache::new(capacity),
        }
    }

    pub fn generator(&self) -> &LevelGenerator {
        &self.generator
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Variant served for `index`
    pub fn variant_for(&self, index: u32) -> u32 {
        self.overrides.variant_for(index).unwrap_or(0)
    }

    /// Level at catalog `index`, generated on a cache miss.
    pub fn level(&mut self, index: u32) -> Result<Arc<GeneratedLevel>, GenerateError> {
        if let Some(hit) = self.cache.get(&index) {
            return Ok(Arc::clone(hit));
        }
        let variant = self.variant_for(index);
        debug!(index, variant, "level cache miss");
        let generated = Arc::new(self.generator.generate(index, variant)?);
        self.cache.put(index, Arc::clone(&generated));
        Ok(generated)
    }

    /// Swap in a new override table; cached levels are dropped.
    pub fn replace_overrides(&mut self, overrides: OverrideTable) {
        self.overrides = overrides;
        self.cache.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_returns_same_level() {
        let mut service = LevelService::new(LevelGenerator::new(), OverrideTable::new());
        let a = service.level(3).unwrap();
        let b = service.level(3).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(service.cached(), 1);
    }

    #[test]
    fn test_eviction_is_least_recently_used() {
        let mut service = LevelService::with_capacity(LevelGenerator::new(), OverrideTable::new(), 2);
        let first = service.level(0).unwrap();
        service.level(1).unwrap();
        service.level(0).unwrap();
        service.level(2).unwrap();
        assert_eq!(service.cached(), 2);
        // 1 was evicted, 0 survived
        assert!(Arc::ptr_eq(&first, &service.level(0).unwrap()));
    }

    #[test]
    fn test_overrides_select_variant() {
        let mut table = OverrideTable::new();
        table.insert(4, 3);
        let mut service = LevelService::new(LevelGenerator::new(), table);
        let level = service.level(4).unwrap();
        assert_eq!(level.variant, 3);
        assert_eq!(service.level(5).unwrap().variant, 0);

        service.replace_overrides(OverrideTable::new());
        assert_eq!(service.cached(), 0);
        assert_eq!(service.level(4).unwrap().variant, 0);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let service = LevelService::with_capacity(LevelGenerator::new(), OverrideTable::new(), 0);
        assert_eq!(service.capacity(), 1);
    }
}
