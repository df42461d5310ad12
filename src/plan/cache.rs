/*!
 * Plan Cache
 *
 * Process-lifetime map from type to compiled plan.
 *
 * # Performance
 * - Reads load an `ArcSwap` snapshot: one atomic load, no lock
 * - Compilation is serialized by a mutex and re-checked under it, so a
 *   shape compiles at most once per cache
 * - A pass publishes all of its plans in one clone-and-swap
 */

use super::compiler::Compiler;
use super::Plan;
use crate::core::limits::PLAN_CACHE_INITIAL_CAPACITY;
use crate::core::ShapeError;
use crate::shape::Shape;
use ahash::RandomState;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

type PlanMap = HashMap<TypeId, Arc<Plan>, RandomState>;

pub struct PlanCache {
    plans: ArcSwap<PlanMap>,
    compile_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
}

static GLOBAL: OnceLock<PlanCache> = OnceLock::new();

impl PlanCache {
    pub fn new() -> Self {
        Self {
            plans: ArcSwap::from_pointee(HashMap::with_capacity_and_hasher(
                PLAN_CACHE_INITIAL_CAPACITY,
                RandomState::new(),
            )),
            compile_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compilations: AtomicU64::new(0),
        }
    }

    /// Cache shared by the convenience entry points
    pub fn global() -> &'static PlanCache {
        GLOBAL.get_or_init(PlanCache::new)
    }

    /// Cached plan for a type, if any
    pub fn get(&self, type_id: TypeId) -> Option<Arc<Plan>> {
        match self.lookup(type_id) {
            Some(plan) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(plan)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Lookup without touching the counters
    pub(crate) fn lookup(&self, type_id: TypeId) -> Option<Arc<Plan>> {
        self.plans.load().get(&type_id).cloned()
    }

    /// Cached plan for `shape`, compiling and publishing it on first use
    pub fn get_or_compile(&self, shape: &'static Shape) -> Result<Arc<Plan>, ShapeError> {
        if let Some(plan) = self.get(shape.type_id()) {
            trace!(type_name = shape.type_name(), "Plan cache hit");
            return Ok(plan);
        }

        let _guard = self.compile_lock.lock();
        // Another thread may have published while we waited
        if let Some(plan) = self.lookup(shape.type_id()) {
            return Ok(plan);
        }

        let compiled = Compiler::new(self).run(shape)?;
        let published = compiled.plans.len();
        self.compilations
            .fetch_add(published as u64, Ordering::Relaxed);
        self.plans.rcu(|current| {
            let mut next = PlanMap::clone(current);
            for plan in &compiled.plans {
                next.entry(plan.shape().type_id())
                    .or_insert_with(|| plan.clone());
            }
            next
        });

        debug!(
            type_name = shape.type_name(),
            published,
            cached = self.len(),
            "Published plans"
        );
        Ok(compiled.root)
    }

    pub fn len(&self) -> usize {
        self.plans.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            plans: self.len(),
            hits,
            misses,
            compilations: self.compilations.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub plans: usize,
    pub hits: u64,
    pub misses: u64,
    /// Plans built across all passes
    pub compilations: u64,
    /// Percentage of `get` calls that hit
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Reflect;
    use std::collections::HashMap;
    use std::thread;

    #[test]
    fn test_compile_once_then_hit() {
        let cache = PlanCache::new();
        let first = cache.get_or_compile(Vec::<u32>::shape()).unwrap();
        let second = cache.get_or_compile(Vec::<u32>::shape()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        // Vec<u32> and u32
        assert_eq!(stats.plans, 2);
        assert_eq!(stats.compilations, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_children_published_with_root() {
        let cache = PlanCache::new();
        cache
            .get_or_compile(HashMap::<String, Vec<i8>>::shape())
            .unwrap();
        assert!(cache.lookup(TypeId::of::<Vec<i8>>()).is_some());
        assert!(cache.lookup(TypeId::of::<i8>()).is_some());
    }

    #[test]
    fn test_failed_compile_publishes_nothing() {
        let cache = PlanCache::new();
        assert!(cache.get_or_compile(HashMap::<f32, u8>::shape()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_compiles_share_plan() {
        let cache = PlanCache::new();
        let plans: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get_or_compile(Vec::<Option<u64>>::shape()).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(plans.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.stats().compilations, 3);
    }
}
