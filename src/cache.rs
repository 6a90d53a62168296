//! # Route Name Cache
//!
//! Bounded LRU cache of route id → route name, so listings do not look up the
//! same route once per row. Names of unknown routes are not cached; the
//! write path drops a renamed route with [`RouteNameCache::invalidate`] or
//! everything with [`RouteNameCache::clear`] (both through the engine).

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::error::Result;
use crate::model::{RouteId, ROUTE_NO_NAME};

#[derive(Debug)]
pub struct RouteNameCache {
    names: LruCache<RouteId, String>,
}

impl RouteNameCache {
    /// Create a cache holding up to `capacity` names (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            names: LruCache::new(capacity),
        }
    }

    /// Cached name, refreshing its recency.
    pub fn get(&mut self, id: RouteId) -> Option<String> {
        self.names.get(&id).cloned()
    }

    pub fn insert(&mut self, id: RouteId, name: String) {
        self.names.put(id, name);
    }

    /// Name for a route, loading and caching it on a miss.
    ///
    /// `load` returns `None` for an unknown route, which resolves to
    /// `ROUTE_NO_NAME` without being cached.
    pub fn resolve<F>(&mut self, id: RouteId, load: F) -> Result<String>
    where
        F: FnOnce(RouteId) -> Result<Option<String>>,
    {
        if let Some(name) = self.get(id) {
            return Ok(name);
        }
        match load(id)? {
            Some(name) => {
                self.insert(id, name.clone());
                Ok(name)
            }
            None => Ok(ROUTE_NO_NAME.to_string()),
        }
    }

    /// Remove a specific route from the cache.
    pub fn invalidate(&mut self, id: RouteId) {
        self.names.pop(&id);
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
