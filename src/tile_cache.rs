//! In-memory LRU cache for rendered tiles.
//!
//! Entries are keyed by tile coordinate and bounded by entry count; once
//! the capacity is exceeded the least-recently-used tile is dropped. There
//! is no TTL and no invalidation: the underlying datasets are static for
//! the lifetime of the process.
//!
//! Concurrent misses for the same coordinate are collapsed into a single
//! render via a per-key in-flight cell, so a burst of requests for an
//! uncached tile costs one query, not one per request.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::error::Error;
use crate::TileCoord;

pub struct TileCache {
    entries: Mutex<LruCache<TileCoord, Bytes>>,
    in_flight: Mutex<HashMap<TileCoord, Arc<OnceCell<Bytes>>>>,
    stats: TileCacheStats,
}

/// Counters are atomic so they can be read without taking the cache lock.
#[derive(Default)]
pub struct TileCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl TileCache {
    pub fn new(capacity: NonZeroUsize) -> TileCache {
        TileCache {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            stats: TileCacheStats::default(),
        }
    }

    /// Returns the cached payload for `coord`, rendering it through
    /// `render` on a miss. An empty payload is a cached value like any
    /// other; a failed render caches nothing.
    pub async fn get_or_render<F, Fut>(&self, coord: TileCoord, render: F) -> Result<Bytes, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, Error>>,
    {
        if let Some(tile) = self.entries.lock().await.get(&coord) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(tile.clone());
        }

        // Join an in-progress render for this coordinate, or become the
        // one doing it.
        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(coord)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = cell
            .get_or_try_init(|| async {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(tile = %coord, "rendering uncached tile");
                render().await
            })
            .await
            .cloned();

        match result {
            Ok(tile) => {
                // Publish before retiring the in-flight cell so late
                // joiners either find the entry or the cell, never neither.
                {
                    let mut entries = self.entries.lock().await;
                    if let Some((evicted, _)) = entries.push(coord, tile.clone()) {
                        if evicted != coord {
                            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                            debug!(tile = %evicted, "evicted least-recently-used tile");
                        }
                    }
                }
                self.in_flight.lock().await.remove(&coord);
                Ok(tile)
            }
            Err(err) => {
                self.in_flight.lock().await.remove(&coord);
                Err(err)
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub fn stats(&self) -> &TileCacheStats {
        &self.stats
    }
}
