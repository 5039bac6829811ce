//! Caching allocator for `f32` device buffers.
//!
//! Freed buffers are parked in a per-length free list and handed back out on
//! the next request for the same element count, so repeated evaluations of one
//! program stop allocating after the first run.

use log::trace;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A zero-initialised block of `f32` values owned by one node during a run.
#[derive(Debug, PartialEq)]
pub struct DeviceBuffer {
    data: Vec<f32>,
}

impl DeviceBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Copies host values into the buffer, narrowing to `f32`.
    /// Extra values on either side are ignored; callers check lengths first.
    pub fn upload(&mut self, host: &[f64]) {
        for (dst, &src) in self.data.iter_mut().zip(host) {
            *dst = src as f32;
        }
    }

    /// Copies the buffer back to the host, widening to `f64`.
    pub fn download(&self) -> Vec<f64> {
        self.data.iter().map(|&x| f64::from(x)).collect()
    }
}

#[derive(Debug, Default)]
struct Pool {
    free: HashMap<usize, Vec<Vec<f32>>>,
    hits: usize,
    misses: usize,
}

/// Allocation counters, mostly for tests and debug logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub hits: usize,
    pub misses: usize,
    pub cached_blocks: usize,
}

#[derive(Debug, Default)]
pub struct CachingAllocator {
    cache: Mutex<Pool>,
}

impl CachingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    // Free lists stay consistent across a panic; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Pool> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a zeroed buffer of `len` elements, reusing a cached block when
    /// one of that length is available.
    pub fn alloc(&self, len: usize) -> DeviceBuffer {
        let mut pool = self.lock();
        if let Some(mut data) = pool.free.get_mut(&len).and_then(Vec::pop) {
            pool.hits += 1;
            drop(pool);
            data.fill(0.0);
            trace!("alloc {} elements (cached)", len);
            return DeviceBuffer { data };
        }
        pool.misses += 1;
        drop(pool);
        trace!("alloc {} elements (fresh)", len);
        DeviceBuffer {
            data: vec![0.0; len],
        }
    }

    /// Parks `buffer` for reuse.
    pub fn free(&self, buffer: DeviceBuffer) {
        let len = buffer.len();
        self.lock().free.entry(len).or_default().push(buffer.data);
    }

    /// Drops every cached block.
    pub fn empty_cache(&self) {
        let mut pool = self.lock();
        let released: usize = pool.free.values().map(Vec::len).sum();
        pool.free.clear();
        trace!("released {} cached block(s)", released);
    }

    pub fn stats(&self) -> AllocatorStats {
        let pool = self.lock();
        AllocatorStats {
            hits: pool.hits,
            misses: pool.misses,
            cached_blocks: pool.free.values().map(Vec::len).sum(),
        }
    }
}
