//! Unit tests for alloc.rs

use super::super::alloc::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_alloc_and_free() {
    let allocator = CachingAllocator::new();
    let block = allocator.alloc(1024);
    assert_eq!(block.len(), 1024);
    allocator.free(block);
    let block2 = allocator.alloc(1024);
    assert_eq!(block2.len(), 1024);
    allocator.free(block2);

    let stats = allocator.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.cached_blocks, 1);
}

#[test]
fn test_reused_block_is_zeroed() {
    let allocator = CachingAllocator::new();
    let mut block = allocator.alloc(4);
    block.as_mut_slice().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
    allocator.free(block);
    let block = allocator.alloc(4);
    assert_eq!(block.as_slice(), &[0.0; 4]);
}

#[test]
fn test_lengths_are_cached_separately() {
    let allocator = CachingAllocator::new();
    allocator.free(allocator.alloc(8));
    let other = allocator.alloc(16);
    assert_eq!(other.len(), 16);
    assert_eq!(allocator.stats().hits, 0);
    assert_eq!(allocator.stats().cached_blocks, 1);
}

#[test]
fn test_empty_cache() {
    let allocator = CachingAllocator::new();
    let block = allocator.alloc(2048);
    allocator.free(block);
    allocator.empty_cache();
    assert_eq!(allocator.stats().cached_blocks, 0);
}

#[test]
fn test_upload_and_download() {
    let allocator = CachingAllocator::new();
    let mut block = allocator.alloc(3);
    block.upload(&[0.5, -1.25, 3.0]);
    assert_eq!(block.as_slice(), &[0.5f32, -1.25, 3.0]);
    assert_eq!(block.download(), vec![0.5, -1.25, 3.0]);
}

#[test]
fn test_thread_safety() {
    let allocator = Arc::new(CachingAllocator::new());
    let mut handles = vec![];
    for _ in 0..4 {
        let alloc = allocator.clone();
        handles.push(thread::spawn(move || {
            let block = alloc.alloc(4096);
            alloc.free(block);
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    let stats = allocator.stats();
    assert_eq!(stats.hits + stats.misses, 4);
    assert!(stats.cached_blocks >= 1);
}
