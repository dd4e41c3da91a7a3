//! Fixed-capacity LRU cache with an eviction hook
//!
//! Thin wrapper over the `lru` crate giving the rest of the engine a
//! stable get/put/evict-oldest shape plus an explicit hook invoked when an
//! entry falls out. Callers hold the cache behind their own lock; nothing
//! here synchronizes.

use lru::LruCache;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::hash::Hash;
use std::num::NonZeroUsize;

type CacheHasher = BuildHasherDefault<FxHasher>;

/// Callback invoked with each evicted entry.
pub type EvictionHook<K, V> = Box<dyn Fn(&K, &V) + Send>;

/// Bounded LRU map. Inserting past capacity evicts the oldest entry.
pub struct BoundedCache<K: Hash + Eq, V> {
  inner: LruCache<K, V, CacheHasher>,
  on_evict: Option<EvictionHook<K, V>>,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
  /// Creates a cache holding at most `capacity` entries (minimum 1).
  pub fn new(capacity: usize) -> Self {
    let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
    Self {
      inner: LruCache::with_hasher(capacity, CacheHasher::default()),
      on_evict: None,
    }
  }

  /// Installs a hook observing evictions, replacing any previous hook.
  pub fn set_eviction_hook(&mut self, hook: EvictionHook<K, V>) {
    self.on_evict = Some(hook);
  }

  /// Looks up a key, marking the entry most recently used.
  pub fn get(&mut self, key: &K) -> Option<&V> {
    self.inner.get(key)
  }

  /// Inserts an entry, evicting the oldest if the cache is full. Replacing
  /// an existing key does not count as an eviction.
  pub fn put(&mut self, key: K, value: V) {
    if let Some((old_key, old_value)) = self.inner.push(key, value) {
      // push returns the displaced entry; same-key replacement is not an
      // eviction.
      if self.inner.peek(&old_key).is_none() {
        if let Some(hook) = &self.on_evict {
          hook(&old_key, &old_value);
        }
      }
    }
  }

  /// Drops every entry without running the eviction hook.
  pub fn clear(&mut self) {
    self.inner.clear();
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.inner.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.inner.cap().get()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;
  use std::sync::atomic::Ordering;
  use std::sync::Arc;

  #[test]
  fn evicts_oldest_at_capacity() {
    let mut cache: BoundedCache<u32, u32> = BoundedCache::new(2);
    cache.put(1, 10);
    cache.put(2, 20);
    cache.put(3, 30);
    assert!(cache.get(&1).is_none());
    assert_eq!(cache.get(&2), Some(&20));
    assert_eq!(cache.get(&3), Some(&30));
  }

  #[test]
  fn get_refreshes_recency() {
    let mut cache: BoundedCache<u32, u32> = BoundedCache::new(2);
    cache.put(1, 10);
    cache.put(2, 20);
    cache.get(&1);
    cache.put(3, 30);
    assert_eq!(cache.get(&1), Some(&10));
    assert!(cache.get(&2).is_none());
  }

  #[test]
  fn eviction_hook_fires_only_for_true_evictions() {
    let evicted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evicted);
    let mut cache: BoundedCache<u32, u32> = BoundedCache::new(1);
    cache.set_eviction_hook(Box::new(move |_, _| {
      counter.fetch_add(1, Ordering::Relaxed);
    }));
    cache.put(1, 10);
    cache.put(1, 11); // replacement, not eviction
    assert_eq!(evicted.load(Ordering::Relaxed), 0);
    cache.put(2, 20);
    assert_eq!(evicted.load(Ordering::Relaxed), 1);
  }
}
