//! Thread-safe LRU cache: slot arena + doubly-linked recency list + key index.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,
}

/// Lifetime statistics plus current occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Unsynchronized core. `head` is most recently used, `tail` least.
struct Inner<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
{
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn entry(&self, idx: usize) -> Option<&Entry<K, V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn entry_mut(&mut self, idx: usize) -> Option<&mut Entry<K, V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.entry(idx) {
            Some(e) => (e.prev, e.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(e) = self.entry_mut(p) {
                    e.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(e) = self.entry_mut(n) {
                    e.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(e) = self.entry_mut(idx) {
            e.prev = None;
            e.next = None;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(e) = self.entry_mut(idx) {
            e.prev = None;
            e.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(e) = self.entry_mut(h) {
                    e.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.detach(idx);
            self.push_front(idx);
        }
    }

    fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        self.entry(idx).map(|e| &e.value)
    }

    fn put(&mut self, key: K, value: V, capacity: usize) -> Option<(K, V)> {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(e) = self.entry_mut(idx) {
                e.value = value;
            }
            self.touch(idx);
            return None;
        }

        let entry = Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(entry);
                i
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_front(idx);

        if self.index.len() > capacity {
            self.evict_tail()
        } else {
            None
        }
    }

    fn evict_tail(&mut self) -> Option<(K, V)> {
        let tail = self.tail?;
        self.detach(tail);
        let evicted = self.slots.get_mut(tail).and_then(Option::take)?;
        self.index.remove(&evicted.key);
        self.free.push(tail);
        Some((evicted.key, evicted.value))
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    fn keys(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            match self.entry(idx) {
                Some(e) => {
                    out.push(e.key.clone());
                    cursor = e.next;
                }
                None => break,
            }
        }
        out
    }
}

/// Bounded key/value cache evicting the least recently used entry.
///
/// A single mutex guards the index and recency list; every operation under it is O(1).
/// Hit and miss counters are atomics so observers never take the lock, and they cover
/// the whole process lifetime: [`LruCache::clear`] leaves them untouched.
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            inner: Mutex::new(Inner::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    // Every mutation leaves Inner consistent before it can panic, so a poisoned
    // guard is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`. A hit promotes it to most recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.lock().get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Insert or overwrite `key` as most recently used. Returns the evicted entry, if any.
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        let evicted = self.lock().put(key, value, self.capacity);
        if evicted.is_some() {
            tracing::trace!(capacity = self.capacity, "lru evicted least recently used entry");
        }
        evicted
    }

    /// Membership check without touching recency or statistics.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().index.contains_key(key)
    }

    /// Drop every entry. Hit/miss counters are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            misses: self.misses(),
            len: self.len(),
            capacity: self.capacity,
        }
    }

    /// Keys ordered most recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.lock().keys()
    }
}
