//! Load-ordered pool of waiting proxies.
//!
//! An indexed binary min-heap: every inserted entry gets a [`PoolHandle`],
//! and an auxiliary `HashMap<PoolHandle, usize>` tracks each entry's slot in
//! the heap so it can be removed in O(log N) before it is popped (a proxy
//! whose wait timed out).
//!
//! Entries with equal priority come out in no particular order. Callers must
//! not rely on FIFO behaviour among ties.

use std::collections::HashMap;

/// Position token returned by [`PriorityPool::insert`].
///
/// Handles are never reused within one pool, so a stale handle simply
/// misses instead of removing somebody else's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct PoolHandle(u64);

#[derive(Debug)]
struct Entry<T, P> {
    priority: P,
    handle: PoolHandle,
    item: T,
}

/// Min-heap keyed by `P`, with removal by handle.
#[derive(Debug)]
pub struct PriorityPool<T, P = u32> {
    heap: Vec<Entry<T, P>>,
    /// Fast lookup: `handle -> heap slot`.
    slots: HashMap<PoolHandle, usize>,
    next_handle: u64,
}

impl<T, P: Ord> PriorityPool<T, P> {
    /// Create a new empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            slots: HashMap::new(),
            next_handle: 0,
        }
    }

    // =================================================================
    // Mutation
    // =================================================================

    /// Insert an item with the given priority. Lower priorities pop first.
    pub fn insert(&mut self, item: T, priority: P) -> PoolHandle {
        let handle = PoolHandle(self.next_handle);
        self.next_handle += 1;

        let pos = self.heap.len();
        self.heap.push(Entry {
            priority,
            handle,
            item,
        });
        self.slots.insert(handle, pos);
        self.sift_up(pos);
        handle
    }

    /// Remove and return the entry with the lowest priority.
    pub fn pop_min(&mut self) -> Option<T> {
        self.remove_at(0)
    }

    /// Remove the entry behind `handle`, if it is still in the pool.
    pub fn remove(&mut self, handle: PoolHandle) -> Option<T> {
        let pos = *self.slots.get(&handle)?;
        self.remove_at(pos)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Priority of the entry that [`pop_min`](Self::pop_min) would return.
    #[must_use]
    pub fn peek_priority(&self) -> Option<&P> {
        self.heap.first().map(|e| &e.priority)
    }

    #[must_use]
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.slots.contains_key(&handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Iterate the entries in heap order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.heap.iter().map(|e| &e.item)
    }

    // =================================================================
    // Heap maintenance
    // =================================================================

    fn remove_at(&mut self, pos: usize) -> Option<T> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(pos, last);
        let entry = self.heap.pop()?;
        self.slots.remove(&entry.handle);

        if pos < self.heap.len() {
            // The entry moved into `pos` may belong above or below it.
            self.sift_down(pos);
            self.sift_up(pos);
        }
        Some(entry.item)
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].priority >= self.heap[parent].priority {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;

            if left < len && self.heap[left].priority < self.heap[smallest].priority {
                smallest = left;
            }
            if right < len && self.heap[right].priority < self.heap[smallest].priority {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.slots.insert(self.heap[a].handle, a);
        self.slots.insert(self.heap[b].handle, b);
    }
}

impl<T, P: Ord> Default for PriorityPool<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn drain(pool: &mut PriorityPool<u32, u32>) -> Vec<u32> {
        std::iter::from_fn(|| pool.pop_min()).collect()
    }

    #[test]
    fn pop_min_yields_non_decreasing_priorities() {
        let mut pool = PriorityPool::new();
        for load in [16, 0, 8, 24, 8, 0, 40] {
            // The item is the priority so the drained order is observable.
            pool.insert(load, load);
        }
        let drained = drain(&mut pool);
        assert_eq!(drained, vec![0, 0, 8, 8, 16, 24, 40]);
        assert!(pool.is_empty());
    }

    #[test]
    fn random_loads_come_out_sorted() {
        let mut rng = rand::thread_rng();
        let mut pool = PriorityPool::new();
        let mut loads: Vec<u32> = (0..500).map(|_| rng.gen_range(0..64) * 8).collect();
        for &load in &loads {
            pool.insert(load, load);
        }
        loads.sort_unstable();
        assert_eq!(drain(&mut pool), loads);
    }

    #[test]
    fn pop_empty_returns_none() {
        let mut pool: PriorityPool<&str> = PriorityPool::new();
        assert!(pool.pop_min().is_none());
        assert!(pool.peek_priority().is_none());
    }

    #[test]
    fn remove_by_handle() {
        let mut pool = PriorityPool::new();
        let _a = pool.insert("a", 8);
        let b = pool.insert("b", 0);
        let _c = pool.insert("c", 16);

        assert!(pool.contains(b));
        assert_eq!(pool.remove(b), Some("b"));
        assert!(!pool.contains(b));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.pop_min(), Some("a"));
        assert_eq!(pool.pop_min(), Some("c"));
    }

    #[test]
    fn remove_twice_is_noop() {
        let mut pool = PriorityPool::new();
        let h = pool.insert("only", 0);
        assert_eq!(pool.remove(h), Some("only"));
        assert_eq!(pool.remove(h), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn remove_after_pop_is_noop() {
        let mut pool = PriorityPool::new();
        let h = pool.insert("x", 0);
        let _other = pool.insert("y", 8);
        assert_eq!(pool.pop_min(), Some("x"));
        assert_eq!(pool.remove(h), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn stale_handle_never_hits_new_entry() {
        let mut pool = PriorityPool::new();
        let old = pool.insert("old", 0);
        pool.pop_min();
        let new = pool.insert("new", 0);
        assert_ne!(old, new);
        assert_eq!(pool.remove(old), None);
        assert!(pool.contains(new));
    }

    #[test]
    fn interleaved_removals_keep_heap_valid() {
        let mut rng = rand::thread_rng();
        let mut pool = PriorityPool::new();
        let mut live = Vec::new();
        for i in 0..300u32 {
            let load = rng.gen_range(0..32);
            live.push((pool.insert(load, load), load));
            if i % 3 == 0 {
                let victim = rng.gen_range(0..live.len());
                let (handle, load) = live.swap_remove(victim);
                assert_eq!(pool.remove(handle), Some(load));
            }
        }
        assert_eq!(pool.len(), live.len());
        let mut expected: Vec<u32> = live.iter().map(|&(_, l)| l).collect();
        expected.sort_unstable();
        assert_eq!(drain(&mut pool), expected);
    }

    #[test]
    fn peek_matches_pop() {
        let mut pool = PriorityPool::new();
        pool.insert("b", 8);
        pool.insert("a", 0);
        assert_eq!(pool.peek_priority(), Some(&0));
        assert_eq!(pool.pop_min(), Some("a"));
        assert_eq!(pool.peek_priority(), Some(&8));
    }
}
