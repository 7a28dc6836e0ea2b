//! Bounded per-area pools of transient artifacts with random and recent
//! sampling.
//!
//! Each area (or `(area, cell)` for cell-gridded variants) holds an
//! insertion-ordered bucket capped at a configured size; overflow evicts the
//! oldest entry. Buckets are `IndexMap`s so sampling by position stays O(1).

use indexmap::IndexMap;
use rand::seq::index::sample;
use rand::Rng;
use rustc_hash::FxHashMap;

/// Partition key for the live caches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub area_id: u32,
    pub cell_id: Option<u64>,
}

impl CacheKey {
    pub fn area(area_id: u32) -> Self {
        Self {
            area_id,
            cell_id: None,
        }
    }

    pub fn new(area_id: u32, cell_id: Option<u64>) -> Self {
        Self { area_id, cell_id }
    }
}

pub struct LiveCache<V> {
    max_entries_per_area: usize,
    areas: FxHashMap<CacheKey, IndexMap<u32, V>>,
}

impl<V> LiveCache<V> {
    pub fn new(max_entries_per_area: usize) -> Self {
        Self {
            max_entries_per_area: max_entries_per_area.max(1),
            areas: FxHashMap::default(),
        }
    }

    /// Inserts at the newest end, evicting the oldest entry if the bucket is
    /// full. Re-adding an existing id refreshes its value but keeps its
    /// position.
    pub fn add(&mut self, key: CacheKey, id: u32, value: V) {
        let bucket = self.areas.entry(key).or_default();
        if !bucket.contains_key(&id) && bucket.len() >= self.max_entries_per_area {
            bucket.shift_remove_index(0);
        }
        bucket.insert(id, value);
    }

    pub fn find(&self, key: CacheKey, id: u32) -> Option<&V> {
        self.areas.get(&key)?.get(&id)
    }

    pub fn find_mut(&mut self, key: CacheKey, id: u32) -> Option<&mut V> {
        self.areas.get_mut(&key)?.get_mut(&id)
    }

    pub fn contains(&self, key: CacheKey, id: u32) -> bool {
        self.find(key, id).is_some()
    }

    /// Removes preserving the bucket's insertion order.
    pub fn remove(&mut self, key: CacheKey, id: u32) -> Option<V> {
        self.areas.get_mut(&key)?.shift_remove(&id)
    }

    /// Uniform sample of up to `n` entries matching `filter`, no
    /// duplicates.
    pub fn random_set(
        &self,
        key: CacheKey,
        n: usize,
        rng: &mut impl Rng,
        mut filter: impl FnMut(&V) -> bool,
    ) -> Vec<&V> {
        let Some(bucket) = self.areas.get(&key) else {
            return Vec::new();
        };

        let eligible: Vec<&V> = bucket.values().filter(|v| filter(v)).collect();
        if eligible.len() <= n {
            return eligible;
        }

        sample(rng, eligible.len(), n)
            .into_iter()
            .map(|i| eligible[i])
            .collect()
    }

    /// Newest-first scan returning up to `n` matching entries.
    pub fn recent_set(
        &self,
        key: CacheKey,
        n: usize,
        mut filter: impl FnMut(&V) -> bool,
    ) -> Vec<&V> {
        let Some(bucket) = self.areas.get(&key) else {
            return Vec::new();
        };
        bucket.values().rev().filter(|v| filter(v)).take(n).collect()
    }

    /// Recency-biased sample: considers the newest `2n` matching entries and
    /// picks `n` of those uniformly, so fresh artifacts dominate without the
    /// very newest always winning.
    pub fn recent_sample(
        &self,
        key: CacheKey,
        n: usize,
        rng: &mut impl Rng,
        filter: impl FnMut(&V) -> bool,
    ) -> Vec<&V> {
        let window = self.recent_set(key, n.saturating_mul(2), filter);
        if window.len() <= n {
            return window;
        }

        sample(rng, window.len(), n)
            .into_iter()
            .map(|i| window[i])
            .collect()
    }

    /// First entry matching `predicate` across every bucket. For lookups
    /// where the request carries no usable area key.
    pub fn find_by(&self, mut predicate: impl FnMut(&V) -> bool) -> Option<&V> {
        self.areas
            .values()
            .flat_map(IndexMap::values)
            .find(|v| predicate(v))
    }

    /// Removes the first entry matching `predicate`, wherever it lives.
    pub fn remove_by(&mut self, mut predicate: impl FnMut(&V) -> bool) -> Option<V> {
        for bucket in self.areas.values_mut() {
            if let Some(at) = bucket.values().position(|v| predicate(v)) {
                return bucket.shift_remove_index(at).map(|(_, v)| v);
            }
        }
        None
    }

    pub fn entries_in_area(&self, key: CacheKey) -> usize {
        self.areas.get(&key).map_or(0, IndexMap::len)
    }

    pub fn total_entries(&self) -> usize {
        self.areas.values().map(IndexMap::len).sum()
    }

    /// Visits every entry; used for cross-area sweeps like clearing a lost
    /// summoner.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(CacheKey, &mut V)) {
        for (&key, bucket) in &mut self.areas {
            for value in bucket.values_mut() {
                f(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5EED)
    }

    #[test]
    fn add_then_find_round_trips() {
        let mut cache = LiveCache::new(4);
        let key = CacheKey::area(1);

        cache.add(key, 10, "ten");
        assert_eq!(cache.find(key, 10), Some(&"ten"));

        cache.remove(key, 10);
        assert_eq!(cache.find(key, 10), None);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut cache = LiveCache::new(3);
        let key = CacheKey::area(1);

        for id in 0..5 {
            cache.add(key, id, id);
        }

        assert_eq!(cache.entries_in_area(key), 3);
        assert!(!cache.contains(key, 0));
        assert!(!cache.contains(key, 1));
        assert!(cache.contains(key, 2));
        assert!(cache.contains(key, 4));
    }

    #[test]
    fn areas_are_independent() {
        let mut cache = LiveCache::new(2);
        cache.add(CacheKey::area(1), 1, ());
        cache.add(CacheKey::area(2), 1, ());
        cache.add(CacheKey::new(2, Some(7)), 1, ());

        assert_eq!(cache.entries_in_area(CacheKey::area(1)), 1);
        assert_eq!(cache.entries_in_area(CacheKey::area(2)), 1);
        assert_eq!(cache.entries_in_area(CacheKey::new(2, Some(7))), 1);
        assert_eq!(cache.total_entries(), 3);
    }

    #[test]
    fn random_set_undershoots_gracefully() {
        let mut cache = LiveCache::new(10);
        let key = CacheKey::area(1);
        for id in 0..3 {
            cache.add(key, id, id);
        }

        let mut sampled = cache.random_set(key, 5, &mut rng(), |_| true);
        sampled.sort_unstable();
        assert_eq!(sampled, vec![&0, &1, &2]);
    }

    #[test]
    fn random_set_returns_distinct_entries() {
        let mut cache = LiveCache::new(10);
        let key = CacheKey::area(2000);
        for id in 100..105 {
            cache.add(key, id, id);
        }

        let mut sampled: Vec<u32> = cache
            .random_set(key, 3, &mut rng(), |_| true)
            .into_iter()
            .copied()
            .collect();
        sampled.sort_unstable();
        sampled.dedup();
        assert_eq!(sampled.len(), 3);
        assert!(sampled.iter().all(|id| (100..105).contains(id)));
    }

    #[test]
    fn random_set_respects_filter() {
        let mut cache = LiveCache::new(10);
        let key = CacheKey::area(1);
        for id in 0..10 {
            cache.add(key, id, id);
        }

        let sampled = cache.random_set(key, 10, &mut rng(), |v| v % 2 == 0);
        assert!(sampled.iter().all(|v| *v % 2 == 0));
        assert_eq!(sampled.len(), 5);
    }

    #[test]
    fn recent_set_is_newest_first() {
        let mut cache = LiveCache::new(10);
        let key = CacheKey::area(1);
        for id in 0..5 {
            cache.add(key, id, id);
        }

        let recent = cache.recent_set(key, 3, |_| true);
        assert_eq!(recent, vec![&4, &3, &2]);
    }

    #[test]
    fn recent_sample_stays_in_window() {
        let mut cache = LiveCache::new(20);
        let key = CacheKey::area(1);
        for id in 0..20 {
            cache.add(key, id, id);
        }

        let sampled = cache.recent_sample(key, 4, &mut rng(), |_| true);
        assert_eq!(sampled.len(), 4);
        // Window is the newest eight entries.
        assert!(sampled.iter().all(|v| **v >= 12));
    }
}
