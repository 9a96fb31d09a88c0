//! # Foreign Key Pools
//!
//! Parent keys are dense: a stage that generated N records owns exactly
//! `first..first + N`. So a pool is just a range, and child generators pick
//! references from it without reading anything back. Stages run in
//! dependency order, so every range handed to a generator describes keys
//! that a completed stage already produced.

use rand::Rng;

/// A dense range of generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    first: i64,
    len: usize,
}

impl KeyRange {
    pub fn new(first: i64, len: usize) -> Self {
        Self { first, len }
    }

    pub fn first(&self) -> i64 {
        self.first
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, key: i64) -> bool {
        key >= self.first && key < self.first + self.len as i64
    }

    /// Uniform pick over the whole range. Many children may share a parent.
    ///
    /// The range must be non-empty; parent volumes are validated before any
    /// stage runs.
    pub fn pick(&self, rng: &mut impl Rng) -> i64 {
        self.first + rng.random_range(0..self.len) as i64
    }

    /// The key at a given position, if the range is long enough.
    pub fn at(&self, position: usize) -> Option<i64> {
        (position < self.len).then(|| self.first + position as i64)
    }

    /// A sub-range starting `offset` positions in.
    pub fn slice(&self, offset: usize, len: usize) -> Option<KeyRange> {
        (offset + len <= self.len).then(|| KeyRange::new(self.first + offset as i64, len))
    }
}

/// Positional split of the address pool: the first `stores` addresses belong
/// to stores, the next `customers` to customers. No address is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressAllocation {
    stores: KeyRange,
    customers: KeyRange,
}

impl AddressAllocation {
    /// Returns `None` when the pool cannot hold both blocks.
    pub fn new(addresses: KeyRange, stores: usize, customers: usize) -> Option<Self> {
        Some(Self {
            stores: addresses.slice(0, stores)?,
            customers: addresses.slice(stores, customers)?,
        })
    }

    /// Address of store number `index` (0-based).
    pub fn store_address(&self, index: usize) -> Option<i64> {
        self.stores.at(index)
    }

    /// Address of customer number `index` (0-based).
    pub fn customer_address(&self, index: usize) -> Option<i64> {
        self.customers.at(index)
    }

    pub fn store_block(&self) -> KeyRange {
        self.stores
    }

    pub fn customer_block(&self) -> KeyRange {
        self.customers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_pick_stays_in_range() {
        let range = KeyRange::new(1_000_000, 10);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let key = range.pick(&mut rng);
            assert!(range.contains(key), "picked {}", key);
        }
    }

    #[test]
    fn test_single_key_range_always_picks_it() {
        let range = KeyRange::new(1, 1);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        assert_eq!(range.pick(&mut rng), 1);
    }

    #[test]
    fn test_positional_lookup() {
        let range = KeyRange::new(1, 3);
        assert_eq!(range.at(0), Some(1));
        assert_eq!(range.at(2), Some(3));
        assert_eq!(range.at(3), None);
    }

    #[test]
    fn test_address_blocks_do_not_overlap() {
        let allocation = AddressAllocation::new(KeyRange::new(1, 2), 1, 1).unwrap();
        assert_eq!(allocation.store_address(0), Some(1));
        assert_eq!(allocation.customer_address(0), Some(2));
        assert_eq!(allocation.store_address(1), None);
    }

    #[test]
    fn test_address_pool_too_small() {
        assert!(AddressAllocation::new(KeyRange::new(1, 2), 2, 1).is_none());
        assert!(AddressAllocation::new(KeyRange::new(1, 3), 2, 1).is_some());
    }
}
