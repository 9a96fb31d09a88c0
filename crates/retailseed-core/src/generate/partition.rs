//! # Partitioner
//!
//! Splits a stage's `[0, items)` index space into one contiguous range per
//! worker. Each worker derives its keys from its own indices, so disjoint
//! ranges are all it takes to rule out key collisions.

use std::ops::Range;

/// Split `items` across `workers` contiguous, sorted, non-overlapping ranges
/// whose union is exactly `0..items`.
///
/// Each worker gets `items / workers` indices and the last one also absorbs
/// the remainder. When there are fewer items than workers, the first `items`
/// workers get one index each and the rest get empty ranges.
///
/// Always returns `workers` ranges (none when `workers == 0`).
pub fn partition(items: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }

    let chunk = items / workers;
    if chunk == 0 {
        return (0..workers)
            .map(|w| {
                let start = w.min(items);
                let end = (w + 1).min(items);
                start..end
            })
            .collect();
    }

    (0..workers)
        .map(|w| {
            let start = w * chunk;
            let end = if w == workers - 1 { items } else { start + chunk };
            start..end
        })
        .collect()
}
