//! Select the most frequent entries of a frequency table

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    num::NonZeroUsize,
};

/// Pick the most frequent items, in order of decreasing frequency
///
/// Items with equal counts come out in the order in which they were
/// provided. If `limit` is set, only that many items are kept.
pub fn most_common<T>(
    items: impl IntoIterator<Item = (T, u64)>,
    limit: Option<NonZeroUsize>,
) -> Vec<(T, u64)> {
    let ranked = items
        .into_iter()
        .enumerate()
        .map(|(order, (item, count))| Ranked { count, order, item });
    let Some(max_len) = limit.map(NonZeroUsize::get) else {
        let mut sorted = ranked.collect::<Vec<_>>();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        return sorted.into_iter().map(Ranked::into_pair).collect();
    };

    // Keep the best items seen so far in a min-heap, whose top is the first
    // one to be evicted once the limit is exceeded
    let mut heap = BinaryHeap::with_capacity(max_len + 1);
    for item in ranked {
        heap.push(Reverse(item));
        if heap.len() > max_len {
            heap.pop();
        }
    }

    // Sorting reversed ranks in ascending order yields the best item first
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(ranked)| ranked.into_pair())
        .collect()
}

/// Item with its ranking criteria
///
/// Higher counts rank higher, then earlier items rank higher.
struct Ranked<T> {
    count: u64,
    order: usize,
    item: T,
}
//
impl<T> Ranked<T> {
    fn into_pair(self) -> (T, u64) {
        (self.item, self.count)
    }
}
//
impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
//
impl<T> Eq for Ranked<T> {}
//
impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
//
impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| other.order.cmp(&self.order))
    }
}
