//! Shard the sorted record stream into reducer buckets by content hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::mapper::Record;

/// The records one reducer receives, in ascending order.
pub type Bucket = Vec<Record>;

/// Moves every record of `sorted` into the bucket its hash selects.
///
/// Returns exactly `npartitions` buckets. Each bucket keeps the relative
/// order of `sorted`, and equal records always share a bucket. There is
/// no rebalancing, so buckets can be arbitrarily skewed.
pub fn shard(sorted: Vec<Record>, npartitions: usize) -> Vec<Bucket> {
    assert!(npartitions > 0);
    let mut buckets = vec![Vec::new(); npartitions];
    let npartitions = npartitions as u64;
    for record in sorted {
        let key = hash_key(&record, npartitions);
        buckets[key].push(record);
    }
    buckets
}

/// Bucket index of `bytes`; the empty record always goes to bucket 0.
///
/// `DefaultHasher::new` uses fixed keys, so the index is stable across
/// runs of the same build.
pub fn hash_key(bytes: &[u8], npartitions: u64) -> usize {
    if bytes.is_empty() {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    (hasher.finish() % npartitions) as usize
}
