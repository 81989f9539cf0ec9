//! Merge of all mapper outputs into one sorted stream.

use crate::mapper::Record;

/// Concatenates every mapper result and sorts the lot ascending.
pub fn merge_sort(results: Vec<Vec<Record>>) -> Vec<Record> {
    let total = results.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    for mut result in results {
        merged.append(&mut result);
    }
    merged.sort_unstable();
    merged
}
