//! Reduce phase: one thread per bucket, each writing to its own sink.

use std::io::{self, Write};
use std::path::Path;
use std::thread;

use log::{debug, error};

use crate::error::YamrError;
use crate::mapper::Record;
use crate::sharder::Bucket;
use crate::sink::OutputSink;

/// Consumes one ascending bucket and writes its result to `out`.
pub trait BucketReducer: Sync {
    fn reduce(&self, bucket: &[Record], out: &mut dyn Write) -> io::Result<()>;
}

/// Writes `Minimum prefix: <n>` for a non-empty bucket, nothing otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimumPrefix;

impl BucketReducer for MinimumPrefix {
    fn reduce(&self, bucket: &[Record], out: &mut dyn Write) -> io::Result<()> {
        if let Some(minimum) = minimum_prefix(bucket) {
            writeln!(out, "Minimum prefix: {}", minimum)?;
        }
        Ok(())
    }
}

/// Shortest prefix length at which no two records of this bucket, at or
/// above that length, are equal. `None` for an empty bucket.
///
/// The bucket must be sorted so that duplicates are adjacent among the
/// records that pass the current threshold. The result only describes
/// this bucket, not the source lines its records came from.
pub fn minimum_prefix(bucket: &[Record]) -> Option<usize> {
    if bucket.is_empty() {
        return None;
    }
    let mut minimum = 1;
    let mut current: &[u8] = b"";
    for record in bucket {
        if record.len() >= minimum {
            if record.as_slice() == current {
                minimum = record.len() + 1;
            } else {
                current = record.as_slice();
            }
        }
    }
    Some(minimum)
}

fn reduce_bucket<R>(bucket: &[Record], mut sink: OutputSink, reducer: &R) -> Result<(), YamrError>
where
    R: BucketReducer + ?Sized,
{
    if let Err(source) = reducer.reduce(bucket, &mut sink) {
        return Err(sink.write_error(source));
    }
    sink.finish()
}

/// Opens one sink per bucket, runs one reducer thread per bucket and
/// waits for all of them.
///
/// Output failures are logged and returned; they never stop the other
/// reducers. A bucket whose sink cannot be created is skipped.
pub fn run_reduce_phase<R>(buckets: Vec<Bucket>, output_dir: &Path, reducer: &R) -> Vec<YamrError>
where
    R: BucketReducer + ?Sized,
{
    let mut errors = Vec::new();
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(buckets.len());
        for (i, bucket) in buckets.into_iter().enumerate() {
            let sink = match OutputSink::create(output_dir, i) {
                Ok(sink) => sink,
                Err(e) => {
                    error!("{}", e);
                    errors.push(e);
                    continue;
                }
            };
            debug!("reducer {} takes {} records into {}", i, bucket.len(), sink.path().display());
            let handle = s.spawn(move || reduce_bucket(&bucket, sink, reducer));
            handles.push((i, handle));
        }

        for (i, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("{}", e);
                    errors.push(e);
                }
                Err(_) => {
                    error!("reducer {} panicked", i);
                    errors.push(YamrError::WorkerPanicked {
                        phase: "reduce",
                        index: i,
                    });
                }
            }
        }
    });
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn records(items: &[&str]) -> Vec<Record> {
        items.iter().map(|s| Record::from(*s)).collect()
    }

    #[test]
    fn duplicate_raises_threshold() {
        assert_eq!(minimum_prefix(&records(&["a", "a"])), Some(2));
    }

    #[test]
    fn distinct_records_keep_threshold() {
        assert_eq!(minimum_prefix(&records(&["x", "xy"])), Some(1));
    }

    #[test]
    fn empty_bucket_has_no_result() {
        assert_eq!(minimum_prefix(&[]), None);
    }

    #[test]
    fn short_duplicates_below_threshold_are_ignored() {
        let bucket = records(&["a", "a", "ab", "ab", "b", "b"]);
        assert_eq!(minimum_prefix(&bucket), Some(3));
    }

    #[test]
    fn threshold_is_monotone_and_bounded() {
        let bucket = records(&["a", "ab", "ab", "abc", "abc", "abcd", "b", "bc", "bc"]);
        let longest = bucket.iter().map(|r| r.len()).max().unwrap();
        let mut previous = 1;
        for end in 1..=bucket.len() {
            let now = minimum_prefix(&bucket[..end]).unwrap();
            assert!(now >= previous);
            assert!(now <= longest + 1);
            previous = now;
        }
        assert_eq!(previous, 4);
    }

    #[test]
    fn reducer_writes_one_line_or_nothing() {
        let mut out = Vec::new();
        MinimumPrefix.reduce(&records(&["a", "a"]), &mut out).unwrap();
        assert_eq!(out, b"Minimum prefix: 2\n");

        let mut out = Vec::new();
        MinimumPrefix.reduce(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn reduce_phase_writes_every_sink() {
        let dir = tempdir().unwrap();
        let buckets = vec![records(&["a", "a"]), Vec::new(), records(&["x", "xy"])];
        let errors = run_reduce_phase(buckets, dir.path(), &MinimumPrefix);
        assert!(errors.is_empty());
        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("reducer_1.out"), "Minimum prefix: 2\n");
        assert_eq!(read("reducer_2.out"), "");
        assert_eq!(read("reducer_3.out"), "Minimum prefix: 1\n");
    }

    #[test]
    fn unwritable_directory_is_recorded() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent");
        let errors = run_reduce_phase(vec![records(&["a"]), Vec::new()], &missing, &MinimumPrefix);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, YamrError::OutputWrite { .. })));
    }
}
