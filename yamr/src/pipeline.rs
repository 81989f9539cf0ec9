//! Two-phase job orchestration: split, map, merge, shard, reduce.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::YamrError;
use crate::fileblocks;
use crate::mapper::{self, LineTransform, PrefixExpansion};
use crate::reducer::{self, BucketReducer, MinimumPrefix};
use crate::sharder;
use crate::shuffle;

/// Validated parameters of one job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    input: PathBuf,
    mappers: usize,
    reducers: usize,
    output_dir: PathBuf,
}

impl JobConfig {
    /// Checks the input is readable, then that both counts are positive.
    /// Output goes to the working directory unless changed with
    /// [`JobConfig::output_dir`].
    ///
    /// Splits are bounded by the input's lines, but every reducer gets its
    /// own bucket, thread and output file, so those grow linearly with
    /// `reducers`.
    pub fn new(input: impl Into<PathBuf>, mappers: i64, reducers: i64) -> Result<Self, YamrError> {
        let input = input.into();
        if let Err(source) = File::open(&input) {
            return Err(YamrError::Input {
                path: input,
                source,
            });
        }
        if mappers <= 0 {
            return Err(YamrError::MapperCount(mappers));
        }
        if reducers <= 0 {
            return Err(YamrError::ReducerCount(reducers));
        }
        Ok(Self {
            input,
            mappers: mappers as usize,
            reducers: reducers as usize,
            output_dir: PathBuf::from("."),
        })
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn mappers(&self) -> usize {
        self.mappers
    }

    pub fn reducers(&self) -> usize {
        self.reducers
    }
}

/// Summary of a finished job.
#[derive(Debug)]
pub struct JobReport {
    /// Number of splits actually mapped; at most the mapper count.
    pub splits: usize,
    /// Records produced by all mappers together.
    pub records: usize,
    /// Record count of every bucket, by reducer index.
    pub bucket_sizes: Vec<usize>,
    /// Failures that were recovered while the job kept going.
    pub errors: Vec<YamrError>,
}

/// Runs the prefix job with the built-in transform and reducer.
pub fn run(config: &JobConfig) -> Result<JobReport, YamrError> {
    run_job(config, &PrefixExpansion, &MinimumPrefix)
}

/// Runs every phase once, in order.
///
/// Only failing to split the input stops the job. Everything after that
/// is recovered per worker and reported in [`JobReport::errors`].
pub fn run_job<T, R>(config: &JobConfig, transform: &T, reducer: &R) -> Result<JobReport, YamrError>
where
    T: LineTransform + ?Sized,
    R: BucketReducer + ?Sized,
{
    info!("splitting");
    let splits = fileblocks::chunkify(&config.input, config.mappers).map_err(|source| {
        YamrError::Input {
            path: config.input.clone(),
            source,
        }
    })?;
    debug!("{} splits for {} mappers", splits.len(), config.mappers);

    info!("Mapping");
    let (results, mut errors) = mapper::run_map_phase(&splits, transform);

    let sorted = shuffle::merge_sort(results);
    let records = sorted.len();
    let buckets = sharder::shard(sorted, config.reducers);
    let bucket_sizes: Vec<usize> = buckets.iter().map(Vec::len).collect();
    debug!("{} records sharded as {:?}", records, bucket_sizes);

    info!("Reduce");
    errors.extend(reducer::run_reduce_phase(buckets, &config.output_dir, reducer));

    info!("Finished");
    Ok(JobReport {
        splits: splits.len(),
        records,
        bucket_sizes,
        errors,
    })
}
