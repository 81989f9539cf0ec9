//! A single-machine MapReduce over the prefixes of text lines.
//!
//! The input file is cut into line-aligned splits, one mapper thread per
//! split expands every line into its proper prefixes, the combined output
//! is sorted and sharded by content hash, and one reducer thread per
//! shard writes the shortest prefix length that is not duplicated within
//! its shard to `reducer_<n>.out`.

pub mod error;
pub mod fileblocks;
pub mod mapper;
pub mod pipeline;
pub mod reducer;
pub mod sharder;
pub mod shuffle;
pub mod sink;

pub use error::YamrError;
pub use mapper::{LineTransform, PrefixExpansion, Record};
pub use pipeline::{run, run_job, JobConfig, JobReport};
pub use reducer::{BucketReducer, MinimumPrefix};
