//! Error taxonomy of a job.
//!
//! Argument and input errors are fatal and carry the process exit code.
//! Split read and output write errors are recovered where they happen,
//! logged, and collected into the job report.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum YamrError {
    #[error("wrong arguments, usage: yamr <src> <mnum> <rnum>")]
    MissingArguments,

    #[error("problems with file {}: {source}", path.display())]
    Input { path: PathBuf, source: io::Error },

    #[error("mnum should be > 0, got {0}")]
    MapperCount(i64),

    #[error("rnum should be > 0, got {0}")]
    ReducerCount(i64),

    #[error("mapper {split} failed on its split: {source}")]
    SplitRead { split: usize, source: io::Error },

    #[error("reducer {reducer} failed writing {}: {source}", path.display())]
    OutputWrite {
        reducer: usize,
        path: PathBuf,
        source: io::Error,
    },

    #[error("{phase} worker {index} panicked")]
    WorkerPanicked { phase: &'static str, index: usize },
}

impl YamrError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            YamrError::MissingArguments => -1,
            YamrError::Input { .. } => -2,
            YamrError::MapperCount(_) => -3,
            YamrError::ReducerCount(_) => -4,
            _ => 1,
        }
    }
}
