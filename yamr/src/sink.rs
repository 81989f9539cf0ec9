//! Per-reducer output files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::YamrError;

/// File name of the sink for the reducer at zero-based `index`.
pub fn sink_name(index: usize) -> String {
    format!("reducer_{}.out", index + 1)
}

/// A buffered output file owned by exactly one reducer.
#[derive(Debug)]
pub struct OutputSink {
    index: usize,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OutputSink {
    /// Creates (or truncates) `dir/reducer_<index + 1>.out`.
    pub fn create(dir: &Path, index: usize) -> Result<Self, YamrError> {
        let path = dir.join(sink_name(index));
        let file = File::create(&path).map_err(|source| YamrError::OutputWrite {
            reducer: index,
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            index,
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and closes the file.
    pub fn finish(mut self) -> Result<(), YamrError> {
        self.writer.flush().map_err(|source| self.write_error(source))
    }

    pub(crate) fn write_error(&self, source: io::Error) -> YamrError {
        YamrError::OutputWrite {
            reducer: self.index,
            path: self.path.clone(),
            source,
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
