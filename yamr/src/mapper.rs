//! Map phase: one thread per split, each expanding its lines into records.

use std::io;
use std::thread;

use bstr::{BString, ByteSlice};
use log::{debug, error};

use crate::error::YamrError;
use crate::fileblocks::InputSplit;

/// The unit of data flowing from mappers to reducers. Compared bytewise.
pub type Record = BString;

/// Turns one input line into zero or more records.
pub trait LineTransform: Sync {
    fn transform(&self, line: &[u8], sink: &mut Vec<Record>);
}

/// Emits every proper prefix of a line, shortest first. The line itself
/// is never emitted, so lines of length 0 or 1 produce nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixExpansion;

impl LineTransform for PrefixExpansion {
    fn transform(&self, line: &[u8], sink: &mut Vec<Record>) {
        sink.extend((1..line.len()).map(|len| BString::from(&line[..len])));
    }
}

/// What one mapper hands back when it joins.
#[derive(Debug)]
pub struct MapOutput {
    pub records: Vec<Record>,
    pub error: Option<YamrError>,
}

/// Reads the lines of `split` and applies `transform` to each.
///
/// A read failure is logged and returned alongside whatever records were
/// produced before it; it never aborts the job.
pub fn map_split<T>(index: usize, split: &InputSplit, transform: &T) -> MapOutput
where
    T: LineTransform + ?Sized,
{
    let mut records = Vec::new();
    let result = split
        .lines()
        .and_then(|lines| map_lines(lines, transform, &mut records));
    let error = match result {
        Ok(()) => None,
        Err(source) => {
            error!("Error in mapper {}: {}", index, source);
            Some(YamrError::SplitRead {
                split: index,
                source,
            })
        }
    };
    debug!(
        "mapper {} read [{}, {}) and emitted {} records, last {:?}",
        index,
        split.start(),
        split.end(),
        records.len(),
        records.last().map(|r| r.as_bstr())
    );
    MapOutput { records, error }
}

/// Feeds every line to `transform` until the source is exhausted or
/// fails. Records emitted before a failure stay in `records`.
pub fn map_lines<I, T>(lines: I, transform: &T, records: &mut Vec<Record>) -> io::Result<()>
where
    I: IntoIterator<Item = io::Result<Vec<u8>>>,
    T: LineTransform + ?Sized,
{
    for line in lines {
        transform.transform(&line?, records);
    }
    Ok(())
}

/// Runs one mapper per split and waits for all of them.
///
/// Results come back in split order. A mapper that panics contributes no
/// records and a `WorkerPanicked` error.
pub fn run_map_phase<T>(splits: &[InputSplit], transform: &T) -> (Vec<Vec<Record>>, Vec<YamrError>)
where
    T: LineTransform + ?Sized,
{
    thread::scope(|s| {
        let handles: Vec<_> = splits
            .iter()
            .enumerate()
            .map(|(i, split)| s.spawn(move || map_split(i, split, transform)))
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        let mut errors = Vec::new();
        for (i, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(output) => {
                    errors.extend(output.error);
                    results.push(output.records);
                }
                Err(_) => {
                    error!("mapper {} panicked", i);
                    errors.push(YamrError::WorkerPanicked {
                        phase: "map",
                        index: i,
                    });
                }
            }
        }
        (results, errors)
    })
}
