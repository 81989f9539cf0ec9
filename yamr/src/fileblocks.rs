//! Utilities for converting files into line-aligned splits.

use std::fs;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, ErrorKind, Read, Take};
use std::io::{Seek, SeekFrom};

use std::path::Path;
use std::path::PathBuf;

use memchr;

const BUFFER_SIZE: usize = 16 * 1024;

/// A byte range `[start, end)` of the input file handed to one mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSplit {
    path: PathBuf,
    start: usize,
    end: usize,
}

impl InputSplit {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Return the number of bytes to read for this split.
    pub fn nbytes(&self) -> usize {
        self.end - self.start
    }

    /// Prepare a private, pre-seeked handle for this split.
    pub fn file(&self) -> io::Result<File> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.start as u64))?;
        Ok(file)
    }

    /// Iterates over just those lines the split refers to.
    ///
    /// Every call opens a fresh handle, so the sequence can be restarted.
    pub fn lines(&self) -> io::Result<SplitLines<BufReader<Take<File>>>> {
        let file = self.file()?.take(self.nbytes() as u64);
        let reader = BufReader::with_capacity(BUFFER_SIZE.min(self.nbytes()), file);
        Ok(SplitLines::new(reader))
    }
}

/// Lazy iterator over the non-empty `\n`-terminated lines of a reader.
///
/// The terminator is stripped; any other byte, `\r` included, is kept.
/// The final line may lack a terminator. After the first I/O error the
/// iterator yields that error once and then ends.
#[derive(Debug)]
pub struct SplitLines<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> SplitLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for SplitLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let mut line = Vec::new();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    if line.last() == Some(&b'\n') {
                        line.pop();
                    }
                    if !line.is_empty() {
                        return Some(Ok(line));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Returns up to `max_splits` line-aligned splits covering the file at
/// `path` exactly once. An empty file yields no splits.
///
/// Cut candidates are spaced `size / max_splits` bytes apart and each is
/// pushed forward to just past the next newline, so a split can be much
/// longer than nominal when lines are long. The file is assumed to not
/// be modified between this call and the use of its splits.
pub fn chunkify(path: &Path, max_splits: usize) -> io::Result<Vec<InputSplit>> {
    assert!(max_splits > 0);
    let size = fs::metadata(path)?.len() as usize;
    let mut file = File::open(path)?;
    let mut boundaries = cut_points(&mut file, size, max_splits)?;
    boundaries.push(size);

    let mut start = 0;
    let mut splits = Vec::with_capacity(boundaries.len());
    for end in boundaries {
        if end > start {
            splits.push(InputSplit {
                path: path.to_owned(),
                start,
                end,
            });
        }
        start = end;
    }
    Ok(splits)
}

/// Same cut algorithm as [`chunkify`] over an in-memory buffer, returning
/// the end offset of every split (the last one is always `bytes.len()`).
pub fn split_boundaries(bytes: &[u8], max_splits: usize) -> Vec<usize> {
    assert!(max_splits > 0);
    let mut boundaries = cut_points(&mut Cursor::new(bytes), bytes.len(), max_splits)
        .expect("reading from memory cannot fail");
    boundaries.push(bytes.len());
    boundaries
}

/// Interior cut points, strictly increasing, each just past a newline and
/// strictly inside `(0, size)`. At most `max_splits - 1` are produced.
fn cut_points<R: Read + Seek>(r: &mut R, size: usize, max_splits: usize) -> io::Result<Vec<usize>> {
    let part = size / max_splits;
    // never more cuts than bytes, whatever the requested split count
    let mut cuts = Vec::with_capacity(max_splits.min(size));
    let mut pos = part;
    while pos < size && cuts.len() + 1 < max_splits {
        r.seek(SeekFrom::Start(pos as u64))?;
        let mut reader = BufReader::new(&mut *r);
        let cut = match read_until(b'\n', &mut reader)? {
            Some(read) => pos + read,
            // the remainder of the file has no newline left to cut at
            None => break,
        };
        if cut >= size {
            break;
        }
        cuts.push(cut);
        pos = cut + part;
    }
    Ok(cuts)
}

/// Consumes bytes up to and including `delim`, returning how many were
/// consumed, or `None` if EOF came first.
fn read_until<R: BufRead + ?Sized>(delim: u8, r: &mut R) -> io::Result<Option<usize>> {
    // from stdlib
    let mut read = 0;
    loop {
        let (done, used) = {
            let available = match r.fill_buf() {
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            match memchr::memchr(delim, available) {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        r.consume(used);
        read += used;
        if done {
            return Ok(Some(read));
        }
        if used == 0 {
            return Ok(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn check_boundaries(bytes: &[u8], max_splits: usize) -> Vec<usize> {
        let boundaries = split_boundaries(bytes, max_splits);
        assert!(boundaries.len() <= max_splits);
        assert_eq!(*boundaries.last().unwrap(), bytes.len());
        let mut prev = 0;
        for (i, &b) in boundaries.iter().enumerate() {
            if i + 1 < boundaries.len() {
                assert!(b > prev, "boundaries must increase: {:?}", boundaries);
                assert_eq!(bytes[b - 1], b'\n', "cut {} is not line aligned", b);
            }
            prev = b;
        }
        boundaries
    }

    #[test]
    fn single_split_covers_file() {
        assert_eq!(check_boundaries(b"ab\nab\n", 1), vec![6]);
    }

    #[test]
    fn cuts_are_pushed_past_newline() {
        assert_eq!(check_boundaries(b"ab\nab\n", 3), vec![3, 6]);
        assert_eq!(check_boundaries(b"abc\ndef", 2), vec![4, 7]);
    }

    #[test]
    fn long_line_swallows_candidates() {
        assert_eq!(check_boundaries(b"abcdefghij\nx\n", 4), vec![11, 13]);
    }

    #[test]
    fn tiny_nominal_part_never_exceeds_max_splits() {
        assert_eq!(check_boundaries(b"a\nb\nc\n", 10), vec![2, 4, 6]);
        assert_eq!(check_boundaries(b"a\nb\nc\nd\ne\n", 2), vec![6, 10]);
        assert_eq!(check_boundaries(b"a\nb\nc\nd\ne\n", 3).len(), 3);
    }

    #[test]
    fn varied_inputs_stay_aligned() {
        let text = b"the quick\nbrown\n\nfox jumps over\nthe\nlazy dog\nno newline at end";
        for n in 1..20 {
            check_boundaries(text, n);
        }
    }

    #[test]
    fn chunkify_reconstructs_file() {
        let text = b"alpha\nbeta\ngamma\ndelta\nepsilon\nzeta\neta\n";
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(text).unwrap();
        for n in 1..8 {
            let splits = chunkify(tmp.path(), n).unwrap();
            assert!(!splits.is_empty() && splits.len() <= n);
            assert_eq!(splits[0].start(), 0);
            assert_eq!(splits.last().unwrap().end(), text.len());
            for pair in splits.windows(2) {
                assert_eq!(pair[0].end(), pair[1].start());
            }
            let mut rebuilt = Vec::new();
            for split in &splits {
                let mut buf = Vec::new();
                split.file().unwrap().take(split.nbytes() as u64).read_to_end(&mut buf).unwrap();
                rebuilt.extend(buf);
            }
            assert_eq!(rebuilt, text.to_vec());
        }
    }

    #[test]
    fn huge_split_count_is_bounded_by_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"ab\nab\ncd\n").unwrap();
        let splits = chunkify(tmp.path(), usize::MAX).unwrap();
        let bounds: Vec<_> = splits.iter().map(|s| (s.start(), s.end())).collect();
        assert_eq!(bounds, vec![(0, 3), (3, 6), (6, 9)]);
        assert_eq!(split_boundaries(b"ab\nab\ncd\n", usize::MAX), vec![3, 6, 9]);
    }

    #[test]
    fn empty_file_has_no_splits() {
        let tmp = NamedTempFile::new().unwrap();
        assert!(chunkify(tmp.path(), 4).unwrap().is_empty());
    }

    #[test]
    fn lines_strip_newline_only() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"one\r\n\ntwo\nthree").unwrap();
        let splits = chunkify(tmp.path(), 1).unwrap();
        let lines: Vec<_> = splits[0].lines().unwrap().map(Result::unwrap).collect();
        assert_eq!(lines, vec![b"one\r".to_vec(), b"two".to_vec(), b"three".to_vec()]);

        let again: Vec<_> = splits[0].lines().unwrap().map(Result::unwrap).collect();
        assert_eq!(again, lines);
    }

    #[test]
    fn lines_stop_at_split_end() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"first\nsecond\nthird\n").unwrap();
        let splits = chunkify(tmp.path(), 3).unwrap();
        let per_split: Vec<Vec<Vec<u8>>> = splits
            .iter()
            .map(|s| s.lines().unwrap().map(Result::unwrap).collect())
            .collect();
        let flat: Vec<Vec<u8>> = per_split.into_iter().flatten().collect();
        assert_eq!(flat, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
    }
}
