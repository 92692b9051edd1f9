/*! Group-preserving chunking

Splits a target-sorted PPDB file into [ByteRange]s that can be processed independently.

Each range starts after a nominal `chunk_size` bytes, is extended to the next line boundary,
and then absorbs every following line that shares the group key of its last line.
Two adjacent ranges never share a group key at their boundary.

The chunker only reads the lines around each boundary:
the last line of a range is found by scanning backwards from the boundary.
!*/
use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use log::debug;
use memchr::memrchr;

use crate::{error::Error, record::Parser};

/// size of the blocks read when looking for the start of a range's last line.
const BACKSCAN: usize = 4096;

/// A chunk of the input: lines in `start..end` (bytes), `index`-th chunk of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(index: usize, start: u64, end: u64) -> Self {
        Self { index, start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Lazy, finite iterator over the [ByteRange]s of a file.
///
/// Stops after the first error.
#[derive(Debug)]
pub struct Chunker<R: Read + Seek> {
    br: BufReader<R>,
    len: u64,
    pos: u64,
    chunk_size: u64,
    index: usize,
    parser: Parser,
    /// keys that closed a previous chunk.
    boundary_keys: HashSet<String>,
    /// group key of the first line of the upcoming chunk.
    next_first_key: Option<String>,
    /// error found while closing the last emitted chunk, yielded next.
    pending: Option<Error>,
    done: bool,
}

impl Chunker<File> {
    pub fn new(src: &Path, chunk_size: u64, parser: Parser) -> Result<Self, Error> {
        let f = File::open(src)?;
        Self::from_reader(f, chunk_size, parser)
    }
}

impl<R: Read + Seek> Chunker<R> {
    pub fn from_reader(mut inner: R, chunk_size: u64, parser: Parser) -> Result<Self, Error> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be at least 1 byte".to_string()));
        }
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            br: BufReader::new(inner),
            len,
            pos: 0,
            chunk_size,
            index: 0,
            parser,
            boundary_keys: HashSet::new(),
            next_first_key: None,
            pending: None,
            done: false,
        })
    }

    /// Total length of the underlying file.
    pub fn file_len(&self) -> u64 {
        self.len
    }

    /// Read the line starting at `offset`.
    /// Leaves the cursor at the end of that line.
    fn line_at(&mut self, offset: u64, buf: &mut Vec<u8>) -> Result<usize, Error> {
        buf.clear();
        self.br.seek(SeekFrom::Start(offset))?;
        Ok(self.br.read_until(b'\n', buf)?)
    }

    fn key_of(&self, offset: u64, line: &[u8]) -> Result<String, Error> {
        let s = std::str::from_utf8(line).map_err(|_| {
            Error::malformed(offset, crate::record::RecordError::InvalidUtf8, line)
        })?;
        self.parser
            .group_key(s)
            .map_err(|reason| Error::malformed(offset, reason, line))
    }

    /// Find the start of the last line of `lo..end`.
    /// `lo` must be a line start and `end` a line end.
    fn last_line_start(&mut self, lo: u64, end: u64) -> Result<u64, Error> {
        // skip the terminating newline of the last line
        let mut hi = end.saturating_sub(1);
        let mut block = [0u8; BACKSCAN];
        while hi > lo {
            let from = hi.saturating_sub(BACKSCAN as u64).max(lo);
            let n = (hi - from) as usize;
            self.br.seek(SeekFrom::Start(from))?;
            self.br.read_exact(&mut block[..n])?;
            if let Some(idx) = memrchr(b'\n', &block[..n]) {
                return Ok(from + idx as u64 + 1);
            }
            hi = from;
        }
        Ok(lo)
    }

    /// Check that `key` did not already close a previous chunk.
    fn check_reappearance(&self, offset: u64, key: &str) -> Result<(), Error> {
        if self.boundary_keys.contains(key) {
            return Err(Error::UnsortedInput {
                offset,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<ByteRange>, Error> {
        if let Some(e) = self.pending.take() {
            return Err(e);
        }
        if self.done || self.pos >= self.len {
            self.done = true;
            return Ok(None);
        }

        let start = self.pos;
        let mut buf = Vec::new();

        if let Some(first_key) = self.next_first_key.take() {
            self.check_reappearance(start, &first_key)?;
        }

        // extend the nominal boundary to the end of the line it falls in.
        let nominal = start.saturating_add(self.chunk_size - 1);
        let mut end = if nominal >= self.len {
            self.len
        } else {
            let n = self.line_at(nominal, &mut buf)?;
            nominal + n as u64
        };

        // key of the last line of the chunk.
        // malformed boundary lines are left to the aggregator, that reports them in file order.
        let last_start = self.last_line_start(start, end)?;
        self.line_at(last_start, &mut buf)?;
        let last_key = match self.key_of(last_start, &buf) {
            Ok(key) => key,
            Err(e) => {
                debug!("chunk {} ends on a malformed line: {}", self.index, e);
                return Ok(Some(self.emit(start, end)));
            }
        };
        // the chunk is still handed over, so that earlier errors in it get reported.
        if let Err(e) = self.check_reappearance(last_start, &last_key) {
            let range = self.emit(start, end);
            self.pending = Some(e);
            return Ok(Some(range));
        }

        // absorb following lines of the same group.
        if end < self.len {
            self.br.seek(SeekFrom::Start(end))?;
            loop {
                buf.clear();
                let n = self.br.read_until(b'\n', &mut buf)?;
                if n == 0 {
                    break;
                }
                match self.key_of(end, &buf) {
                    Ok(key) if key == last_key => end += n as u64,
                    Ok(key) => {
                        self.next_first_key = Some(key);
                        break;
                    }
                    // starts the next chunk
                    Err(_) => break,
                }
            }
        }

        self.boundary_keys.insert(last_key);
        Ok(Some(self.emit(start, end)))
    }

    fn emit(&mut self, start: u64, end: u64) -> ByteRange {
        let range = ByteRange::new(self.index, start, end);
        debug!("chunk {:?}", range);
        self.index += 1;
        self.pos = end;
        if end >= self.len {
            self.done = true;
        }
        range
    }
}

impl<R: Read + Seek> Iterator for Chunker<R> {
    type Item = Result<ByteRange, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(range)) => Some(Ok(range)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn line(source: &str, target: &str) -> String {
        format!("[X] ||| {} ||| {} ||| p(f|e)=0.5 ||| 0-0\n", source, target)
    }

    fn corpus(groups: &[(&str, usize)]) -> String {
        let mut s = String::new();
        for (target, nb) in groups {
            for i in 0..*nb {
                s.push_str(&line(&format!("src{}", i), target));
            }
        }
        s
    }

    fn chunks(content: &str, chunk_size: u64) -> Vec<ByteRange> {
        Chunker::from_reader(Cursor::new(content.to_string()), chunk_size, Parser::default())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn keys(content: &str, range: &ByteRange) -> Vec<String> {
        let parser = Parser::default();
        content[range.start as usize..range.end as usize]
            .lines()
            .map(|l| parser.group_key(l).unwrap())
            .collect()
    }

    #[test]
    fn empty_file() {
        assert!(chunks("", 10).is_empty());
    }

    #[test]
    fn covers_whole_file() {
        let content = corpus(&[("a", 3), ("b", 5), ("c", 1), ("d", 7), ("e", 2)]);
        for chunk_size in [1, 7, 40, 100, 1000, 100_000] {
            let ranges = chunks(&content, chunk_size);
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges.last().unwrap().end, content.len() as u64);
            for (idx, w) in ranges.windows(2).enumerate() {
                assert_eq!(w[0].end, w[1].start);
                assert_eq!(w[0].index, idx);
            }
            for r in &ranges {
                assert!(!r.is_empty());
                // ranges start and end on line boundaries
                assert!(r.start == 0 || content.as_bytes()[r.start as usize - 1] == b'\n');
                assert_eq!(content.as_bytes()[r.end as usize - 1], b'\n');
            }
        }
    }

    #[test]
    fn groups_are_not_split() {
        let content = corpus(&[("a", 3), ("b", 5), ("c", 1), ("d", 7), ("e", 2)]);
        for chunk_size in [1, 7, 40, 100, 1000] {
            let ranges = chunks(&content, chunk_size);
            for w in ranges.windows(2) {
                let left = keys(&content, &w[0]);
                let right = keys(&content, &w[1]);
                assert_ne!(left.last(), right.first());
            }
        }
    }

    #[test]
    fn single_chunk_if_big() {
        let content = corpus(&[("a", 3), ("b", 5)]);
        let ranges = chunks(&content, 1 << 20);
        assert_eq!(ranges, vec![ByteRange::new(0, 0, content.len() as u64)]);
    }

    #[test]
    fn absorbs_spanning_group() {
        // a single line of "a", then a big "b" group
        let content = corpus(&[("a", 1), ("b", 10), ("c", 1)]);
        let first_line = line("src0", "a").len() as u64;
        // second nominal boundary falls at the end of the first "b" line
        let ranges = chunks(&content, first_line);
        assert_eq!(ranges.len(), 3);
        assert_eq!(keys(&content, &ranges[1]), vec!["b".to_string(); 10]);
    }

    #[test]
    fn no_trailing_newline() {
        let mut content = corpus(&[("a", 2), ("b", 2)]);
        content.pop();
        let ranges = chunks(&content, 5);
        assert_eq!(ranges.last().unwrap().end, content.len() as u64);
        assert_eq!(ranges.len(), 2);
    }

    #[test]
    fn unsorted_detected() {
        // "a" closes the first chunk, then reappears after "b".
        let content = corpus(&[("a", 2), ("b", 2), ("a", 2)]);
        let chunk_size = line("src0", "a").len() as u64;
        let r: Result<Vec<_>, _> =
            Chunker::from_reader(Cursor::new(content), chunk_size, Parser::default())
                .unwrap()
                .collect();
        assert!(matches!(r, Err(Error::UnsortedInput { key, .. }) if key == "a"));
    }

    #[test]
    fn chunk_closing_on_reappearing_key_is_emitted() {
        // "a" closes the first chunk, then closes the second one after "b".
        let content = corpus(&[("a", 2), ("b", 1), ("a", 1)]);
        let line_len = line("src0", "a").len() as u64;
        let mut chunker =
            Chunker::from_reader(Cursor::new(content), 2 * line_len, Parser::default()).unwrap();
        assert_eq!(
            chunker.next().unwrap().unwrap(),
            ByteRange::new(0, 0, 2 * line_len)
        );
        assert_eq!(
            chunker.next().unwrap().unwrap(),
            ByteRange::new(1, 2 * line_len, 4 * line_len)
        );
        match chunker.next() {
            Some(Err(Error::UnsortedInput { offset, key })) => {
                assert_eq!(offset, 3 * line_len);
                assert_eq!(key, "a");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(chunker.next().is_none());
    }

    #[test]
    fn malformed_boundary_line() {
        let mut content = corpus(&[("a", 2)]);
        let offset = content.len() as u64;
        content.push_str("broken line\n");
        content.push_str(&corpus(&[("b", 2)]));
        let chunk_size = line("src0", "a").len() as u64;
        let ranges = chunks(&content, chunk_size);
        // the malformed line starts the next chunk
        assert_eq!(ranges[0], ByteRange::new(0, 0, offset));
        assert_eq!(ranges[1].start, offset);
        assert_eq!(ranges.last().unwrap().end, content.len() as u64);
    }

    #[test]
    fn stops_after_error() {
        let content = corpus(&[("a", 2), ("b", 2), ("a", 2), ("c", 2)]);
        let chunk_size = line("src0", "a").len() as u64;
        let mut chunker =
            Chunker::from_reader(Cursor::new(content), chunk_size, Parser::default()).unwrap();
        assert!(matches!(chunker.next(), Some(Ok(_))));
        assert!(matches!(chunker.next(), Some(Ok(_))));
        assert!(matches!(chunker.next(), Some(Err(Error::UnsortedInput { .. }))));
        assert!(chunker.next().is_none());
    }
}
