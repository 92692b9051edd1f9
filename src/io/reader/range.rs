//! Line reader bound to a [ByteRange].
//!
//! Each reader owns its file handle, so that concurrent readers never share a cursor.
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom, Take},
    path::Path,
};

use crate::{error::Error, record::RecordError};

use super::ByteRange;

/// Yields `(offset, line)` pairs for every line of a [ByteRange].
/// Lines keep their trailing newline, if any.
#[derive(Debug)]
pub struct RangeReader<R: Read> {
    br: BufReader<Take<R>>,
    offset: u64,
}

impl RangeReader<File> {
    pub fn new(src: &Path, range: &ByteRange) -> Result<Self, Error> {
        let f = File::open(src)?;
        Self::from_reader(f, range)
    }
}

impl<R: Read + Seek> RangeReader<R> {
    pub fn from_reader(mut inner: R, range: &ByteRange) -> Result<Self, Error> {
        inner.seek(SeekFrom::Start(range.start))?;
        Ok(Self {
            br: BufReader::new(inner.take(range.len())),
            offset: range.start,
        })
    }
}

impl<R: Read> Iterator for RangeReader<R> {
    type Item = Result<(u64, String), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.br.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Err(e) => Some(Err(Error::Io(e))),
            Ok(n) => {
                let offset = self.offset;
                self.offset += n as u64;
                match String::from_utf8(buf) {
                    Ok(line) => Some(Ok((offset, line))),
                    Err(e) => Some(Err(Error::malformed(
                        offset,
                        RecordError::InvalidUtf8,
                        e.as_bytes(),
                    ))),
                }
            }
        }
    }
}
