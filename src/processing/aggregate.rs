/*! Local aggregation

Builds a [LocalTable] from the lines of a single [ByteRange].
Aggregation only touches its own range and its own file handle,
so any number of ranges can be aggregated concurrently.
!*/
use std::path::Path;

use log::debug;

use crate::{
    error::Error,
    io::reader::{ByteRange, RangeReader},
    record::Parser,
};

use super::table::{Entry, LocalTable};

#[derive(Debug, Clone)]
pub struct Aggregator {
    parser: Parser,
    base: f64,
}

impl Aggregator {
    /// `base` is used to get raw scores from the designated feature: `base ^ -feature`.
    pub fn new(parser: Parser, base: f64) -> Self {
        Self { parser, base }
    }

    /// Aggregate the `range` of the `src` file.
    pub fn aggregate(&self, src: &Path, range: &ByteRange) -> Result<LocalTable, Error> {
        let reader = RangeReader::new(src, range)?;
        self.aggregate_lines(range, reader)
    }

    /// Aggregate `(offset, line)` pairs belonging to `range`.
    ///
    /// Duplicate (target, source) pairs are resolved by keeping the last one.
    /// A target phrase that comes back after another one has been seen is an [Error::UnsortedInput].
    pub fn aggregate_lines<I>(&self, range: &ByteRange, lines: I) -> Result<LocalTable, Error>
    where
        I: Iterator<Item = Result<(u64, String), Error>>,
    {
        let mut table = LocalTable::new(range.start);
        let mut current: Option<String> = None;

        for line in lines {
            let (offset, line) = line?;
            let record = self
                .parser
                .parse(&line)
                .map_err(|reason| Error::malformed(offset, reason, line.as_bytes()))?;
            let score = record.raw_score(self.base);
            let (target, source, alignment) = record.into_parts();

            if current.as_deref() != Some(target.as_str()) {
                if table.groups.contains_key(&target) {
                    return Err(Error::UnsortedInput {
                        offset,
                        key: target,
                    });
                }
                current = Some(target.clone());
            }

            let entry = Entry::new(score, alignment, range.start);
            if let Some(previous) = table
                .groups
                .entry(target)
                .or_default()
                .insert(source, entry)
            {
                debug!(
                    "chunk {}: duplicate pair at byte {} overrides score {}",
                    range.index, offset, previous.score
                );
            }
            table.records += 1;
        }

        Ok(table)
    }
}
