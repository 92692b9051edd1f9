/*! Moses phrase table writer

One line per (source, target) pair, probabilities being rendered as float literals (`1.0`, `0.25`):

```text
<source> ||| <target> ||| <probability> ||| <alignment> |||
```

Lines are sorted by target phrase, then by source phrase.
The table is written in a temporary file next to the destination,
which is renamed into place by [TableWriter::commit] only.
Dropping a [TableWriter] without committing removes the temporary file.
!*/
use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::{
    error::Error,
    processing::{ProbabilityGroup, ProbabilityTable},
    record::COLUMN_DELIMITER,
};

pub struct TableWriter {
    dst: PathBuf,
    handle: BufWriter<NamedTempFile>,
    nb_lines: usize,
}

impl TableWriter {
    /// Open a temporary file in the directory of `dst`.
    pub fn new(dst: &Path) -> Result<Self, Error> {
        let parent = match dst.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = NamedTempFile::new_in(&parent)?;
        debug!("writing table to temporary file {:?}", tmp.path());
        Ok(Self {
            dst: dst.to_path_buf(),
            handle: BufWriter::new(tmp),
            nb_lines: 0,
        })
    }

    /// Write the lines of a single group.
    pub fn write_group(&mut self, target: &str, group: &ProbabilityGroup) -> Result<(), Error> {
        for (source, entry) in group.iter() {
            write_line(&mut self.handle, source, target, entry.score, &entry.alignment)?;
            self.nb_lines += 1;
        }
        Ok(())
    }

    /// Write every group of `table`, in order.
    pub fn write_table(&mut self, table: &ProbabilityTable) -> Result<(), Error> {
        for (target, group) in table.iter() {
            self.write_group(target, group)?;
        }
        Ok(())
    }

    pub fn nb_lines(&self) -> usize {
        self.nb_lines
    }

    /// Flush and atomically move the table to its destination.
    pub fn commit(self) -> Result<PathBuf, Error> {
        let tmp = self.handle.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.dst)?;
        info!("wrote {} lines to {:?}", self.nb_lines, self.dst);
        Ok(self.dst)
    }
}

/// Write a single phrase table line.
pub fn write_line<W: Write>(
    w: &mut W,
    source: &str,
    target: &str,
    probability: f64,
    alignment: &str,
) -> std::io::Result<()> {
    writeln!(
        w,
        "{source}{d}{target}{d}{probability:?}{d}{alignment} {end}",
        d = COLUMN_DELIMITER,
        end = COLUMN_DELIMITER.trim(),
    )
}
