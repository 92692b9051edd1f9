//! PPDB to phrase table pipeline
//!
//! # Processing
//! 1. The input is split into group-preserving chunks by a [Chunker], read sequentially.
//! 1. Each chunk is aggregated into a [LocalTable] on a worker pool, each worker reading its own range.
//! 1. Local tables are merged as they come, on the calling thread.
//! 1. Once every chunk is merged, groups are normalized concurrently.
//! 1. The table is written to a temporary file that is renamed into place.
//!
//! Any fatal error stops the dispatching of chunks that start after it.
//! Chunks that start before it are still processed, so that the reported error is
//! always the first one in file order.
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc,
    },
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    config::Config,
    error::Error,
    io::{
        reader::{ByteRange, Chunker},
        writer::TableWriter,
    },
    processing::{
        normalize_table, Aggregator, DuplicateGroupSpan, Liveness, LocalTable, Merger,
    },
    record::Parser,
};

use super::pipeline::Pipeline;

const NO_FAILURE: u64 = u64::MAX;

type ChunkResult = (u64, Result<LocalTable, Error>);

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub chunks: usize,
    pub records: usize,
    pub groups: usize,
    pub pairs: usize,
    /// number of times a group was found in a chunk after having been seen in another one.
    pub spanning_groups: usize,
    pub duplicates: Vec<DuplicateGroupSpan>,
    pub elapsed: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records in {} chunks -> {} groups, {} pairs ({} spanning groups, {} duplicate pairs) in {:.2}s",
            self.records,
            self.chunks,
            self.groups,
            self.pairs,
            self.spanning_groups,
            self.duplicates.len(),
            self.elapsed.as_secs_f64()
        )
    }
}

pub struct PhraseTable {
    src: PathBuf,
    dst: PathBuf,
    config: Config,
}

impl PhraseTable {
    pub fn new(src: PathBuf, dst: PathBuf, config: Config) -> Self {
        debug!("phrase table pipeline {:?} -> {:?} ({:?})", src, dst, config);
        Self { src, dst, config }
    }

    /// Lower `first_failure` to `offset`.
    fn record_failure(first_failure: &AtomicU64, offset: u64) {
        first_failure.fetch_min(offset, Ordering::SeqCst);
    }

    /// Aggregate a chunk, unless an error was already found before it.
    fn process_chunk(
        src: &Path,
        aggregator: &Aggregator,
        liveness: &Liveness,
        first_failure: &AtomicU64,
        chunk: Result<ByteRange, Error>,
    ) -> Option<ChunkResult> {
        let range = match chunk {
            Ok(range) => range,
            Err(e) => {
                let offset = e.offset().unwrap_or(NO_FAILURE);
                Self::record_failure(first_failure, offset);
                return Some((offset, Err(e)));
            }
        };

        if range.start > first_failure.load(Ordering::SeqCst) {
            debug!("skipping chunk {}: an earlier chunk failed", range.index);
            return None;
        }

        let heartbeat = liveness.track(&range);
        match aggregator.aggregate(src, &range) {
            Ok(table) => {
                debug!(
                    "chunk {} (bytes {}..{}): {} records, {} groups",
                    range.index,
                    range.start,
                    range.end,
                    table.records,
                    table.nb_groups()
                );
                heartbeat.finish(table.records);
                Some((range.start, Ok(table)))
            }
            Err(e) => {
                let offset = e.offset().unwrap_or(range.start);
                Self::record_failure(first_failure, offset);
                Some((offset, Err(e)))
            }
        }
    }

    /// Chunk, aggregate and merge the whole file.
    fn aggregate_all(&self, pool: &rayon::ThreadPool) -> Result<Merger, Error> {
        let parser = Parser::new(self.config.feature(), self.config.escape());
        let chunker = Chunker::new(&self.src, self.config.chunk_size(), parser.clone())?;
        info!(
            "{:?}: {} bytes, nominal chunk size {}",
            self.src,
            chunker.file_len(),
            self.config.chunk_size()
        );

        let aggregator = Aggregator::new(parser, self.config.log_base().value());
        let liveness = Liveness::new();
        let monitor = liveness.monitor(self.config.heartbeat(), self.config.stall_after());
        let first_failure = AtomicU64::new(NO_FAILURE);

        let mut merger = Merger::new();
        let mut failure: Option<(u64, Error)> = None;
        let (tx, rx) = mpsc::channel::<ChunkResult>();

        {
            let src = self.src.as_path();
            let aggregator = &aggregator;
            let liveness = &liveness;
            let first_failure = &first_failure;

            thread::scope(|s| {
                s.spawn(move || {
                    pool.install(|| {
                        chunker
                            // no need to read further than the first failure
                            .take_while(|chunk| match chunk {
                                Ok(range) => range.start <= first_failure.load(Ordering::SeqCst),
                                Err(_) => true,
                            })
                            .par_bridge()
                            .for_each_with(tx, |tx, chunk| {
                                if let Some(res) = Self::process_chunk(
                                    src,
                                    aggregator,
                                    liveness,
                                    first_failure,
                                    chunk,
                                ) {
                                    // receiver lives until every sender is dropped
                                    let _ = tx.send(res);
                                }
                            })
                    })
                });

                for (offset, res) in rx {
                    match res {
                        Ok(table) if failure.is_none() => merger.merge(table),
                        Ok(_) => (),
                        Err(e) => {
                            if failure.as_ref().map_or(true, |(o, _)| offset < *o) {
                                failure = Some((offset, e));
                            }
                        }
                    }
                }
            });
        }

        monitor.stop();

        match failure {
            Some((_, e)) => Err(e),
            None => Ok(merger),
        }
    }
}

impl Pipeline<RunReport> for PhraseTable {
    fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn run(&self) -> Result<RunReport, Error> {
        self.config.validate()?;
        let start = Instant::now();

        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|idx| format!("phrasetable-{}", idx));
        if let Some(workers) = self.config.workers() {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build()?;
        info!("running with {} workers", pool.current_num_threads());

        let merger = self.aggregate_all(&pool)?;
        let chunks = merger.chunks();
        let records = merger.records();
        let spanning_groups = merger.spanning_groups();
        let (mut table, duplicates) = merger.finish();

        if spanning_groups > 0 {
            warn!(
                "{} groups were found in more than one chunk: is the input sorted by target phrase?",
                spanning_groups
            );
        }

        info!(
            "merged {} records into {} groups",
            records,
            table.nb_groups()
        );
        pool.install(|| normalize_table(&mut table))?;

        let mut writer = TableWriter::new(&self.dst)?;
        writer.write_table(&table)?;
        writer.commit()?;

        let report = RunReport {
            chunks,
            records,
            groups: table.nb_groups(),
            pairs: table.nb_pairs(),
            spanning_groups,
            duplicates,
            elapsed: start.elapsed(),
        };
        info!("{}", report);
        Ok(report)
    }
}
