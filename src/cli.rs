//! Command line arguments and parameters management/parsing.
use std::{path::PathBuf, time::Duration};

use phrasetable::config::{Config, LogBase};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
/// Phrase table command and parameters.
///
/// ```sh
/// phrasetable 0.1.0
/// Parses a PPDB file into a Moses phrase table.
///
/// USAGE:
///     phrasetable [FLAGS] [OPTIONS] <src> <dst>
///
/// FLAGS:
///     -h, --help         Prints help information
///         --no-escape    do not escape Moses special characters
///     -V, --version      Prints version information
///
/// OPTIONS:
///     -b, --log-base <log-base>          base of the log feature: e, 2, 10 or any positive number [default: e]
///     -c, --chunk-size <chunk-size>      nominal size of a chunk, in bytes [default: 1048576]
///     -f, --feature <feature>            negative log probability feature [default: p(f|e)]
///         --heartbeat <heartbeat>        liveness poll interval, in seconds [default: 10]
///         --stall-after <stall-after>    report chunks in flight for longer than this, in seconds [default: 60]
///     -w, --workers <workers>            number of workers. Defaults to the number of CPUs.
///
/// ARGS:
///     <src>    PPDB file, sorted by target phrase
///     <dst>    phrase table destination
/// ```
#[structopt(
    name = "phrasetable",
    about = "Parses a PPDB file into a Moses phrase table."
)]
pub struct PhraseTable {
    #[structopt(parse(from_os_str), help = "PPDB file, sorted by target phrase")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "phrase table destination")]
    pub dst: PathBuf,
    #[structopt(
        short = "c",
        long = "chunk-size",
        help = "nominal size of a chunk, in bytes",
        default_value = "1048576"
    )]
    pub chunk_size: u64,
    #[structopt(
        short = "w",
        long = "workers",
        help = "number of workers. Defaults to the number of CPUs."
    )]
    pub workers: Option<usize>,
    #[structopt(
        short = "b",
        long = "log-base",
        help = "base of the log feature: e, 2, 10 or any positive number",
        default_value = "e"
    )]
    pub log_base: LogBase,
    #[structopt(
        short = "f",
        long = "feature",
        help = "negative log probability feature",
        default_value = "p(f|e)"
    )]
    pub feature: String,
    #[structopt(long = "no-escape", help = "do not escape Moses special characters")]
    pub no_escape: bool,
    #[structopt(
        long = "heartbeat",
        help = "liveness poll interval, in seconds",
        default_value = "10"
    )]
    pub heartbeat: u64,
    #[structopt(
        long = "stall-after",
        help = "report chunks in flight for longer than this, in seconds",
        default_value = "60"
    )]
    pub stall_after: u64,
}

impl PhraseTable {
    pub fn config(&self) -> Config {
        Config::default()
            .with_chunk_size(self.chunk_size)
            .with_workers(self.workers)
            .with_log_base(self.log_base)
            .with_feature(&self.feature)
            .with_escape(!self.no_escape)
            .with_heartbeat(Duration::from_secs(self.heartbeat))
            .with_stall_after(Duration::from_secs(self.stall_after))
    }
}
