//! # phrasetable
//!
//! Turns a PPDB corpus, sorted by target phrase, into a normalized Moses phrase table.
//!
//! ## Getting started
//!
//! ```sh
//! phrasetable ppdb-2.0-s-lexical sorted-lexical.pt -w 8
//! ```
//!
//! Logging is controlled by `RUST_LOG` (defaults to `info`).
use phrasetable::pipelines::{PhraseTable, Pipeline};
use structopt::StructOpt;

#[macro_use]
extern crate log;

mod cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = cli::PhraseTable::from_args();
    debug!("cli args\n{:#?}", opt);

    let config = opt.config();
    info!("phrasetable {}", PhraseTable::version());
    let p = PhraseTable::new(opt.src, opt.dst, config);
    if let Err(e) = p.run() {
        // the fatal error is always shown, even with logging turned off
        if log_enabled!(log::Level::Error) {
            error!("{}", e);
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(1);
    }
}
