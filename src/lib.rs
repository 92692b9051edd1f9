/*! # phrasetable

Builds a Moses phrase table out of a PPDB corpus sorted by target phrase.

For each target phrase, the scores of every source phrase are normalized into a conditional probability distribution.
The corpus is split into chunks that never split a target phrase group, aggregated concurrently,
merged and then normalized.

```no_run
use std::path::PathBuf;
use phrasetable::{config::Config, pipelines::{PhraseTable, Pipeline}};

let p = PhraseTable::new(
    PathBuf::from("ppdb-lexical.txt"),
    PathBuf::from("phrase-table.txt"),
    Config::default().with_workers(Some(4)),
);
let report = p.run().unwrap();
println!("{}", report);
```
!*/
pub mod config;
pub mod error;
pub mod io;
pub mod pipelines;
pub mod processing;
pub mod record;
