//! Pipelines.
//!
//! The module provides a light [pipeline::Pipeline] trait,
//! implemented by the [PhraseTable] pipeline that turns a PPDB file into a phrase table.
mod phrasetable;
#[allow(clippy::module_inception)]
pub mod pipeline;

pub use phrasetable::{PhraseTable, RunReport};
pub use pipeline::Pipeline;
