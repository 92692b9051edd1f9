/*!
# Phrase table writing

[TableWriter] writes a normalized [crate::processing::ProbabilityTable] in the Moses phrase table format,
making it visible at its destination only once fully written.
!*/
mod table;
pub use table::{write_line, TableWriter};
