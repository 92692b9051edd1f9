/*! Content processing

Contains structures and functions to aggregate, merge and normalize scores:

1. [aggregate] builds a [LocalTable] per chunk,
1. [merge] folds them into a [ProbabilityTable],
1. [normalize] turns raw scores into probabilities.
!*/
pub mod aggregate;
pub mod liveness;
pub mod merge;
pub mod normalize;
mod table;

pub use aggregate::Aggregator;
pub use liveness::Liveness;
pub use merge::{DuplicateGroupSpan, Merger};
pub use normalize::{normalize_group, normalize_table};
pub use table::{Entry, LocalTable, ProbabilityGroup, ProbabilityTable};
