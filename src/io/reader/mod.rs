/*! Reading facilities

- [Chunker] splits the input into group-preserving [ByteRange]s.
- [RangeReader] iterates on the lines of a single [ByteRange].
!*/
mod chunker;
mod range;

pub use chunker::{ByteRange, Chunker};
pub use range::RangeReader;
