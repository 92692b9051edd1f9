/*!
# IO utilities

Chunked reading of PPDB files and writing of phrase tables.
!*/
pub mod reader;
pub mod writer;
