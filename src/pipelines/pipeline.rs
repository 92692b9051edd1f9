//! Pipeline trait.
use crate::error::Error;

/// A complete run, from input file to committed output.
///
/// `T` is what a successful run reports back (see [super::RunReport]).
/// A failed run must leave no output behind.
pub trait Pipeline<T> {
    /// Version reported in logs at startup.
    fn version() -> &'static str
    where
        Self: Sized;

    fn run(&self) -> Result<T, Error>;
}
