//! Normalization of raw scores into conditional probabilities.
use log::debug;
use rayon::prelude::*;

use crate::error::Error;

use super::table::{ProbabilityGroup, ProbabilityTable};

/// Divide every score of `group` by the group mass.
pub fn normalize_group(key: &str, group: &mut ProbabilityGroup) -> Result<(), Error> {
    if group.is_empty() {
        return Err(Error::EmptyGroup(key.to_string()));
    }

    let mass = group.mass();
    if !mass.is_finite() || mass <= 0.0 {
        return Err(Error::ZeroMass {
            key: key.to_string(),
            mass,
        });
    }

    for (_, entry) in group.iter_mut() {
        entry.score /= mass;
    }
    Ok(())
}

/// Normalize every group concurrently.
///
/// On failure, the error of the first failing group (in target phrase order) is returned.
pub fn normalize_table(table: &mut ProbabilityTable) -> Result<(), Error> {
    debug!("normalizing {} groups", table.nb_groups());
    let mut errors: Vec<(String, Error)> = table
        .groups
        .par_iter_mut()
        .filter_map(|(key, group)| {
            normalize_group(key, group)
                .err()
                .map(|e| (key.clone(), e))
        })
        .collect();

    errors.sort_by(|a, b| a.0.cmp(&b.0));
    match errors.into_iter().next() {
        Some((_, e)) => Err(e),
        None => Ok(()),
    }
}
