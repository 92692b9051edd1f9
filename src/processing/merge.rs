/*! Merging of local tables

Local tables are folded into a single [ProbabilityTable].

Groups that appear in more than one local table are merged source by source.
When the same (target, source) pair appears in several chunks, the entry coming from the chunk
that starts later in the file is kept, and a [DuplicateGroupSpan] is recorded.
This makes merging independent of the order in which local tables are merged.
!*/
use std::collections::btree_map::Entry as MapEntry;

use log::{debug, warn};

use super::table::{LocalTable, ProbabilityGroup, ProbabilityTable};

/// A (target, source) pair found in two chunks.
///
/// Only happens on input that is not sorted by target phrase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DuplicateGroupSpan {
    pub target: String,
    pub source: String,
    /// start of the chunk whose entry is kept
    pub kept_from: u64,
    /// start of the chunk whose entry is dropped
    pub dropped_from: u64,
}

/// Merge `other` into `into`, both being groups of `target`.
pub fn merge_group(
    target: &str,
    into: &mut ProbabilityGroup,
    other: ProbabilityGroup,
    duplicates: &mut Vec<DuplicateGroupSpan>,
) {
    for (source, entry) in other.into_entries() {
        match into.entry(source) {
            MapEntry::Vacant(v) => {
                v.insert(entry);
            }
            MapEntry::Occupied(mut o) => {
                let (kept_from, dropped_from) = if entry.origin > o.get().origin {
                    let dropped = o.insert(entry);
                    (o.get().origin, dropped.origin)
                } else {
                    (o.get().origin, entry.origin)
                };
                let span = DuplicateGroupSpan {
                    target: target.to_string(),
                    source: o.key().clone(),
                    kept_from,
                    dropped_from,
                };
                warn!(
                    "pair ({:?}, {:?}) found in chunks starting at bytes {} and {}, keeping the latter",
                    span.target, span.source, span.dropped_from, span.kept_from
                );
                duplicates.push(span);
            }
        }
    }
}

/// Single-threaded reduction of local tables.
#[derive(Debug, Default)]
pub struct Merger {
    table: ProbabilityTable,
    duplicates: Vec<DuplicateGroupSpan>,
    spanning_groups: usize,
    records: usize,
    chunks: usize,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, local: LocalTable) {
        self.records += local.records;
        self.chunks += 1;
        for (target, group) in local.groups {
            match self.table.groups.entry(target) {
                MapEntry::Vacant(v) => {
                    v.insert(group);
                }
                MapEntry::Occupied(mut o) => {
                    debug!(
                        "group {:?} spans several chunks (chunk at byte {})",
                        o.key(),
                        local.origin
                    );
                    self.spanning_groups += 1;
                    let target = o.key().clone();
                    merge_group(&target, o.get_mut(), group, &mut self.duplicates);
                }
            }
        }
    }

    /// Number of records merged so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Number of local tables merged so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Number of times a group already present was merged again.
    pub fn spanning_groups(&self) -> usize {
        self.spanning_groups
    }

    /// Get the merged table and the duplicate spans, sorted.
    pub fn finish(self) -> (ProbabilityTable, Vec<DuplicateGroupSpan>) {
        let mut duplicates = self.duplicates;
        duplicates.sort();
        (self.table, duplicates)
    }
}

#[cfg(test)]
mod tests {
    use crate::processing::table::Entry;

    use super::*;

    fn local(origin: u64, pairs: &[(&str, &str, f64)]) -> LocalTable {
        let mut t = LocalTable::new(origin);
        for (target, source, score) in pairs {
            t.groups
                .entry(target.to_string())
                .or_default()
                .insert(source.to_string(), Entry::new(*score, "0-0".to_string(), origin));
            t.records += 1;
        }
        t
    }

    fn merged(tables: Vec<LocalTable>) -> (ProbabilityTable, Vec<DuplicateGroupSpan>) {
        let mut m = Merger::new();
        for t in tables {
            m.merge(t);
        }
        m.finish()
    }

    #[test]
    fn disjoint() {
        let (table, dups) = merged(vec![
            local(0, &[("a", "x", 1.0), ("a", "y", 2.0)]),
            local(100, &[("b", "x", 3.0)]),
        ]);
        assert!(dups.is_empty());
        assert_eq!(table.nb_groups(), 2);
        assert_eq!(table.nb_pairs(), 3);
    }

    #[test]
    fn group_in_two_chunks() {
        let (table, dups) = merged(vec![
            local(0, &[("a", "x", 1.0)]),
            local(100, &[("a", "y", 2.0)]),
        ]);
        assert!(dups.is_empty());
        let a = table.get("a").unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.mass(), 3.0);
    }

    #[test]
    fn later_chunk_wins() {
        for order in [[0, 1], [1, 0]] {
            let mut tables = vec![
                Some(local(0, &[("a", "x", 1.0)])),
                Some(local(100, &[("a", "x", 2.0)])),
            ];
            let tables = order.iter().map(|i| tables[*i].take().unwrap()).collect();
            let (table, dups) = merged(tables);
            assert_eq!(table.get("a").unwrap().get("x").unwrap().score, 2.0);
            assert_eq!(
                dups,
                vec![DuplicateGroupSpan {
                    target: "a".to_string(),
                    source: "x".to_string(),
                    kept_from: 100,
                    dropped_from: 0,
                }]
            );
        }
    }

    #[test]
    fn order_independent() {
        let build = || {
            vec![
                local(0, &[("a", "x", 1.0), ("b", "x", 1.0)]),
                local(50, &[("b", "y", 2.0), ("c", "x", 1.0)]),
                local(100, &[("b", "x", 5.0), ("d", "z", 1.0)]),
            ]
        };
        let forward = merged(build());
        let mut rev = build();
        rev.reverse();
        let backward = merged(rev);
        assert_eq!(forward, backward);
    }
}
