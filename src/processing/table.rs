/*! Probability tables

- [ProbabilityGroup]: every source phrase that produces a given target phrase, with its score.
- [LocalTable]: groups built from a single chunk.
- [ProbabilityTable]: groups of the whole corpus, ordered by target phrase.
!*/
use std::{
    collections::{btree_map, BTreeMap, HashMap},
    hash::BuildHasherDefault,
};

use twox_hash::XxHash64;

/// Score of a (target, source) pair, along with data that is passed through.
///
/// `origin` is the start offset of the chunk the entry comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub score: f64,
    pub alignment: String,
    pub origin: u64,
}

impl Entry {
    pub fn new(score: f64, alignment: String, origin: u64) -> Self {
        Self {
            score,
            alignment,
            origin,
        }
    }
}

/// source phrase -> [Entry].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityGroup {
    entries: BTreeMap<String, Entry>,
}

impl ProbabilityGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the one it replaces.
    pub fn insert(&mut self, source: String, entry: Entry) -> Option<Entry> {
        self.entries.insert(source, entry)
    }

    pub fn get(&self, source: &str) -> Option<&Entry> {
        self.entries.get(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the scores.
    pub fn mass(&self) -> f64 {
        self.entries.values().map(|e| e.score).sum()
    }

    /// Iterate over entries, sorted by source phrase.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Entry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Entry> {
        self.entries.iter_mut()
    }

    pub(crate) fn entry(&mut self, source: String) -> btree_map::Entry<'_, String, Entry> {
        self.entries.entry(source)
    }

    pub(crate) fn into_entries(self) -> btree_map::IntoIter<String, Entry> {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Entry)> for ProbabilityGroup {
    fn from_iter<T: IntoIterator<Item = (String, Entry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub(crate) type LocalGroups = HashMap<String, ProbabilityGroup, BuildHasherDefault<XxHash64>>;

/// Raw groups of a single chunk.
#[derive(Debug, Default)]
pub struct LocalTable {
    /// start offset of the chunk
    pub origin: u64,
    /// number of records read
    pub records: usize,
    pub(crate) groups: LocalGroups,
}

impl LocalTable {
    pub fn new(origin: u64) -> Self {
        Self {
            origin,
            records: 0,
            groups: Default::default(),
        }
    }

    pub fn get(&self, target: &str) -> Option<&ProbabilityGroup> {
        self.groups.get(target)
    }

    pub fn nb_groups(&self) -> usize {
        self.groups.len()
    }
}

/// target phrase -> [ProbabilityGroup], for the whole corpus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityTable {
    pub(crate) groups: BTreeMap<String, ProbabilityGroup>,
}

impl ProbabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, target: &str) -> Option<&ProbabilityGroup> {
        self.groups.get(target)
    }

    pub fn nb_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of (target, source) pairs.
    pub fn nb_pairs(&self) -> usize {
        self.groups.values().map(ProbabilityGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over groups, sorted by target phrase.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ProbabilityGroup> {
        self.groups.iter()
    }
}
