//! Reconciliation against a reference list of members whose Wikidata ids are
//! already known.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::types::MemberRecord;

#[derive(Debug, thiserror::Error)]
#[error("Failed to read existing members: {0}")]
pub struct ExistingMembersError(#[from] csv::Error);

/// Outcome of looking a name up in the reference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match<'a> {
    NotFound,
    Unique(&'a str),
    Ambiguous(Vec<&'a str>),
}

/// Distinct ids per exact name, read from a header-less `name,id` CSV.
#[derive(Debug, Clone, Default)]
pub struct ExistingMembers {
    by_name: HashMap<String, Vec<String>>,
}

impl ExistingMembers {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExistingMembersError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ExistingMembersError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, ExistingMembersError> {
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for record in reader.records() {
            let record = record?;
            // name is the first column, the id the last
            let (Some(name), Some(id)) = (record.get(0), record.iter().last()) else {
                continue;
            };
            let ids = by_name.entry(name.to_string()).or_default();
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        log::debug!("Loaded {} existing member names", by_name.len());
        Ok(Self { by_name })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// A blank id counts as one of the distinct ids, so a name listed both
    /// with and without an id is ambiguous. A name known only without one
    /// is not found.
    pub fn lookup(&self, name: &str) -> Match<'_> {
        let Some(ids) = self.by_name.get(name) else {
            return Match::NotFound;
        };
        match ids.as_slice() {
            [] => Match::NotFound,
            [id] if id.is_empty() => Match::NotFound,
            [id] => Match::Unique(id.as_str()),
            ids => Match::Ambiguous(ids.iter().map(String::as_str).collect()),
        }
    }

    /// The id of `name` when the reference list knows exactly one. Names with
    /// conflicting ids are reported and left unresolved.
    pub fn single_exact_match_for(&self, name: &str) -> Option<&str> {
        match self.lookup(name) {
            Match::NotFound => None,
            Match::Unique(id) => Some(id),
            Match::Ambiguous(ids) => {
                log::warn!("More than one match for {} ({})", name, ids.join(", "));
                None
            }
        }
    }

    /// Fills the id of every record that has none. Returns how many were
    /// filled.
    pub fn fill_missing_ids(&self, members: &mut [MemberRecord]) -> usize {
        let mut filled = 0;
        for member in members.iter_mut().filter(|m| m.id.is_none()) {
            let Some(name) = member.name.as_deref() else {
                continue;
            };
            if let Some(id) = self.single_exact_match_for(name) {
                log::debug!("Resolved {} to {}", name, id);
                member.id = Some(id.to_string());
                filled += 1;
            }
        }
        filled
    }
}
