use super::domain::{Match, PersonId};

/// Append-only record of committed pairings. Only the match engine appends;
/// only a full reset clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchLog {
    entries: Vec<Match>,
}

impl MatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Match>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Match] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Match> {
        self.entries.last()
    }

    /// The match referencing `id` in either slot.
    pub fn match_for(&self, id: &PersonId) -> Option<&Match> {
        self.entries
            .iter()
            .find(|entry| &entry.mentee.id == id || &entry.mentor.id == id)
    }

    pub(crate) fn append(&mut self, entry: Match) {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
