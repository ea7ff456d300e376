//! In-memory result collection for the current session.

use crate::record::CitationRecord;

/// Ordered collection of the records extracted in this session.
///
/// Records keep arrival order and are not deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    records: Vec<CitationRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records in the order given.
    pub fn append(&mut self, records: impl IntoIterator<Item = CitationRecord>) {
        self.records.extend(records);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Current records, in arrival order.
    pub fn snapshot(&self) -> &[CitationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
