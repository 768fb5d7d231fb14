//! Requirement resolution state.

use std::collections::HashMap;

/// The accumulator of one resolution pass: the ordered, deduplicated raw
/// column names to fetch from the source, plus whether the synthetic
/// entry-index column is needed.
///
/// Walking the chain from the requested outputs down to the source mutates
/// one shared `Requirements`; fetcher construction afterwards reads the
/// positions recorded here. When the entry index is requested it is always
/// appended after the last real column of each chunk, so its position is
/// `columns().len()` regardless of when it was marked.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    needs_entry_index: bool,
}

impl Requirements {
    pub fn new() -> Self {
        Requirements::default()
    }

    /// Raw column names in fetch order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn needs_entry_index(&self) -> bool {
        self.needs_entry_index
    }

    /// Position of a raw column in the fetched chunk, if present.
    pub fn position(&self, raw_name: &str) -> Option<usize> {
        self.positions.get(raw_name).copied()
    }

    /// Position of the synthetic entry-index array: one past the last real
    /// column.
    pub fn entry_index_position(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn mark_entry_index(&mut self) {
        self.needs_entry_index = true;
    }

    /// Append a raw column if absent; returns its position either way.
    pub(crate) fn add_column(&mut self, raw_name: &str) -> usize {
        if let Some(position) = self.position(raw_name) {
            return position;
        }
        let position = self.columns.len();
        self.columns.push(raw_name.to_string());
        self.positions.insert(raw_name.to_string(), position);
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_column_dedups() {
        let mut requirements = Requirements::new();
        assert_eq!(requirements.add_column("x"), 0);
        assert_eq!(requirements.add_column("y"), 1);
        assert_eq!(requirements.add_column("x"), 0);
        assert_eq!(requirements.columns(), ["x", "y"]);
        assert_eq!(requirements.position("y"), Some(1));
        assert_eq!(requirements.position("z"), None);
    }

    #[test]
    fn test_entry_index_position_tracks_columns() {
        let mut requirements = Requirements::new();
        requirements.mark_entry_index();
        assert!(requirements.needs_entry_index());
        assert_eq!(requirements.entry_index_position(), 0);
        requirements.add_column("x");
        assert_eq!(requirements.entry_index_position(), 1);
    }
}
