//! Table Surface: the attribute grid shown next to the map.
//!
//! One layer's table is displayed at a time.  Rows appear in ascending id order and
//! the engine keeps a [`RowIndex`] so that a row can be traced to its feature without
//! reading anything back out of the rendered cells.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{FeatureHandle, LayerKind};

/// Everything needed to draw a layer's table from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    /// The layer being shown.
    pub layer: LayerKind,
    /// Schema field names, `Label` first.
    pub columns: Vec<String>,
    /// Cell values per row, in column order.
    pub rows: Vec<Vec<String>>,
    /// Whether cells accept input.
    pub editable: bool,
}

/// Narrow interface to the table widget.
pub trait TableSurface: Send {
    /// Replaces whatever is displayed with `view`.
    fn render(&mut self, view: TableView);

    /// Appends a row to the displayed table.
    fn append_row(&mut self, cells: Vec<String>);

    /// Drops a row; rows below it move up.
    fn remove_row(&mut self, row: usize);

    /// The current contents of a cell, including unsaved keystrokes.
    fn cell_value(&self, row: usize, field: &str) -> Option<String>;

    /// Updates the per-layer feature count shown beside the layer name.
    fn set_feature_count(&mut self, layer: LayerKind, count: usize);
}

/// Headless table used by the service, the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable {
    view: Option<TableView>,
    counts: BTreeMap<LayerKind, usize>,
}

impl InMemoryTable {
    /// Creates a table with nothing displayed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Types `value` into a cell.  Fails when nothing editable is shown there.
    pub fn edit_cell(&mut self, row: usize, field: &str, value: &str) -> bool {
        let Some(view) = self.view.as_mut() else {
            return false;
        };
        if !view.editable {
            return false;
        }
        let Some(column) = view.columns.iter().position(|c| c == field) else {
            return false;
        };
        match view.rows.get_mut(row).and_then(|cells| cells.get_mut(column)) {
            Some(cell) => {
                *cell = value.to_string();
                true
            }
            None => false,
        }
    }

    /// What is currently displayed.
    pub fn view(&self) -> Option<&TableView> {
        self.view.as_ref()
    }

    /// The count last shown for a layer.
    pub fn feature_count(&self, layer: LayerKind) -> usize {
        self.counts.get(&layer).copied().unwrap_or(0)
    }
}

impl TableSurface for InMemoryTable {
    fn render(&mut self, view: TableView) {
        self.view = Some(view);
    }

    fn append_row(&mut self, cells: Vec<String>) {
        if let Some(view) = self.view.as_mut() {
            view.rows.push(cells);
        }
    }

    fn remove_row(&mut self, row: usize) {
        if let Some(view) = self.view.as_mut() {
            if row < view.rows.len() {
                view.rows.remove(row);
            }
        }
    }

    fn cell_value(&self, row: usize, field: &str) -> Option<String> {
        let view = self.view.as_ref()?;
        let column = view.columns.iter().position(|c| c == field)?;
        view.rows.get(row)?.get(column).cloned()
    }

    fn set_feature_count(&mut self, layer: LayerKind, count: usize) {
        self.counts.insert(layer, count);
    }
}

/// Bidirectional map between table rows and feature handles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIndex {
    rows: Vec<FeatureHandle>,
    positions: HashMap<FeatureHandle, usize>,
}

impl RowIndex {
    /// An index with no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index with `handles`, one row each, in order.
    pub fn rebuild<I>(&mut self, handles: I)
    where
        I: IntoIterator<Item = FeatureHandle>,
    {
        self.rows = handles.into_iter().collect();
        self.reindex();
    }

    /// Adds a row for `handle` at the bottom and returns its row number.
    pub fn push(&mut self, handle: FeatureHandle) -> usize {
        let row = self.rows.len();
        self.rows.push(handle);
        self.positions.insert(handle, row);
        row
    }

    /// Drops the row of `handle` and returns the row number it had.
    pub fn remove(&mut self, handle: FeatureHandle) -> Option<usize> {
        let row = self.positions.remove(&handle)?;
        self.rows.remove(row);
        self.reindex();
        Some(row)
    }

    /// The row showing `handle`.
    pub fn row_of(&self, handle: FeatureHandle) -> Option<usize> {
        self.positions.get(&handle).copied()
    }

    /// The feature shown at `row`.
    pub fn handle_at(&self, row: usize) -> Option<FeatureHandle> {
        self.rows.get(row).copied()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows are indexed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(row, handle)` pairs from the top.
    pub fn iter(&self) -> impl Iterator<Item = (usize, FeatureHandle)> + '_ {
        self.rows.iter().copied().enumerate()
    }

    fn reindex(&mut self) {
        self.positions = self
            .rows
            .iter()
            .enumerate()
            .map(|(row, handle)| (*handle, row))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> TableView {
        TableView {
            layer: LayerKind::Wells,
            columns: vec!["Label".into(), "Qw".into(), "rw".into(), "layers".into()],
            rows: vec![
                vec!["Well_1".into(), "".into(), "".into(), "".into()],
                vec!["Well_2".into(), "".into(), "".into(), "".into()],
            ],
            editable: true,
        }
    }

    #[test]
    fn edits_are_visible_through_cell_value() {
        let mut table = InMemoryTable::new();
        table.render(view());
        assert!(table.edit_cell(1, "Qw", "250"));
        assert_eq!(table.cell_value(1, "Qw"), Some("250".to_string()));
        assert_eq!(table.cell_value(1, "nope"), None);
        assert_eq!(table.cell_value(5, "Qw"), None);
    }

    #[test]
    fn read_only_tables_reject_edits() {
        let mut table = InMemoryTable::new();
        let mut read_only = view();
        read_only.editable = false;
        table.render(read_only);
        assert!(!table.edit_cell(0, "Qw", "1"));
    }

    #[test]
    fn removing_rows_shifts_later_rows_up() {
        let mut table = InMemoryTable::new();
        table.render(view());
        table.remove_row(0);
        assert_eq!(table.cell_value(0, "Label"), Some("Well_2".to_string()));
    }

    #[test]
    fn row_index_tracks_removals() {
        let mut index = RowIndex::new();
        index.rebuild([FeatureHandle(7), FeatureHandle(3), FeatureHandle(9)]);
        assert_eq!(index.remove(FeatureHandle(3)), Some(1));
        assert_eq!(index.row_of(FeatureHandle(9)), Some(1));
        assert_eq!(index.handle_at(0), Some(FeatureHandle(7)));
        assert_eq!(index.remove(FeatureHandle(3)), None);
        assert_eq!(index.push(FeatureHandle(11)), 2);
        assert_eq!(index.len(), 3);
    }
}
