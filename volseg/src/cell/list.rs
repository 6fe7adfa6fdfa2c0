//! Arena of cells with a key index.
//!
//! Cells are stored in a `Vec` and addressed by [`CellId`]. The key index maps
//! each [`CellKey`] to its cell; iteration follows key order so every pass that
//! walks the list is deterministic.
//!
//! An index entry goes stale when a cell's id is rewritten. Stale entries stay
//! until [`CelpList::retain_consistent`] drops them.

use std::collections::BTreeMap;

use glam::DVec3;

use super::{Cell, CellKey};

/// Stable handle to a cell in a [`CelpList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u32);

impl CellId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct CelpList {
    cells: Vec<Cell>,
    index: BTreeMap<CellKey, CellId>,
    min_size: u32,
    max_size: u32,
    spacing: DVec3,
}

impl CelpList {
    pub fn new(spacing: DVec3) -> Self {
        Self {
            spacing,
            ..Default::default()
        }
    }

    /// Drop every cell and reset the size range.
    pub fn clear(&mut self, spacing: DVec3) {
        self.cells.clear();
        self.index.clear();
        self.min_size = 0;
        self.max_size = 0;
        self.spacing = spacing;
    }

    /// Number of keyed entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    /// Insert a cell under its own key. An existing cell with the same key is
    /// merged into instead.
    pub fn insert(&mut self, cell: Cell) -> CellId {
        let key = cell.key();
        if let Some(&id) = self.index.get(&key) {
            self.cells[id.index()].merge(&cell);
            return id;
        }
        let id = CellId(self.cells.len() as u32);
        self.cells.push(cell);
        self.index.insert(key, id);
        id
    }

    #[inline]
    pub fn id_of(&self, key: CellKey) -> Option<CellId> {
        self.index.get(&key).copied()
    }

    pub fn get(&self, key: CellKey) -> Option<&Cell> {
        self.id_of(key).map(|id| &self.cells[id.index()])
    }

    #[inline]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    #[inline]
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.index()]
    }

    /// Entries in key order. Stale entries are included until
    /// [`Self::retain_consistent`] runs.
    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &Cell)> + '_ {
        self.index
            .iter()
            .map(move |(&key, &id)| (key, &self.cells[id.index()]))
    }

    /// Handles in key order.
    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.index.values().copied()
    }

    /// Change a cell's id and index it under the new key. The old entry stays
    /// until [`Self::retain_consistent`].
    pub fn relabel(&mut self, id: CellId, new_label: u32) {
        let cell = &mut self.cells[id.index()];
        cell.set_id(new_label);
        self.index.insert(cell.key(), id);
    }

    /// Drop entries whose key no longer matches the cell they point at.
    pub fn retain_consistent(&mut self) {
        let cells = &self.cells;
        self.index.retain(|key, id| cells[id.index()].key() == *key);
    }

    pub fn observe_size(&mut self, size: u32) {
        if self.min_size == 0 || size < self.min_size {
            self.min_size = size;
        }
        self.max_size = self.max_size.max(size);
    }

    pub fn min_size(&self) -> u32 {
        self.min_size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub(crate) fn copy_size_range(&mut self, other: &CelpList) {
        self.min_size = other.min_size;
        self.max_size = other.max_size;
    }

    /// Recompute the size range from the keyed cells.
    pub fn refresh_size_range(&mut self) {
        self.min_size = 0;
        self.max_size = 0;
        let sizes: Vec<u32> = self.iter().map(|(_, c)| c.size_ui()).collect();
        for size in sizes {
            self.observe_size(size);
        }
    }
}
