/// Uniform 2D spatial hash
use crate::config::CheckMethod;
use crate::types::Vec3;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Offsets of a cell and its eight neighbors.
const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Quantized 2D grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
}

impl CellKey {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Quantizes a position onto the grid.
    ///
    /// Returns `None` when the position is not finite or lands outside the
    /// `i32` cell range.
    pub fn from_position(position: Vec3, cell_size: f64, method: CheckMethod) -> Option<Self> {
        let (a, b) = match method {
            CheckMethod::Xz => (position.x, position.z),
            CheckMethod::Xy => (position.x, position.y),
        };

        let x = quantize(a, cell_size)?;
        let y = quantize(b, cell_size)?;
        Some(Self { x, y })
    }

    /// The cell shifted by `(dx, dy)`; saturates at the grid edge.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

fn quantize(value: f64, cell_size: f64) -> Option<i32> {
    let cell = (value / cell_size).floor();
    if !cell.is_finite() || cell < i32::MIN as f64 || cell > i32::MAX as f64 {
        return None;
    }
    Some(cell as i32)
}

/// Sparse grid of cells, each holding a set of members.
///
/// Backing sets are dropped when [`SpatialGrid::remove`] empties them, but
/// [`SpatialGrid::clear`] keeps them allocated so a grid that is rebuilt
/// every interval reuses its storage.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cells: HashMap<CellKey, HashSet<T>>,
}

impl<T> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> SpatialGrid<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the cell at `key`.
    pub fn add(&mut self, key: CellKey, value: T) {
        self.cells.entry(key).or_default().insert(value);
    }

    /// Removes `value` from the cell at `key`, dropping the cell once empty.
    pub fn remove(&mut self, key: CellKey, value: &T) -> bool {
        let Some(cell) = self.cells.get_mut(&key) else {
            return false;
        };

        let removed = cell.remove(value);
        if cell.is_empty() {
            self.cells.remove(&key);
        }
        removed
    }

    /// Empties every cell in place without freeing the backing sets.
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    /// Unions the members of `key` and its eight neighbors into `result`.
    ///
    /// `result` is not cleared first; callers decide whether they accumulate.
    pub fn get_with_neighbors(&self, key: CellKey, result: &mut HashSet<T>) {
        for (dx, dy) in NEIGHBOR_OFFSETS {
            // Saturated offsets at the i32 edge would revisit a cell; sets absorb that.
            if let Some(cell) = self.cells.get(&key.offset(dx, dy)) {
                result.extend(cell.iter().cloned());
            }
        }
    }

    /// Members of a single cell; a missing cell yields nothing.
    pub fn get(&self, key: CellKey) -> impl Iterator<Item = &T> + '_ {
        self.cells.get(&key).into_iter().flatten()
    }

    /// Cells that currently hold at least one member.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|cell| !cell.is_empty()).count()
    }

    /// Cells with an allocated backing set, occupied or not.
    pub fn allocated_cells(&self) -> usize {
        self.cells.len()
    }

    /// Total number of members across all cells.
    pub fn len(&self) -> usize {
        self.cells.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(HashSet::is_empty)
    }

    /// Frees every backing set.
    pub fn reset(&mut self) {
        self.cells.clear();
    }
}
