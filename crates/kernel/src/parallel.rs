//! Work partitioning for the per-cell sweeps.
//!
//! Occupied cells are listed once per tick in ascending index order. Because
//! both particle ranges and SoA offsets are laid out in that same order, any
//! buffer indexed by either can be carved into one exclusive `&mut` slice per
//! task with successive `split_at_mut` calls.

use crate::grid::{Cell, SpatialGrid};

/// One occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellTask {
    /// Flat cell index.
    pub index: u32,
    /// Grid coordinates of the cell.
    pub coord: [u32; 3],
    /// Particle and block ranges.
    pub cell: Cell,
}

/// List every non-empty cell.
pub fn occupied_cells(cells: &[Cell], grid: &SpatialGrid) -> Vec<CellTask> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(index, cell)| CellTask {
            index: index as u32,
            coord: grid.unhash(index as u32),
            cell: *cell,
        })
        .collect()
}

/// Split `buf` into each task's block range.
pub fn split_blocks<'a, T>(buf: &'a mut [T], tasks: &[CellTask]) -> Vec<&'a mut [T]> {
    split_runs(buf, tasks.iter().map(|t| (t.cell.soai as usize, t.cell.blocks())))
}

/// Split `buf` into each task's particle range.
pub fn split_particles<'a, T>(buf: &'a mut [T], tasks: &[CellTask]) -> Vec<&'a mut [T]> {
    split_runs(buf, tasks.iter().map(|t| (t.cell.begin as usize, t.cell.len())))
}

fn split_runs<'a, T>(
    mut rest: &'a mut [T],
    runs: impl ExactSizeIterator<Item = (usize, usize)>,
) -> Vec<&'a mut [T]> {
    let mut out = Vec::with_capacity(runs.len());
    let mut consumed = 0;
    for (start, len) in runs {
        debug_assert!(start >= consumed, "runs must be ascending and disjoint");
        let skip = start - consumed;
        let (_, tail) = std::mem::take(&mut rest).split_at_mut(skip);
        let (head, tail) = tail.split_at_mut(len);
        out.push(head);
        rest = tail;
        consumed = start + len;
    }
    out
}
