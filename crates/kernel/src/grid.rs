//! Uniform-grid spatial hash over the world box.
//!
//! The grid has a power-of-two subdivision per axis, so a cell's 3D
//! coordinates pack losslessly into one integer:
//!
//! ```text
//! index = x | z << bits_x | y << (bits_x + bits_z)
//! ```
//!
//! Particles sort by this index, which places every cell's particles in one
//! contiguous run described by a [`Cell`]. Bit 31 is never part of a cell
//! index and tags dead particles so they sort after all live ones.

use std::ops::Range;

use crate::config::SimulationConfig;
use crate::soa::soa_blocks;

/// Death tag on a packed hash.
pub const DEAD_BIT: u32 = 0x8000_0000;

/// Decoded particle hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellHash {
    /// Live particle in the cell with this flat index.
    Cell(u32),
    /// Particle with no lifetime left.
    Dead,
}

impl CellHash {
    /// Packed form stored in the particle record. Dead keeps bit 31 only.
    #[inline]
    pub fn pack(self) -> u32 {
        match self {
            CellHash::Cell(index) => index & !DEAD_BIT,
            CellHash::Dead => DEAD_BIT,
        }
    }

    /// Inverse of [`CellHash::pack`]. Any packed value with bit 31 set is dead.
    #[inline]
    pub fn unpack(raw: u32) -> Self {
        if raw & DEAD_BIT != 0 {
            CellHash::Dead
        } else {
            CellHash::Cell(raw)
        }
    }
}

/// Derived grid constants, recomputed from a sanitized config each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialGrid {
    div: [u32; 3],
    bits: [u32; 3],
    rcp_cell_size: [f32; 3],
    cell_size: [f32; 3],
    bb_min: [f32; 3],
    bb_max: [f32; 3],
}

impl SpatialGrid {
    /// Build the grid for `config`, which must already be sanitized.
    pub fn new(config: &SimulationConfig) -> Self {
        let mut grid = Self {
            div: config.world_div,
            bits: [0; 3],
            rcp_cell_size: [0.0; 3],
            cell_size: [0.0; 3],
            bb_min: [0.0; 3],
            bb_max: [0.0; 3],
        };
        for axis in 0..3 {
            let div = config.world_div[axis];
            debug_assert!(div.is_power_of_two(), "world_div must be sanitized");
            let extent = config.world_extent[axis];
            grid.bits[axis] = div.trailing_zeros();
            grid.rcp_cell_size[axis] = div as f32 / (extent * 2.0);
            grid.cell_size[axis] = extent * 2.0 / div as f32;
            grid.bb_min[axis] = config.world_center[axis] - extent;
            grid.bb_max[axis] = config.world_center[axis] + extent;
        }
        grid
    }

    /// Subdivision per axis.
    pub fn div(&self) -> [u32; 3] {
        self.div
    }

    /// Edge length of one cell per axis.
    pub fn cell_size(&self) -> [f32; 3] {
        self.cell_size
    }

    /// Lower world corner.
    pub fn bb_min(&self) -> [f32; 3] {
        self.bb_min
    }

    /// Upper world corner.
    pub fn bb_max(&self) -> [f32; 3] {
        self.bb_max
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.div.iter().map(|&d| d as usize).product()
    }

    /// Whether `pos` lies inside the world box (inclusive).
    #[inline]
    pub fn contains(&self, pos: [f32; 3]) -> bool {
        (0..3).all(|a| pos[a] >= self.bb_min[a] && pos[a] <= self.bb_max[a])
    }

    /// Grid coordinates of `pos`, clamped into the grid.
    #[inline]
    pub fn coords_of(&self, pos: [f32; 3]) -> [u32; 3] {
        let mut coord = [0u32; 3];
        for a in 0..3 {
            // Truncation toward zero; anything below the box lands in cell 0.
            let i = ((pos[a] - self.bb_min[a]) * self.rcp_cell_size[a]) as i32;
            coord[a] = i.clamp(0, self.div[a] as i32 - 1) as u32;
        }
        coord
    }

    /// Flat index of the cell at `coord`.
    #[inline]
    pub fn index_of(&self, coord: [u32; 3]) -> u32 {
        coord[0] | coord[2] << self.bits[0] | coord[1] << (self.bits[0] + self.bits[2])
    }

    /// Flat cell index containing `pos`.
    #[inline]
    pub fn hash(&self, pos: [f32; 3]) -> u32 {
        self.index_of(self.coords_of(pos))
    }

    /// Hash of a particle at `pos` with `lifetime` seconds left.
    #[inline]
    pub fn hash_particle(&self, pos: [f32; 3], lifetime: f32) -> CellHash {
        if lifetime <= 0.0 {
            CellHash::Dead
        } else {
            CellHash::Cell(self.hash(pos))
        }
    }

    /// Grid coordinates of the cell with flat index `index`.
    #[inline]
    pub fn unhash(&self, index: u32) -> [u32; 3] {
        let [bx, _, bz] = self.bits;
        [
            index & (self.div[0] - 1),
            (index >> (bx + bz)) & (self.div[1] - 1),
            (index >> bx) & (self.div[2] - 1),
        ]
    }

    /// Flat indices of the up to 27 cells around `coord` (itself included),
    /// skipping those outside the grid.
    pub fn neighbors(&self, coord: [u32; 3]) -> impl Iterator<Item = u32> + '_ {
        let lo = |a: usize| coord[a].saturating_sub(1);
        let hi = |a: usize| (coord[a] + 1).min(self.div[a] - 1);
        let (x0, x1, y0, y1, z0, z1) = (lo(0), hi(0), lo(1), hi(1), lo(2), hi(2));
        (y0..=y1).flat_map(move |y| {
            (z0..=z1).flat_map(move |z| (x0..=x1).map(move |x| self.index_of([x, y, z])))
        })
    }
}

/// One grid cell's run in the sorted particle buffer and its SoA offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    /// First particle index (inclusive).
    pub begin: u32,
    /// Last particle index (exclusive).
    pub end: u32,
    /// Index of the cell's first 8-lane block in the SoA buffer.
    pub soai: u32,
}

impl Cell {
    /// Number of particles in the cell.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.begin) as usize
    }

    /// Whether the cell holds no particles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Range of the cell's particles in the sorted buffer.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.begin as usize..self.end as usize
    }

    /// Number of 8-lane blocks the cell occupies.
    #[inline]
    pub fn blocks(&self) -> usize {
        soa_blocks(self.len())
    }

    /// Range of the cell's blocks in the SoA buffer.
    #[inline]
    pub fn block_range(&self) -> Range<usize> {
        let start = self.soai as usize;
        start..start + self.blocks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(div: [u32; 3]) -> SpatialGrid {
        let config = SimulationConfig {
            world_center: [0.0; 3],
            world_extent: [1.0; 3],
            world_div: div,
            ..Default::default()
        };
        SpatialGrid::new(&config)
    }

    #[test]
    fn packing_puts_z_between_x_and_y() {
        let g = grid([8, 4, 16]);
        // bits: x = 3, y = 2, z = 4
        assert_eq!(g.index_of([1, 0, 0]), 1);
        assert_eq!(g.index_of([0, 0, 1]), 1 << 3);
        assert_eq!(g.index_of([0, 1, 0]), 1 << 7);
        assert_eq!(g.cell_count(), 512);
    }

    #[test]
    fn positions_clamp_to_edge_cells() {
        let g = grid([8, 8, 8]);
        assert_eq!(g.coords_of([-5.0, 0.0, 5.0]), [0, 4, 7]);
        assert_eq!(g.coords_of([1.0, 1.0, 1.0]), [7, 7, 7]);
        assert_eq!(g.coords_of([f32::NAN, -0.999, 0.999]), [0, 0, 7]);
    }

    #[test]
    fn dead_hash_sorts_after_every_cell() {
        let g = grid([1024, 1024, 1024]);
        let last = g.index_of([1023, 1023, 1023]);
        assert!(CellHash::Dead.pack() > last);
        assert_eq!(g.hash_particle([0.0; 3], 0.0), CellHash::Dead);
        assert_eq!(g.hash_particle([0.0; 3], -1.0), CellHash::Dead);
    }

    #[test]
    fn corner_cell_has_eight_neighbors() {
        let g = grid([4, 4, 4]);
        assert_eq!(g.neighbors([0, 0, 0]).count(), 8);
        assert_eq!(g.neighbors([1, 1, 1]).count(), 27);
        assert_eq!(grid([1, 1, 1]).neighbors([0, 0, 0]).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn cell_ranges() {
        let cell = Cell { begin: 10, end: 27, soai: 4 };
        assert_eq!(cell.range(), 10..27);
        assert_eq!(cell.blocks(), 3);
        assert_eq!(cell.block_range(), 4..7);
        assert!(Cell::default().is_empty());
    }

    proptest! {
        #[test]
        fn unhash_inverts_hash(
            bits in (0u32..=10, 0u32..=10, 0u32..=10),
            seed in (any::<u32>(), any::<u32>(), any::<u32>()),
        ) {
            let div = [1 << bits.0, 1 << bits.1, 1 << bits.2];
            let g = grid(div);
            let coord = [seed.0 % div[0], seed.1 % div[1], seed.2 % div[2]];
            let index = g.index_of(coord);
            prop_assert!(index & DEAD_BIT == 0);
            prop_assert_eq!(g.unhash(index), coord);
            prop_assert_eq!(CellHash::unpack(CellHash::Cell(index).pack()), CellHash::Cell(index));
        }

        #[test]
        fn hash_of_cell_center_matches_coords(x in 0u32..8, y in 0u32..8, z in 0u32..8) {
            let g = grid([8, 8, 8]);
            let size = g.cell_size();
            let min = g.bb_min();
            let center = [
                min[0] + (x as f32 + 0.5) * size[0],
                min[1] + (y as f32 + 0.5) * size[1],
                min[2] + (z as f32 + 0.5) * size[2],
            ];
            prop_assert_eq!(g.unhash(g.hash(center)), [x, y, z]);
        }
    }
}
