//! Sort & compaction: the first phase of every tick.
//!
//! 1. Age every particle and tag it with its cell hash (dead ones get bit 31).
//! 2. Sort the active region by hash.
//! 3. Scan adjacent hashes for cell boundaries and the live/dead boundary.
//! 4. Assign each cell its offset in the 8-lane block buffer.
//!
//! After this phase the cells exactly partition `[0, active)` and every dead
//! particle sits past `active`, where it is no longer simulated.

use rayon::prelude::*;

use crate::grid::{Cell, CellHash, SpatialGrid, DEAD_BIT};
use crate::particle::Particle;

/// Lifetime cap for particles found outside the world box.
pub const OUT_OF_BOUNDS_LIFETIME: f32 = 20.0;

/// Hash seen before the first particle.
const SENTINEL_PREV: u32 = u32::MAX;
/// Hash seen after the last sorted particle.
const SENTINEL_NEXT: u32 = u32::MAX - 1;

/// Decay lifetimes by `dt` and store each particle's packed hash.
pub fn assign_hashes(particles: &mut [Particle], grid: &SpatialGrid, dt: f32, min_len: usize) {
    particles.par_iter_mut().with_min_len(min_len).for_each(|p| {
        let pos = [p.position[0], p.position[1], p.position[2]];
        let mut lifetime = p.params.lifetime;
        if !grid.contains(pos) {
            lifetime = lifetime.min(OUT_OF_BOUNDS_LIFETIME);
        }
        lifetime = (lifetime - dt).max(0.0);
        p.params.lifetime = lifetime;
        p.params.hash = grid.hash_particle(pos, lifetime).pack();
    });
}

/// Sort by packed hash, dead particles last.
pub fn sort_by_hash(particles: &mut [Particle]) {
    particles.par_sort_unstable_by_key(|p| p.params.hash);
}

/// Something the boundary scan found at one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    /// A cell's run starts here.
    Begin { cell: u32, at: u32 },
    /// A cell's run ends just before `at`.
    End { cell: u32, at: u32 },
    /// First dead particle after a live one.
    Compaction { at: u32 },
}

/// Examine index `i` of the sorted hashes against its neighbors.
fn classify(i: usize, prev: u32, cur: u32, next: u32) -> [Option<Boundary>; 2] {
    let at = i as u32;
    if cur & DEAD_BIT != 0 {
        if prev & DEAD_BIT == 0 {
            return [Some(Boundary::Compaction { at }), None];
        }
        return [None, None];
    }
    let begin = (cur != prev).then_some(Boundary::Begin { cell: cur, at });
    let end = (cur != next).then_some(Boundary::End { cell: cur, at: at + 1 });
    [begin, end]
}

/// Rebuild `cells` from the sorted `particles` and return the new active count.
///
/// `cells` is cleared first, so cells with no particles end up empty. The
/// clear is split into tasks of at least `cells_per_task` cells and the
/// boundary scan into tasks of at least `particles_per_task` particles.
pub fn scan_cells(
    particles: &[Particle],
    cells: &mut [Cell],
    cells_per_task: usize,
    particles_per_task: usize,
) -> usize {
    let n = particles.len();
    cells
        .par_iter_mut()
        .with_min_len(cells_per_task)
        .for_each(|c| *c = Cell::default());
    if n == 0 {
        return 0;
    }

    let events: Vec<Boundary> = (0..n)
        .into_par_iter()
        .with_min_len(particles_per_task)
        .flat_map_iter(|i| {
            let prev = if i == 0 { SENTINEL_PREV } else { particles[i - 1].params.hash };
            let next = if i + 1 == n { SENTINEL_NEXT } else { particles[i + 1].params.hash };
            classify(i, prev, particles[i].params.hash, next).into_iter().flatten()
        })
        .collect();

    let mut compaction = Vec::new();
    for event in events {
        match event {
            Boundary::Begin { cell, at } => cells[cell as usize].begin = at,
            Boundary::End { cell, at } => cells[cell as usize].end = at,
            Boundary::Compaction { at } => compaction.push(at as usize),
        }
    }

    if compaction.len() > 1 {
        tracing::error!(
            "sorted particles have {} live/dead boundaries, expected at most one",
            compaction.len()
        );
        debug_assert!(false, "unordered live/dead particles: {compaction:?}");
    }

    let live = |p: &Particle| matches!(p.cell_hash(), CellHash::Cell(_));
    if !live(&particles[0]) {
        0
    } else if live(&particles[n - 1]) {
        n
    } else {
        compaction.into_iter().min().unwrap_or(n)
    }
}

/// Assign block offsets in cell order and return the total block count.
pub fn assign_block_offsets(cells: &mut [Cell]) -> usize {
    let mut total = 0u32;
    for cell in cells.iter_mut() {
        cell.soai = total;
        total += cell.blocks() as u32;
    }
    total as usize
}
