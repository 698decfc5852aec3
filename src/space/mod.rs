// src/space/mod.rs

mod cavity_fill;
mod classify;
mod tally;

use crate::atom::AtomStore;
use crate::error::CoreError;
use crate::grid::Grid3D;
use crate::voxel::{Voxel, VoxelType};

/// Owner of the octree forest and per-level grids for one calculation.
/// Exclusively owned by the [`crate::engine::Engine`] for the duration of
/// a run: constructed from `(AtomStore, grid_size, max_depth, r_probe_small)`,
/// mutated only by the two classification passes, and dropped once the
/// result bundle has been assembled.
pub struct Space {
    cart_min: [f64; 3],
    cart_max: [f64; 3],
    grid_size: f64,
    max_depth: u32,
    n_gridsteps: [usize; 3],
    /// The octree forest: one root voxel per top-level grid cell (level
    /// `max_depth`), each potentially mixed with children down to level 0.
    top: Grid3D<Voxel>,
    /// Materialized type-byte view at every level, indexed by level
    /// (`0` = bottom, `max_depth` = top). Populated by
    /// [`Space::update_grid`] after pass 1 so that any level resolves a
    /// coordinate's type in O(1) without walking the octree.
    level_grids: Vec<Grid3D<VoxelType>>,
    /// Cavity component id per bottom-level voxel, `0` for non-cavity
    /// voxels. Kept as a grid parallel to `level_grids[0]` rather than
    /// widening the voxel type byte (see DESIGN.md).
    cavity_labels: Grid3D<u8>,
}

impl Space {
    /// Builds the cartesian bounds and the empty (all-unassigned) octree
    /// forest for `store`. Does not classify anything; call
    /// [`Space::classify_atom_vs_core`] next.
    pub fn build(store: &AtomStore, grid_size: f64, max_depth: u32) -> Result<Space, CoreError> {
        Self::build_with_margin(store, grid_size, max_depth, None)
    }

    /// Like [`Space::build`], but lets the caller override the margin
    /// added around the atoms' bounding box (`addSpace` in §4.2). A `None`
    /// margin defaults to `r_probe + 2*grid_size`, per spec; callers doing
    /// two-probe runs should pass the larger of the two probe radii so the
    /// grid has room for the large-probe shell too.
    pub fn build_with_margin(
        store: &AtomStore,
        grid_size: f64,
        max_depth: u32,
        margin_probe_radius: Option<f64>,
    ) -> Result<Space, CoreError> {
        if !(grid_size > 0.0) {
            return Err(CoreError::InvalidGridStep(grid_size));
        }
        if max_depth > 20 {
            return Err(CoreError::InvalidDepth(max_depth));
        }

        let (mut cart_min, mut cart_max, max_atom_radius) =
            store.bounds_and_max_radius().unwrap_or(([0.0; 3], [0.0; 3], 0.0));
        let add_space = margin_probe_radius.unwrap_or(0.0) + 2.0 * grid_size;
        for dim in 0..3 {
            cart_min[dim] -= add_space + max_atom_radius;
            cart_max[dim] += add_space + max_atom_radius;
        }

        let mut n_gridsteps = [0usize; 3];
        for dim in 0..3 {
            let size = cart_max[dim] - cart_min[dim];
            let steps = (size / grid_size).ceil();
            let top_steps = (steps / 2f64.powi(max_depth as i32)).ceil();
            n_gridsteps[dim] = top_steps.max(1.0) as usize;
        }

        let top = Grid3D::new(n_gridsteps);
        let mut level_grids = Vec::with_capacity(max_depth as usize + 1);
        for level in 0..=max_depth {
            let scale = 1usize << (max_depth - level);
            let dims = [
                n_gridsteps[0] * scale,
                n_gridsteps[1] * scale,
                n_gridsteps[2] * scale,
            ];
            level_grids.push(Grid3D::new(dims));
        }
        let bottom_dims = level_grids[0].dims();
        let cavity_labels = Grid3D::new(bottom_dims);

        Ok(Space {
            cart_min,
            cart_max,
            grid_size,
            max_depth,
            n_gridsteps,
            top,
            level_grids,
            cavity_labels,
        })
    }

    pub fn cart_min(&self) -> [f64; 3] {
        self.cart_min
    }

    pub fn cart_max(&self) -> [f64; 3] {
        self.cart_max
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn n_gridsteps(&self) -> [usize; 3] {
        self.n_gridsteps
    }

    /// Side length of a voxel at `level` (`0` = bottom, `max_depth` = top).
    pub fn side_at(&self, level: u32) -> f64 {
        self.grid_size * 2f64.powi(level as i32)
    }

    /// Center of the top-level voxel at `(i, j, k)`, per §4.3.
    pub fn top_voxel_center(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        let side = self.side_at(self.max_depth);
        [
            self.cart_min[0] + side * (0.5 + i as f64),
            self.cart_min[1] + side * (0.5 + j as f64),
            self.cart_min[2] + side * (0.5 + k as f64),
        ]
    }

    pub fn bottom_dims(&self) -> [usize; 3] {
        self.level_grids[0].dims()
    }

    pub fn type_at(&self, level: u32, pos: [usize; 3]) -> VoxelType {
        *self.level_grids[level as usize].get(pos)
    }

    pub fn cavity_label_at(&self, pos: [usize; 3]) -> u8 {
        *self.cavity_labels.get(pos)
    }

    /// Writes a copy of every octree node's type byte into the matching
    /// level grid, per §4.4. A pure node's type is replicated into every
    /// descendant cell at every lower level down to the bottom, so random
    /// access at any level is O(1).
    pub fn update_grid(&mut self) {
        let max_depth = self.max_depth;
        let n_gridsteps = self.n_gridsteps;
        let top = &self.top;
        let level_grids = &mut self.level_grids;
        for xi in 0..n_gridsteps[0] {
            for yi in 0..n_gridsteps[1] {
                for zi in 0..n_gridsteps[2] {
                    let voxel = top.get([xi, yi, zi]);
                    fill_grid(level_grids, voxel, xi, yi, zi, max_depth);
                }
            }
        }
    }
}

/// Recursively copies `voxel`'s type into `level_grids[level]` at
/// `(x, y, z)`, then descends into its children (or itself again, if it
/// is a pure leaf) at `level - 1` with doubled coordinates. Matches the
/// teacher's `fillGrid` in `original_source/src/space.cpp`: a pure leaf's
/// type is replicated all the way down, not just written at its own
/// level.
fn fill_grid(
    level_grids: &mut [Grid3D<VoxelType>],
    voxel: &Voxel,
    x: usize,
    y: usize,
    z: usize,
    level: u32,
) {
    level_grids[level as usize].set([x, y, z], voxel.kind);
    if level == 0 {
        return;
    }
    for octant in 0..8 {
        let offset = Voxel::octant_offset(octant);
        let cx = x * 2 + usize::from(offset[0] > 0.0);
        let cy = y * 2 + usize::from(offset[1] > 0.0);
        let cz = z * 2 + usize::from(offset[2] > 0.0);
        match &voxel.children {
            Some(children) => fill_grid(level_grids, &children[octant], cx, cy, cz, level - 1),
            None => fill_grid(level_grids, voxel, cx, cy, cz, level - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;

    fn single_atom_store() -> AtomStore {
        AtomStore::new(vec![Atom::new("H", [0.0, 0.0, 0.0], 1.2)])
    }

    #[test]
    fn build_rejects_non_positive_grid_step() {
        let store = single_atom_store();
        let err = Space::build(&store, 0.0, 2).unwrap_err();
        assert!(matches!(err, CoreError::InvalidGridStep(_)));
    }

    #[test]
    fn build_rejects_depth_over_twenty() {
        let store = single_atom_store();
        let err = Space::build(&store, 0.1, 21).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDepth(21)));
    }

    #[test]
    fn bounds_expand_beyond_atom_and_margin() {
        let store = single_atom_store();
        let space = Space::build(&store, 0.1, 2).unwrap();
        assert!(space.cart_min()[0] < -1.2);
        assert!(space.cart_max()[0] > 1.2);
    }

    #[test]
    fn bottom_dims_scale_by_two_to_the_depth() {
        let store = single_atom_store();
        let space = Space::build(&store, 0.1, 3).unwrap();
        let top = space.n_gridsteps();
        let bottom = space.bottom_dims();
        for dim in 0..3 {
            assert_eq!(bottom[dim], top[dim] * 8);
        }
    }
}
