// src/space/classify.rs
//
// Pass 1: atom-vs-core classification (spec.md §4.3).

use nalgebra::Vector3;

use crate::atom::{distance, AtomStore};
use crate::atom_tree::AtomTree;
use crate::error::CoreError;
use crate::notify::{AbortFlag, Notifier};
use crate::voxel::{Voxel, VoxelType};

use super::Space;

struct AtomCtx<'a> {
    store: &'a AtomStore,
    tree: &'a AtomTree,
    r_probe: f64,
    max_atom_radius: f64,
}

impl Space {
    /// Runs pass 1 over every top-level voxel: evaluates its relation to
    /// the atoms in `store` via `tree`, refining into the octree wherever
    /// a voxel is neither fully atom, fully dilated-sphere, nor fully
    /// clear of any dilated sphere. Checks `abort` once per top-level
    /// voxel and reports progress once per x-slab, per §5.
    pub fn classify_atom_vs_core(
        &mut self,
        store: &AtomStore,
        tree: &AtomTree,
        r_probe: f64,
        abort: &AbortFlag,
        notifier: &dyn Notifier,
    ) -> Result<(), CoreError> {
        let ctx = AtomCtx {
            store,
            tree,
            r_probe,
            max_atom_radius: tree.max_rad(),
        };
        let [nx, ny, nz] = self.n_gridsteps;
        let max_depth = self.max_depth;
        let grid_size = self.grid_size;

        for xi in 0..nx {
            for yi in 0..ny {
                for zi in 0..nz {
                    if abort.is_aborted() {
                        return Err(CoreError::Aborted);
                    }
                    let center = self.top_voxel_center(xi, yi, zi);
                    let voxel = self.top.get_mut([xi, yi, zi]);
                    classify_recursive(voxel, center, grid_size, max_depth, &ctx);
                }
            }
            notifier.progress((100 * (xi + 1) / nx.max(1)) as u8);
        }
        Ok(())
    }
}

/// Axis-aligned corners of a voxel of side `2*half` centered at `center`.
fn voxel_corners(center: [f64; 3], half: f64) -> [[f64; 3]; 8] {
    std::array::from_fn(|octant| {
        let offset = Voxel::octant_offset(octant);
        [
            center[0] + offset[0] * half,
            center[1] + offset[1] * half,
            center[2] + offset[2] * half,
        ]
    })
}

fn classify_recursive(voxel: &mut Voxel, center: [f64; 3], grid_size: f64, level: u32, ctx: &AtomCtx) {
    let side = grid_size * 2f64.powi(level as i32);
    let half = side / 2.0;
    let query_radius = half * 3f64.sqrt() + ctx.max_atom_radius + ctx.r_probe;
    let candidates = ctx.tree.atoms_within(ctx.store, center, query_radius);

    let in_atom = |p: [f64; 3]| -> bool {
        candidates.iter().any(|&i| {
            let a = ctx.store.get(i);
            distance(p, a.pos) <= a.rad
        })
    };
    let in_dilated = |p: [f64; 3]| -> bool {
        candidates.iter().any(|&i| {
            let a = ctx.store.get(i);
            distance(p, a.pos) <= a.rad + ctx.r_probe
        })
    };

    if level == 0 {
        voxel.kind = if in_atom(center) {
            VoxelType::atom()
        } else if in_dilated(center) {
            VoxelType::shell_inner()
        } else {
            VoxelType::core()
        };
        return;
    }

    let corners = voxel_corners(center, half);
    if corners.iter().all(|&c| in_atom(c)) {
        voxel.kind = VoxelType::atom();
        return;
    }
    if corners.iter().all(|&c| in_dilated(c)) {
        voxel.kind = VoxelType::shell_inner();
        return;
    }
    if corners.iter().all(|&c| !in_dilated(c)) {
        voxel.kind = VoxelType::core();
        return;
    }

    // Mixed: neither uniformly atom, uniformly dilated, nor uniformly
    // clear. Subdivide and recurse into each octant.
    *voxel = Voxel::mixed();
    let parent_center = Vector3::from(center);
    let quarter = side / 4.0;
    let children = voxel.children.as_mut().expect("just allocated by Voxel::mixed");
    for (octant, child) in children.iter_mut().enumerate() {
        let offset = Voxel::octant_offset(octant);
        let child_center = parent_center + Vector3::new(offset[0], offset[1], offset[2]) * quarter;
        classify_recursive(child, [child_center.x, child_center.y, child_center.z], grid_size, level - 1, ctx);
    }
}
