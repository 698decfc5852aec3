// src/space/tally.rs
//
// Tallying: volume-per-mask totals and inter-voxel surface areas
// (spec.md §4.6).

use rayon::prelude::*;

use crate::result::{Surfaces, TypeTensor, VolumeMap};
use crate::voxel::VoxelType;

use super::Space;

impl Space {
    /// Sums bottom-level voxels per type mask, walking the octree rather
    /// than the materialized bottom grid so a pure subtree's contribution
    /// is `8^level` instead of a per-cell scan, per §4.6. Runs the
    /// per-top-voxel reduction across threads with `rayon`, safe because
    /// classification has already completed and the result does not
    /// depend on visitation order.
    pub fn tally_volumes(&self) -> VolumeMap {
        let unit = self.grid_size.powi(3);
        let remaining = self.max_depth;
        let (atom, core, shell) = self
            .top
            .as_slice()
            .par_iter()
            .map(|voxel| {
                (
                    voxel.count_leaves(remaining, VoxelType::is_atom),
                    voxel.count_leaves(remaining, VoxelType::is_core),
                    voxel.count_leaves(remaining, VoxelType::is_shell),
                )
            })
            .reduce(|| (0, 0, 0), |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2));

        VolumeMap {
            atom: atom as f64 * unit,
            core: core as f64 * unit,
            shell: shell as f64 * unit,
        }
    }

    /// Sums large-probe core/shell voxels from the bottom-level grid
    /// directly: the large-probe pass only ever touches `level_grids[0]`,
    /// never the octree's `Voxel::kind` fields, so there is no pure-subtree
    /// shortcut available here. `atom` is always left at `0.0`; the caller
    /// already has the small-probe atom volume and can fill it in.
    pub fn tally_large_probe_volumes(&self) -> VolumeMap {
        let unit = self.grid_size.powi(3);
        let (core, shell) = self.level_grids[0]
            .as_slice()
            .par_iter()
            .map(|kind| (kind.is_large_core() as u64, kind.is_large_shell() as u64))
            .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
        VolumeMap {
            atom: 0.0,
            core: core as f64 * unit,
            shell: shell as f64 * unit,
        }
    }

    /// Counts grid-aligned inter-voxel faces on the bottom-level grid and
    /// classifies each into one of the four named surfaces, per §4.6:
    /// van-der-Waals (atom/non-atom), probe-accessible (core/shell),
    /// probe-excluded (shell/void, where *void* is a reached — i.e.
    /// non-cavity — core voxel) and, in two-probe mode, molecular
    /// (small-probe-accessible/large-probe-shell). Each unordered pair of
    /// face-adjacent voxels is counted exactly once, by only ever looking
    /// at a voxel's `+x`/`+y`/`+z` neighbor.
    pub fn tally_surfaces(&self) -> Surfaces {
        let unit = self.grid_size.powi(2);
        let bottom = &self.level_grids[0];
        let labels = &self.cavity_labels;
        let [nx, ny, nz] = bottom.dims();

        let totals = (0..nx)
            .into_par_iter()
            .map(|xi| {
                let mut slab = Surfaces::default();
                for yi in 0..ny {
                    for zi in 0..nz {
                        let here = [xi, yi, zi];
                        let here_kind = *bottom.get(here);
                        let here_void = here_kind.is_core() && *labels.get(here) == 0;

                        for (dx, dy, dz) in [(1isize, 0isize, 0isize), (0, 1, 0), (0, 0, 1)] {
                            let nx_ = xi as isize + dx;
                            let ny_ = yi as isize + dy;
                            let nz_ = zi as isize + dz;
                            if nx_ as usize >= nx || ny_ as usize >= ny || nz_ as usize >= nz {
                                continue;
                            }
                            let there = [nx_ as usize, ny_ as usize, nz_ as usize];
                            let there_kind = *bottom.get(there);
                            let there_void = there_kind.is_core() && *labels.get(there) == 0;

                            if here_kind.is_atom() != there_kind.is_atom() {
                                slab.vdw += unit;
                            }
                            if (here_kind.is_core() && there_kind.is_shell())
                                || (here_kind.is_shell() && there_kind.is_core())
                            {
                                slab.probe_accessible += unit;
                            }
                            if (here_kind.is_shell() && there_void) || (here_void && there_kind.is_shell()) {
                                slab.probe_excluded += unit;
                            }

                            let here_accessible = !here_kind.is_atom() && *labels.get(here) == 0;
                            let there_accessible = !there_kind.is_atom() && *labels.get(there) == 0;
                            let here_large_shell = here_kind.is_large_shell();
                            let there_large_shell = there_kind.is_large_shell();
                            if here_large_shell && there_accessible && !there_large_shell {
                                slab.molecular += unit;
                            }
                            if there_large_shell && here_accessible && !here_large_shell {
                                slab.molecular += unit;
                            }
                        }
                    }
                }
                slab
            })
            .reduce(Surfaces::default, |a, b| Surfaces {
                vdw: a.vdw + b.vdw,
                probe_accessible: a.probe_accessible + b.probe_accessible,
                probe_excluded: a.probe_excluded + b.probe_excluded,
                molecular: a.molecular + b.molecular,
            });

        totals
    }

    /// Exposes the bottom-level type grid plus the geometry needed to
    /// place it in space, for callers that want to export a density map.
    /// Does not apply the type→float mapping table from §6; that belongs
    /// to the external writer, not the core.
    pub fn type_tensor(&self) -> TypeTensor {
        let dims = self.level_grids[0].dims();
        let mut grid = crate::grid::Grid3D::new(dims);
        for (pos, kind) in self.level_grids[0].iter_positions() {
            grid.set(pos, kind.0);
        }
        TypeTensor {
            grid,
            origin: self.cart_min,
            voxel_side: self.grid_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{Atom, AtomStore};
    use crate::atom_tree::AtomTree;
    use crate::notify::{AbortFlag, NullNotifier};

    #[test]
    fn single_atom_volume_tally_counts_atom_voxels() {
        let mut store = AtomStore::new(vec![Atom::new("H", [0.0, 0.0, 0.0], 1.2)]);
        let tree = AtomTree::build(&mut store);
        let mut space = Space::build_with_margin(&store, 0.2, 3, Some(1.4)).unwrap();
        space
            .classify_atom_vs_core(&store, &tree, 1.4, &AbortFlag::new(), &NullNotifier)
            .unwrap();
        space.update_grid();
        space.classify_shell_vs_void(&AbortFlag::new(), &NullNotifier).unwrap();

        let volumes = space.tally_volumes();
        assert!(volumes.atom > 0.0);
        assert!(volumes.shell > 0.0);
        // A single atom has no sealed interior, so no bottom voxel should
        // classify as probe-inaccessible core surrounded entirely by shell.
        assert!(volumes.total_excluded() > volumes.atom);
    }

    #[test]
    fn surface_tally_is_zero_for_an_empty_grid() {
        let dims = [4, 4, 4];
        let bottom: crate::grid::Grid3D<VoxelType> = crate::grid::Grid3D::new(dims);
        let space = Space {
            cart_min: [0.0; 3],
            cart_max: [4.0, 4.0, 4.0],
            grid_size: 1.0,
            max_depth: 0,
            n_gridsteps: dims,
            top: crate::grid::Grid3D::new(dims),
            level_grids: vec![bottom],
            cavity_labels: crate::grid::Grid3D::new(dims),
        };
        let surfaces = space.tally_surfaces();
        assert_eq!(surfaces, Surfaces::default());
    }

    #[test]
    fn type_tensor_preserves_grid_geometry() {
        let store = AtomStore::new(vec![Atom::new("H", [0.0, 0.0, 0.0], 1.2)]);
        let space = Space::build(&store, 0.2, 2).unwrap();
        let tensor = space.type_tensor();
        assert_eq!(tensor.grid.dims(), space.bottom_dims());
        assert_eq!(tensor.origin, space.cart_min());
        assert_eq!(tensor.voxel_side, space.grid_size());
    }
}
