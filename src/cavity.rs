// src/cavity.rs

use serde::{Deserialize, Serialize};

/// A single connected cavity found inside the small-probe solvent-excluded
/// volume: a maximal 6-connected component of core/shell voxels that the
/// exterior flood fill in pass 2 never reached.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cavity {
    /// Cavity label, `1..=255`, matching the id stored in the cavity
    /// label grid.
    pub id: u8,
    /// Volume in cubic angstrom, bottom-level voxel count times
    /// `voxel_side^3`.
    pub volume: f64,
    /// Surface area in square angstrom contributed by faces between a
    /// cavity-core voxel and a non-cavity voxel.
    pub surf_core: f64,
    /// Surface area in square angstrom contributed by faces between a
    /// cavity-shell voxel and a non-cavity voxel.
    pub surf_shell: f64,
    /// Voxel-count-weighted centroid of the cavity, in angstrom.
    pub center: [f64; 3],
}

impl Cavity {
    pub fn total_surface(&self) -> f64 {
        self.surf_core + self.surf_shell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_surface_sums_core_and_shell() {
        let cavity = Cavity {
            id: 1,
            volume: 10.0,
            surf_core: 3.0,
            surf_shell: 4.0,
            center: [0.0, 0.0, 0.0],
        };
        assert_eq!(cavity.total_surface(), 7.0);
    }
}
