// src/result.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cavity::Cavity;
use crate::error::CoreError;
use crate::grid::Grid3D;

/// Multiset of element symbols, as reported in a [`ResultBundle`].
/// Formatting it into a human-readable string (e.g. "H2O") is a caller
/// concern, out of scope for this crate.
pub type ChemicalFormula = BTreeMap<String, usize>;

/// Volumes in cubic angstrom for one probe pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMap {
    pub atom: f64,
    pub core: f64,
    pub shell: f64,
}

impl VolumeMap {
    /// Total solvent-excluded volume: the molecule's atoms plus the core
    /// and shell voxels the probe cannot reach from outside.
    pub fn total_excluded(&self) -> f64 {
        self.atom + self.core + self.shell
    }
}

/// Surface areas in square angstrom, named per the interface contract's
/// `surfaces: {vdw, molecular, probe_excluded, probe_accessible}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Surfaces {
    /// atom / non-atom faces.
    pub vdw: f64,
    /// core / shell faces (small probe).
    pub probe_accessible: f64,
    /// shell / void faces (small probe).
    pub probe_excluded: f64,
    /// small-probe-accessible / large-probe-shell boundary. Zero unless
    /// the run used two probes.
    pub molecular: f64,
}

/// The bottom-level voxel type grid, exposed for callers that want to
/// export a density map (e.g. OpenDX). Writing the file itself is out of
/// scope here; this is just the tensor plus the geometry needed to place
/// it in space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeTensor {
    pub grid: Grid3D<u8>,
    pub origin: [f64; 3],
    pub voxel_side: f64,
}

/// Outcome of an [`crate::engine::Engine::run`] call. On success, carries
/// every quantity §6 of the interface contract promises; on failure,
/// `error` names the fatal condition and every quantity field is left at
/// its default/empty value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResultBundle {
    pub success: bool,
    /// Wall-clock duration of the `Engine::run` call that produced this
    /// bundle, in seconds.
    pub elapsed_seconds: f64,
    pub formula: ChemicalFormula,
    pub volumes: VolumeMap,
    pub surfaces: Surfaces,
    pub cavities: Vec<Cavity>,
    /// Present only when the run used two probes.
    pub large_probe_volumes: Option<VolumeMap>,
    pub type_tensor: Option<TypeTensor>,
    pub error: Option<CoreError>,
    /// Human-readable status, e.g. `"Calculation aborted."` on a
    /// cooperative abort.
    pub status: String,
}

impl ResultBundle {
    pub fn failure(error: CoreError) -> Self {
        ResultBundle {
            success: false,
            status: error.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn aborted() -> Self {
        ResultBundle {
            success: false,
            status: "Calculation aborted.".to_string(),
            error: Some(CoreError::Aborted),
            ..Default::default()
        }
    }
}
