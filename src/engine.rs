// src/engine.rs
//
// Orchestration (spec.md §4.7): validates parameters, resolves atom radii,
// builds the k-d tree and Space, runs both classification passes, tallies,
// and assembles a ResultBundle.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::atom::{Atom, AtomStore};
use crate::atom_tree::AtomTree;
use crate::error::{CoreError, ErrorCode};
use crate::notify::{AbortFlag, Notifier};
use crate::radius_table::RadiusTable;
use crate::result::ResultBundle;
use crate::space::Space;

/// One atom as supplied by an external parser: element symbol and
/// Cartesian position. Radius is resolved from a [`RadiusTable`] inside
/// [`Engine::run`], not carried on the record itself — reading a
/// coordinate file and reading a radius table are two independent,
/// out-of-scope external concerns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub symbol: String,
    pub pos: [f64; 3],
}

impl AtomRecord {
    pub fn new(symbol: impl Into<String>, pos: [f64; 3]) -> Self {
        Self {
            symbol: symbol.into(),
            pos,
        }
    }
}

/// Run configuration: the in-memory analogue of a calculation dialog's
/// state. Validated once, at the top of [`Engine::run`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Parameters {
    pub grid_size: f64,
    pub max_depth: u32,
    pub r_probe_small: f64,
    /// `Some(r)` switches on two-probe mode; `r` must exceed `r_probe_small`.
    pub r_probe_large: Option<f64>,
    /// Whether `Engine::run` should populate `ResultBundle.type_tensor`.
    /// Building it costs one more full grid copy, so it defaults to off.
    pub export_type_tensor: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            grid_size: 0.2,
            max_depth: 3,
            r_probe_small: 1.4,
            r_probe_large: None,
            export_type_tensor: false,
        }
    }
}

impl Parameters {
    /// §4.7 step 1: `grid_size > 0`, `0 <= max_depth <= 20`,
    /// `r_probe_small >= 0`, and in two-probe mode `r_probe_large >
    /// r_probe_small`. A zero small-probe radius is the degenerate
    /// "geometric, no probe" case used by the single-atom scenario in
    /// §8, so it is accepted rather than rejected.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.grid_size > 0.0) {
            return Err(CoreError::InvalidGridStep(self.grid_size));
        }
        if self.max_depth > 20 {
            return Err(CoreError::InvalidDepth(self.max_depth));
        }
        if !(self.r_probe_small >= 0.0) {
            return Err(CoreError::InvalidProbeRadius(self.r_probe_small));
        }
        if let Some(large) = self.r_probe_large {
            if !(large > self.r_probe_small) {
                return Err(CoreError::ProbeRadiiInverted {
                    small: self.r_probe_small,
                    large,
                });
            }
        }
        Ok(())
    }
}

/// Stateless orchestrator. Holds no data between calls; every `run` is
/// independent, per §1's "no persistent state between calculations".
#[derive(Clone, Copy, Debug, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Runs one full calculation end to end. Never panics on bad input:
    /// both validation failures and cooperative aborts come back as a
    /// `ResultBundle { success: false, .. }` rather than an `Err`, so a
    /// caller only ever has one result type to handle.
    pub fn run(
        &self,
        parameters: &Parameters,
        records: &[AtomRecord],
        radii: &RadiusTable,
        abort: &AbortFlag,
        notifier: &dyn Notifier,
    ) -> ResultBundle {
        let start = Instant::now();
        let mut bundle = match self.run_inner(parameters, records, radii, abort, notifier) {
            Ok(bundle) => bundle,
            Err(CoreError::Aborted) => {
                log::info!("calculation aborted by caller");
                ResultBundle::aborted()
            }
            Err(err) => {
                log::warn!("calculation failed: {err}");
                ResultBundle::failure(err)
            }
        };
        bundle.elapsed_seconds = start.elapsed().as_secs_f64();
        bundle
    }

    fn run_inner(
        &self,
        parameters: &Parameters,
        records: &[AtomRecord],
        radii: &RadiusTable,
        abort: &AbortFlag,
        notifier: &dyn Notifier,
    ) -> Result<ResultBundle, CoreError> {
        parameters.validate()?;

        if records.is_empty() {
            log::info!("run requested with zero atoms; returning an all-zero result");
            return Ok(ResultBundle {
                success: true,
                status: "Calculation completed.".to_string(),
                ..Default::default()
            });
        }

        // §4.7 step 2: resolve each record's radius, warning (not failing)
        // on an unknown symbol.
        let atoms: Vec<Atom> = records
            .iter()
            .map(|record| {
                let rad = radii.radius_for(&record.symbol).unwrap_or_else(|| {
                    let text = format!("no radius known for element '{}', using 0.0", record.symbol);
                    notifier.warn(ErrorCode::InvalidEntrySkipped, &text);
                    log::warn!("{text}");
                    0.0
                });
                Atom::new(record.symbol.clone(), record.pos, rad)
            })
            .collect();
        let formula = AtomStore::new(atoms.clone()).chemical_formula();

        let mut store = AtomStore::new(atoms);
        log::info!("building k-d tree over {} atoms", store.len());
        let tree = AtomTree::build(&mut store);

        let margin_probe = parameters.r_probe_large.unwrap_or(parameters.r_probe_small);
        let mut space = Space::build_with_margin(
            &store,
            parameters.grid_size,
            parameters.max_depth,
            Some(margin_probe),
        )?;

        log::info!("pass 1: atom-vs-core classification");
        space.classify_atom_vs_core(&store, &tree, parameters.r_probe_small, abort, notifier)?;
        space.update_grid();

        log::info!("pass 2: shell-vs-void and cavity segmentation");
        let cavities = space.classify_shell_vs_void(abort, notifier)?;

        let volumes = space.tally_volumes();

        let large_probe_volumes = match parameters.r_probe_large {
            Some(r_probe_large) => {
                log::info!("two-probe pass: large-probe classification (r={r_probe_large})");
                space.classify_large_probe(&store, &tree, r_probe_large, abort)?;
                let mut large = space.tally_large_probe_volumes();
                large.atom = volumes.atom;
                Some(large)
            }
            None => None,
        };

        // §5: an abort check gates entry to the tally stage as a whole,
        // even though the reduction itself has no suspension points.
        if abort.is_aborted() {
            return Err(CoreError::Aborted);
        }

        let surfaces = space.tally_surfaces();
        let type_tensor = parameters.export_type_tensor.then(|| space.type_tensor());

        notifier.message("calculation complete");
        Ok(ResultBundle {
            success: true,
            elapsed_seconds: 0.0,
            formula,
            volumes,
            surfaces,
            cavities,
            large_probe_volumes,
            type_tensor,
            error: None,
            status: "Calculation completed.".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NullNotifier;
    use crate::result::VolumeMap;

    fn water_radii() -> RadiusTable {
        let mut table = RadiusTable::new();
        table.insert("H", 1.2).unwrap();
        table.insert("O", 1.52).unwrap();
        table
    }

    #[test]
    fn single_hydrogen_atom_matches_analytic_volume() {
        let params = Parameters {
            grid_size: 0.1,
            max_depth: 4,
            r_probe_small: 0.0,
            r_probe_large: None,
            export_type_tensor: false,
        };
        let records = vec![AtomRecord::new("H", [0.0, 0.0, 0.0])];
        let bundle = Engine::new().run(&params, &records, &water_radii(), &AbortFlag::new(), &NullNotifier);

        assert!(bundle.success);
        let expected = 4.0 / 3.0 * std::f64::consts::PI * 1.2f64.powi(3);
        let tolerance = expected * 0.01;
        assert!(
            (bundle.volumes.atom - expected).abs() < tolerance,
            "atom volume {} not within 1% of {}",
            bundle.volumes.atom,
            expected
        );
        assert_eq!(bundle.volumes.shell, 0.0);
        assert!(bundle.cavities.is_empty());
    }

    #[test]
    fn empty_atom_list_returns_zeroed_success() {
        let params = Parameters::default();
        let bundle = Engine::new().run(&params, &[], &water_radii(), &AbortFlag::new(), &NullNotifier);
        assert!(bundle.success);
        assert_eq!(bundle.volumes, VolumeMap::default());
        assert!(bundle.formula.is_empty());
    }

    #[test]
    fn inverted_probe_radii_fail_validation() {
        let params = Parameters {
            grid_size: 0.2,
            max_depth: 3,
            r_probe_small: 2.0,
            r_probe_large: Some(1.5),
            export_type_tensor: false,
        };
        let records = vec![AtomRecord::new("H", [0.0, 0.0, 0.0])];
        let bundle = Engine::new().run(&params, &records, &water_radii(), &AbortFlag::new(), &NullNotifier);

        assert!(!bundle.success);
        assert!(matches!(bundle.error, Some(CoreError::ProbeRadiiInverted { .. })));
    }

    #[test]
    fn missing_radius_symbol_warns_and_uses_zero() {
        let params = Parameters {
            grid_size: 0.2,
            max_depth: 2,
            r_probe_small: 1.0,
            r_probe_large: None,
            export_type_tensor: false,
        };
        let records = vec![AtomRecord::new("Xx", [0.0, 0.0, 0.0])];
        let bundle = Engine::new().run(&params, &records, &RadiusTable::new(), &AbortFlag::new(), &NullNotifier);

        assert!(bundle.success);
        assert_eq!(bundle.volumes.atom, 0.0);
    }

    #[test]
    fn parameters_round_trip_through_json() {
        let params = Parameters {
            grid_size: 0.15,
            max_depth: 5,
            r_probe_small: 1.4,
            r_probe_large: Some(2.0),
            export_type_tensor: true,
        };
        let json = serde_json::to_string(&params).unwrap();
        let restored: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.grid_size, params.grid_size);
        assert_eq!(restored.r_probe_large, params.r_probe_large);
    }

    #[test]
    fn result_bundle_round_trips_through_json() {
        let params = Parameters {
            grid_size: 0.2,
            max_depth: 2,
            r_probe_small: 1.2,
            r_probe_large: None,
            export_type_tensor: false,
        };
        let records = vec![AtomRecord::new("H", [0.0, 0.0, 0.0])];
        let bundle = Engine::new().run(&params, &records, &water_radii(), &AbortFlag::new(), &NullNotifier);
        let json = serde_json::to_string(&bundle).unwrap();
        let restored: ResultBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.success, bundle.success);
        assert_eq!(restored.volumes, bundle.volumes);
    }

    #[test]
    fn pre_aborted_flag_yields_unsuccessful_bundle() {
        let params = Parameters::default();
        let abort = AbortFlag::new();
        abort.request_abort();
        let records = vec![AtomRecord::new("H", [0.0, 0.0, 0.0])];
        let bundle = Engine::new().run(&params, &records, &water_radii(), &abort, &NullNotifier);

        assert!(!bundle.success);
        assert_eq!(bundle.status, "Calculation aborted.");
    }
}
