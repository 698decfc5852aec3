// src/error.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric error codes surfaced verbatim to callers, matching the
/// error code table in the interface contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// 104: two-probe mode requested with r_probe2 <= r_probe1
    ProbeRadiiInverted,
    /// 105: an atom record was skipped during preprocessing
    InvalidEntrySkipped,
    /// 106: element symbol has a non-alphabetic prefix
    InvalidElementSymbol,
    /// 107: radius value could not be interpreted as a number
    InvalidRadiusValue,
    /// 200: calculation failed for a reason other than abort
    CalculationFailed,
    /// 201: more than 255 distinct cavities were found
    CavityOverflow,
}

impl ErrorCode {
    pub const fn code(self) -> u32 {
        match self {
            ErrorCode::ProbeRadiiInverted => 104,
            ErrorCode::InvalidEntrySkipped => 105,
            ErrorCode::InvalidElementSymbol => 106,
            ErrorCode::InvalidRadiusValue => 107,
            ErrorCode::CalculationFailed => 200,
            ErrorCode::CavityOverflow => 201,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            ErrorCode::ProbeRadiiInverted => {
                "the large probe must have a larger radius than the small probe"
            }
            ErrorCode::InvalidEntrySkipped => "an input entry was skipped",
            ErrorCode::InvalidElementSymbol => "element symbol must begin with an alphabetic character",
            ErrorCode::InvalidRadiusValue => "radius value is not numeric",
            ErrorCode::CalculationFailed => "calculation failed",
            ErrorCode::CavityOverflow => "total number of cavities (255) exceeded",
        };
        write!(f, "{}: {}", self.code(), text)
    }
}

/// Fatal-to-run errors. Returned by [`crate::Engine::run`] validation and
/// carried (for display purposes) inside an aborted `ResultBundle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreError {
    /// grid_step must be > 0
    InvalidGridStep(f64),
    /// max_depth must be in [0, 20]
    InvalidDepth(u32),
    /// r_probe1 must be >= 0 (a zero small-probe radius is the degenerate,
    /// but valid, "no probe" case exercised by the single-atom scenario)
    InvalidProbeRadius(f64),
    /// two-probe mode: r_probe2 must be > r_probe1
    ProbeRadiiInverted { small: f64, large: f64 },
    /// the run was aborted cooperatively before completion
    Aborted,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoreError::InvalidGridStep(v) => write!(f, "grid_step must be positive, got {}", v),
            CoreError::InvalidDepth(d) => {
                write!(f, "max_depth must be between 0 and 20, got {}", d)
            }
            CoreError::InvalidProbeRadius(v) => {
                write!(f, "r_probe1 must be non-negative, got {}", v)
            }
            CoreError::ProbeRadiiInverted { small, large } => write!(
                f,
                "{}",
                ErrorCode::ProbeRadiiInverted.to_string()
                    + &format!(" (r_probe1={}, r_probe2={})", small, large)
            ),
            CoreError::Aborted => write!(f, "calculation aborted"),
        }
    }
}

impl std::error::Error for CoreError {}

impl CoreError {
    /// The numeric error code for errors that have one in the interface
    /// contract. `Aborted` has none: an abort is not an error code, it is
    /// a distinct `success = false` status ("Calculation aborted.").
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            CoreError::ProbeRadiiInverted { .. } => Some(ErrorCode::ProbeRadiiInverted),
            CoreError::InvalidGridStep(_) | CoreError::InvalidDepth(_) | CoreError::InvalidProbeRadius(_) => None,
            CoreError::Aborted => None,
        }
    }
}

/// Non-fatal warnings raised while building a [`crate::radius_table::RadiusTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum RadiusWarning {
    /// 106: symbol does not start with an alphabetic character
    NonAlphabeticSymbol(String),
    /// 107: radius is not a finite, non-negative number
    NonNumericRadius(String, f64),
}

impl fmt::Display for RadiusWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RadiusWarning::NonAlphabeticSymbol(sym) => {
                write!(f, "{}: '{}'", ErrorCode::InvalidElementSymbol, sym)
            }
            RadiusWarning::NonNumericRadius(sym, val) => {
                write!(f, "{}: '{}' = {}", ErrorCode::InvalidRadiusValue, sym, val)
            }
        }
    }
}

impl std::error::Error for RadiusWarning {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_interface_contract() {
        assert_eq!(ErrorCode::ProbeRadiiInverted.code(), 104);
        assert_eq!(ErrorCode::InvalidEntrySkipped.code(), 105);
        assert_eq!(ErrorCode::InvalidElementSymbol.code(), 106);
        assert_eq!(ErrorCode::InvalidRadiusValue.code(), 107);
        assert_eq!(ErrorCode::CalculationFailed.code(), 200);
        assert_eq!(ErrorCode::CavityOverflow.code(), 201);
    }

    #[test]
    fn core_error_aborted_has_no_code() {
        assert_eq!(CoreError::Aborted.code(), None);
    }
}
