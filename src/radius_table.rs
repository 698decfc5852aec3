// src/radius_table.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RadiusWarning;

/// In-memory symbol→radius map, keyed by uppercased element symbol so
/// lookups are case-insensitive. Building one from a file is a caller
/// concern; this type only validates and stores already-parsed entries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RadiusTable {
    radii: BTreeMap<String, f64>,
}

impl RadiusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `symbol -> radius`, uppercasing the symbol for lookup.
    /// Returns a warning (and still inserts whatever was given) when the
    /// symbol doesn't start with an alphabetic character, or when the
    /// radius is not a finite, positive number.
    pub fn insert(&mut self, symbol: &str, radius: f64) -> Result<(), RadiusWarning> {
        self.radii.insert(symbol.to_uppercase(), radius);
        if !symbol.chars().next().is_some_and(|c| c.is_alphabetic()) {
            return Err(RadiusWarning::NonAlphabeticSymbol(symbol.to_string()));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RadiusWarning::NonNumericRadius(symbol.to_string(), radius));
        }
        Ok(())
    }

    pub fn radius_for(&self, symbol: &str) -> Option<f64> {
        self.radii.get(&symbol.to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut table = RadiusTable::new();
        table.insert("Na", 2.27).unwrap();
        assert_eq!(table.radius_for("na"), Some(2.27));
        assert_eq!(table.radius_for("NA"), Some(2.27));
    }

    #[test]
    fn non_alphabetic_symbol_warns_but_still_inserts() {
        let mut table = RadiusTable::new();
        let err = table.insert("1X", 1.5).unwrap_err();
        assert!(matches!(err, RadiusWarning::NonAlphabeticSymbol(_)));
        assert_eq!(table.radius_for("1x"), Some(1.5));
    }

    #[test]
    fn non_positive_radius_warns() {
        let mut table = RadiusTable::new();
        let err = table.insert("Xx", -1.0).unwrap_err();
        assert!(matches!(err, RadiusWarning::NonNumericRadius(_, _)));
    }

    #[test]
    fn missing_symbol_returns_none() {
        let table = RadiusTable::new();
        assert_eq!(table.radius_for("He"), None);
    }

    #[test]
    fn round_trips_through_json() {
        let mut table = RadiusTable::new();
        table.insert("C", 1.7).unwrap();
        table.insert("N", 1.55).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let restored: RadiusTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.radius_for("C"), Some(1.7));
        assert_eq!(restored.radius_for("N"), Some(1.55));
    }
}
