//! # Custom Tuning Records
//!
//! Schema and validation for user-defined tunings, one JSON file per
//! tuning. This module owns the record shape, the validation rules, and
//! the filesystem-safe slug derived from the tuning name; reading and
//! writing the actual files is the host application's job.

use serde::{Deserialize, Serialize};

use crate::error::TunerError;
use crate::temperament::Temperament;

/// One custom tuning as stored on disk. Fields may appear in any order
/// in the file; `description` is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTuning {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub ratios: Vec<f64>,
}

impl CustomTuning {
    /// Parses and validates a tuning record from JSON text.
    pub fn from_json(text: &str) -> Result<Self, TunerError> {
        let tuning: CustomTuning = serde_json::from_str(text)
            .map_err(|e| TunerError::InvalidTuning(e.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serializes the record to the documented JSON shape.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("tuning record serializes")
    }

    /// Checks the record against the schema rules: a non-empty name and
    /// exactly twelve positive, finite ratios.
    pub fn validate(&self) -> Result<(), TunerError> {
        if self.name.is_empty() {
            return Err(TunerError::InvalidTuning("missing name field".into()));
        }
        if self.ratios.len() != 12 {
            return Err(TunerError::InvalidTuning(format!(
                "ratios array must contain exactly 12 entries, got {}",
                self.ratios.len()
            )));
        }
        for (i, ratio) in self.ratios.iter().enumerate() {
            if !ratio.is_finite() || *ratio <= 0.0 {
                return Err(TunerError::InvalidTuning(format!(
                    "ratio {i} must be positive and finite, got {ratio}"
                )));
            }
        }
        Ok(())
    }

    /// Filesystem-safe slug for this tuning's file name: lowercase
    /// alphanumerics with everything else collapsed to single
    /// underscores, trailing underscores trimmed.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());

        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('_') {
                slug.push('_');
            }
        }

        while slug.ends_with('_') {
            slug.pop();
        }

        if slug.is_empty() {
            slug = "custom_tuning".into();
        }
        slug
    }

    /// File name the record should be stored under.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.slug())
    }

    /// Converts a validated record into a registry entry.
    pub fn into_temperament(self) -> Result<Temperament, TunerError> {
        self.validate()?;
        let mut ratios = [0.0; 12];
        ratios.copy_from_slice(&self.ratios);
        Ok(Temperament::custom(self.name, self.description, ratios))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_ratios() -> Vec<f64> {
        vec![
            1.0, 1.053497942, 1.118033989, 1.185185185, 1.25, 1.333333333, 1.40625, 1.495348781,
            1.580246914, 1.671850762, 1.777777778, 1.875,
        ]
    }

    #[test]
    fn parses_fields_in_any_order() {
        let text = r#"{
            "ratios": [1.0, 1.05, 1.12, 1.19, 1.26, 1.33, 1.41, 1.50, 1.59, 1.68, 1.78, 1.89],
            "name": "Kirnberger III",
            "description": "well temperament"
        }"#;
        let tuning = CustomTuning::from_json(text).unwrap();
        assert_eq!(tuning.name, "Kirnberger III");
        assert_eq!(tuning.ratios.len(), 12);
    }

    #[test]
    fn description_is_optional() {
        let text = r#"{"name": "Bare", "ratios": [1.0, 1.05, 1.12, 1.19, 1.26, 1.33, 1.41, 1.50, 1.59, 1.68, 1.78, 1.89]}"#;
        let tuning = CustomTuning::from_json(text).unwrap();
        assert!(tuning.description.is_empty());
    }

    #[test]
    fn missing_ratios_is_an_error() {
        let err = CustomTuning::from_json(r#"{"name": "x"}"#).unwrap_err();
        assert!(matches!(err, TunerError::InvalidTuning(_)));
    }

    #[test]
    fn wrong_ratio_count_is_an_error() {
        let tuning = CustomTuning {
            name: "short".into(),
            description: String::new(),
            ratios: vec![1.0; 11],
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn nonpositive_ratio_is_an_error() {
        let mut ratios = valid_ratios();
        ratios[3] = 0.0;
        let tuning = CustomTuning {
            name: "bad".into(),
            description: String::new(),
            ratios,
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn empty_name_is_an_error() {
        let tuning = CustomTuning {
            name: String::new(),
            description: String::new(),
            ratios: valid_ratios(),
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn slugs_collapse_and_trim() {
        let named = |name: &str| CustomTuning {
            name: name.into(),
            description: String::new(),
            ratios: valid_ratios(),
        };

        assert_eq!(named("Kirnberger III").slug(), "kirnberger_iii");
        assert_eq!(named("My  Shop - Piano!").slug(), "my_shop_piano");
        assert_eq!(named("Meantone 1/4").slug(), "meantone_1_4");
        assert_eq!(named("***").slug(), "custom_tuning");
        assert_eq!(named("Bare").file_name(), "bare.json");
    }

    #[test]
    fn round_trips_through_json() {
        let tuning = CustomTuning {
            name: "Round trip".into(),
            description: "stable".into(),
            ratios: valid_ratios(),
        };
        let parsed = CustomTuning::from_json(&tuning.to_json()).unwrap();
        assert_eq!(parsed, tuning);
    }

    #[test]
    fn converts_to_a_registry_entry() {
        let tuning = CustomTuning {
            name: "House reeds".into(),
            description: String::new(),
            ratios: valid_ratios(),
        };
        let temperament = tuning.into_temperament().unwrap();
        assert!(temperament.is_custom);
        assert_eq!(temperament.ratios[0], 1.0);
    }
}
