//! # Persisted Settings Contract
//!
//! The small set of options a host application persists between runs.
//! Storage is host-chosen; this module only defines the typed shape,
//! the recognised keys, and the integer encoding used by simple
//! key/value backends (the reference frequency is stored times ten,
//! rounded).

use serde::{Deserialize, Serialize};

use crate::A4_REFERENCE;

/// Recognised option keys, in the order hosts historically stored them.
pub const KEYS: [&str; 5] = ["Zoom", "Strobe", "Colours", "Filter", "Reference"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Zoom the spectrum display around the current note.
    #[serde(default = "Settings::default_zoom")]
    pub zoom: bool,
    /// Show the strobe display.
    #[serde(default)]
    pub strobe: bool,
    /// Strobe colour scheme index.
    #[serde(default)]
    pub colours: i32,
    /// Run the low-pass prefilter on input samples.
    #[serde(default)]
    pub filter: bool,
    /// Reference frequency for A4 in Hz.
    #[serde(default = "Settings::default_reference")]
    pub reference: f64,
}

impl Settings {
    fn default_zoom() -> bool {
        true
    }

    fn default_reference() -> f64 {
        A4_REFERENCE
    }

    /// Encodes the settings for an integer key/value store.
    pub fn to_pairs(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("Zoom", self.zoom as i64),
            ("Strobe", self.strobe as i64),
            ("Colours", self.colours as i64),
            ("Filter", self.filter as i64),
            ("Reference", (self.reference * 10.0).round() as i64),
        ]
    }

    /// Decodes settings from an integer key/value store. Unrecognised
    /// keys are ignored; missing keys keep their defaults.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let mut settings = Self::default();
        for (key, value) in pairs {
            match key {
                "Zoom" => settings.zoom = value != 0,
                "Strobe" => settings.strobe = value != 0,
                "Colours" => settings.colours = value as i32,
                "Filter" => settings.filter = value != 0,
                "Reference" => settings.reference = value as f64 / 10.0,
                _ => {}
            }
        }
        settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zoom: Self::default_zoom(),
            strobe: false,
            colours: 0,
            filter: false,
            reference: Self::default_reference(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_stored_times_ten() {
        let settings = Settings {
            reference: 442.5,
            ..Default::default()
        };
        let pairs = settings.to_pairs();
        assert!(pairs.contains(&("Reference", 4425)));

        let decoded = Settings::from_pairs(pairs);
        assert_eq!(decoded.reference, 442.5);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let settings = Settings::from_pairs([("Sparkle", 7), ("Filter", 1)]);
        assert!(settings.filter);
        assert_eq!(settings.reference, A4_REFERENCE);
    }

    #[test]
    fn all_recognised_keys_are_emitted() {
        let pairs = Settings::default().to_pairs();
        for key in KEYS {
            assert!(pairs.iter().any(|(k, _)| *k == key), "{key}");
        }
    }
}
