//! Build settings and their JSON config file
//!
//! The numeric parameters control how imported outlines are scaled and
//! spaced; the toggles control which sequence families are included in
//! the substitution table. Settings load from a JSON file and fall back
//! to built-in defaults for any missing key.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parameters of one font build.
///
/// The defaults reproduce a 72-unit SVG viewbox scaled onto 1300 font
/// units with 80% of the glyph above the baseline, monospaced at one
/// glyph height.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Font family name written into the UFO.
    pub family_name: String,
    /// Style name written into the UFO.
    pub style_name: String,
    /// Copyright notice written into the UFO, if any.
    pub copyright: Option<String>,

    /// Height of the source SVG viewbox, in SVG units.
    pub svg_height: f64,
    /// Height of an imported glyph, in font units.
    pub glyph_height: f64,
    /// Portion of the glyph height placed above the baseline.
    pub portion_above_baseline: f64,
    /// Spacing between characters, in font units. Made redundant by
    /// `monospace_width` when that is set.
    pub separation: f64,
    /// When set, all characters get this fixed advance width.
    pub monospace_width: Option<f64>,
    /// When set, characters wider than this are scaled down. Leaving it
    /// unset while `monospace_width` is set may put contours outside
    /// their bounding box.
    pub max_width: Option<f64>,
    /// When set, a blank space character of this width is included.
    pub space_width: Option<f64>,

    /// Add ligatures for alternate hexcodes, so sequences fire whether or
    /// not the presentation selector is present in input text.
    pub include_alternate_hexcodes: bool,
    /// Collapse skin-tone variants onto their base glyph. When false the
    /// variants render as sequences of glyphs.
    pub include_skintone_variants: bool,
    /// Include country flags. In a monochrome font they are just blank
    /// rectangles, so the default leaves them out.
    pub include_country_flags: bool,

    /// JSON file overriding the built-in skin-tone special-case aliases.
    pub special_cases: Option<PathBuf>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        let glyph_height = 1300.0;
        Self {
            family_name: "Monomoji".to_string(),
            style_name: "Regular".to_string(),
            copyright: None,
            svg_height: 72.0,
            glyph_height,
            portion_above_baseline: 0.8,
            separation: 0.0,
            monospace_width: Some(glyph_height),
            max_width: Some(glyph_height),
            space_width: Some(glyph_height),
            include_alternate_hexcodes: true,
            include_skintone_variants: true,
            include_country_flags: false,
            special_cases: None,
        }
    }
}

impl BuildSettings {
    /// Load settings from a JSON file, or use defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings file {}", path.display()))?;
                let settings: Self = serde_json::from_str(&contents)
                    .with_context(|| format!("failed to parse settings file {}", path.display()))?;
                debug!("Loaded build settings from {:?}", path);
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }

    /// Save settings to a JSON file (handy for seeding a config to edit).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        debug!("Saved build settings to {:?}", path);
        Ok(())
    }

    /// Check that the numeric parameters describe a usable scale.
    pub fn validate(&self) -> Result<(), String> {
        if self.svg_height <= 0.0 {
            return Err(format!(
                "svg_height must be positive, got {}",
                self.svg_height
            ));
        }
        if self.glyph_height <= 0.0 {
            return Err(format!(
                "glyph_height must be positive, got {}",
                self.glyph_height
            ));
        }
        if !(0.0..=1.0).contains(&self.portion_above_baseline) {
            return Err(format!(
                "portion_above_baseline must be between 0 and 1, got {}",
                self.portion_above_baseline
            ));
        }
        for (name, value) in [
            ("monospace_width", self.monospace_width),
            ("max_width", self.max_width),
            ("space_width", self.space_width),
        ] {
            if let Some(value) = value {
                if value <= 0.0 {
                    return Err(format!("{name} must be positive when set, got {value}"));
                }
            }
        }
        Ok(())
    }

    /// Uniform scale factor from SVG units to font units.
    pub fn scale_factor(&self) -> f64 {
        self.glyph_height / self.svg_height
    }

    /// Font units above the baseline (the imported glyph's top edge).
    pub fn ascent(&self) -> f64 {
        self.portion_above_baseline * self.glyph_height
    }

    /// Font units below the baseline, as a negative descender value.
    pub fn descent(&self) -> f64 {
        -(self.glyph_height - self.ascent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = BuildSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.scale_factor(), 1300.0 / 72.0);
        assert_eq!(settings.ascent(), 1040.0);
        assert_eq!(settings.descent(), -260.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: BuildSettings =
            serde_json::from_str(r#"{"glyph_height": 1000.0, "include_country_flags": true}"#)
                .unwrap();
        assert_eq!(settings.glyph_height, 1000.0);
        assert!(settings.include_country_flags);
        // Untouched keys keep the built-in defaults
        assert_eq!(settings.svg_height, 72.0);
        assert!(settings.include_skintone_variants);
    }

    #[test]
    fn test_bad_scale_is_rejected() {
        let settings = BuildSettings {
            svg_height: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = BuildSettings {
            portion_above_baseline: 1.5,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");
        let mut settings = BuildSettings::default();
        settings.family_name = "Test Emoji".to_string();
        settings.monospace_width = None;
        settings.save(&path).unwrap();

        let loaded = BuildSettings::load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded.family_name, "Test Emoji");
        assert_eq!(loaded.monospace_width, None);
    }
}
