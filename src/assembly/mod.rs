//! Font-assembly driver
//!
//! `FontAssembler` is the build context for one run: it realizes glyph
//! records as outlines in font coordinates, collects substitution rules
//! into a ligature feature, applies the global metric normalization, and
//! writes the result as a UFO which `fontc` compiles into the final
//! font. It is constructed at the start of a run and discarded at the
//! end; there is no process-wide font state.
//!
//! Every glyph must be realized before a substitution rule referencing
//! it is registered. Rules that violate this are rejected rather than
//! silently dropped.

use anyhow::{anyhow, bail, Context, Result};
use kurbo::{Affine, BezPath, Shape};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::core::settings::BuildSettings;
use crate::outline;
use crate::resolver::{FontPlan, GlyphRecord, OutlineSource, SubstitutionRule};

/// A realized glyph: placed outline plus advance width.
#[derive(Debug, Clone)]
pub struct AssembledGlyph {
    pub name: String,
    pub encoding: Option<char>,
    pub outline: BezPath,
    pub width: f64,
}

/// The build context threaded through one font build.
pub struct FontAssembler {
    settings: BuildSettings,
    placement: Affine,
    placeholder: BezPath,
    glyphs: Vec<AssembledGlyph>,
    names: HashMap<String, usize>,
    rules: Vec<SubstitutionRule>,
    seen_rules: HashSet<SubstitutionRule>,
    features: String,
}

impl FontAssembler {
    /// Create the build context. The placeholder outline is imported
    /// once; when the file cannot be read a built-in rectangle stands in
    /// so structural glyphs still get geometry.
    pub fn new(settings: BuildSettings, placeholder_path: Option<&Path>) -> Self {
        let placement = outline::placement_transform(&settings);
        let placeholder = match placeholder_path {
            Some(path) => match outline::import_file(path) {
                Ok(outline) => outline,
                Err(error) => {
                    warn!(
                        "Could not import placeholder {}: {error:#}; using built-in geometry",
                        path.display()
                    );
                    outline::builtin_placeholder()
                }
            },
            None => outline::builtin_placeholder(),
        };
        Self {
            settings,
            placement,
            placeholder,
            glyphs: Vec::new(),
            names: HashMap::new(),
            rules: Vec::new(),
            seen_rules: HashSet::new(),
            features: String::new(),
        }
    }

    /// Realize one glyph record. An unreadable outline file degrades to
    /// an empty outline with a warning; a duplicate name is an error.
    pub fn register_glyph(&mut self, record: &GlyphRecord) -> Result<()> {
        if self.names.contains_key(&record.name) {
            bail!("glyph {} registered twice", record.name);
        }
        let raw = match &record.source {
            OutlineSource::File(path) => match outline::import_file(path) {
                Ok(outline) => outline,
                Err(error) => {
                    warn!("Importing {} failed: {error:#}; glyph gets an empty outline", record.name);
                    BezPath::new()
                }
            },
            OutlineSource::Placeholder => self.placeholder.clone(),
        };
        let placed = self.placement * raw;
        self.names.insert(record.name.clone(), self.glyphs.len());
        self.glyphs.push(AssembledGlyph {
            name: record.name.clone(),
            encoding: record.encoding,
            outline: placed,
            width: 0.0,
        });
        Ok(())
    }

    /// Register a substitution rule. Rules referencing unrealized glyphs
    /// are rejected; duplicates are no-ops.
    pub fn register_substitution(&mut self, rule: &SubstitutionRule) -> Result<()> {
        for component in &rule.components {
            if !self.names.contains_key(component) {
                bail!(
                    "substitution rule for {} references unrealized component {component}",
                    rule.target
                );
            }
        }
        if !self.names.contains_key(&rule.target) {
            bail!("substitution rule targets unrealized glyph {}", rule.target);
        }
        if self.seen_rules.insert(rule.clone()) {
            self.rules.push(rule.clone());
        }
        Ok(())
    }

    /// Realize a resolved plan: all glyphs first, then all rules. A rule
    /// the resolver got wrong is skipped with a warning rather than
    /// aborting the batch.
    pub fn realize_plan(&mut self, plan: &FontPlan) -> Result<()> {
        for record in plan.glyphs() {
            self.register_glyph(record)?;
        }
        for rule in plan.substitutions() {
            if let Err(error) = self.register_substitution(rule) {
                warn!("Skipping substitution rule: {error:#}");
            }
        }
        info!(
            "Realized {} glyphs and {} substitution rules",
            self.glyphs.len(),
            self.rules.len()
        );
        Ok(())
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn glyph(&self, name: &str) -> Option<&AssembledGlyph> {
        self.names.get(name).map(|&index| &self.glyphs[index])
    }

    /// Normalize advance widths and bearings across the font: widths
    /// from ink bounds plus separation, then the optional max-width
    /// clamp, then optional monospacing with centered bearings.
    pub fn normalize_metrics(&mut self) {
        self.auto_widths();

        if let Some(max_width) = self.settings.max_width {
            for glyph in &mut self.glyphs {
                if glyph.width > max_width {
                    let factor = max_width / glyph.width;
                    debug!("Scaling down wide glyph {} by {factor:.3}", glyph.name);
                    glyph.outline.apply_affine(Affine::scale(factor));
                }
            }
            self.auto_widths();
        }

        if let Some(monospace_width) = self.settings.monospace_width {
            for glyph in &mut self.glyphs {
                if glyph.outline.elements().is_empty() {
                    glyph.width = monospace_width;
                    continue;
                }
                let bounds = glyph.outline.bounding_box();
                let bearing = (monospace_width - bounds.width()) / 2.0;
                glyph
                    .outline
                    .apply_affine(Affine::translate((bearing - bounds.min_x(), 0.0)));
                glyph.width = monospace_width;
            }
        }
    }

    /// Set each width from its ink bounds and the configured separation,
    /// splitting the separation into equal side bearings.
    fn auto_widths(&mut self) {
        let separation = self.settings.separation;
        for glyph in &mut self.glyphs {
            if glyph.outline.elements().is_empty() {
                glyph.width = 0.0;
                continue;
            }
            let bounds = glyph.outline.bounding_box();
            glyph
                .outline
                .apply_affine(Affine::translate((separation / 2.0 - bounds.min_x(), 0.0)));
            glyph.width = bounds.width() + separation;
        }
    }

    /// Include a blank space character. A glyph without geometry needs
    /// its width set explicitly, so this runs after normalization.
    pub fn add_space_glyph(&mut self) {
        let Some(space_width) = self.settings.space_width else {
            return;
        };
        if self.names.contains_key("u0020") {
            debug!("Space glyph already present, keeping its outline");
            return;
        }
        self.names.insert("u0020".to_string(), self.glyphs.len());
        self.glyphs.push(AssembledGlyph {
            name: "u0020".to_string(),
            encoding: Some(' '),
            outline: BezPath::new(),
            width: space_width,
        });
    }

    /// Emit all collected substitution rules, exactly once, as the named
    /// OpenType feature of the font. The feature-file syntax is an
    /// implementation detail of this method.
    pub fn register_substitution_feature(&mut self, name: &str) {
        if self.rules.is_empty() {
            self.features = String::new();
            return;
        }
        let mut text = String::new();
        text.push_str("languagesystem DFLT dflt;\n\n");
        text.push_str(&format!("feature {name} {{\n"));
        for rule in &self.rules {
            text.push_str(&format!(
                "    sub {} by {};\n",
                rule.components.join(" "),
                rule.target
            ));
        }
        text.push_str(&format!("}} {name};\n"));
        self.features = text;
    }

    /// Build the in-memory UFO font from the assembled glyphs.
    pub fn build_font(&self) -> norad::Font {
        let mut font = norad::Font::new();
        font.font_info.family_name = Some(self.settings.family_name.clone());
        font.font_info.style_name = Some(self.settings.style_name.clone());
        font.font_info.copyright = self.settings.copyright.clone();
        font.font_info.ascender = Some(self.settings.ascent());
        font.font_info.descender = Some(self.settings.descent());
        font.font_info.cap_height = Some(self.settings.ascent());
        font.features = self.features.clone();

        let layer = font.default_layer_mut();
        for assembled in &self.glyphs {
            let mut glyph = norad::Glyph::new(&assembled.name);
            glyph.width = assembled.width;
            if let Some(codepoint) = assembled.encoding {
                glyph.codepoints.insert(codepoint);
            }
            glyph.contours = outline::bezpath_to_contours(&assembled.outline);
            layer.insert_glyph(glyph);
        }
        font
    }

    /// Write the UFO source to disk, replacing any previous build.
    pub fn save(&self, ufo_path: &Path) -> Result<()> {
        if ufo_path.exists() {
            std::fs::remove_dir_all(ufo_path)
                .with_context(|| format!("failed to clear previous UFO {}", ufo_path.display()))?;
        }
        let font = self.build_font();
        font.save(ufo_path)
            .with_context(|| format!("failed to write UFO {}", ufo_path.display()))?;
        info!("Wrote UFO source to {}", ufo_path.display());
        Ok(())
    }
}

/// Compile a UFO into the output font with the external `fontc` compiler.
pub fn compile_font(ufo_path: &Path, output_path: &Path) -> Result<()> {
    let mut cmd = Command::new("fontc");
    cmd.arg(ufo_path).arg("--output").arg(output_path);

    let output = cmd
        .output()
        .map_err(|error| anyhow!("failed to run fontc ({error}); is it installed?"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("fontc compilation failed: {stderr}");
    }
    info!("Generated font at {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn assembler() -> FontAssembler {
        FontAssembler::new(BuildSettings::default(), None)
    }

    fn placeholder_record(name: &str) -> GlyphRecord {
        GlyphRecord {
            name: name.to_string(),
            encoding: None,
            source: OutlineSource::Placeholder,
        }
    }

    #[test]
    fn test_rule_before_glyph_is_rejected() {
        let mut ctx = assembler();
        let rule = SubstitutionRule {
            components: vec!["u200D".into()],
            target: "u1F468".into(),
        };
        assert!(
            ctx.register_substitution(&rule).is_err(),
            "components must be realized before the rule"
        );

        ctx.register_glyph(&placeholder_record("u200D")).unwrap();
        ctx.register_glyph(&placeholder_record("u1F468")).unwrap();
        assert!(ctx.register_substitution(&rule).is_ok());
    }

    #[test]
    fn test_duplicate_glyph_is_rejected() {
        let mut ctx = assembler();
        ctx.register_glyph(&placeholder_record("u1F468")).unwrap();
        assert!(ctx.register_glyph(&placeholder_record("u1F468")).is_err());
    }

    #[test]
    fn test_duplicate_rule_is_noop() {
        let mut ctx = assembler();
        ctx.register_glyph(&placeholder_record("u200D")).unwrap();
        ctx.register_glyph(&placeholder_record("u1F468")).unwrap();
        let rule = SubstitutionRule {
            components: vec!["u1F468".into(), "u200D".into()],
            target: "u1F468".into(),
        };
        ctx.register_substitution(&rule).unwrap();
        ctx.register_substitution(&rule).unwrap();
        assert_eq!(ctx.rule_count(), 1);
    }

    #[test]
    fn test_unreadable_outline_degrades_to_empty_glyph() {
        let mut ctx = assembler();
        let record = GlyphRecord {
            name: "u1F600".to_string(),
            encoding: char::from_u32(0x1F600),
            source: OutlineSource::File(PathBuf::from("does/not/exist.svg")),
        };
        ctx.register_glyph(&record).unwrap();
        let glyph = ctx.glyph("u1F600").unwrap();
        assert!(glyph.outline.elements().is_empty());
    }

    #[test]
    fn test_monospace_normalization_centers_ink() {
        let mut ctx = assembler();
        ctx.register_glyph(&placeholder_record("u25A1")).unwrap();
        ctx.normalize_metrics();

        let glyph = ctx.glyph("u25A1").unwrap();
        assert_eq!(glyph.width, 1300.0);
        let bounds = glyph.outline.bounding_box();
        let left = bounds.min_x();
        let right = glyph.width - bounds.max_x();
        assert!(
            (left - right).abs() < 1e-6,
            "bearings should be equal, got {left} vs {right}"
        );
    }

    #[test]
    fn test_max_width_clamp_scales_wide_glyphs() {
        let mut settings = BuildSettings::default();
        settings.monospace_width = None;
        settings.max_width = Some(500.0);
        let mut ctx = FontAssembler::new(settings, None);
        ctx.register_glyph(&placeholder_record("u25A1")).unwrap();
        ctx.normalize_metrics();

        let glyph = ctx.glyph("u25A1").unwrap();
        assert!(
            glyph.width <= 500.0 + 1e-6,
            "clamped width, got {}",
            glyph.width
        );
        assert!(!glyph.outline.elements().is_empty());
    }

    #[test]
    fn test_space_glyph_added_with_width() {
        let mut ctx = assembler();
        ctx.normalize_metrics();
        ctx.add_space_glyph();
        let space = ctx.glyph("u0020").unwrap();
        assert_eq!(space.width, 1300.0);
        assert_eq!(space.encoding, Some(' '));
        assert!(space.outline.elements().is_empty());
    }

    #[test]
    fn test_feature_text_contains_rules_in_order() {
        let mut ctx = assembler();
        for name in ["u1F468", "u200D", "u1F9B3", "u1F468_u200D_u1F9B3"] {
            ctx.register_glyph(&placeholder_record(name)).unwrap();
        }
        ctx.register_substitution(&SubstitutionRule {
            components: vec!["u1F468".into(), "u200D".into(), "u1F9B3".into()],
            target: "u1F468_u200D_u1F9B3".into(),
        })
        .unwrap();
        ctx.register_substitution_feature("liga");

        let font = ctx.build_font();
        assert!(font.features.starts_with("languagesystem DFLT dflt;"));
        assert!(font.features.contains("feature liga {"));
        assert!(font
            .features
            .contains("sub u1F468 u200D u1F9B3 by u1F468_u200D_u1F9B3;"));
        assert!(font.features.trim_end().ends_with("} liga;"));
    }

    #[test]
    fn test_no_rules_means_no_feature_block() {
        let mut ctx = assembler();
        ctx.register_substitution_feature("liga");
        assert!(ctx.build_font().features.is_empty());
    }

    #[test]
    fn test_build_font_carries_encodings_and_metrics() {
        let mut ctx = assembler();
        ctx.register_glyph(&GlyphRecord {
            name: "u25A1".to_string(),
            encoding: char::from_u32(0x25A1),
            source: OutlineSource::Placeholder,
        })
        .unwrap();
        ctx.normalize_metrics();
        let font = ctx.build_font();

        assert_eq!(font.font_info.ascender, Some(1040.0));
        assert_eq!(font.font_info.descender, Some(-260.0));
        let layer = font.default_layer();
        let glyph = layer.get_glyph("u25A1").expect("glyph present");
        assert!(glyph.codepoints.iter().any(|c| c == '\u{25A1}'));
        assert_eq!(glyph.width, 1300.0);
        assert!(!glyph.contours.is_empty());
    }
}
