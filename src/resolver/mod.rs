//! Glyph-identity resolver
//!
//! Turns the raw scan results plus CSV metadata into the final glyph and
//! substitution table, as an ordered `FontPlan`. Glyph records always
//! precede the substitution rules that reference them; the assembly
//! driver relies on that order.
//!
//! Resolution never raises a hard failure on a missing mapping. Every
//! miss degrades to importing a standalone glyph and a diagnostic, so
//! one bad CSV row cannot abort the whole build.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::core::settings::BuildSettings;
use crate::data::catalog::{Catalog, SpecialCases};
use crate::data::scan::{scalar_value, CodepointSequence, ScanEntry, ScanResult, VARIATION_SELECTOR};

/// Where a glyph's outline comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineSource {
    /// An SVG file scanned from the input directory.
    File(PathBuf),
    /// The shared placeholder geometry, for codepoints that must exist
    /// structurally but have no outline file of their own.
    Placeholder,
}

/// A named glyph to be realized in the font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRecord {
    /// Deterministic name derived from the codepoint sequence.
    pub name: String,
    /// Direct Unicode encoding; `None` for ligature-only glyphs and for
    /// hex values that are not valid scalars.
    pub encoding: Option<char>,
    pub source: OutlineSource,
}

/// A ligature rule: a sequence of component glyph names realized as one
/// target glyph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubstitutionRule {
    pub components: Vec<String>,
    pub target: String,
}

/// The resolved glyph and substitution table, in registration order.
///
/// Glyphs are unique by name; rules are unique by content, and a
/// duplicate insertion is a harmless no-op.
#[derive(Debug, Clone, Default)]
pub struct FontPlan {
    glyphs: Vec<GlyphRecord>,
    substitutions: Vec<SubstitutionRule>,
    names: HashSet<String>,
    seen_rules: HashSet<SubstitutionRule>,
}

impl FontPlan {
    pub fn glyphs(&self) -> &[GlyphRecord] {
        &self.glyphs
    }

    pub fn substitutions(&self) -> &[SubstitutionRule] {
        &self.substitutions
    }

    pub fn has_glyph(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Register a glyph. A sequence never maps to more than one glyph,
    /// so a second record with the same name is rejected.
    fn add_glyph(&mut self, record: GlyphRecord) -> bool {
        if !self.names.insert(record.name.clone()) {
            warn!("Glyph {} already registered, skipping duplicate", record.name);
            return false;
        }
        self.glyphs.push(record);
        true
    }

    /// Register a substitution rule; duplicates are no-ops.
    fn add_rule(&mut self, rule: SubstitutionRule) {
        if rule.components.is_empty() {
            return;
        }
        if self.seen_rules.insert(rule.clone()) {
            self.substitutions.push(rule);
        }
    }
}

/// Resolve scanned outlines and CSV metadata into a `FontPlan`.
///
/// The result is deterministic for a given input set regardless of the
/// filesystem scan order.
pub fn resolve(
    scan: &ScanResult,
    catalog: &Catalog,
    special_cases: &SpecialCases,
    settings: &BuildSettings,
) -> FontPlan {
    let mut plan = FontPlan::default();

    // 1. One glyph per single-codepoint file, encoded at its scalar value.
    let mut singles: Vec<&ScanEntry> = scan.singles.iter().collect();
    singles.sort_by(|a, b| a.sequence.cmp(&b.sequence));
    for entry in &singles {
        let encoding = entry.sequence.single_scalar();
        if encoding.is_none() {
            warn!(
                "Codepoint {} is not a valid Unicode scalar, glyph gets no direct encoding",
                entry.sequence
            );
        }
        plan.add_glyph(GlyphRecord {
            name: entry.sequence.glyph_name(),
            encoding,
            source: OutlineSource::File(entry.path.clone()),
        });
    }

    // 2. Placeholder glyphs for codepoints that appear inside sequences
    // but lack their own outline file (ZWJ, FE0F, tone modifiers, ...).
    // Without a realized glyph per component, the ligature rules
    // referencing them would be dropped.
    let mut missing: BTreeSet<&str> = BTreeSet::new();
    for entry in &scan.combinations {
        for codepoint in entry.sequence.codepoints() {
            if !plan.has_glyph(&format!("u{codepoint}")) {
                missing.insert(codepoint.as_str());
            }
        }
    }
    for codepoint in missing {
        debug!("No outline for component {codepoint}, using placeholder geometry");
        plan.add_glyph(GlyphRecord {
            name: format!("u{codepoint}"),
            encoding: scalar_value(codepoint),
            source: OutlineSource::Placeholder,
        });
    }

    // 3. Partition the combination sequences.
    let mut combinations: Vec<&ScanEntry> = scan.combinations.iter().collect();
    combinations.sort_by(|a, b| a.sequence.cmp(&b.sequence));
    if !settings.include_country_flags {
        let before = combinations.len();
        combinations.retain(|entry| !catalog.is_country_flag(&entry.sequence));
        debug!("Excluded {} country-flag sequences", before - combinations.len());
    }
    let (skintone_variants, others): (Vec<&ScanEntry>, Vec<&ScanEntry>) =
        combinations.into_iter().partition(|entry| {
            catalog.is_skintone_variant(&entry.sequence) || entry.sequence.has_skin_tone()
        });

    // 4. Non-skintone combinations become ligature-only glyphs with their
    // own outlines.
    for entry in others {
        let name = entry.sequence.glyph_name();
        if !plan.add_glyph(GlyphRecord {
            name: name.clone(),
            encoding: None,
            source: OutlineSource::File(entry.path.clone()),
        }) {
            continue;
        }
        plan.add_rule(SubstitutionRule {
            components: entry.sequence.component_names(),
            target: name.clone(),
        });
        add_alternate_rule(&mut plan, &entry.sequence, &name, settings);
    }

    // 5. Skin-tone variants reference their base glyph instead of
    // importing redundant outlines.
    if settings.include_skintone_variants {
        for entry in skintone_variants {
            let target = resolve_skintone_base(&mut plan, entry, catalog, special_cases);
            plan.add_rule(SubstitutionRule {
                components: entry.sequence.component_names(),
                target: target.clone(),
            });
            add_alternate_rule(&mut plan, &entry.sequence, &target, settings);
        }
    } else {
        debug!(
            "Skin-tone variants disabled, leaving {} sequences unmapped",
            skintone_variants.len()
        );
    }

    // 6. Alternate hexcodes: when a row's literal emoji decomposes to a
    // different tuple than its hexcode column, the decomposition becomes
    // another route to the same glyph. This leans on the data encoding of
    // the metadata table (the literal is fully qualified while the
    // hexcode is abbreviated); if that ever changes the list may need to
    // be hardcoded instead.
    if settings.include_alternate_hexcodes {
        for row in catalog.rows() {
            let literal = CodepointSequence::from_literal(row.emoji.trim());
            if literal.is_empty() {
                continue;
            }
            let Some(canonical) = CodepointSequence::parse(&row.hexcode) else {
                warn!("CSV row with unparseable hexcode {:?}, skipping", row.hexcode);
                continue;
            };
            if literal == canonical {
                continue;
            }
            let target = canonical.glyph_name();
            if !plan.has_glyph(&target) {
                debug!(
                    "Alternate encoding {} targets unregistered glyph {}, skipping",
                    literal, target
                );
                continue;
            }
            // Components must be realized before the rule referencing them.
            for codepoint in literal.codepoints() {
                let component = format!("u{codepoint}");
                if !plan.has_glyph(&component) {
                    plan.add_glyph(GlyphRecord {
                        name: component,
                        encoding: scalar_value(codepoint),
                        source: OutlineSource::Placeholder,
                    });
                }
            }
            debug!("Adding alternate codepoint rule {} -> {}", literal, target);
            plan.add_rule(SubstitutionRule {
                components: literal.component_names(),
                target,
            });
        }
    }

    plan
}

/// Resolve the base glyph of a skin-toned sequence.
///
/// The chain: explicit CSV base, then the tone-stripped name, then the
/// special-case alias table. When nothing matches an existing glyph the
/// sequence falls back to importing its own outline, so resolution
/// always terminates with a usable target.
fn resolve_skintone_base(
    plan: &mut FontPlan,
    entry: &ScanEntry,
    catalog: &Catalog,
    special_cases: &SpecialCases,
) -> String {
    if let Some(base) = catalog.skintone_base(&entry.sequence) {
        let name = base.glyph_name();
        if plan.has_glyph(&name) {
            return name;
        }
        debug!(
            "CSV base {} for {} has no glyph, trying tone removal",
            base, entry.sequence
        );
    }

    let stripped = entry.sequence.strip_skin_tones();
    if !stripped.is_empty() && stripped != entry.sequence {
        let name = stripped.glyph_name();
        if plan.has_glyph(&name) {
            return name;
        }
    }

    if let Some(base) = special_cases.base_for(&stripped) {
        let name = base.glyph_name();
        if plan.has_glyph(&name) {
            return name;
        }
        debug!(
            "Special-case base {} for {} has no glyph either",
            base, entry.sequence
        );
    }

    // Last resort: a standalone glyph from the variant's own outline,
    // flagged for manual review.
    warn!(
        "No base glyph found for skin-tone sequence {}, importing its own outline",
        entry.sequence
    );
    let name = entry.sequence.glyph_name();
    plan.add_glyph(GlyphRecord {
        name: name.clone(),
        encoding: None,
        source: OutlineSource::File(entry.path.clone()),
    });
    name
}

/// Add a second rule omitting the FE0F presentation selector, so the
/// ligature fires whether or not the selector is present in input text.
fn add_alternate_rule(
    plan: &mut FontPlan,
    sequence: &CodepointSequence,
    target: &str,
    settings: &BuildSettings,
) {
    if !settings.include_alternate_hexcodes || sequence.len() <= 2 {
        return;
    }
    let without_selector = sequence.without(VARIATION_SELECTOR);
    if without_selector != *sequence && !without_selector.is_empty() {
        plan.add_rule(SubstitutionRule {
            components: without_selector.component_names(),
            target: target.to_string(),
        });
    }
}

/// Group substitution rules by target glyph (used by diagnostics and
/// tests; the assembler consumes the flat ordered list).
pub fn rules_by_target(plan: &FontPlan) -> HashMap<&str, Vec<&SubstitutionRule>> {
    let mut map: HashMap<&str, Vec<&SubstitutionRule>> = HashMap::new();
    for rule in plan.substitutions() {
        map.entry(rule.target.as_str()).or_default().push(rule);
    }
    map
}
