//! CSV metadata catalog
//!
//! The CSV drives everything the filenames alone cannot express: which
//! sequences are skin-tone variants and of which base, which sequences
//! are country flags, and which emoji have an alternate encoding that
//! differs from their canonical hexcode. The input corpus is
//! community-maintained, so individual bad rows are skipped with a
//! diagnostic rather than failing the build.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use crate::data::scan::CodepointSequence;

/// One row of the metadata table. Extra columns in the file are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EmojiRow {
    pub emoji: String,
    pub hexcode: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub subgroups: String,
    #[serde(default)]
    pub annotation: String,
    #[serde(default)]
    pub skintone: String,
    #[serde(default)]
    pub skintone_base_emoji: String,
    #[serde(default)]
    pub skintone_base_hexcode: String,
}

impl EmojiRow {
    /// Whether this row describes a skin-toned variant of another glyph.
    pub fn is_skintone_variant(&self) -> bool {
        !self.skintone.is_empty() || !self.skintone_base_emoji.is_empty()
    }
}

/// The parsed metadata table plus its derived lookup structures.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rows: Vec<EmojiRow>,
    skintone_bases: HashMap<CodepointSequence, CodepointSequence>,
    flags: HashSet<CodepointSequence>,
}

impl Catalog {
    /// Read the CSV table from disk. Rows that fail to deserialize are
    /// skipped with a warning; a missing or unreadable file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open CSV metadata table {}", path.display()))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<EmojiRow>() {
            match record {
                Ok(row) => rows.push(row),
                Err(error) => warn!("Skipping malformed CSV row: {error}"),
            }
        }
        debug!("Loaded {} CSV rows from {:?}", rows.len(), path);
        Ok(Self::from_rows(rows))
    }

    /// Build the catalog from already-parsed rows (used by tests).
    pub fn from_rows(rows: Vec<EmojiRow>) -> Self {
        let mut skintone_bases = HashMap::new();
        let mut flags = HashSet::new();
        for row in &rows {
            if row.is_skintone_variant() {
                let variant = CodepointSequence::parse(&row.hexcode);
                let base = CodepointSequence::parse(&row.skintone_base_hexcode);
                match (variant, base) {
                    (Some(variant), Some(base)) => {
                        skintone_bases.insert(variant, base);
                    }
                    _ => warn!(
                        "Skin-tone row {} has an unparseable hexcode or base, ignoring",
                        row.hexcode
                    ),
                }
            }
            // 'subdivision-flag' might also reasonably be excluded here,
            // but those sequences use tag characters that rarely have
            // outlines of their own.
            if row.subgroups == "country-flag" {
                if let Some(sequence) = CodepointSequence::parse(&row.hexcode) {
                    flags.insert(sequence);
                }
            }
        }
        Self {
            rows,
            skintone_bases,
            flags,
        }
    }

    /// All rows, in file order (the comparison page preserves this order).
    pub fn rows(&self) -> &[EmojiRow] {
        &self.rows
    }

    /// The base sequence the CSV assigns to a skin-toned sequence.
    pub fn skintone_base(&self, sequence: &CodepointSequence) -> Option<&CodepointSequence> {
        self.skintone_bases.get(sequence)
    }

    /// Whether the CSV lists this sequence as a skin-tone variant.
    pub fn is_skintone_variant(&self, sequence: &CodepointSequence) -> bool {
        self.skintone_bases.contains_key(sequence)
    }

    /// Whether the CSV flags this sequence as a country flag.
    pub fn is_country_flag(&self, sequence: &CodepointSequence) -> bool {
        self.flags.contains(sequence)
    }
}

/// Aliases for skin-toned sequences whose base glyph cannot be derived by
/// removing the tone codepoints, keyed by the *stripped* sequence.
///
/// The built-in table covers the sequences where the base form uses
/// entirely different codepoints: the holding-hands pairs and the
/// handshake. New irregularities can be supplied from a JSON file
/// (a flat map of hexcode sequence to hexcode sequence) without a code
/// change.
#[derive(Debug, Clone, Default)]
pub struct SpecialCases {
    aliases: HashMap<CodepointSequence, CodepointSequence>,
}

impl SpecialCases {
    /// The built-in alias table.
    pub fn builtin() -> Self {
        let pairs = [
            ("1F468-200D-1F91D-200D-1F468", "1F46C"),
            ("1F469-200D-1F91D-200D-1F468", "1F46B"),
            ("1F469-200D-1F91D-200D-1F469", "1F46D"),
            ("1FAF1-200D-1FAF2", "1F91D"),
        ];
        let aliases = pairs
            .iter()
            .map(|(stripped, base)| {
                (
                    CodepointSequence::parse(stripped).expect("builtin alias key"),
                    CodepointSequence::parse(base).expect("builtin alias value"),
                )
            })
            .collect();
        Self { aliases }
    }

    /// Load an alias table from a JSON map, or fall back to the built-in
    /// table when no file is given. Unparseable entries are skipped with
    /// a warning.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::builtin());
        };
        let contents = fs_read(path)?;
        let raw: HashMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse special cases file {}", path.display()))?;
        let mut aliases = HashMap::new();
        for (stripped, base) in raw {
            match (
                CodepointSequence::parse(&stripped),
                CodepointSequence::parse(&base),
            ) {
                (Some(stripped), Some(base)) => {
                    aliases.insert(stripped, base);
                }
                _ => warn!("Skipping unparseable special case {stripped} -> {base}"),
            }
        }
        debug!("Loaded {} special-case aliases from {:?}", aliases.len(), path);
        Ok(Self { aliases })
    }

    /// The aliased base sequence for a tone-stripped sequence, if any.
    pub fn base_for(&self, stripped: &CodepointSequence) -> Option<&CodepointSequence> {
        self.aliases.get(stripped)
    }
}

fn fs_read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read special cases file {}", path.display()))
}
