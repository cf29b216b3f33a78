//! Codepoint-sequence scanner
//!
//! Lists the SVG input directory and parses filenames into ordered
//! codepoint tuples. `1F94B.svg` is a single character, while
//! `1F468-200D-1F9B3.svg` is a sequence realized as a ligature.
//! Filenames that do not match the pattern are skipped.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The five Unicode skin-tone modifier codepoints (Fitzpatrick types 1-2 to 6).
pub const SKIN_TONE_MODIFIERS: [&str; 5] = ["1F3FB", "1F3FC", "1F3FD", "1F3FE", "1F3FF"];

/// The emoji presentation selector.
pub const VARIATION_SELECTOR: &str = "FE0F";

/// An ordered tuple of hexadecimal codepoint strings identifying one glyph
/// or ligature target. Equality and lookup are by exact tuple value; the
/// hex digits are normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodepointSequence(Vec<String>);

impl CodepointSequence {
    /// Parse a hyphen-separated hex string (a filename stem or a CSV
    /// hexcode cell). Returns `None` when any part is not hexadecimal
    /// or the string is empty.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let mut parts = Vec::new();
        for part in text.split('-') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            parts.push(part.to_ascii_uppercase());
        }
        Some(Self(parts))
    }

    /// Build a sequence from the scalar values of a literal emoji string.
    /// Codepoints are zero-padded to four hex digits, matching the
    /// encoding used by filenames and the CSV hexcode column.
    pub fn from_literal(text: &str) -> Self {
        Self(text.chars().map(|c| format!("{:04X}", c as u32)).collect())
    }

    pub fn codepoints(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single codepoint of a one-element sequence.
    pub fn single(&self) -> Option<&str> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// The deterministic glyph name for this sequence: `u<HEX>` per
    /// codepoint, joined with underscores (e.g. `u1F468_u200D_u1F9B3`).
    pub fn glyph_name(&self) -> String {
        self.component_names().join("_")
    }

    /// Per-codepoint glyph names, in sequence order.
    pub fn component_names(&self) -> Vec<String> {
        self.0.iter().map(|cp| format!("u{cp}")).collect()
    }

    /// A copy of this sequence without any occurrence of `codepoint`.
    pub fn without(&self, codepoint: &str) -> Self {
        Self(self.0.iter().filter(|cp| *cp != codepoint).cloned().collect())
    }

    /// A copy of this sequence without any skin-tone modifier codepoints.
    pub fn strip_skin_tones(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|cp| !SKIN_TONE_MODIFIERS.contains(&cp.as_str()))
                .cloned()
                .collect(),
        )
    }

    /// Whether any codepoint of this sequence is a skin-tone modifier.
    pub fn has_skin_tone(&self) -> bool {
        self.0
            .iter()
            .any(|cp| SKIN_TONE_MODIFIERS.contains(&cp.as_str()))
    }

    /// The Unicode scalar value of a one-element sequence, when the hex
    /// value is a valid scalar.
    pub fn single_scalar(&self) -> Option<char> {
        scalar_value(self.single()?)
    }
}

impl fmt::Display for CodepointSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("-"))
    }
}

/// The Unicode scalar for one hex codepoint string, when valid.
pub fn scalar_value(codepoint: &str) -> Option<char> {
    u32::from_str_radix(codepoint, 16).ok().and_then(char::from_u32)
}

/// One outline file paired with the sequence parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub sequence: CodepointSequence,
    pub path: PathBuf,
}

/// Scan output, partitioned into single- and multi-codepoint groups.
///
/// The order of entries follows directory iteration and is not stable;
/// downstream consumers must not depend on it for correctness.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub singles: Vec<ScanEntry>,
    pub combinations: Vec<ScanEntry>,
}

impl ScanResult {
    /// Total number of recognized outline files.
    pub fn len(&self) -> usize {
        self.singles.len() + self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.combinations.is_empty()
    }
}

/// List the input directory and parse every `*.svg` filename into a
/// codepoint sequence. Non-matching filenames are skipped.
pub fn scan_directory(dir: &Path) -> Result<ScanResult> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list SVG directory {}", dir.display()))?;

    let mut result = ScanResult::default();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("svg") {
            continue;
        }
        let stem = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => stem,
            None => continue,
        };
        match CodepointSequence::parse(stem) {
            Some(sequence) if sequence.len() == 1 => {
                result.singles.push(ScanEntry { sequence, path });
            }
            Some(sequence) => {
                result.combinations.push(ScanEntry { sequence, path });
            }
            None => {
                debug!("Skipping non-codepoint filename {:?}", path.file_name());
            }
        }
    }
    Ok(result)
}
