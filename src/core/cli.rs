//! Command line interface for the Monomoji font assembler
//!
//! Handles parsing command line arguments and provides
//! validation for user inputs. Options are documented with
//! examples to help users understand the expected format.

use clap::Parser;
use std::path::PathBuf;

/// Monomoji CLI arguments
///
/// Examples:
///   monomoji -i black/svg -d data/openmoji.csv          # Build with defaults
///   monomoji -i svg -d data.csv -o MyEmoji.ttf          # Name the output font
///   monomoji -i svg -d data.csv --settings build.json   # Load build settings
///   monomoji -i svg -d data.csv --report compare.html   # Also write a QA page
///   monomoji -d data.csv --report compare.html --report-only
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "monomoji",
    version,
    about = "Assembles monochrome emoji fonts from per-codepoint SVG outlines",
    long_about = "Monomoji builds a monochrome emoji font from a directory of SVG outlines named by codepoint sequence (e.g. 1F468-200D-1F9B3.svg) and a CSV metadata table. Multi-codepoint sequences become OpenType ligatures; skin-tone variants collapse onto their base glyph. The font is assembled as a UFO and compiled with fontc."
)]
pub struct CliArgs {
    /// Directory of SVG outline files named by codepoint sequence
    ///
    /// Each file must be named `<HEX>.svg` or `<HEX>-<HEX>-....svg`,
    /// e.g. `1F94B.svg` or `1F468-200D-1F9B3.svg`. Files that do not
    /// match the pattern are skipped.
    #[clap(
        long = "svg-dir",
        short = 'i',
        help = "Directory of SVG outlines named by codepoint sequence",
        long_help = "Directory of SVG outline files named by hyphen-separated hexadecimal codepoint sequence, e.g. 1F94B.svg or 1F468-200D-1F9B3.svg. Filenames that do not match the pattern are skipped. Required unless --report-only is given."
    )]
    pub svg_dir: Option<PathBuf>,

    /// CSV metadata table (hexcode, emoji, group, subgroups, skintone columns)
    #[clap(
        long = "data",
        short = 'd',
        help = "CSV metadata table",
        long_help = "CSV metadata table with at least the columns: hexcode, emoji, annotation, group, subgroups, skintone, skintone_base_hexcode, skintone_base_emoji. Used to associate skin-tone variants with their base glyph, to identify country flags, and to derive alternate-hexcode ligatures."
    )]
    pub data_csv: PathBuf,

    /// Output font file path
    ///
    /// The UFO source is written next to it with a .ufo extension.
    #[clap(
        long = "output",
        short = 'o',
        default_value = "Monomoji.ttf",
        help = "Output font file path"
    )]
    pub output: PathBuf,

    /// Build settings JSON file
    ///
    /// Values not present in the file keep their built-in defaults.
    #[clap(
        long = "settings",
        short = 's',
        help = "Build settings JSON file",
        long_help = "Path to a JSON file with build settings (glyph height, monospace width, feature toggles, naming, ...). Values not present in the file keep their built-in defaults. See BuildSettings for the recognized keys."
    )]
    pub settings: Option<PathBuf>,

    /// Placeholder outline for codepoints that lack their own SVG
    ///
    /// Defaults to `<svg-dir>/25A1.svg` (white square). A built-in
    /// rectangle is used when the file cannot be read.
    #[clap(
        long = "placeholder",
        help = "Placeholder SVG for codepoints without their own outline"
    )]
    pub placeholder: Option<PathBuf>,

    /// Write an HTML comparison page for visual QA
    #[clap(
        long = "report",
        help = "Write an HTML comparison page to this path",
        long_help = "Write an HTML page to this path comparing reference images against the generated font, grouped by the CSV's group and subgroup columns. Useful for scrolling past glyphs looking for mismatches."
    )]
    pub report: Option<PathBuf>,

    /// Directory of reference images for the comparison page
    ///
    /// Defaults to the SVG input directory.
    #[clap(
        long = "report-images",
        help = "Directory of reference images for the comparison page"
    )]
    pub report_images: Option<PathBuf>,

    /// Only write the HTML comparison page, skip the font build
    #[clap(
        long = "report-only",
        help = "Only write the HTML comparison page, skip the font build",
        requires = "report"
    )]
    pub report_only: bool,

    /// Stop after writing the UFO, do not invoke fontc
    #[clap(
        long = "ufo-only",
        help = "Stop after writing the UFO, do not invoke fontc",
        long_help = "Stop after writing the UFO source next to the output path. Useful when fontc is not installed or when the UFO is the artifact you want to inspect."
    )]
    pub ufo_only: bool,
}

impl CliArgs {
    /// Validate the CLI arguments after parsing
    ///
    /// This ensures that all input paths exist before the build starts,
    /// providing clear error messages for common mistakes.
    pub fn validate(&self) -> Result<(), String> {
        if !self.report_only {
            match &self.svg_dir {
                None => {
                    return Err(
                        "No SVG directory given.\nPass --svg-dir (or use --report-only to skip the font build).".to_string(),
                    );
                }
                Some(dir) => {
                    if !dir.is_dir() {
                        return Err(format!(
                            "SVG directory does not exist: {}\nMake sure the path is correct and is a directory.",
                            dir.display()
                        ));
                    }
                }
            }
        }

        if !self.data_csv.is_file() {
            return Err(format!(
                "CSV metadata table does not exist: {}\nMake sure the path is correct and the file exists.",
                self.data_csv.display()
            ));
        }

        if let Some(path) = &self.settings {
            if !path.is_file() {
                return Err(format!(
                    "Settings file does not exist: {}",
                    path.display()
                ));
            }
        }

        if let Some(path) = &self.placeholder {
            if !path.is_file() {
                return Err(format!(
                    "Placeholder SVG does not exist: {}",
                    path.display()
                ));
            }
        }

        Ok(())
    }

    /// The placeholder SVG path: explicit flag, or `25A1.svg` in the input directory.
    pub fn placeholder_path(&self) -> Option<PathBuf> {
        self.placeholder
            .clone()
            .or_else(|| self.svg_dir.as_ref().map(|dir| dir.join("25A1.svg")))
    }

    /// The UFO source path derived from the output font path.
    pub fn ufo_path(&self) -> PathBuf {
        self.output.with_extension("ufo")
    }
}

/// Parse command line arguments.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Report a fatal error to stderr and exit with code 1.
pub fn handle_error(error: anyhow::Error) {
    eprintln!();
    eprintln!("Error building font:");
    eprintln!("{error:#}");
    eprintln!();
    eprintln!("Try running with --help for usage information.");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_svg_dir_is_rejected() {
        let args = CliArgs::parse_from(["monomoji", "--data", "nonexistent.csv"]);
        let error = args.validate().unwrap_err();
        assert!(
            error.contains("No SVG directory"),
            "Should explain that --svg-dir is required: {error}"
        );
    }

    #[test]
    fn test_placeholder_defaults_into_svg_dir() {
        let args = CliArgs::parse_from([
            "monomoji",
            "--svg-dir",
            "svg",
            "--data",
            "data.csv",
        ]);
        assert_eq!(
            args.placeholder_path().unwrap(),
            PathBuf::from("svg").join("25A1.svg")
        );
    }

    #[test]
    fn test_ufo_path_swaps_extension() {
        let args = CliArgs::parse_from([
            "monomoji",
            "--svg-dir",
            "svg",
            "--data",
            "data.csv",
            "--output",
            "out/Emoji.ttf",
        ]);
        assert_eq!(args.ufo_path(), PathBuf::from("out/Emoji.ufo"));
    }
}
