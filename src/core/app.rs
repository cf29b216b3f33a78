//! Run orchestration
//!
//! Wires one batch run together: load settings and catalog, scan the
//! outline directory, resolve the glyph plan, assemble the font, and
//! write the optional comparison page. All state lives in values
//! constructed here and dropped when the run ends.

use anyhow::{anyhow, bail, Result};
use tracing::info;

use crate::assembly::{self, FontAssembler};
use crate::core::cli::CliArgs;
use crate::core::settings::BuildSettings;
use crate::data::catalog::{Catalog, SpecialCases};
use crate::data::scan;
use crate::report::{self, ReportOptions};
use crate::resolver;

/// Execute the build described by the CLI arguments.
pub fn run(args: CliArgs) -> Result<()> {
    args.validate().map_err(|message| anyhow!(message))?;
    let settings = BuildSettings::load_or_default(args.settings.as_deref())?;
    settings.validate().map_err(|message| anyhow!(message))?;
    let catalog = Catalog::load(&args.data_csv)?;

    if !args.report_only {
        build_font(&args, &settings, &catalog)?;
    }

    if let Some(report_path) = &args.report {
        report::write(report_path, &catalog, &report_options(&args))?;
    }
    Ok(())
}

fn build_font(args: &CliArgs, settings: &BuildSettings, catalog: &Catalog) -> Result<()> {
    let Some(svg_dir) = &args.svg_dir else {
        bail!("an SVG directory is required to build a font");
    };
    let scan_result = scan::scan_directory(svg_dir)?;
    if scan_result.is_empty() {
        bail!(
            "no outline files found in {}; expected names like 1F600.svg",
            svg_dir.display()
        );
    }
    info!(
        "Found {} outline files ({} single codepoints, {} sequences)",
        scan_result.len(),
        scan_result.singles.len(),
        scan_result.combinations.len()
    );

    let special_cases = SpecialCases::load_or_builtin(settings.special_cases.as_deref())?;
    let plan = resolver::resolve(&scan_result, catalog, &special_cases, settings);
    info!(
        "Resolved {} glyphs and {} substitution rules",
        plan.glyphs().len(),
        plan.substitutions().len()
    );

    let mut assembler = FontAssembler::new(settings.clone(), args.placeholder_path().as_deref());
    assembler.realize_plan(&plan)?;
    assembler.normalize_metrics();
    assembler.add_space_glyph();
    assembler.register_substitution_feature("liga");

    let ufo_path = args.ufo_path();
    assembler.save(&ufo_path)?;
    if args.ufo_only {
        info!("Skipping fontc compilation (--ufo-only)");
        return Ok(());
    }
    assembly::compile_font(&ufo_path, &args.output)
}

fn report_options(args: &CliArgs) -> ReportOptions {
    // An explicit image folder is assumed to hold rasterized references
    // (the usual 72x72 PNG export); without one the page falls back to
    // showing the SVG inputs themselves.
    let (image_dir, image_ext) = match (&args.report_images, &args.svg_dir) {
        (Some(dir), _) => (dir.display().to_string(), "png"),
        (None, Some(dir)) => (dir.display().to_string(), "svg"),
        (None, None) => (ReportOptions::default().image_dir, "svg"),
    };
    let font_file = args
        .output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ReportOptions::default().font_file);
    ReportOptions {
        image_dir,
        image_ext: image_ext.to_string(),
        font_file,
    }
}
