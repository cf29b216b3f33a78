//! HTML comparison page generator
//!
//! Builds grouped tables for visual QA: each row shows an emoji's
//! reference image next to the same character rendered with the
//! generated font, so mismatched contours can be spotted by scrolling.
//! Plain string formatting; no resolution logic lives here.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::data::catalog::{Catalog, EmojiRow};

/// What the comparison page links against.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Directory of reference images, relative to the page location.
    pub image_dir: String,
    /// Extension of the reference images (`svg` or `png`).
    pub image_ext: String,
    /// Font file the rendered column loads, relative to the page location.
    pub font_file: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            image_dir: "svg".to_string(),
            image_ext: "svg".to_string(),
            font_file: "Monomoji.ttf".to_string(),
        }
    }
}

const TABLE_PREFIX: &str = "<table>\n<thead><tr><th></th><th>Image</th><th>Font</th></tr></thead>\n<tbody>\n";
const TABLE_SUFFIX: &str = "</tbody>\n</table>\n\n";

/// Render the full HTML page from the catalog rows, in file order.
/// Skin-tone variant rows are left out; in a monochrome font they all
/// render like their base.
pub fn generate(catalog: &Catalog, options: &ReportOptions) -> String {
    let mut body = String::new();
    let mut previous: Option<(&str, &str)> = None;

    for row in catalog.rows() {
        if row.is_skintone_variant() {
            continue;
        }
        let current = (row.group.as_str(), row.subgroups.as_str());
        if previous != Some(current) {
            if previous.is_some() {
                body.push_str(TABLE_SUFFIX);
            }
            if previous.map(|(group, _)| group) != Some(current.0) {
                body.push_str(&format!("<h2>{}</h2>\n", row.group));
            }
            body.push_str(&format!("<h3>{}</h3>\n", row.subgroups));
            body.push_str(TABLE_PREFIX);
            previous = Some(current);
        }
        body.push_str(&table_row(row, options));
    }
    if previous.is_some() {
        body.push_str(TABLE_SUFFIX);
    }

    format!(
        "<html><head>\n{}</head><body>\n<h1>Comparison of Rendered Glyphs</h1>\n\n{}</body></html>\n",
        style_block(options),
        body
    )
}

/// Write the page to disk.
pub fn write(path: &Path, catalog: &Catalog, options: &ReportOptions) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, generate(catalog, options))
        .with_context(|| format!("failed to write comparison page {}", path.display()))?;
    info!("Wrote comparison page to {}", path.display());
    Ok(())
}

fn table_row(row: &EmojiRow, options: &ReportOptions) -> String {
    let cell0 = format!(
        "{}<br><small>{}</small><br>{}",
        row.hexcode, row.annotation, row.emoji
    );
    let cell1 = format!(
        "<img src='{}/{}.{}'/>",
        options.image_dir, row.hexcode, options.image_ext
    );
    let cell2 = &row.emoji;
    format!("<tr><td>{cell0}</td><td>{cell1}</td><td>{cell2}</td></tr>\n")
}

fn style_block(options: &ReportOptions) -> String {
    format!(
        "<style>\n\
         table, th, td {{\n    border: 1px solid #ccc;\n}}\n\
         td {{\n    vertical-align: middle;\n    text-align: center;\n}}\n\
         img {{\n    width: 65px;\n}}\n\
         @font-face {{\n  font-family: 'Generated Emoji Font';\n  src: url({});\n}}\n\
         td:nth-child(3) {{\n  font-family: 'Generated Emoji Font';\n  font-size: 50px;\n  padding: 0px;\n}}\n\
         </style>\n",
        options.font_file
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hexcode: &str, group: &str, subgroup: &str) -> crate::data::catalog::EmojiRow {
        crate::data::catalog::EmojiRow {
            emoji: "x".to_string(),
            hexcode: hexcode.to_string(),
            group: group.to_string(),
            subgroups: subgroup.to_string(),
            annotation: format!("annotation for {hexcode}"),
            skintone: String::new(),
            skintone_base_emoji: String::new(),
            skintone_base_hexcode: String::new(),
        }
    }

    #[test]
    fn test_groups_become_headers_once() {
        let catalog = Catalog::from_rows(vec![
            row("1F600", "smileys-emotion", "face-smiling"),
            row("1F601", "smileys-emotion", "face-smiling"),
            row("1F44D", "people-body", "hand-fingers-closed"),
        ]);
        let page = generate(&catalog, &ReportOptions::default());

        assert_eq!(page.matches("<h2>smileys-emotion</h2>").count(), 1);
        assert_eq!(page.matches("<h2>people-body</h2>").count(), 1);
        assert_eq!(page.matches("<table>").count(), 2, "one table per subgroup");
    }

    #[test]
    fn test_subgroup_change_starts_new_table() {
        let catalog = Catalog::from_rows(vec![
            row("1F600", "smileys-emotion", "face-smiling"),
            row("1F62D", "smileys-emotion", "face-crying"),
        ]);
        let page = generate(&catalog, &ReportOptions::default());
        assert_eq!(page.matches("<h2>").count(), 1, "same group keeps one h2");
        assert_eq!(page.matches("<h3>").count(), 2);
    }

    #[test]
    fn test_skintone_variants_are_skipped() {
        let mut variant = row("1F44D-1F3FB", "people-body", "hand-fingers-closed");
        variant.skintone = "1".to_string();
        variant.skintone_base_emoji = "\u{1F44D}".to_string();
        let catalog = Catalog::from_rows(vec![
            row("1F44D", "people-body", "hand-fingers-closed"),
            variant,
        ]);
        let page = generate(&catalog, &ReportOptions::default());
        assert!(page.contains("1F44D<br>"));
        assert!(!page.contains("1F44D-1F3FB"));
    }

    #[test]
    fn test_font_and_images_are_referenced() {
        let catalog = Catalog::from_rows(vec![row("1F600", "g", "s")]);
        let options = ReportOptions {
            image_dir: "../png".to_string(),
            image_ext: "png".to_string(),
            font_file: "MyEmoji.ttf".to_string(),
        };
        let page = generate(&catalog, &options);
        assert!(page.contains("src: url(MyEmoji.ttf);"));
        assert!(page.contains("<img src='../png/1F600.png'/>"));
    }

    #[test]
    fn test_empty_catalog_yields_page_without_tables() {
        let page = generate(&Catalog::default(), &ReportOptions::default());
        assert!(page.contains("<h1>"));
        assert!(!page.contains("<table>"));
    }
}
