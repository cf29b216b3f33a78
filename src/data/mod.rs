//! Input data handling
//!
//! This module reads the two static inputs of a build:
//! - the directory of SVG outlines named by codepoint sequence
//! - the CSV metadata table (skin tones, flags, alternate hexcodes)

pub mod catalog;
pub mod scan;

// Simple, clear re-exports
pub use catalog::{Catalog, EmojiRow, SpecialCases};
pub use scan::{scan_directory, CodepointSequence, ScanEntry, ScanResult};
