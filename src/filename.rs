//! Filename Grammar - Processed File Names
//!
//! ```text
//! filename := date "_" time "_" origin ["-HDR"] ["-Pano"] ["-Edit"] "." extension
//! date     := 8 digits
//! time     := 6 digits
//! extension := "dng" | "tif"
//! ```
//!
//! A name is only valid when its origin is recognized by the
//! [`PatternRegistry`]. Syntax without provenance is not a processed file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::patterns::{PatternRegistry, RawExtension};

const HDR_SUFFIX: &str = "-HDR";
const PANO_SUFFIX: &str = "-Pano";
const EDIT_SUFFIX: &str = "-Edit";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedExtension {
    Dng,
    Tif,
}

impl ProcessedExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedExtension::Dng => "dng",
            ProcessedExtension::Tif => "tif",
        }
    }

    fn from_text(text: &str) -> Option<Self> {
        match text {
            "dng" => Some(ProcessedExtension::Dng),
            "tif" => Some(ProcessedExtension::Tif),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedFilename {
    /// Capture date digits, verbatim
    pub date: String,
    /// Capture time digits, verbatim
    pub time: String,
    pub original_base_name: String,
    pub raw_extension: RawExtension,
    pub is_merged_hdr: bool,
    pub is_merged_panorama: bool,
    pub is_edit: bool,
    pub extension: ProcessedExtension,
}

impl ParsedFilename {
    /// Name the raw original should be preserved under, e.g. `DSC04521.ARW`.
    pub fn expected_preserved_file_name(&self) -> String {
        format!("{}.{}", self.original_base_name, self.raw_extension)
    }
}

impl fmt::Display for ParsedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.date, self.time, self.original_base_name)?;
        if self.is_merged_hdr {
            f.write_str(HDR_SUFFIX)?;
        }
        if self.is_merged_panorama {
            f.write_str(PANO_SUFFIX)?;
        }
        if self.is_edit {
            f.write_str(EDIT_SUFFIX)?;
        }
        write!(f, ".{}", self.extension.as_str())
    }
}

/// Parser bound to a pattern registry
pub struct FilenameParser<'r> {
    registry: &'r PatternRegistry,
}

impl<'r> FilenameParser<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self { registry }
    }

    /// Parse a processed file name. `None` is the single failure signal.
    pub fn parse(&self, file_name: &str) -> Option<ParsedFilename> {
        let (date, rest) = take_digits(file_name, 8)?;
        let rest = rest.strip_prefix('_')?;
        let (time, rest) = take_digits(rest, 6)?;
        let rest = rest.strip_prefix('_')?;

        let (stem, ext) = rest.rsplit_once('.')?;
        let extension = ProcessedExtension::from_text(ext)?;

        let (origin, suffixes) = match stem.find('-') {
            Some(idx) => stem.split_at(idx),
            None => (stem, ""),
        };
        if origin.is_empty() {
            return None;
        }

        let (is_merged_hdr, suffixes) = take_suffix(suffixes, HDR_SUFFIX);
        let (is_merged_panorama, suffixes) = take_suffix(suffixes, PANO_SUFFIX);
        let (is_edit, suffixes) = take_suffix(suffixes, EDIT_SUFFIX);
        if !suffixes.is_empty() {
            return None;
        }

        let raw_extension = self.registry.match_origin(origin)?;

        Some(ParsedFilename {
            date: date.to_string(),
            time: time.to_string(),
            original_base_name: origin.to_string(),
            raw_extension,
            is_merged_hdr,
            is_merged_panorama,
            is_edit,
            extension,
        })
    }
}

/// Parse with the built-in camera patterns
pub fn parse_file_name(file_name: &str) -> Option<ParsedFilename> {
    let registry = PatternRegistry::default();
    FilenameParser::new(&registry).parse(file_name)
}

fn take_digits(input: &str, count: usize) -> Option<(&str, &str)> {
    let head = input.get(..count)?;
    if head.bytes().all(|b| b.is_ascii_digit()) {
        Some((head, &input[count..]))
    } else {
        None
    }
}

fn take_suffix<'a>(input: &'a str, suffix: &str) -> (bool, &'a str) {
    match input.strip_prefix(suffix) {
        Some(rest) => (true, rest),
        None => (false, input),
    }
}
