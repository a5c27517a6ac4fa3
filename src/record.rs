//! Metadata Records - Input from the metadata tool
//!
//! One record per image file, decoded from ExifTool `-json` output.
//! The engine only reads records; it never mutates them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    Dng,
    Tiff,
    Jpeg,
    /// Anything the metadata tool reported that the archive does not hold
    Other(String),
}

impl FileType {
    pub fn as_str(&self) -> &str {
        match self {
            FileType::Dng => "DNG",
            FileType::Tiff => "TIFF",
            FileType::Jpeg => "JPEG",
            FileType::Other(other) => other,
        }
    }
}

impl From<String> for FileType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DNG" => FileType::Dng,
            "TIFF" => FileType::Tiff,
            "JPEG" => FileType::Jpeg,
            _ => FileType::Other(value),
        }
    }
}

impl From<&str> for FileType {
    fn from(value: &str) -> Self {
        FileType::from(value.to_string())
    }
}

impl From<FileType> for String {
    fn from(value: FileType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "SourceFile")]
    pub source_file_path: String,
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "FileType")]
    pub file_type: FileType,
    #[serde(rename = "IsMergedHDR", default, deserialize_with = "flag")]
    pub is_merged_hdr: bool,
    #[serde(rename = "IsMergedPanorama", default, deserialize_with = "flag")]
    pub is_merged_panorama: bool,
    #[serde(rename = "PreservedFileName", default)]
    pub preserved_file_name: String,
}

impl MetadataRecord {
    /// Record for `file_name` with no merge flags and no preserved name.
    /// The source path defaults to the file name itself.
    pub fn new(file_name: impl Into<String>, file_type: impl Into<FileType>) -> Self {
        let file_name = file_name.into();
        Self {
            source_file_path: file_name.clone(),
            file_name,
            file_type: file_type.into(),
            is_merged_hdr: false,
            is_merged_panorama: false,
            preserved_file_name: String::new(),
        }
    }

    pub fn with_source(mut self, path: impl Into<String>) -> Self {
        self.source_file_path = path.into();
        self
    }

    pub fn with_hdr(mut self, merged: bool) -> Self {
        self.is_merged_hdr = merged;
        self
    }

    pub fn with_panorama(mut self, merged: bool) -> Self {
        self.is_merged_panorama = merged;
        self
    }

    pub fn with_preserved(mut self, name: impl Into<String>) -> Self {
        self.preserved_file_name = name.into();
        self
    }
}

/// Decode a JSON array of records as printed by `exiftool -json`.
pub fn parse_records(json: &str) -> Result<Vec<MetadataRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(i) => Ok(i != 0),
        Flag::Text(text) => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            _ => Err(serde::de::Error::custom(format!("invalid flag value: {}", text))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exiftool_output() {
        let json = r#"[
            {
                "SourceFile": "/archive/DNG/20210615_143200_DSC04521-HDR.dng",
                "FileName": "20210615_143200_DSC04521-HDR.dng",
                "FileType": "DNG",
                "IsMergedHDR": true,
                "PreservedFileName": "DSC04521.ARW"
            },
            {
                "SourceFile": "/archive/DNG/preview.jpg",
                "FileName": "preview.jpg",
                "FileType": "JPEG"
            }
        ]"#;
        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_type, FileType::Dng);
        assert!(records[0].is_merged_hdr);
        assert!(!records[0].is_merged_panorama);
        assert_eq!(records[0].preserved_file_name, "DSC04521.ARW");
        assert_eq!(records[1].file_type, FileType::Jpeg);
        assert_eq!(records[1].preserved_file_name, "");
    }

    #[test]
    fn test_flag_accepts_text_and_numbers() {
        let json = r#"[
            {"SourceFile": "a", "FileName": "a", "FileType": "TIFF", "IsMergedHDR": "True", "IsMergedPanorama": 0},
            {"SourceFile": "b", "FileName": "b", "FileType": "TIFF", "IsMergedHDR": "False", "IsMergedPanorama": 1}
        ]"#;
        let records = parse_records(json).unwrap();
        assert!(records[0].is_merged_hdr);
        assert!(!records[0].is_merged_panorama);
        assert!(!records[1].is_merged_hdr);
        assert!(records[1].is_merged_panorama);
    }

    #[test]
    fn test_flag_rejects_garbage() {
        let json = r#"[{"SourceFile": "a", "FileName": "a", "FileType": "DNG", "IsMergedHDR": "maybe"}]"#;
        assert!(parse_records(json).is_err());
    }

    #[test]
    fn test_unknown_file_type_is_kept() {
        let json = r#"[{"SourceFile": "a.png", "FileName": "a.png", "FileType": "PNG"}]"#;
        let records = parse_records(json).unwrap();
        assert_eq!(records[0].file_type, FileType::Other("PNG".to_string()));
        assert_eq!(records[0].file_type.to_string(), "PNG");
    }
}
