//! Audit configuration (TOML)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::patterns::{PatternRegistry, RawExtension, RawOriginPattern, SequenceMatcher};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_archive_root")]
    pub archive_root: PathBuf,
    /// Subdirectories of the archive root, audited in this order
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,
    #[serde(default = "default_exiftool")]
    pub exiftool: PathBuf,
    #[serde(default)]
    pub apply_corrections: bool,
    /// Read captured `exiftool -json` output instead of running the tool
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
    /// Save every `exiftool -json` batch here, named for its subdirectory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Delete ExifTool `*_original` backups from a subdirectory once it passed
    #[serde(default = "default_true")]
    pub clean_backups: bool,
    /// Appended after the built-in camera patterns
    #[serde(default)]
    pub extra_patterns: Vec<PatternConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub prefix: String,
    pub digits: usize,
    pub raw_extension: RawExtension,
}

fn default_true() -> bool { true }
fn default_archive_root() -> PathBuf { PathBuf::from(".") }
fn default_exiftool() -> PathBuf { PathBuf::from("exiftool") }

fn default_directories() -> Vec<String> {
    ["DNG", "TIFF", "Panoramas", "HDR"].iter().map(|d| d.to_string()).collect()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            archive_root: default_archive_root(),
            directories: default_directories(),
            exiftool: default_exiftool(),
            apply_corrections: false,
            snapshot_dir: None,
            cache_dir: None,
            clean_backups: true,
            extra_patterns: vec![],
        }
    }
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AuditConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directories.is_empty() {
            return Err(ConfigError::Invalid("no directories to audit".into()));
        }
        for p in &self.extra_patterns {
            if p.prefix.is_empty() || p.digits == 0 {
                return Err(ConfigError::Invalid(format!(
                    "pattern {:?} needs a prefix and at least one digit",
                    p.prefix
                )));
            }
        }
        Ok(())
    }

    /// Absolute subdirectory paths in audit order
    pub fn directory_paths(&self) -> Vec<PathBuf> {
        self.directories.iter().map(|d| self.archive_root.join(d)).collect()
    }

    pub fn pattern_registry(&self) -> PatternRegistry {
        let mut registry = PatternRegistry::default();
        for p in &self.extra_patterns {
            registry.register(RawOriginPattern::new(
                SequenceMatcher::new(p.prefix.clone(), p.digits),
                p.raw_extension,
            ));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = AuditConfig::from_toml("").unwrap();
        assert_eq!(config, AuditConfig::default());
        assert_eq!(config.directories, vec!["DNG", "TIFF", "Panoramas", "HDR"]);
        assert!(!config.apply_corrections);
        assert!(config.clean_backups);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = AuditConfig::from_toml(
            r#"
            archive_root = "/photos"
            directories = ["2021", "2022"]
            exiftool = "/usr/local/bin/exiftool"
            apply_corrections = true
            cache_dir = "/var/cache/photoaudit"
            clean_backups = false

            [[extra_patterns]]
            prefix = "A7R"
            digits = 5
            raw_extension = "ARW"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.directory_paths(),
            vec![PathBuf::from("/photos/2021"), PathBuf::from("/photos/2022")]
        );
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/photoaudit")));
        assert!(!config.clean_backups);
        let registry = config.pattern_registry();
        assert_eq!(registry.len(), PatternRegistry::default().len() + 1);
        assert_eq!(registry.match_origin("A7R00001"), Some(RawExtension::Arw));
    }

    #[test]
    fn test_rejects_empty_directory_list() {
        let err = AuditConfig::from_toml("directories = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let err = AuditConfig::from_toml(
            r#"
            [[extra_patterns]]
            prefix = ""
            digits = 4
            raw_extension = "CR2"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "archive_root = \"/mnt/archive\"\n").unwrap();
        let config = AuditConfig::load(tmp.path()).unwrap();
        assert_eq!(config.archive_root, PathBuf::from("/mnt/archive"));
    }
}
