//! Pattern Registry - Raw Origin Recognition
//!
//! Camera bodies name their raw files in a fixed shape. Each shape is bound
//! to exactly one raw extension. Patterns are evaluated in registration
//! order and the first match is authoritative.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RawExtension {
    Arw,
    Cr2,
}

impl RawExtension {
    /// Extension text as the camera writes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            RawExtension::Arw => "ARW",
            RawExtension::Cr2 => "CR2",
        }
    }
}

impl fmt::Display for RawExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin matcher trait - tests a candidate base name
pub trait OriginMatcher: Send + Sync {
    fn matches(&self, candidate: &str) -> bool;
    fn describe(&self) -> String;
}

/// Fixed prefix followed by an exact-length run of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMatcher {
    pub prefix: String,
    pub digits: usize,
}

impl SequenceMatcher {
    pub fn new(prefix: impl Into<String>, digits: usize) -> Self {
        Self { prefix: prefix.into(), digits }
    }
}

impl OriginMatcher for SequenceMatcher {
    fn matches(&self, candidate: &str) -> bool {
        match candidate.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.len() == self.digits && rest.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }

    fn describe(&self) -> String {
        format!("{}{}", self.prefix, "#".repeat(self.digits))
    }
}

pub struct RawOriginPattern {
    pub matcher: Box<dyn OriginMatcher>,
    pub raw_extension: RawExtension,
}

impl RawOriginPattern {
    pub fn new(matcher: impl OriginMatcher + 'static, raw_extension: RawExtension) -> Self {
        Self { matcher: Box::new(matcher), raw_extension }
    }
}

impl fmt::Debug for RawOriginPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOriginPattern")
            .field("matcher", &self.matcher.describe())
            .field("raw_extension", &self.raw_extension)
            .finish()
    }
}

/// Pattern registry - ordered, first match wins
#[derive(Debug)]
pub struct PatternRegistry {
    patterns: Vec<RawOriginPattern>,
}

impl PatternRegistry {
    /// Empty registry. Nothing will match until patterns are registered.
    pub fn new() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Appends a pattern. Earlier registrations keep precedence.
    pub fn register(&mut self, pattern: RawOriginPattern) {
        self.patterns.push(pattern);
    }

    pub fn with(mut self, matcher: impl OriginMatcher + 'static, raw_extension: RawExtension) -> Self {
        self.register(RawOriginPattern::new(matcher, raw_extension));
        self
    }

    pub fn match_origin(&self, candidate: &str) -> Option<RawExtension> {
        self.patterns
            .iter()
            .find(|p| p.matcher.matches(candidate))
            .map(|p| p.raw_extension)
    }

    pub fn patterns(&self) -> &[RawOriginPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PatternRegistry {
    /// Built-in camera patterns: Sony first, then Canon.
    fn default() -> Self {
        Self::new()
            .with(SequenceMatcher::new("DSC", 5), RawExtension::Arw)
            .with(SequenceMatcher::new("_DSC", 4), RawExtension::Arw)
            .with(SequenceMatcher::new("IMG_", 4), RawExtension::Cr2)
            .with(SequenceMatcher::new("_MG_", 4), RawExtension::Cr2)
    }
}
