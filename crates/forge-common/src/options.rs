//! Analyzer configuration.
//!
//! The two surface languages share one analyzer; the selected language and
//! mode decide the memory model used for assignment and container moves, the
//! default wrapper on declaration, and whether escape blocks are permitted.

use serde::{Deserialize, Serialize};

/// The surface language being analyzed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLanguage {
    /// Explicit ownership: assignment moves, declarations default to Owned.
    #[default]
    Forge,
    /// Automatic reference counting: assignment aliases, declarations default
    /// to Retained.
    Sweet,
}

/// Compilation mode, affecting which features are permitted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzerMode {
    #[default]
    Normal,
    /// No standard library; compile-time intrinsics only.
    Freestanding,
    /// Sweet mode forbids escape blocks entirely.
    Sweet,
}

/// Configuration options for the semantic analyzer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalyzerOptions {
    pub language: SourceLanguage,
    pub mode: AnalyzerMode,
}

impl AnalyzerOptions {
    #[must_use]
    pub fn forge() -> Self {
        Self {
            language: SourceLanguage::Forge,
            mode: AnalyzerMode::Normal,
        }
    }

    #[must_use]
    pub fn sweet() -> Self {
        Self {
            language: SourceLanguage::Sweet,
            mode: AnalyzerMode::Sweet,
        }
    }

    /// Whether `danger` escape blocks are permitted at all.
    #[must_use]
    pub fn allows_escape_blocks(&self) -> bool {
        self.mode != AnalyzerMode::Sweet
    }
}
