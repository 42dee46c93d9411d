//! Common types for the classify module

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Fraction of the largest font size at or above which text is a level-1 heading
pub const DEFAULT_HEADING1_RATIO: f32 = 0.90;

/// Fraction of the largest font size at or above which text is a level-2 heading
pub const DEFAULT_HEADING2_RATIO: f32 = 0.75;

/// Leading glyphs that mark a list item
pub const DEFAULT_BULLET_CHARS: &[char] = &['-', '\u{2022}', '\u{2023}', '\u{2043}', '\u{25E6}', '\u{2219}'];

// ============================================================
// Error Types
// ============================================================

/// Classification error types
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Malformed fragment #{index}: {reason}")]
    MalformedFragment { index: usize, reason: String },

    #[error("Invalid thresholds: heading1 ratio {heading1} must be >= heading2 ratio {heading2}, both in (0, 1]")]
    InvalidThresholds { heading1: f32, heading2: f32 },
}

pub type Result<T> = std::result::Result<T, ClassifyError>;

// ============================================================
// Core Data Structures
// ============================================================

/// Semantic role assigned to a block of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Level-1 heading
    Heading1,
    /// Level-2 heading
    Heading2,
    /// Body text
    Paragraph,
    /// Bulleted list entry
    ListItem,
}

impl BlockKind {
    /// All kinds in classification priority order
    pub const ALL: [BlockKind; 4] = [
        BlockKind::Heading1,
        BlockKind::Heading2,
        BlockKind::ListItem,
        BlockKind::Paragraph,
    ];

    /// Standard structure type name
    pub fn role(&self) -> &'static str {
        match self {
            BlockKind::Heading1 => "H1",
            BlockKind::Heading2 => "H2",
            BlockKind::Paragraph => "P",
            BlockKind::ListItem => "LI",
        }
    }

    /// Heading rank: 2 for level 1, 1 for level 2, 0 otherwise
    pub fn heading_rank(&self) -> u8 {
        match self {
            BlockKind::Heading1 => 2,
            BlockKind::Heading2 => 1,
            BlockKind::Paragraph | BlockKind::ListItem => 0,
        }
    }

    /// Check if this is a heading
    pub fn is_heading(&self) -> bool {
        self.heading_rank() > 0
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

/// A classified fragment, ready to be tagged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    /// Trimmed, non-empty text
    pub text: String,

    /// Assigned role
    pub kind: BlockKind,

    /// Page number (1-based)
    pub page_number: u32,

    /// Marked-content identifier shared by the span and the structure element
    pub mcid: u32,

    /// Left edge (kept for reading-order work)
    pub x0: f32,

    /// Top edge (kept for reading-order work)
    pub top: f32,
}

/// Per-kind block tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockCounts {
    pub heading1: usize,
    pub heading2: usize,
    pub paragraph: usize,
    pub list_item: usize,
}

impl BlockCounts {
    /// Count blocks by kind
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut counts = Self::default();
        for block in blocks {
            match block.kind {
                BlockKind::Heading1 => counts.heading1 += 1,
                BlockKind::Heading2 => counts.heading2 += 1,
                BlockKind::Paragraph => counts.paragraph += 1,
                BlockKind::ListItem => counts.list_item += 1,
            }
        }
        counts
    }

    /// Total number of blocks
    pub fn total(&self) -> usize {
        self.heading1 + self.heading2 + self.paragraph + self.list_item
    }
}

// ============================================================
// Options
// ============================================================

/// Population over which the largest font size is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdScope {
    /// One maximum across every fragment of the document
    #[default]
    Document,
    /// A separate maximum for each page
    Page,
}

/// Range over which marked-content identifiers are unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McidScope {
    /// Restart at 0 on every page
    #[default]
    Page,
    /// One counter for the whole document
    ///
    /// Each page's `/ParentTree` array is indexed by MCID, so a page whose
    /// identifiers start at `n` carries `n` leading nulls. Total parent tree
    /// size is quadratic in the page count for evenly filled pages; prefer
    /// [`McidScope::Page`] for long documents.
    Document,
}

/// Options for block classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyOptions {
    /// Level-1 heading ratio of the largest font size
    pub heading1_ratio: f32,

    /// Level-2 heading ratio of the largest font size
    pub heading2_ratio: f32,

    /// Leading glyphs that mark a list item
    pub bullet_chars: Vec<char>,

    /// Where the largest font size is measured
    pub threshold_scope: ThresholdScope,

    /// How marked-content identifiers are numbered
    pub mcid_scope: McidScope,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            heading1_ratio: DEFAULT_HEADING1_RATIO,
            heading2_ratio: DEFAULT_HEADING2_RATIO,
            bullet_chars: DEFAULT_BULLET_CHARS.to_vec(),
            threshold_scope: ThresholdScope::Document,
            mcid_scope: McidScope::Page,
        }
    }
}

impl ClassifyOptions {
    /// Create a builder
    pub fn builder() -> ClassifyOptionsBuilder {
        ClassifyOptionsBuilder::default()
    }

    /// Per-page thresholds and per-page numbering
    pub fn per_page() -> Self {
        Self {
            threshold_scope: ThresholdScope::Page,
            ..Default::default()
        }
    }

    /// Check the ratios describe a usable threshold ladder
    pub fn validate(&self) -> Result<()> {
        let in_range = |r: f32| r.is_finite() && r > 0.0 && r <= 1.0;
        if !in_range(self.heading1_ratio)
            || !in_range(self.heading2_ratio)
            || self.heading1_ratio < self.heading2_ratio
        {
            return Err(ClassifyError::InvalidThresholds {
                heading1: self.heading1_ratio,
                heading2: self.heading2_ratio,
            });
        }
        Ok(())
    }
}

/// Builder for ClassifyOptions
#[derive(Debug, Default)]
pub struct ClassifyOptionsBuilder {
    options: ClassifyOptions,
}

impl ClassifyOptionsBuilder {
    /// Set the level-1 heading ratio
    #[must_use]
    pub fn heading1_ratio(mut self, ratio: f32) -> Self {
        self.options.heading1_ratio = ratio;
        self
    }

    /// Set the level-2 heading ratio
    #[must_use]
    pub fn heading2_ratio(mut self, ratio: f32) -> Self {
        self.options.heading2_ratio = ratio;
        self
    }

    /// Replace the bullet glyph set
    #[must_use]
    pub fn bullet_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.options.bullet_chars = chars.into_iter().collect();
        self
    }

    /// Set the threshold scope
    #[must_use]
    pub fn threshold_scope(mut self, scope: ThresholdScope) -> Self {
        self.options.threshold_scope = scope;
        self
    }

    /// Set the MCID scope
    #[must_use]
    pub fn mcid_scope(mut self, scope: McidScope) -> Self {
        self.options.mcid_scope = scope;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ClassifyOptions {
        self.options
    }
}

// ============================================================
// Tests
// ============================================================
