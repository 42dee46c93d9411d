//! Classification strategies
//!
//! A strategy maps one fragment to a [`BlockKind`] given the largest font
//! size in its population. Strategies are pure so they can be swapped
//! without touching tree building or stream rewriting.

use super::types::{BlockKind, ClassifyOptions, DEFAULT_BULLET_CHARS};
use crate::layout::TextFragment;

/// Pure fragment → role policy
pub trait ClassificationStrategy {
    /// Classify a non-blank fragment
    fn classify(&self, fragment: &TextFragment, max_size: f32) -> BlockKind;
}

impl<F> ClassificationStrategy for F
where
    F: Fn(&TextFragment, f32) -> BlockKind,
{
    fn classify(&self, fragment: &TextFragment, max_size: f32) -> BlockKind {
        self(fragment, max_size)
    }
}

/// Font-size ranking with a leading-bullet check
///
/// Checks run in fixed priority: Heading1, Heading2, ListItem, Paragraph.
/// Thresholds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSizeStrategy {
    heading1_ratio: f32,
    heading2_ratio: f32,
    bullet_chars: Vec<char>,
}

impl Default for FontSizeStrategy {
    fn default() -> Self {
        Self::from_options(&ClassifyOptions::default())
    }
}

impl FontSizeStrategy {
    /// Create a strategy from explicit ratios and the default bullets
    pub fn new(heading1_ratio: f32, heading2_ratio: f32) -> Self {
        Self {
            heading1_ratio,
            heading2_ratio,
            bullet_chars: DEFAULT_BULLET_CHARS.to_vec(),
        }
    }

    /// Create a strategy from classification options
    pub fn from_options(options: &ClassifyOptions) -> Self {
        Self {
            heading1_ratio: options.heading1_ratio,
            heading2_ratio: options.heading2_ratio,
            bullet_chars: options.bullet_chars.clone(),
        }
    }

    /// `(heading1, heading2)` thresholds for a maximum size
    pub fn thresholds(&self, max_size: f32) -> (f32, f32) {
        (max_size * self.heading1_ratio, max_size * self.heading2_ratio)
    }

    /// Check if text opens with a bullet glyph
    pub fn starts_with_bullet(&self, text: &str) -> bool {
        text.trim_start()
            .chars()
            .next()
            .is_some_and(|c| self.bullet_chars.contains(&c))
    }
}

impl ClassificationStrategy for FontSizeStrategy {
    fn classify(&self, fragment: &TextFragment, max_size: f32) -> BlockKind {
        let (h1, h2) = self.thresholds(max_size);
        if fragment.font_size >= h1 {
            BlockKind::Heading1
        } else if fragment.font_size >= h2 {
            BlockKind::Heading2
        } else if self.starts_with_bullet(&fragment.text) {
            BlockKind::ListItem
        } else {
            BlockKind::Paragraph
        }
    }
}

// ============================================================
// Tests
// ============================================================
