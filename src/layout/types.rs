//! Common types for the layout module

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Default vertical tolerance (points) when merging runs into one line
pub const DEFAULT_Y_TOLERANCE: f32 = 3.0;

/// Page height used when a page has no usable MediaBox (US Letter)
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Font size in effect before the first `Tf`
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

// ============================================================
// Error Types
// ============================================================

/// Layout extraction error types
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("PDF not found: {0}")]
    PdfNotFound(PathBuf),

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

// ============================================================
// Core Data Structures
// ============================================================

/// A run of text as laid out on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFragment {
    /// The text content (untrimmed)
    pub text: String,

    /// Effective font size in points
    pub font_size: f32,

    /// Page number (1-based)
    pub page_number: u32,

    /// Left edge of the run
    pub x0: f32,

    /// Distance from the top of the page to the top of the run
    pub top: f32,
}

impl TextFragment {
    /// Create a fragment at the origin of a page
    pub fn new(text: impl Into<String>, font_size: f32, page_number: u32) -> Self {
        Self {
            text: text.into(),
            font_size,
            page_number,
            x0: 0.0,
            top: 0.0,
        }
    }

    /// Set the layout position
    #[must_use]
    pub fn at(mut self, x0: f32, top: f32) -> Self {
        self.x0 = x0;
        self.top = top;
        self
    }

    /// Check if the fragment carries no visible text
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ============================================================
// Options
// ============================================================

/// Options for layout extraction
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum baseline difference for runs to count as one line
    pub y_tolerance: f32,

    /// Merge consecutive same-size runs on one line into a single fragment
    pub merge_lines: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            y_tolerance: DEFAULT_Y_TOLERANCE,
            merge_lines: true,
        }
    }
}

impl ExtractOptions {
    /// Create a builder
    pub fn builder() -> ExtractOptionsBuilder {
        ExtractOptionsBuilder::default()
    }

    /// One fragment per show-text operator, no merging
    pub fn raw_runs() -> Self {
        Self {
            merge_lines: false,
            ..Default::default()
        }
    }
}

/// Builder for ExtractOptions
#[derive(Debug, Default)]
pub struct ExtractOptionsBuilder {
    options: ExtractOptions,
}

impl ExtractOptionsBuilder {
    /// Set the baseline tolerance (clamped to be non-negative)
    #[must_use]
    pub fn y_tolerance(mut self, tolerance: f32) -> Self {
        self.options.y_tolerance = tolerance.max(0.0);
        self
    }

    /// Enable or disable line merging
    #[must_use]
    pub fn merge_lines(mut self, merge: bool) -> Self {
        self.options.merge_lines = merge;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ExtractOptions {
        self.options
    }
}

// ============================================================
// Tests
// ============================================================
