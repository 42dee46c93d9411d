//! Block Classification module
//!
//! Labels text fragments as headings, paragraphs, or list items and numbers
//! them with marked-content identifiers.
//!
//! # Features
//!
//! - Font-size ranking against the largest size in the document (or page)
//! - Leading bullet glyph detection for list items
//! - Pluggable [`ClassificationStrategy`] for alternative classifiers
//! - Page-scoped or document-scoped MCID numbering
//!
//! # Example
//!
//! ```rust
//! use pdf_a11y_tagger::{BlockClassifier, BlockKind, TextFragment};
//!
//! let fragments = vec![
//!     TextFragment::new("Annual Report", 24.0, 1),
//!     TextFragment::new("Revenue grew 10%.", 12.0, 1),
//! ];
//! let blocks = BlockClassifier::default().classify(&fragments).unwrap();
//! assert_eq!(blocks[0].kind, BlockKind::Heading1);
//! assert_eq!(blocks[1].mcid, 1);
//! ```

mod classifier;
mod strategy;
mod types;

// Re-export public API
pub use classifier::BlockClassifier;
pub use strategy::{ClassificationStrategy, FontSizeStrategy};
pub use types::{
    Block, BlockCounts, BlockKind, ClassifyError, ClassifyOptions, ClassifyOptionsBuilder,
    McidScope, Result, ThresholdScope, DEFAULT_BULLET_CHARS, DEFAULT_HEADING1_RATIO,
    DEFAULT_HEADING2_RATIO,
};
