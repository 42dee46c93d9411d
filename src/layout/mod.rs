//! Layout Extraction module
//!
//! Reads positioned text runs out of PDF pages so they can be classified.
//!
//! # Features
//!
//! - Content stream interpretation over `lopdf` (text matrix, CTM, leading)
//! - Effective font size from `Tf` scaled by the text rendering matrix
//! - Font-aware decoding through `/ToUnicode` CMaps, including Type0 fonts
//! - Form XObjects painted with `Do` are interpreted with their own matrix and resources
//! - Same-line run merging as a light stand-in for word flow analysis
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_a11y_tagger::{load_document, ContentStreamExtractor, LayoutExtractor};
//! use std::path::Path;
//!
//! let doc = load_document(Path::new("report.pdf")).unwrap();
//! let fragments = ContentStreamExtractor::new().extract_document(&doc).unwrap();
//! for frag in &fragments {
//!     println!("p{} {:>5.1}pt {}", frag.page_number, frag.font_size, frag.text);
//! }
//! ```

mod extract;
mod font;
mod types;

pub(crate) use extract::{page_content_bytes, resolve_inherited};

// Re-export public API
pub use extract::{load_document, ContentStreamExtractor, LayoutExtractor};
pub use font::{parse_to_unicode, CMap, FontDecoder};
pub use types::{
    ExtractOptions, ExtractOptionsBuilder, LayoutError, Result, TextFragment, DEFAULT_FONT_SIZE,
    DEFAULT_PAGE_HEIGHT, DEFAULT_Y_TOLERANCE,
};
