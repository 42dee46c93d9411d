//! Structure Tagging module
//!
//! Attaches a logical structure tree to a PDF and binds every structure
//! leaf to a marked-content span on its page.
//!
//! # Features
//!
//! - Per-page `Document` groups with `H1`/`H2`/`P`/`LI` leaves
//! - One appended content stream per block; original streams stay untouched
//! - `/ParentTree` and `/StructParents` for MCID lookup
//! - All-or-nothing application with atomic output writing
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_a11y_tagger::{load_document, DocumentWriter, TagPlan};
//! use pdf_a11y_tagger::{Block, BlockKind};
//! use std::path::Path;
//!
//! let mut doc = load_document(Path::new("report.pdf")).unwrap();
//! let blocks = vec![Block {
//!     text: "Annual Report".to_string(),
//!     kind: BlockKind::Heading1,
//!     page_number: 1,
//!     mcid: 0,
//!     x0: 72.0,
//!     top: 60.0,
//! }];
//!
//! let plan = TagPlan::new(&blocks, doc.get_pages().len()).unwrap();
//! plan.apply(&mut doc).unwrap();
//! DocumentWriter::write(&mut doc, Path::new("report.tagged.pdf")).unwrap();
//! ```

mod content;
mod plan;
mod tree;
mod types;
mod writer;

// Re-export public API
pub use content::{mcids_in, ContentStreamRewriter, MarkedContentSpan};
pub use plan::TagPlan;
pub use tree::StructTreeBuilder;
pub use types::{
    ApplySummary, Result, StructChild, StructElem, StructRole, StructTree, TaggingError,
};
pub use writer::DocumentWriter;
