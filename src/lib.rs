//! pdf-a11y-tagger - Structure tagging for untagged PDFs
//!
//! Classifies page text into headings, paragraphs and list items and
//! attaches a matching logical structure tree, so assistive technology can
//! navigate the document instead of reading an undifferentiated glyph stream.
//!
//! # Modules
//!
//! - [`layout`]: positioned text fragments from page content streams
//! - [`classify`]: font-size and bullet-glyph block classification
//! - [`tagging`]: structure tree, marked-content spans, atomic writing
//! - [`metadata`]: document title and language
//! - [`alt_text`]: image keys and `/Alt` injection
//! - [`pipeline`]: the end-to-end run
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_a11y_tagger::{TaggingOptions, TaggingPipeline};
//! use std::path::Path;
//!
//! let pipeline = TaggingPipeline::new(TaggingOptions::default());
//! let result = pipeline
//!     .process(Path::new("report.pdf"), Path::new("report.tagged.pdf"))
//!     .unwrap();
//! println!("{} blocks on {} pages", result.counts.total(), result.tagged_pages);
//! ```

pub mod alt_text;
pub mod classify;
pub mod cli;
pub mod config;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod tagging;
mod text;

// Re-export public API
pub use alt_text::{
    document_images, inject_alt_text, load_alt_text_map, page_images, AltTextError, AltTextMap,
    AltTextReport, ImageExt, ImageKey, PageImage,
};
pub use classify::{
    Block, BlockClassifier, BlockCounts, BlockKind, ClassificationStrategy, ClassifyError,
    ClassifyOptions, FontSizeStrategy, McidScope, ThresholdScope,
};
pub use cli::{exit_codes, AltTextArgs, Cli, Commands, InfoArgs, InspectArgs, TagArgs};
pub use config::{CliOverrides, Config, ConfigError};
pub use layout::{
    load_document, ContentStreamExtractor, ExtractOptions, FontDecoder, LayoutError,
    LayoutExtractor, TextFragment,
};
pub use metadata::{DocumentInfo, DocumentMetadata, MetadataError};
pub use pipeline::{
    ErrorKind, PipelineError, TagSummary, TaggingOptions, TaggingOptionsBuilder, TaggingPipeline,
    TaggingResult,
};
pub use progress::{ConsoleProgress, NoopProgress, OutputMode, ProcessingStage, ProgressCallback};
pub use tagging::{
    ApplySummary, DocumentWriter, MarkedContentSpan, StructElem, StructTree, StructTreeBuilder,
    TagPlan, TaggingError,
};
pub use text::{decode_pdf_string, text_string};
