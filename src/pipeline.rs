//! Tagging Pipeline
//!
//! Runs extraction, classification, planning, application and writing as
//! strictly ordered stages. Nothing reaches the output path unless every
//! stage before the write succeeded.

use std::path::{Path, PathBuf};
use std::time::Instant;

use lopdf::Document;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::alt_text::{inject_alt_text, AltTextError, AltTextMap, AltTextReport};
use crate::classify::{Block, BlockClassifier, BlockCounts, ClassifyError, ClassifyOptions};
use crate::layout::{
    load_document, ContentStreamExtractor, ExtractOptions, LayoutError, LayoutExtractor,
};
use crate::metadata::{DocumentMetadata, MetadataError};
use crate::progress::{NoopProgress, ProcessingStage, ProgressCallback};
use crate::tagging::{ApplySummary, DocumentWriter, TagPlan, TaggingError};

// ============================================================
// Error Types
// ============================================================

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Output would overwrite the input {0}; pass --in-place to allow it")]
    SameInputOutput(PathBuf),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Tagging(#[from] TaggingError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    AltText(#[from] AltTextError),
}

/// Broad failure category, used for exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input PDF or a side file does not exist
    InputNotFound,
    /// Blocks and document disagree; nothing was written
    InputIntegrity,
    /// The output could not be written
    Serialization,
    /// The PDF could not be parsed or has a broken object graph
    Document,
    /// Options or arguments are invalid
    Config,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InputNotFound(_) => ErrorKind::InputNotFound,
            PipelineError::SameInputOutput(_) => ErrorKind::Config,
            PipelineError::Layout(LayoutError::PdfNotFound(_)) => ErrorKind::InputNotFound,
            PipelineError::Layout(_) => ErrorKind::Document,
            PipelineError::Classify(ClassifyError::MalformedFragment { .. }) => {
                ErrorKind::InputIntegrity
            }
            PipelineError::Classify(ClassifyError::InvalidThresholds { .. }) => ErrorKind::Config,
            PipelineError::Tagging(e) if e.is_input_integrity() => ErrorKind::InputIntegrity,
            PipelineError::Tagging(TaggingError::Serialization { .. }) => ErrorKind::Serialization,
            PipelineError::Tagging(_) => ErrorKind::Document,
            PipelineError::Metadata(MetadataError::InvalidLanguage(_)) => ErrorKind::Config,
            PipelineError::Metadata(_) => ErrorKind::Document,
            PipelineError::AltText(AltTextError::Pdf(_)) => ErrorKind::Document,
            PipelineError::AltText(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Options
// ============================================================

/// Everything a tagging run can be configured with
#[derive(Debug, Clone, Default)]
pub struct TaggingOptions {
    /// Layout extraction
    pub extract: ExtractOptions,

    /// Block classification
    pub classify: ClassifyOptions,

    /// Title and language written after tagging
    pub metadata: DocumentMetadata,

    /// Captions injected onto image objects
    pub alt_text: Option<AltTextMap>,

    /// Allow the output path to be the input path
    pub in_place: bool,
}

impl TaggingOptions {
    pub fn builder() -> TaggingOptionsBuilder {
        TaggingOptionsBuilder::default()
    }

    /// Tag only; leave title, language and images alone
    pub fn structure_only() -> Self {
        Self {
            metadata: DocumentMetadata::none(),
            ..Default::default()
        }
    }
}

/// Builder for [`TaggingOptions`]
#[derive(Debug, Default)]
pub struct TaggingOptionsBuilder {
    options: TaggingOptions,
}

impl TaggingOptionsBuilder {
    #[must_use]
    pub fn extract(mut self, extract: ExtractOptions) -> Self {
        self.options.extract = extract;
        self
    }

    #[must_use]
    pub fn classify(mut self, classify: ClassifyOptions) -> Self {
        self.options.classify = classify;
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.options.metadata = metadata;
        self
    }

    #[must_use]
    pub fn alt_text(mut self, map: AltTextMap) -> Self {
        self.options.alt_text = Some(map);
        self
    }

    #[must_use]
    pub fn in_place(mut self, in_place: bool) -> Self {
        self.options.in_place = in_place;
        self
    }

    pub fn build(self) -> TaggingOptions {
        self.options
    }
}

// ============================================================
// Results
// ============================================================

/// What tagging changed in an in-memory document
#[derive(Debug, Clone, Default)]
pub struct TagSummary {
    /// Pages in the document
    pub page_count: usize,

    /// Fragments handed to the classifier
    pub fragment_count: usize,

    /// Blocks per kind
    pub counts: BlockCounts,

    /// Changes made by the tag plan
    pub applied: ApplySummary,

    /// Alt-text injection outcome, when a map was given
    pub alt_text: Option<AltTextReport>,
}

/// Report of a file-to-file run
#[derive(Debug, Clone, Serialize)]
pub struct TaggingResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub page_count: usize,
    pub tagged_pages: usize,
    pub counts: BlockCounts,
    pub struct_elements: usize,
    pub replaced_existing_tree: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<AltTextReport>,
    pub elapsed_seconds: f64,
    pub output_size: u64,
}

// ============================================================
// Pipeline
// ============================================================

/// Extract → classify → tag → write
pub struct TaggingPipeline {
    options: TaggingOptions,
    classifier: BlockClassifier,
}

impl TaggingPipeline {
    pub fn new(options: TaggingOptions) -> Self {
        let classifier = BlockClassifier::new(options.classify.clone());
        Self {
            options,
            classifier,
        }
    }

    /// Use a custom classifier instead of the font-size policy
    pub fn with_classifier(options: TaggingOptions, classifier: BlockClassifier) -> Self {
        Self {
            options,
            classifier,
        }
    }

    pub fn options(&self) -> &TaggingOptions {
        &self.options
    }

    /// Classify a document's text without changing it
    pub fn classify_document(&self, doc: &Document) -> Result<Vec<Block>> {
        let extractor = ContentStreamExtractor::with_options(self.options.extract.clone());
        let fragments = extractor.extract_document(doc)?;
        Ok(self.classifier.classify(&fragments)?)
    }

    /// Load a PDF and return its classified blocks
    pub fn inspect(&self, input: &Path) -> Result<Vec<Block>> {
        if !input.exists() {
            return Err(PipelineError::InputNotFound(input.to_path_buf()));
        }
        let doc = load_document(input)?;
        self.classify_document(&doc)
    }

    /// Tag an in-memory document
    pub fn tag_document(&self, doc: &mut Document) -> Result<TagSummary> {
        self.tag_document_with_progress(doc, &NoopProgress)
    }

    /// Tag an in-memory document, reporting each stage
    pub fn tag_document_with_progress(
        &self,
        doc: &mut Document,
        progress: &dyn ProgressCallback,
    ) -> Result<TagSummary> {
        self.options.metadata.validate()?;
        let page_count = doc.get_pages().len();

        progress.on_step_start(ProcessingStage::Extracting);
        let extractor = ContentStreamExtractor::with_options(self.options.extract.clone());
        let mut fragments = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            fragments.extend(extractor.extract_page(doc, page_number, page_id)?);
            progress.on_step_progress(page_number as usize, page_count);
        }
        progress.on_step_complete(
            ProcessingStage::Extracting,
            &format!("{} fragments from {} pages", fragments.len(), page_count),
        );

        progress.on_step_start(ProcessingStage::Classifying);
        let blocks = self.classifier.classify(&fragments)?;
        let counts = BlockCounts::from_blocks(&blocks);
        progress.on_step_complete(
            ProcessingStage::Classifying,
            &format!(
                "{} blocks ({} H1, {} H2, {} P, {} LI)",
                counts.total(),
                counts.heading1,
                counts.heading2,
                counts.paragraph,
                counts.list_item
            ),
        );

        progress.on_step_start(ProcessingStage::Planning);
        let plan = TagPlan::new(&blocks, page_count)?;
        progress.on_debug(&format!("{} structure leaves planned", plan.tree().leaf_count()));

        progress.on_step_start(ProcessingStage::Applying);
        let applied = plan.apply(doc)?;
        progress.on_step_complete(
            ProcessingStage::Applying,
            &format!("{} pages tagged", applied.tagged_pages),
        );

        let alt_text = match &self.options.alt_text {
            Some(map) => {
                let report = inject_alt_text(doc, map)?;
                progress.on_debug(&format!(
                    "alt text: {} applied, {} unmatched",
                    report.applied.len(),
                    report.unmatched.len()
                ));
                Some(report)
            }
            None => None,
        };

        if !self.options.metadata.is_empty() {
            progress.on_step_start(ProcessingStage::Metadata);
            self.options.metadata.apply(doc)?;
        }

        Ok(TagSummary {
            page_count,
            fragment_count: fragments.len(),
            counts,
            applied,
            alt_text,
        })
    }

    /// Tag `input` and write the result to `output`
    pub fn process(&self, input: &Path, output: &Path) -> Result<TaggingResult> {
        self.process_with_progress(input, output, &NoopProgress)
    }

    /// Tag `input` and write the result to `output`, reporting each stage
    pub fn process_with_progress(
        &self,
        input: &Path,
        output: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<TaggingResult> {
        let start = Instant::now();
        self.check_paths(input, output)?;

        progress.on_step_start(ProcessingStage::Loading);
        let mut doc = load_document(input)?;

        let summary = self.tag_document_with_progress(&mut doc, progress)?;

        progress.on_step_start(ProcessingStage::Writing);
        let output_size = DocumentWriter::write(&mut doc, output)?;
        progress.on_step_complete(ProcessingStage::Completed, &output.display().to_string());

        let result = TaggingResult {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            page_count: summary.page_count,
            tagged_pages: summary.applied.tagged_pages,
            counts: summary.counts,
            struct_elements: summary.applied.struct_elements,
            replaced_existing_tree: summary.applied.replaced_existing_tree,
            alt_text: summary.alt_text,
            elapsed_seconds: start.elapsed().as_secs_f64(),
            output_size,
        };
        info!(
            input = %input.display(),
            output = %output.display(),
            pages = result.page_count,
            blocks = result.counts.total(),
            "tagging complete"
        );
        Ok(result)
    }

    /// Inject alt text only, writing `input` to `output`
    pub fn process_alt_text(
        &self,
        input: &Path,
        output: &Path,
        map: &AltTextMap,
    ) -> Result<AltTextReport> {
        self.check_paths(input, output)?;
        let mut doc = load_document(input)?;
        let report = inject_alt_text(&mut doc, map)?;
        DocumentWriter::write(&mut doc, output)?;
        info!(
            applied = report.applied.len(),
            unmatched = report.unmatched.len(),
            "alt text injected"
        );
        Ok(report)
    }

    fn check_paths(&self, input: &Path, output: &Path) -> Result<()> {
        if !input.exists() {
            return Err(PipelineError::InputNotFound(input.to_path_buf()));
        }
        if !self.options.in_place && same_file(input, output) {
            return Err(PipelineError::SameInputOutput(input.to_path_buf()));
        }
        Ok(())
    }
}

impl Default for TaggingPipeline {
    fn default() -> Self {
        Self::new(TaggingOptions::default())
    }
}

/// Compare paths after resolving the parts that exist
fn same_file(a: &Path, b: &Path) -> bool {
    fn resolve(path: &Path) -> PathBuf {
        if let Ok(canonical) = path.canonicalize() {
            return canonical;
        }
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf()),
            _ => path.to_path_buf(),
        }
    }
    resolve(a) == resolve(b)
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BlockKind;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// One page per entry; each line is `(text, size)` drawn top-down
    fn text_doc(pages: &[&[(&str, i64)]]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let mut kids = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for (i, (text, size)) in lines.iter().enumerate() {
                let y = 720 - (i as i64) * 40;
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), (*size).into()]));
                operations.push(Operation::new("Td", vec![72.into(), y.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_tag_document_counts() {
        let mut doc = text_doc(&[&[
            ("Annual Report", 24),
            ("Highlights", 19),
            ("Revenue grew 10%.", 12),
            ("- Margins improved", 12),
        ]]);
        let pipeline = TaggingPipeline::new(TaggingOptions::structure_only());
        let summary = pipeline.tag_document(&mut doc).unwrap();

        assert_eq!(summary.page_count, 1);
        assert_eq!(summary.counts.heading1, 1);
        assert_eq!(summary.counts.heading2, 1);
        assert_eq!(summary.counts.paragraph, 1);
        assert_eq!(summary.counts.list_item, 1);
        assert_eq!(summary.applied.tagged_pages, 1);
        assert_eq!(summary.applied.streams_added, 4);
    }

    #[test]
    fn test_classify_document_does_not_modify() {
        let doc = text_doc(&[&[("Title", 20), ("Body", 10)]]);
        let before = doc.objects.len();
        let blocks = TaggingPipeline::default().classify_document(&doc).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Heading1);
        assert_eq!(doc.objects.len(), before);
    }

    #[test]
    fn test_progress_stages_reported_in_order() {
        struct Stages(RefCell<Vec<ProcessingStage>>);
        impl ProgressCallback for Stages {
            fn on_step_start(&self, stage: ProcessingStage) {
                self.0.borrow_mut().push(stage);
            }
        }

        let mut doc = text_doc(&[&[("Title", 20)]]);
        let stages = Stages(RefCell::new(Vec::new()));
        TaggingPipeline::default()
            .tag_document_with_progress(&mut doc, &stages)
            .unwrap();

        assert_eq!(
            *stages.0.borrow(),
            vec![
                ProcessingStage::Extracting,
                ProcessingStage::Classifying,
                ProcessingStage::Planning,
                ProcessingStage::Applying,
                ProcessingStage::Metadata,
            ]
        );
    }

    #[test]
    fn test_invalid_language_rejected_before_tagging() {
        let mut doc = text_doc(&[&[("Title", 20)]]);
        let options = TaggingOptions::builder()
            .metadata(DocumentMetadata::none().with_lang("not a tag"))
            .build();
        let before = doc.objects.len();

        let err = TaggingPipeline::new(options).tag_document(&mut doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(doc.objects.len(), before);
    }

    #[test]
    fn test_process_writes_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        text_doc(&[&[("Title", 20), ("Body", 10)], &[("More", 10)]])
            .save(&input)
            .unwrap();

        let result = TaggingPipeline::default().process(&input, &output).unwrap();
        assert_eq!(result.page_count, 2);
        assert_eq!(result.tagged_pages, 2);
        assert_eq!(result.counts.total(), 3);
        assert!(result.output_size > 0);
        assert!(output.exists());
    }

    #[test]
    fn test_process_refuses_to_overwrite_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        text_doc(&[&[("Title", 20)]]).save(&input).unwrap();
        let before = std::fs::read(&input).unwrap();

        let err = TaggingPipeline::default().process(&input, &input).unwrap_err();
        assert!(matches!(err, PipelineError::SameInputOutput(_)));
        assert_eq!(std::fs::read(&input).unwrap(), before);

        let in_place = TaggingOptions::builder().in_place(true).build();
        TaggingPipeline::new(in_place).process(&input, &input).unwrap();
        assert_ne!(std::fs::read(&input).unwrap(), before);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        let err = TaggingPipeline::default()
            .process(&dir.path().join("nope.pdf"), &dir.path().join("out.pdf"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputNotFound);
    }

    #[test]
    fn test_error_kinds() {
        let integrity = PipelineError::Tagging(TaggingError::PageOutOfRange {
            page: 4,
            page_count: 1,
        });
        assert_eq!(integrity.kind(), ErrorKind::InputIntegrity);

        let write = PipelineError::Tagging(TaggingError::Serialization {
            path: PathBuf::from("out.pdf"),
            reason: "disk full".into(),
        });
        assert_eq!(write.kind(), ErrorKind::Serialization);

        let malformed = PipelineError::Classify(ClassifyError::MalformedFragment {
            index: 0,
            reason: "page 0".into(),
        });
        assert_eq!(malformed.kind(), ErrorKind::InputIntegrity);
    }

    #[test]
    fn test_same_file_resolves_relative_parts() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"x").unwrap();
        let dotted = dir.path().join(".").join("a.pdf");

        assert!(same_file(&file, &dotted));
        assert!(!same_file(&file, &dir.path().join("b.pdf")));
    }
}
