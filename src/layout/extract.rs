//! Content stream text extraction
//!
//! Interprets page content streams with `lopdf` and reports each run of
//! shown text with its effective font size and position. Text is decoded
//! through each font's `/ToUnicode` map, and Form XObjects painted with
//! `Do` are interpreted in place.

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace, warn};

use super::font::FontDecoder;
use super::types::{
    ExtractOptions, LayoutError, Result, TextFragment, DEFAULT_FONT_SIZE, DEFAULT_PAGE_HEIGHT,
};

/// Guard against cyclic `/Parent` chains
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Guard against cyclic or runaway Form XObject nesting
const MAX_FORM_DEPTH: usize = 16;

lazy_static! {
    static ref SIMPLE_DECODER: FontDecoder = FontDecoder::simple();
}

/// TJ adjustment (thousandths of text space) treated as a word gap
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Average glyph advance as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

// ============================================================
// Extractor Trait
// ============================================================

/// Source of positioned text fragments for a document
pub trait LayoutExtractor {
    /// Extract the fragments of one page in content-stream order
    fn extract_page(
        &self,
        doc: &Document,
        page_number: u32,
        page_id: ObjectId,
    ) -> Result<Vec<TextFragment>>;

    /// Extract every page, ascending by page number
    fn extract_document(&self, doc: &Document) -> Result<Vec<TextFragment>> {
        let mut fragments = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            let page_fragments = self.extract_page(doc, page_number, page_id)?;
            debug!(page = page_number, fragments = page_fragments.len(), "extracted page");
            fragments.extend(page_fragments);
        }
        Ok(fragments)
    }
}

/// Load a PDF from disk
pub fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(LayoutError::PdfNotFound(path.to_path_buf()));
    }
    Document::load(path).map_err(|e| LayoutError::InvalidPdf(format!("{}: {}", path.display(), e)))
}

// ============================================================
// Matrix
// ============================================================

/// Affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [oa, ob, oc, od, oe, of] = other.0;
        Matrix([
            a * oa + b * oc,
            a * ob + b * od,
            c * oa + d * oc,
            c * ob + d * od,
            e * oa + f * oc + oe,
            e * ob + f * od + of,
        ])
    }

    fn origin(&self) -> (f32, f32) {
        (self.0[4], self.0[5])
    }

    fn vertical_scale(&self) -> f32 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }
}

// ============================================================
// Content Stream Extractor
// ============================================================

/// Text state tracked while walking a content stream
#[derive(Debug, Clone)]
struct TextState {
    ctm: Matrix,
    tm: Matrix,
    tlm: Matrix,
    /// Resource name of the current font
    font: Option<Vec<u8>>,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font: None,
            font_size: DEFAULT_FONT_SIZE,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }
}

/// One show-text operation in device space
#[derive(Debug, Clone)]
struct Run {
    text: String,
    size: f32,
    x: f32,
    baseline: f32,
    end_x: f32,
}

/// Default [`LayoutExtractor`] reading text straight from content streams
#[derive(Debug, Clone, Default)]
pub struct ContentStreamExtractor {
    options: ExtractOptions,
}

impl ContentStreamExtractor {
    /// Create an extractor with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with specified options
    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Access the options
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    fn collect_runs(
        &self,
        doc: &Document,
        operations: &[Operation],
        resources: Option<&Dictionary>,
    ) -> Vec<Run> {
        let mut runs = Vec::new();
        interpret(doc, operations, resources, TextState::default(), 0, &mut runs);
        runs
    }

    fn merge_runs(&self, runs: Vec<Run>) -> Vec<Run> {
        let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
        for run in runs {
            if let Some(last) = merged.last_mut() {
                let same_line = (run.baseline - last.baseline).abs() <= self.options.y_tolerance;
                let same_size = (run.size - last.size).abs() < 0.01;
                if same_line && same_size && run.x >= last.x {
                    let gap = run.x - last.end_x;
                    let needs_space = gap > run.size * 0.15
                        && !last.text.ends_with(char::is_whitespace)
                        && !run.text.starts_with(char::is_whitespace);
                    if needs_space {
                        last.text.push(' ');
                    }
                    last.text.push_str(&run.text);
                    last.end_x = last.end_x.max(run.end_x);
                    continue;
                }
            }
            merged.push(run);
        }
        merged
    }
}

impl LayoutExtractor for ContentStreamExtractor {
    fn extract_page(
        &self,
        doc: &Document,
        page_number: u32,
        page_id: ObjectId,
    ) -> Result<Vec<TextFragment>> {
        let page = doc.get_dictionary(page_id)?;
        let bytes = page_content_bytes(doc, page)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let content = match Content::decode(&bytes) {
            Ok(content) => content,
            Err(e) => {
                warn!(page = page_number, error = %e, "skipping undecodable content stream");
                return Ok(Vec::new());
            }
        };

        let resources = resolve_inherited(doc, page_id, b"Resources").and_then(|r| r.as_dict().ok());
        let mut runs = self.collect_runs(doc, &content.operations, resources);
        if self.options.merge_lines {
            runs = self.merge_runs(runs);
        }

        let page_top = page_top(doc, page_id);
        Ok(runs
            .into_iter()
            .map(|run| {
                TextFragment::new(run.text, run.size, page_number)
                    .at(run.x, page_top - (run.baseline + run.size))
            })
            .collect())
    }
}

// ============================================================
// Interpreter
// ============================================================

/// Walk one content stream, recursing into Form XObjects it paints
fn interpret(
    doc: &Document,
    operations: &[Operation],
    resources: Option<&Dictionary>,
    mut state: TextState,
    depth: usize,
    runs: &mut Vec<Run>,
) {
    let mut stack: Vec<TextState> = Vec::new();
    let mut fonts: HashMap<Vec<u8>, FontDecoder> = HashMap::new();

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => stack.push(state.clone()),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    state = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    state.ctm = m.then(&state.ctm);
                }
            }
            "BT" => {
                state.tm = Matrix::IDENTITY;
                state.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    if !fonts.contains_key(name) {
                        fonts.insert(name.clone(), font_decoder(doc, resources, name));
                    }
                    state.font = Some(name.clone());
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    state.leading = -ty;
                }
                state.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    state.tm = m;
                    state.tlm = m;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = current_decoder(&fonts, &state).decode(bytes);
                    show_text(&mut state, text, runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text = decode_tj_array(items, current_decoder(&fonts, &state));
                    show_text(&mut state, text, runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = current_decoder(&fonts, &state).decode(bytes);
                    show_text(&mut state, text, runs);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let text = current_decoder(&fonts, &state).decode(bytes);
                    show_text(&mut state, text, runs);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    paint_form(doc, resources, name, &state, depth, runs);
                }
            }
            _ => {}
        }
    }
}

/// Interpret a Form XObject under the current state; other XObjects carry no text
fn paint_form(
    doc: &Document,
    resources: Option<&Dictionary>,
    name: &[u8],
    state: &TextState,
    depth: usize,
    runs: &mut Vec<Run>,
) {
    let Some(stream) = resources
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|x| resolve(doc, x).as_dict().ok())
        .and_then(|x| x.get(name).ok())
        .and_then(|obj| resolve(doc, obj).as_stream().ok())
    else {
        return;
    };
    if !matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Form") {
        return;
    }
    if depth >= MAX_FORM_DEPTH {
        warn!(
            form = %String::from_utf8_lossy(name),
            depth,
            "form nesting too deep, skipping"
        );
        return;
    }

    let content = match stream_bytes(stream).map(|bytes| Content::decode(&bytes)) {
        Ok(Ok(content)) => content,
        Ok(Err(e)) => {
            warn!(form = %String::from_utf8_lossy(name), error = %e, "skipping undecodable form");
            return;
        }
        Err(e) => {
            warn!(form = %String::from_utf8_lossy(name), error = %e, "skipping unreadable form");
            return;
        }
    };

    let matrix = stream
        .dict
        .get(b"Matrix")
        .ok()
        .and_then(|m| resolve(doc, m).as_array().ok())
        .and_then(|m| Matrix::from_operands(m))
        .unwrap_or(Matrix::IDENTITY);
    let form_resources = stream
        .dict
        .get(b"Resources")
        .ok()
        .and_then(|r| resolve(doc, r).as_dict().ok())
        .or(resources);

    let mut inner = state.clone();
    inner.ctm = matrix.then(&state.ctm);
    trace!(form = %String::from_utf8_lossy(name), depth, "entering form");
    interpret(doc, &content.operations, form_resources, inner, depth + 1, runs);
}

fn font_decoder(doc: &Document, resources: Option<&Dictionary>, name: &[u8]) -> FontDecoder {
    resources
        .and_then(|r| r.get(b"Font").ok())
        .and_then(|fonts| resolve(doc, fonts).as_dict().ok())
        .and_then(|fonts| fonts.get(name).ok())
        .and_then(|font| resolve(doc, font).as_dict().ok())
        .map(|font| FontDecoder::from_font(doc, font))
        .unwrap_or_default()
}

fn current_decoder<'f>(fonts: &'f HashMap<Vec<u8>, FontDecoder>, state: &TextState) -> &'f FontDecoder {
    state
        .font
        .as_ref()
        .and_then(|name| fonts.get(name))
        .unwrap_or(&*SIMPLE_DECODER)
}

// ============================================================
// Helpers
// ============================================================

fn show_text(state: &mut TextState, text: String, runs: &mut Vec<Run>) {
    if text.is_empty() {
        return;
    }
    let trm = state.tm.then(&state.ctm);
    let (x, baseline) = trm.origin();
    let scale = trm.vertical_scale();
    let size = state.font_size.abs() * if scale > 0.0 { scale } else { 1.0 };

    let advance = text.chars().count() as f32 * state.font_size.abs() * AVG_GLYPH_WIDTH;
    state.tm = Matrix::translation(advance, 0.0).then(&state.tm);
    let end_x = state.tm.then(&state.ctm).origin().0;

    runs.push(Run {
        text,
        size,
        x,
        baseline,
        end_x,
    });
}

fn decode_tj_array(items: &[Object], decoder: &FontDecoder) -> String {
    let mut combined = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decoder.decode(bytes)),
            other => {
                if let Some(adjustment) = number(other) {
                    if -adjustment > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(char::is_whitespace)
                    {
                        combined.push(' ');
                    }
                }
            }
        }
    }
    combined
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Concatenated, decompressed bytes of a page's content streams
pub(crate) fn page_content_bytes(doc: &Document, page: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    let refs: Vec<ObjectId> = match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => items.iter().filter_map(|o| o.as_reference().ok()).collect(),
            _ => vec![*id],
        },
        Object::Array(items) => items.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => return Err(LayoutError::InvalidPdf("/Contents is not a reference or array".to_string())),
    };

    let mut content = Vec::new();
    for id in refs {
        let bytes = stream_bytes(doc.get_object(id)?.as_stream()?)?;
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&bytes);
    }
    Ok(content)
}

/// Stream bytes, decompressed when filtered
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Look up a page attribute, following `/Parent` for inheritable keys
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = current.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn page_top(doc: &Document, page_id: ObjectId) -> f32 {
    resolve_inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .and_then(|arr| {
            let lly = arr.get(1).and_then(number)?;
            let ury = arr.get(3).and_then(number)?;
            Some(lly.max(ury))
        })
        .unwrap_or(DEFAULT_PAGE_HEIGHT)
}

// ============================================================
// Tests
// ============================================================
