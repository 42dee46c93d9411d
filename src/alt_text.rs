//! Image alternative text module
//!
//! Image files exported for captioning are named `page<NNN>_img<MMM>.<ext>`,
//! and captions come back keyed by that name. [`ImageKey`] is the single
//! place that format is produced and parsed, so keys derived while
//! injecting always match the ones written while exporting.
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_a11y_tagger::{inject_alt_text, load_alt_text_map, load_document};
//! use std::path::Path;
//!
//! let mut doc = load_document(Path::new("report.pdf")).unwrap();
//! let map = load_alt_text_map(Path::new("alt_map.json")).unwrap();
//! let report = inject_alt_text(&mut doc, &map).unwrap();
//! println!("{} applied, {} unmatched", report.applied.len(), report.unmatched.len());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::layout::resolve_inherited;
use crate::text::text_string;

/// Alt-text error types
#[derive(Debug, Error)]
pub enum AltTextError {
    #[error("Invalid image key: {0:?}")]
    InvalidKey(String),

    #[error("Failed to read alt-text map {path}: {reason}")]
    MapRead { path: PathBuf, reason: String },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

pub type Result<T> = std::result::Result<T, AltTextError>;

/// Captions keyed by image file name
pub type AltTextMap = BTreeMap<String, String>;

/// Exported image file type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExt {
    /// JPEG data (`DCTDecode`)
    Jpg,
    /// Everything else, re-encoded losslessly
    Png,
}

impl ImageExt {
    /// Extension chosen from the image stream's first filter
    pub fn from_filter(filter: Option<&[u8]>) -> Self {
        match filter {
            Some(b"DCTDecode") => ImageExt::Jpg,
            _ => ImageExt::Png,
        }
    }

    /// File extension without the dot
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageExt::Jpg => "jpg",
            ImageExt::Png => "png",
        }
    }
}

/// Deterministic name of an image: page and 1-based per-page ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey {
    pub page_number: u32,
    pub ordinal: u32,
    pub ext: ImageExt,
}

impl ImageKey {
    pub fn new(page_number: u32, ordinal: u32, ext: ImageExt) -> Self {
        Self {
            page_number,
            ordinal,
            ext,
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page{:03}_img{:03}.{}",
            self.page_number,
            self.ordinal,
            self.ext.as_str()
        )
    }
}

impl Serialize for ImageKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for ImageKey {
    type Err = AltTextError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AltTextError::InvalidKey(s.to_string());

        let (stem, ext) = s.rsplit_once('.').ok_or_else(invalid)?;
        let ext = match ext {
            "jpg" => ImageExt::Jpg,
            "png" => ImageExt::Png,
            _ => return Err(invalid()),
        };
        let (page, ordinal) = stem
            .strip_prefix("page")
            .and_then(|rest| rest.split_once("_img"))
            .ok_or_else(invalid)?;

        let number = |digits: &str| -> Option<u32> {
            if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok().filter(|n| *n > 0)
        };
        let page_number = number(page).ok_or_else(invalid)?;
        let ordinal = number(ordinal).ok_or_else(invalid)?;

        Ok(ImageKey::new(page_number, ordinal, ext))
    }
}

/// An image XObject placed on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageImage {
    /// Deterministic key
    pub key: ImageKey,

    /// Resource name in the page's `/XObject` dictionary
    pub resource_name: String,

    /// Object id of the image stream
    #[serde(skip)]
    pub id: ObjectId,

    /// Image already carries `/Alt`
    pub has_alt: bool,
}

/// Image XObjects of one page in resource order
pub fn page_images(doc: &Document, page_number: u32, page_id: ObjectId) -> Result<Vec<PageImage>> {
    let Some(resources) = resolve_inherited(doc, page_id, b"Resources").and_then(|obj| as_dict(doc, obj))
    else {
        return Ok(Vec::new());
    };
    let Some(xobjects) = resources.get(b"XObject").ok().and_then(|obj| as_dict(doc, obj)) else {
        return Ok(Vec::new());
    };

    let mut images = Vec::new();
    for (name, value) in xobjects.iter() {
        let Ok(id) = value.as_reference() else {
            warn!(page = page_number, "inline XObject entry skipped");
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            continue;
        };
        let is_image = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image");
        if !is_image {
            continue;
        }

        let ordinal = images.len() as u32 + 1;
        images.push(PageImage {
            key: ImageKey::new(page_number, ordinal, ImageExt::from_filter(first_filter(&stream.dict))),
            resource_name: String::from_utf8_lossy(name).into_owned(),
            id,
            has_alt: stream.dict.has(b"Alt"),
        });
    }
    Ok(images)
}

/// Image XObjects of every page, pages ascending
pub fn document_images(doc: &Document) -> Result<Vec<PageImage>> {
    let mut all = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        all.extend(page_images(doc, page_number, page_id)?);
    }
    Ok(all)
}

fn as_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        _ => None,
    }
}

fn first_filter(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(filters) => match filters.first()? {
            Object::Name(name) => Some(name.as_slice()),
            _ => None,
        },
        _ => None,
    }
}

/// Read a JSON object of `{ "<image key>": "<alt text>" }`
pub fn load_alt_text_map(path: &Path) -> Result<AltTextMap> {
    let fail = |reason: String| AltTextError::MapRead {
        path: path.to_path_buf(),
        reason,
    };
    let json = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| fail(e.to_string()))
}

/// Outcome of an injection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AltTextReport {
    /// Keys written onto an image
    pub applied: Vec<String>,

    /// Map keys that named no image in the document
    pub unmatched: Vec<String>,
}

/// Write `/Alt` onto every image whose key is in the map
pub fn inject_alt_text(doc: &mut Document, map: &AltTextMap) -> Result<AltTextReport> {
    let targets: Vec<(String, ObjectId)> = document_images(doc)?
        .into_iter()
        .map(|image| (image.key.to_string(), image.id))
        .filter(|(key, _)| map.contains_key(key))
        .collect();

    let mut applied = BTreeSet::new();
    for (key, id) in targets {
        let alt = &map[&key];
        if let Object::Stream(stream) = doc.get_object_mut(id)? {
            stream.dict.set("Alt", text_string(alt));
            debug!(key = %key, "alt text written");
            applied.insert(key);
        }
    }

    let unmatched = map
        .keys()
        .filter(|key| !applied.contains(*key))
        .cloned()
        .collect();
    Ok(AltTextReport {
        applied: applied.into_iter().collect(),
        unmatched,
    })
}

// ============================================================
// Tests
// ============================================================
