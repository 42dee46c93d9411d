//! Document metadata module
//!
//! Sets the document title and natural language, the two document-level
//! properties screen readers announce before any content.

use chrono::Utc;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::text::{decode_pdf_string, text_string};

/// Default natural language
pub const DEFAULT_LANG: &str = "en-US";

/// Metadata error types
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Invalid language tag: {0:?}")]
    InvalidLanguage(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Title and language to stamp onto a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Document title (Info `/Title`)
    pub title: Option<String>,

    /// BCP 47 language tag (catalog `/Lang`)
    pub lang: Option<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: None,
            lang: Some(DEFAULT_LANG.to_string()),
        }
    }
}

impl DocumentMetadata {
    /// Metadata that changes nothing
    pub fn none() -> Self {
        Self {
            title: None,
            lang: None,
        }
    }

    /// Set the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the language tag
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Check if there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.lang.is_none()
    }

    /// Validate the language tag
    pub fn validate(&self) -> Result<()> {
        match &self.lang {
            Some(lang) if !is_valid_language_tag(lang) => {
                Err(MetadataError::InvalidLanguage(lang.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Write title and language into the document
    pub fn apply(&self, doc: &mut Document) -> Result<()> {
        self.validate()?;
        if self.is_empty() {
            return Ok(());
        }

        let catalog_id = catalog_id(doc)?;
        if let Some(lang) = &self.lang {
            let catalog = doc.get_object_mut(catalog_id)?.as_dict_mut()?;
            catalog.set("Lang", Object::string_literal(lang.as_str()));
        }

        let info_id = info_id(doc);
        let info = doc.get_object_mut(info_id)?.as_dict_mut()?;
        if let Some(title) = &self.title {
            info.set("Title", text_string(title));
        }
        info.set("ModDate", Object::string_literal(pdf_date()));

        if self.title.is_some() {
            let catalog = doc.get_object_mut(catalog_id)?.as_dict_mut()?;
            let inline_prefs = matches!(catalog.get(b"ViewerPreferences"), Ok(Object::Dictionary(_)));
            if !inline_prefs {
                catalog.set("ViewerPreferences", Dictionary::new());
            }
            catalog
                .get_mut(b"ViewerPreferences")?
                .as_dict_mut()?
                .set("DisplayDocTitle", true);
        }

        debug!(title = ?self.title, lang = ?self.lang, "metadata applied");
        Ok(())
    }
}

/// Check a BCP 47 tag: alphabetic primary subtag, alphanumeric subtags of 1 to 8 chars
pub fn is_valid_language_tag(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let primary_ok = subtags
        .next()
        .is_some_and(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok && subtags.all(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn pdf_date() -> String {
    Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
}

fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| MetadataError::InvalidDocument("trailer has no /Root reference".to_string()))
}

/// The Info dictionary's id, creating one when the trailer has none
fn info_id(doc: &mut Document) -> ObjectId {
    if let Ok(id) = doc.trailer.get(b"Info").and_then(Object::as_reference) {
        if matches!(doc.get_object(id), Ok(Object::Dictionary(_))) {
            return id;
        }
    }
    let id = doc.add_object(Dictionary::new());
    doc.trailer.set("Info", Object::Reference(id));
    id
}

// ============================================================
// Document Report
// ============================================================

/// Accessibility-relevant facts about a document
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentInfo {
    /// PDF version from the header
    pub version: String,

    /// Number of pages
    pub page_count: usize,

    /// Info `/Title`
    pub title: Option<String>,

    /// Catalog `/Lang`
    pub lang: Option<String>,

    /// `/MarkInfo /Marked` is true
    pub marked: bool,

    /// Catalog carries a `/StructTreeRoot`
    pub has_struct_tree: bool,
}

impl DocumentInfo {
    /// Read the report from a loaded document
    pub fn read(doc: &Document) -> Self {
        let catalog = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
        let info = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();

        let marked = catalog
            .and_then(|c| c.get(b"MarkInfo").ok())
            .and_then(|m| match m {
                Object::Dictionary(d) => Some(d),
                Object::Reference(id) => doc.get_dictionary(*id).ok(),
                _ => None,
            })
            .and_then(|d| d.get(b"Marked").ok())
            .is_some_and(|v| matches!(v, Object::Boolean(true)));

        Self {
            version: doc.version.clone(),
            page_count: doc.get_pages().len(),
            title: info.and_then(|d| string_entry(d, b"Title")),
            lang: catalog.and_then(|d| string_entry(d, b"Lang")),
            marked,
            has_struct_tree: catalog.is_some_and(|c| c.has(b"StructTreeRoot")),
        }
    }
}

fn string_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

// ============================================================
// Tests
// ============================================================
