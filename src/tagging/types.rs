//! Common types for the tagging module

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::classify::BlockKind;

// ============================================================
// Error Types
// ============================================================

/// Tagging error types
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("Malformed block: {0}")]
    MalformedBlock(String),

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: usize },

    #[error("MCID {mcid} is assigned twice on page {page}")]
    DuplicateMcid { page: u32, mcid: u32 },

    #[error("Page {page} already uses MCID {mcid} in its content streams")]
    McidInUse { page: u32, mcid: u32 },

    #[error("Page {page} content cannot be scanned for MCIDs: {reason}")]
    UnreadableContent { page: u32, reason: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Failed to write {path}: {reason}")]
    Serialization { path: PathBuf, reason: String },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TaggingError {
    /// Blocks and document disagree; nothing may be written
    pub fn is_input_integrity(&self) -> bool {
        matches!(
            self,
            TaggingError::MalformedBlock(_)
                | TaggingError::PageOutOfRange { .. }
                | TaggingError::DuplicateMcid { .. }
                | TaggingError::McidInUse { .. }
                | TaggingError::UnreadableContent { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TaggingError>;

// ============================================================
// Structure Tree Model
// ============================================================

/// Structure type of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructRole {
    /// Per-page grouping element
    Document,
    /// Leaf carrying one classified block
    Block(BlockKind),
}

impl StructRole {
    /// Structure type name written to `/S`
    pub fn name(&self) -> &'static str {
        match self {
            StructRole::Document => "Document",
            StructRole::Block(kind) => kind.role(),
        }
    }
}

impl From<BlockKind> for StructRole {
    fn from(kind: BlockKind) -> Self {
        StructRole::Block(kind)
    }
}

/// Child of a structure element
#[derive(Debug, Clone, PartialEq)]
pub enum StructChild {
    /// Nested element
    Element(StructElem),
    /// Marked-content reference on the element's page
    Mcid(u32),
}

/// Node of the logical structure tree
#[derive(Debug, Clone, PartialEq)]
pub struct StructElem {
    /// Structure type
    pub role: StructRole,

    /// Page the element's content lives on (1-based)
    pub page_number: u32,

    /// Ordered children
    pub children: Vec<StructChild>,
}

impl StructElem {
    /// Create a leaf referencing one marked-content span
    pub fn leaf(kind: BlockKind, page_number: u32, mcid: u32) -> Self {
        Self {
            role: StructRole::Block(kind),
            page_number,
            children: vec![StructChild::Mcid(mcid)],
        }
    }

    /// Create a page grouping element around leaves
    pub fn page_group(page_number: u32, leaves: Vec<StructElem>) -> Self {
        Self {
            role: StructRole::Document,
            page_number,
            children: leaves.into_iter().map(StructChild::Element).collect(),
        }
    }

    /// The MCID of a leaf
    pub fn mcid(&self) -> Option<u32> {
        match self.children.as_slice() {
            [StructChild::Mcid(mcid)] => Some(*mcid),
            _ => None,
        }
    }

    /// Child elements in order
    pub fn elements(&self) -> impl Iterator<Item = &StructElem> {
        self.children.iter().filter_map(|child| match child {
            StructChild::Element(elem) => Some(elem),
            StructChild::Mcid(_) => None,
        })
    }
}

/// The structure tree root: page groups in first-appearance order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructTree {
    groups: Vec<StructElem>,
}

impl StructTree {
    pub(crate) fn from_groups(groups: Vec<StructElem>) -> Self {
        Self { groups }
    }

    /// Page grouping elements
    pub fn groups(&self) -> &[StructElem] {
        &self.groups
    }

    /// Check if the tree has no page groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of leaf elements
    pub fn leaf_count(&self) -> usize {
        self.groups.iter().map(|g| g.elements().count()).sum()
    }

    /// MCIDs referenced by leaves, keyed by page, in leaf order
    pub fn mcids_by_page(&self) -> BTreeMap<u32, Vec<u32>> {
        let mut map: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for group in &self.groups {
            let entry = map.entry(group.page_number).or_default();
            entry.extend(group.elements().filter_map(StructElem::mcid));
        }
        map
    }
}

/// What applying a plan changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Pages that received marked content
    pub tagged_pages: usize,

    /// Content streams appended
    pub streams_added: usize,

    /// Structure elements written (groups and leaves)
    pub struct_elements: usize,

    /// A previous structure tree was replaced
    pub replaced_existing_tree: bool,
}

// ============================================================
// Tests
// ============================================================
