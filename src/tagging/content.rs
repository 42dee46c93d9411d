//! Content Stream Rewriter
//!
//! Encodes one marked-content span per block. The block text travels in
//! the span's `/ActualText` property, so the span paints nothing and the
//! page's original drawing operators remain the only visible output.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId};
use super::types::{Result, TaggingError};
use crate::classify::{Block, BlockKind};
use crate::layout::page_content_bytes;
use crate::text::text_string;

/// A `BDC … EMC` bracket bound to one structure leaf
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedContentSpan {
    /// Target page (1-based)
    pub page_number: u32,

    /// Identifier shared with the structure leaf
    pub mcid: u32,

    /// Role used as the marked-content tag
    pub kind: BlockKind,

    /// Text payload
    pub text: String,
}

impl MarkedContentSpan {
    /// Create the span for a block
    pub fn from_block(block: &Block) -> Self {
        Self {
            page_number: block.page_number,
            mcid: block.mcid,
            kind: block.kind,
            text: flatten_controls(&block.text),
        }
    }

    /// Content stream operators for the span
    pub fn operations(&self) -> Vec<Operation> {
        let properties = dictionary! {
            "MCID" => Object::Integer(i64::from(self.mcid)),
            "ActualText" => text_string(&self.text),
        };
        vec![
            Operation::new(
                "BDC",
                vec![
                    Object::Name(self.kind.role().as_bytes().to_vec()),
                    Object::Dictionary(properties),
                ],
            ),
            Operation::new("EMC", vec![]),
        ]
    }

    /// Serialized content stream bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let content = Content {
            operations: self.operations(),
        };
        Ok(content.encode()?)
    }
}

fn flatten_controls(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Produces the spans appended to each page
pub struct ContentStreamRewriter;

impl ContentStreamRewriter {
    /// One span per block, in block order
    pub fn spans(blocks: &[Block]) -> Vec<MarkedContentSpan> {
        blocks.iter().map(MarkedContentSpan::from_block).collect()
    }

    /// MCIDs already used by a page's content streams, in stream order
    ///
    /// Content that cannot be read or decoded is an integrity error: an
    /// unscanned page could already hold any MCID.
    pub fn page_mcids(doc: &Document, page_number: u32, page_id: ObjectId) -> Result<Vec<u32>> {
        let page = doc.get_dictionary(page_id)?;
        let bytes = page_content_bytes(doc, page).map_err(|e| TaggingError::UnreadableContent {
            page: page_number,
            reason: e.to_string(),
        })?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let content = Content::decode(&bytes).map_err(|e| TaggingError::UnreadableContent {
            page: page_number,
            reason: e.to_string(),
        })?;
        Ok(mcids_in(&content.operations))
    }
}

/// MCIDs carried by inline `BDC` property dictionaries
pub fn mcids_in(operations: &[Operation]) -> Vec<u32> {
    operations
        .iter()
        .filter(|op| op.operator == "BDC")
        .filter_map(|op| match op.operands.get(1) {
            Some(Object::Dictionary(props)) => match props.get(b"MCID") {
                Ok(Object::Integer(mcid)) => u32::try_from(*mcid).ok(),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

// ============================================================
// Tests
// ============================================================
