//! Tag Plan
//!
//! The finalized block list is turned into a plan (tree + spans) before the
//! document is touched. `apply` resolves every page and `/Contents` slot
//! read-only first, then commits streams and structure objects together.

use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use super::content::{ContentStreamRewriter, MarkedContentSpan};
use super::tree::StructTreeBuilder;
use super::types::{ApplySummary, Result, StructElem, StructTree, TaggingError};
use crate::classify::Block;

/// Where a page's new content streams go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentsSlot {
    /// No `/Contents` yet
    Missing,
    /// A single indirect stream, promoted to an array
    Single(ObjectId),
    /// An array stored directly in the page dictionary
    InlineArray,
    /// An indirect array object
    IndirectArray(ObjectId),
}

/// A validated set of edits for one document
#[derive(Debug, Clone)]
pub struct TagPlan {
    tree: StructTree,
    spans: Vec<MarkedContentSpan>,
}

impl TagPlan {
    /// Validate blocks against the page count and build tree and spans
    pub fn new(blocks: &[Block], page_count: usize) -> Result<Self> {
        for block in blocks {
            if block.page_number == 0 {
                return Err(TaggingError::MalformedBlock(format!(
                    "block {:?} has no page number",
                    block.text
                )));
            }
            if block.page_number as usize > page_count {
                return Err(TaggingError::PageOutOfRange {
                    page: block.page_number,
                    page_count,
                });
            }
        }

        let tree = StructTreeBuilder::build(blocks)?;
        let spans = ContentStreamRewriter::spans(blocks);
        Ok(Self { tree, spans })
    }

    /// The structure tree to attach
    pub fn tree(&self) -> &StructTree {
        &self.tree
    }

    /// The spans to append, in block order
    pub fn spans(&self) -> &[MarkedContentSpan] {
        &self.spans
    }

    /// Check if the plan tags nothing
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Commit the plan to the document
    pub fn apply(self, doc: &mut Document) -> Result<ApplySummary> {
        let pages = doc.get_pages();
        let catalog_id = catalog_id(doc)?;
        let replaced_existing_tree = doc.get_dictionary(catalog_id)?.has(b"StructTreeRoot");

        // Resolve everything before the first mutation.
        let mut slots: BTreeMap<u32, (ObjectId, ContentsSlot)> = BTreeMap::new();
        for group in self.tree.groups() {
            let page = group.page_number;
            let page_id = *pages.get(&page).ok_or(TaggingError::PageOutOfRange {
                page,
                page_count: pages.len(),
            })?;
            let slot = contents_slot(doc, page_id)?;

            let planned: HashSet<u32> = group.elements().filter_map(StructElem::mcid).collect();
            if let Some(&mcid) = ContentStreamRewriter::page_mcids(doc, page, page_id)?
                .iter()
                .find(|mcid| planned.contains(*mcid))
            {
                return Err(TaggingError::McidInUse { page, mcid });
            }
            slots.insert(page, (page_id, slot));
        }

        let mut encoded = Vec::with_capacity(self.spans.len());
        for span in &self.spans {
            encoded.push((span.page_number, span.encode()?));
        }

        // Commit content streams.
        let mut new_streams: BTreeMap<u32, Vec<Object>> = BTreeMap::new();
        for (page, bytes) in encoded {
            let stream_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
            new_streams.entry(page).or_default().push(Object::Reference(stream_id));
        }
        let streams_added = new_streams.values().map(Vec::len).sum();
        for (page, refs) in new_streams {
            let (page_id, slot) = slots[&page];
            append_streams(doc, page_id, slot, refs)?;
            debug!(page, "appended marked-content streams");
        }

        // Commit the structure tree.
        let root_id = doc.new_object_id();
        let mut group_refs = Vec::with_capacity(self.tree.groups().len());
        let mut nums = Vec::new();
        let mut struct_elements = 0;
        let mut tagged: HashSet<ObjectId> = HashSet::new();

        for (key, group) in self.tree.groups().iter().enumerate() {
            let (page_id, _) = slots[&group.page_number];
            let group_id = doc.new_object_id();

            let mut leaf_refs = Vec::new();
            let mut by_mcid: HashMap<u32, ObjectId> = HashMap::new();
            for leaf in group.elements() {
                let mcid = leaf.mcid().ok_or_else(|| {
                    TaggingError::MalformedBlock("structure leaf without MCID".to_string())
                })?;
                let leaf_id = doc.add_object(dictionary! {
                    "Type" => "StructElem",
                    "S" => Object::Name(leaf.role.name().as_bytes().to_vec()),
                    "P" => Object::Reference(group_id),
                    "Pg" => Object::Reference(page_id),
                    "K" => Object::Integer(i64::from(mcid)),
                });
                leaf_refs.push(Object::Reference(leaf_id));
                by_mcid.insert(mcid, leaf_id);
            }
            struct_elements += leaf_refs.len() + 1;

            doc.objects.insert(
                group_id,
                Object::Dictionary(dictionary! {
                    "Type" => "StructElem",
                    "S" => Object::Name(group.role.name().as_bytes().to_vec()),
                    "P" => Object::Reference(root_id),
                    "Pg" => Object::Reference(page_id),
                    "K" => Object::Array(leaf_refs),
                }),
            );
            group_refs.push(Object::Reference(group_id));

            nums.push(Object::Integer(key as i64));
            nums.push(Object::Array(parent_tree_entry(&by_mcid)));
            set_page_entry(doc, page_id, "StructParents", Object::Integer(key as i64))?;
            tagged.insert(page_id);
        }

        let parent_tree_id = doc.add_object(dictionary! { "Nums" => Object::Array(nums) });
        doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "StructTreeRoot",
                "K" => Object::Array(group_refs),
                "ParentTree" => Object::Reference(parent_tree_id),
                "ParentTreeNextKey" => Object::Integer(self.tree.groups().len() as i64),
            }),
        );

        // Untagged pages must not point into the new parent tree.
        for page_id in pages.values() {
            if !tagged.contains(page_id) {
                if let Ok(Object::Dictionary(page)) = doc.get_object_mut(*page_id) {
                    page.remove(b"StructParents");
                }
            }
        }

        let catalog = doc.get_object_mut(catalog_id)?.as_dict_mut()?;
        catalog.set("StructTreeRoot", Object::Reference(root_id));
        if !self.tree.is_empty() {
            catalog.set("MarkInfo", dictionary! { "Marked" => Object::Boolean(true) });
        }

        if replaced_existing_tree {
            let pruned = doc.prune_objects();
            debug!(pruned = pruned.len(), "pruned objects of the replaced structure tree");
        }

        let summary = ApplySummary {
            tagged_pages: tagged.len(),
            streams_added,
            struct_elements,
            replaced_existing_tree,
        };
        info!(
            pages = summary.tagged_pages,
            spans = summary.streams_added,
            elements = summary.struct_elements,
            "structure tree attached"
        );
        Ok(summary)
    }
}

fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| TaggingError::InvalidDocument("trailer has no /Root reference".to_string()))
}

fn contents_slot(doc: &Document, page_id: ObjectId) -> Result<ContentsSlot> {
    let page = doc.get_dictionary(page_id)?;
    match page.get(b"Contents") {
        Err(_) => Ok(ContentsSlot::Missing),
        Ok(Object::Array(_)) => Ok(ContentsSlot::InlineArray),
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Stream(_) => Ok(ContentsSlot::Single(*id)),
            Object::Array(_) => Ok(ContentsSlot::IndirectArray(*id)),
            _ => Err(TaggingError::InvalidDocument(format!(
                "/Contents of page object {:?} references neither a stream nor an array",
                page_id
            ))),
        },
        Ok(_) => Err(TaggingError::InvalidDocument(format!(
            "/Contents of page object {:?} is not a reference or array",
            page_id
        ))),
    }
}

fn append_streams(
    doc: &mut Document,
    page_id: ObjectId,
    slot: ContentsSlot,
    refs: Vec<Object>,
) -> Result<()> {
    match slot {
        ContentsSlot::Missing => set_page_entry(doc, page_id, "Contents", Object::Array(refs)),
        ContentsSlot::Single(original) => {
            let mut contents = Vec::with_capacity(refs.len() + 1);
            contents.push(Object::Reference(original));
            contents.extend(refs);
            set_page_entry(doc, page_id, "Contents", Object::Array(contents))
        }
        ContentsSlot::InlineArray => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            page.get_mut(b"Contents")?.as_array_mut()?.extend(refs);
            Ok(())
        }
        ContentsSlot::IndirectArray(array_id) => {
            doc.get_object_mut(array_id)?.as_array_mut()?.extend(refs);
            Ok(())
        }
    }
}

fn set_page_entry(doc: &mut Document, page_id: ObjectId, key: &str, value: Object) -> Result<()> {
    doc.get_object_mut(page_id)?.as_dict_mut()?.set(key, value);
    Ok(())
}

/// Parent tree array for one page: index = MCID, gaps are null
///
/// The array runs to the page's largest MCID. Under document-wide numbering
/// every page pads up to the running counter, so total size grows with
/// pages × blocks.
fn parent_tree_entry(by_mcid: &HashMap<u32, ObjectId>) -> Vec<Object> {
    let len = by_mcid.keys().max().map_or(0, |max| *max as usize + 1);
    let mut entry = vec![Object::Null; len];
    for (mcid, id) in by_mcid {
        entry[*mcid as usize] = Object::Reference(*id);
    }
    entry
}

// ============================================================
// Tests
// ============================================================
