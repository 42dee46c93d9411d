//! Structure Tree Builder
//!
//! Groups one leaf per block under a per-page `Document` element.

use std::collections::{HashMap, HashSet};

use super::types::{Result, StructElem, StructTree, TaggingError};
use crate::classify::Block;

/// Assembles the in-memory structure tree from classified blocks
pub struct StructTreeBuilder;

impl StructTreeBuilder {
    /// Build the tree; pages appear in the order they are first seen
    pub fn build(blocks: &[Block]) -> Result<StructTree> {
        let mut order: Vec<u32> = Vec::new();
        let mut leaves: HashMap<u32, Vec<StructElem>> = HashMap::new();
        let mut seen: HashSet<(u32, u32)> = HashSet::new();

        for block in blocks {
            if block.page_number == 0 {
                return Err(TaggingError::MalformedBlock(format!(
                    "block {:?} has no page number",
                    block.text
                )));
            }
            if block.text.is_empty() {
                return Err(TaggingError::MalformedBlock(format!(
                    "block with MCID {} on page {} has no text",
                    block.mcid, block.page_number
                )));
            }
            if !seen.insert((block.page_number, block.mcid)) {
                return Err(TaggingError::DuplicateMcid {
                    page: block.page_number,
                    mcid: block.mcid,
                });
            }

            let page_leaves = leaves.entry(block.page_number).or_insert_with(|| {
                order.push(block.page_number);
                Vec::new()
            });
            page_leaves.push(StructElem::leaf(block.kind, block.page_number, block.mcid));
        }

        let groups = order
            .into_iter()
            .filter_map(|page| {
                leaves
                    .remove(&page)
                    .map(|page_leaves| StructElem::page_group(page, page_leaves))
            })
            .collect();

        Ok(StructTree::from_groups(groups))
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BlockKind;
    use crate::tagging::types::StructRole;

    fn block(text: &str, kind: BlockKind, page: u32, mcid: u32) -> Block {
        Block {
            text: text.to_string(),
            kind,
            page_number: page,
            mcid,
            x0: 0.0,
            top: 0.0,
        }
    }

    #[test]
    fn test_empty_blocks_give_empty_tree() {
        let tree = StructTreeBuilder::build(&[]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.leaf_count(), 0);
    }

    #[test]
    fn test_single_page_order() {
        let blocks = vec![
            block("Annual Report", BlockKind::Heading1, 1, 0),
            block("Revenue grew 10%.", BlockKind::Paragraph, 1, 1),
        ];
        let tree = StructTreeBuilder::build(&blocks).unwrap();

        assert_eq!(tree.groups().len(), 1);
        let group = &tree.groups()[0];
        assert_eq!(group.role, StructRole::Document);
        let leaves: Vec<_> = group.elements().collect();
        assert_eq!(leaves[0].role, StructRole::Block(BlockKind::Heading1));
        assert_eq!(leaves[0].mcid(), Some(0));
        assert_eq!(leaves[1].role, StructRole::Block(BlockKind::Paragraph));
        assert_eq!(leaves[1].mcid(), Some(1));
    }

    #[test]
    fn test_pages_in_first_appearance_order() {
        let blocks = vec![
            block("c", BlockKind::Paragraph, 3, 0),
            block("a", BlockKind::Paragraph, 1, 0),
            block("c2", BlockKind::Paragraph, 3, 1),
        ];
        let tree = StructTreeBuilder::build(&blocks).unwrap();

        let pages: Vec<u32> = tree.groups().iter().map(|g| g.page_number).collect();
        assert_eq!(pages, vec![3, 1]);
        assert_eq!(tree.mcids_by_page()[&3], vec![0, 1]);
    }

    #[test]
    fn test_missing_page_number_fails_fast() {
        let result = StructTreeBuilder::build(&[block("x", BlockKind::Paragraph, 0, 0)]);
        assert!(matches!(result, Err(TaggingError::MalformedBlock(_))));
    }

    #[test]
    fn test_duplicate_mcid_rejected() {
        let blocks = vec![
            block("a", BlockKind::Paragraph, 1, 0),
            block("b", BlockKind::Paragraph, 1, 0),
        ];
        let result = StructTreeBuilder::build(&blocks);
        assert!(matches!(
            result,
            Err(TaggingError::DuplicateMcid { page: 1, mcid: 0 })
        ));
    }

    #[test]
    fn test_same_mcid_on_different_pages_is_fine() {
        let blocks = vec![
            block("a", BlockKind::Paragraph, 1, 0),
            block("b", BlockKind::Paragraph, 2, 0),
        ];
        let tree = StructTreeBuilder::build(&blocks).unwrap();
        assert_eq!(tree.groups().len(), 2);
    }
}
