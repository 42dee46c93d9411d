//! Block Classifier
//!
//! Turns the extracted fragment sequence into numbered blocks.

use std::collections::HashMap;

use tracing::debug;

use super::strategy::{ClassificationStrategy, FontSizeStrategy};
use super::types::{Block, ClassifyError, ClassifyOptions, McidScope, Result, ThresholdScope};
use crate::layout::TextFragment;

/// Classifies fragments and assigns marked-content identifiers
pub struct BlockClassifier {
    strategy: Box<dyn ClassificationStrategy>,
    options: ClassifyOptions,
}

impl BlockClassifier {
    /// Create a classifier using the font-size strategy
    pub fn new(options: ClassifyOptions) -> Self {
        let strategy = FontSizeStrategy::from_options(&options);
        Self {
            strategy: Box::new(strategy),
            options,
        }
    }

    /// Create a classifier with a custom strategy
    pub fn with_strategy(strategy: impl ClassificationStrategy + 'static, options: ClassifyOptions) -> Self {
        Self {
            strategy: Box::new(strategy),
            options,
        }
    }

    /// Access the options
    pub fn options(&self) -> &ClassifyOptions {
        &self.options
    }

    /// Classify the whole document's fragments in input order
    ///
    /// Blank fragments are skipped and consume no MCID. All maxima are
    /// measured before the first fragment is classified.
    pub fn classify(&self, fragments: &[TextFragment]) -> Result<Vec<Block>> {
        self.options.validate()?;
        validate_fragments(fragments)?;

        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let maxima = Maxima::measure(fragments, self.options.threshold_scope);
        let mut counter = McidCounter::new(self.options.mcid_scope);
        let mut blocks = Vec::with_capacity(fragments.len());

        for fragment in fragments {
            let text = fragment.text.trim();
            if text.is_empty() {
                continue;
            }

            let kind = self.strategy.classify(fragment, maxima.for_page(fragment.page_number));
            blocks.push(Block {
                text: text.to_string(),
                kind,
                page_number: fragment.page_number,
                mcid: counter.next(fragment.page_number),
                x0: fragment.x0,
                top: fragment.top,
            });
        }

        debug!(
            fragments = fragments.len(),
            blocks = blocks.len(),
            "classified fragments"
        );
        Ok(blocks)
    }
}

impl Default for BlockClassifier {
    fn default() -> Self {
        Self::new(ClassifyOptions::default())
    }
}

fn validate_fragments(fragments: &[TextFragment]) -> Result<()> {
    for (index, fragment) in fragments.iter().enumerate() {
        if fragment.page_number == 0 {
            return Err(ClassifyError::MalformedFragment {
                index,
                reason: "page number must be 1-based".to_string(),
            });
        }
        if !fragment.font_size.is_finite() || fragment.font_size < 0.0 {
            return Err(ClassifyError::MalformedFragment {
                index,
                reason: format!("font size {} is not a finite non-negative number", fragment.font_size),
            });
        }
    }
    Ok(())
}

/// Largest font size per threshold population
enum Maxima {
    Document(f32),
    Page(HashMap<u32, f32>),
}

impl Maxima {
    fn measure(fragments: &[TextFragment], scope: ThresholdScope) -> Self {
        match scope {
            ThresholdScope::Document => Maxima::Document(
                fragments
                    .iter()
                    .map(|f| f.font_size)
                    .fold(0.0, f32::max),
            ),
            ThresholdScope::Page => {
                let mut per_page: HashMap<u32, f32> = HashMap::new();
                for fragment in fragments {
                    let max = per_page.entry(fragment.page_number).or_insert(0.0);
                    *max = max.max(fragment.font_size);
                }
                Maxima::Page(per_page)
            }
        }
    }

    fn for_page(&self, page_number: u32) -> f32 {
        match self {
            Maxima::Document(max) => *max,
            Maxima::Page(per_page) => per_page.get(&page_number).copied().unwrap_or(0.0),
        }
    }
}

/// Dense, zero-based MCID numbering
struct McidCounter {
    scope: McidScope,
    global: u32,
    per_page: HashMap<u32, u32>,
}

impl McidCounter {
    fn new(scope: McidScope) -> Self {
        Self {
            scope,
            global: 0,
            per_page: HashMap::new(),
        }
    }

    fn next(&mut self, page_number: u32) -> u32 {
        let slot = match self.scope {
            McidScope::Document => &mut self.global,
            McidScope::Page => self.per_page.entry(page_number).or_insert(0),
        };
        let mcid = *slot;
        *slot += 1;
        mcid
    }
}

// ============================================================
// Tests
// ============================================================
