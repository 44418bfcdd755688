//! Page index over normalized highlights

use std::collections::HashMap;

use super::NormalizedHighlight;

/// Highlights bucketed by 1-based page number.
///
/// Order within a page is normalization order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageHighlightIndex {
    by_page: HashMap<u32, Vec<NormalizedHighlight>>,
}

impl PageHighlightIndex {
    /// Highlights for a page, empty if the page has none
    #[must_use]
    pub fn page(&self, page_number: u32) -> &[NormalizedHighlight] {
        self.by_page
            .get(&page_number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pages that carry at least one highlight, ascending
    #[must_use]
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.by_page.keys().copied().collect();
        pages.sort_unstable();
        pages
    }

    /// Total number of highlights across all pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_page.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }
}

/// Group highlights by page, preserving relative order within each page.
#[must_use]
pub fn group_by_page(highlights: &[NormalizedHighlight]) -> PageHighlightIndex {
    let mut by_page: HashMap<u32, Vec<NormalizedHighlight>> = HashMap::new();
    for highlight in highlights {
        by_page
            .entry(highlight.page_number)
            .or_default()
            .push(highlight.clone());
    }
    PageHighlightIndex { by_page }
}
