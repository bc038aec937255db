//! Ordering, pagination, index and bookmark algorithms
//!
//! Pure functions over a document list. The stepper calls them with the
//! current order, so nothing here can observe a stale order.

use filing_types::ValidationError;
use serde::{Deserialize, Serialize};

use crate::document::{bookmark_path, Bookmark, CompiledDocument, IndexEntry, PageRange};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// One running sequence across the whole filing
    #[default]
    Continuous,
    /// Numbering restarts at 1 whenever the section changes
    Sectional,
}

/// Move the document at `from` to `to` and renumber `1..N`.
pub fn reorder(
    documents: &[CompiledDocument],
    from: usize,
    to: usize,
) -> Result<Vec<CompiledDocument>, ValidationError> {
    let len = documents.len();
    for index in [from, to] {
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len });
        }
    }

    let mut reordered = documents.to_vec();
    let moved = reordered.remove(from);
    reordered.insert(to, moved);
    renumber(&mut reordered);
    Ok(reordered)
}

pub fn renumber(documents: &mut [CompiledDocument]) {
    for (i, doc) in documents.iter_mut().enumerate() {
        doc.order = i as u32 + 1;
        doc.bookmark_path = bookmark_path(doc.order, &doc.name);
    }
}

pub fn paginate(documents: &[CompiledDocument], mode: PaginationMode) -> Vec<CompiledDocument> {
    let mut paginated = documents.to_vec();
    let mut next_page = 1;
    let mut section = paginated.first().map(|d| d.section);

    for doc in paginated.iter_mut() {
        if mode == PaginationMode::Sectional && section != Some(doc.section) {
            section = Some(doc.section);
            next_page = 1;
        }
        let start = next_page;
        let end = start + doc.page_count - 1;
        doc.page_range = Some(PageRange { start, end });
        next_page = end + 1;
    }

    paginated
}

pub fn clear_pagination(documents: &[CompiledDocument]) -> Vec<CompiledDocument> {
    documents
        .iter()
        .cloned()
        .map(|mut d| {
            d.page_range = None;
            d
        })
        .collect()
}

pub fn build_index(documents: &[CompiledDocument]) -> Vec<IndexEntry> {
    documents
        .iter()
        .map(|d| IndexEntry {
            index: d.order,
            document_id: d.id.clone(),
            document_name: d.name.clone(),
            page_range: d.page_range,
        })
        .collect()
}

pub fn build_bookmarks(documents: &[CompiledDocument]) -> Vec<Bookmark> {
    documents
        .iter()
        .map(|d| Bookmark {
            order: d.order,
            document_id: d.id.clone(),
            title: d.bookmark_path.clone(),
            page: d.page_range.map(|r| r.start),
        })
        .collect()
}

pub fn orders_contiguous(documents: &[CompiledDocument]) -> bool {
    documents
        .iter()
        .enumerate()
        .all(|(i, d)| d.order == i as u32 + 1)
}

/// First document whose range does not start right after its predecessor's
pub fn first_page_gap(documents: &[CompiledDocument]) -> Option<&CompiledDocument> {
    let mut expected = 1;
    for doc in documents {
        match doc.page_range {
            Some(range) if range.start == expected && range.len() == doc.page_count => {
                expected = range.end + 1;
            }
            _ => return Some(doc),
        }
    }
    None
}


#[cfg(test)]
mod proptests {
    use super::tests::compiled;
    use super::*;
    use crate::document::Section;
    use proptest::prelude::*;

    fn documents() -> impl Strategy<Value = Vec<CompiledDocument>> {
        prop::collection::vec((1u32..40, any::<bool>()), 1..12).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (pages, annexure))| {
                    let section = if annexure { Section::Annexures } else { Section::Main };
                    compiled(&format!("d{}", i), pages, section, i as u32 + 1)
                })
                .collect()
        })
    }

    proptest! {
        /// Any sequence of reorders yields a permutation numbered 1..N
        #[test]
        fn reorder_is_permutation(
            docs in documents(),
            moves in prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 0..10),
        ) {
            let mut current = docs.clone();
            for (from, to) in moves {
                let len = current.len();
                current = reorder(&current, from.index(len), to.index(len)).unwrap();
            }

            let mut before: Vec<_> = docs.iter().map(|d| d.id.clone()).collect();
            let mut after: Vec<_> = current.iter().map(|d| d.id.clone()).collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
            prop_assert!(orders_contiguous(&current));
        }

        /// Continuous pagination: doc 1 starts at 1, each next starts after the previous end
        #[test]
        fn continuous_pagination_is_contiguous(docs in documents()) {
            let paginated = paginate(&docs, PaginationMode::Continuous);
            prop_assert_eq!(paginated[0].page_range.unwrap().start, 1);
            for pair in paginated.windows(2) {
                prop_assert_eq!(
                    pair[1].page_range.unwrap().start,
                    pair[0].page_range.unwrap().end + 1
                );
            }
            prop_assert!(first_page_gap(&paginated).is_none());
        }

        /// Index length equals document count and preserves order
        #[test]
        fn index_preserves_order(docs in documents(), from in 0usize..12, to in 0usize..12) {
            let len = docs.len();
            let docs = reorder(&docs, from % len, to % len).unwrap();
            let index = build_index(&docs);
            prop_assert_eq!(index.len(), docs.len());
            for (entry, doc) in index.iter().zip(&docs) {
                prop_assert_eq!(&entry.document_id, &doc.id);
                prop_assert_eq!(entry.index, doc.order);
            }
        }
    }
}
