//! Offset/limit slicing of an already filtered sequence.

use std::num::NonZeroUsize;

use serde::Serialize;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 1000;
/// Page size used when a caller asks for everything with default pagination.
pub const DEFAULT_PAGE_LIMIT: NonZeroUsize = NonZeroUsize::new(MAX_PAGE_LIMIT).unwrap();

/// One page of a larger result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult<T> {
    /// Number of items before slicing.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub items: Vec<T>,
}

/// Returns `items[offset..offset + limit]`, clipped to the sequence.
///
/// An offset past the end yields an empty page; `total` is always the full
/// input length.
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: NonZeroUsize) -> PageResult<T> {
    let total = items.len();
    let items = items
        .into_iter()
        .skip(offset)
        .take(limit.get())
        .collect();

    PageResult {
        total,
        offset,
        limit: limit.get(),
        items,
    }
}

/// A single page holding every item.
pub fn single_page<T>(items: Vec<T>) -> PageResult<T> {
    let limit = NonZeroUsize::new(items.len()).unwrap_or(NonZeroUsize::MIN);
    paginate(items, 0, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_first_page() {
        let page = paginate((0..10).collect(), 0, limit(3));
        assert_eq!(page.total, 10);
        assert_eq!(page.offset, 0);
        assert_eq!(page.limit, 3);
        assert_eq!(page.items, vec![0, 1, 2]);
    }

    #[test]
    fn test_last_page_is_clipped() {
        let page = paginate((0..10).collect(), 8, limit(5));
        assert_eq!(page.items, vec![8, 9]);
        assert_eq!(page.total, 10);
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let page = paginate((0..4).collect::<Vec<i32>>(), 10, limit(2));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 4);
        assert_eq!(page.offset, 10);
    }

    #[test]
    fn test_single_page() {
        let page = single_page(vec!["a", "b"]);
        assert_eq!(page.total, 2);
        assert_eq!(page.limit, 2);
        assert_eq!(page.items, vec!["a", "b"]);

        let empty = single_page(Vec::<u8>::new());
        assert_eq!(empty.total, 0);
        assert_eq!(empty.limit, 1);
    }

    proptest! {
        #[test]
        fn prop_page_length(total in 0usize..200, offset in 0usize..250, n in 1usize..=MAX_PAGE_LIMIT) {
            let items: Vec<usize> = (0..total).collect();
            let page = paginate(items, offset, limit(n));

            prop_assert_eq!(page.total, total);
            prop_assert_eq!(page.items.len(), n.min(total.saturating_sub(offset)));
            // Slicing never reorders.
            for (i, item) in page.items.iter().enumerate() {
                prop_assert_eq!(*item, offset + i);
            }
        }
    }
}
