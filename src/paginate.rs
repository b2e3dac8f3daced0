//! Splitting table rows into pages.

use serde::{Deserialize, Serialize};

use crate::error::PaginationError;

/// Largest trailing page that may be folded into its predecessor.
pub const TRAILING_MERGE_MAX_ROWS: usize = 3;

const DEFAULT_PAGE_SIZE: usize = 12;
const DEFAULT_MERGE_MAX_COMBINED: usize = 15;

/// How many rows go on a table page and whether an undersized last page may be merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationPolicy {
    /// Rows per page. Must be greater than zero.
    pub page_size: usize,
    /// Fold a trailing page of at most [`TRAILING_MERGE_MAX_ROWS`] rows into the previous page.
    pub merge_trailing_page: bool,
    /// Upper bound on the size of a merged page.
    pub merge_max_combined: usize,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::merging()
    }
}

impl PaginationPolicy {
    /// Twelve rows per page, folding short trailing pages into pages of up to fifteen rows.
    pub fn merging() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            merge_trailing_page: true,
            merge_max_combined: DEFAULT_MERGE_MAX_COMBINED,
        }
    }

    /// Twelve rows per page, never merging.
    pub fn strict() -> Self {
        Self {
            merge_trailing_page: false,
            ..Self::merging()
        }
    }

    /// Sets the page size and returns the updated policy.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Splits `rows` into consecutive pages according to `policy`.
///
/// Concatenating the returned pages always reproduces `rows` in order.
pub fn paginate<T: Clone>(
    rows: &[T],
    policy: &PaginationPolicy,
) -> Result<Vec<Vec<T>>, PaginationError> {
    if policy.page_size == 0 {
        return Err(PaginationError::InvalidPageSize);
    }
    if rows.is_empty() {
        return Err(PaginationError::EmptyDataset);
    }

    let mut pages: Vec<Vec<T>> = rows
        .chunks(policy.page_size)
        .map(|chunk| chunk.to_vec())
        .collect();

    if policy.merge_trailing_page && pages.len() >= 2 {
        let last = pages[pages.len() - 1].len();
        let previous = pages[pages.len() - 2].len();
        if last <= TRAILING_MERGE_MAX_ROWS && previous + last <= policy.merge_max_combined {
            if let Some(trailing) = pages.pop() {
                if let Some(target) = pages.last_mut() {
                    target.extend(trailing);
                }
            }
        }
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(pages: &[Vec<usize>]) -> Vec<usize> {
        pages.iter().map(Vec::len).collect()
    }

    #[test]
    fn trailing_single_row_merges() {
        let rows: Vec<usize> = (0..25).collect();
        let pages = paginate(&rows, &PaginationPolicy::merging()).unwrap();
        assert_eq!(sizes(&pages), vec![12, 13]);
    }

    #[test]
    fn strict_policy_keeps_orphan_page() {
        let rows: Vec<usize> = (0..25).collect();
        let pages = paginate(&rows, &PaginationPolicy::strict()).unwrap();
        assert_eq!(sizes(&pages), vec![12, 12, 1]);
    }

    #[test]
    fn merge_respects_combined_limit() {
        // 12 + 4 exceeds the trailing limit, 12 + 3 fits exactly.
        let rows: Vec<usize> = (0..16).collect();
        let pages = paginate(&rows, &PaginationPolicy::merging()).unwrap();
        assert_eq!(sizes(&pages), vec![12, 4]);

        let rows: Vec<usize> = (0..15).collect();
        let pages = paginate(&rows, &PaginationPolicy::merging()).unwrap();
        assert_eq!(sizes(&pages), vec![15]);

        let tight = PaginationPolicy {
            merge_max_combined: 13,
            ..PaginationPolicy::merging()
        };
        let pages = paginate(&rows, &tight).unwrap();
        assert_eq!(sizes(&pages), vec![12, 3]);
    }

    #[test]
    fn single_short_page_is_left_alone() {
        let rows = vec!["a", "b"];
        let pages = paginate(&rows, &PaginationPolicy::merging()).unwrap();
        assert_eq!(pages, vec![vec!["a", "b"]]);
    }

    #[test]
    fn empty_rows_fail() {
        let rows: Vec<u8> = Vec::new();
        assert_eq!(
            paginate(&rows, &PaginationPolicy::default()),
            Err(PaginationError::EmptyDataset)
        );
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let policy = PaginationPolicy::merging().with_page_size(0);
        assert_eq!(paginate(&[1], &policy), Err(PaginationError::InvalidPageSize));
    }

    #[test]
    fn concatenation_reproduces_rows() {
        for policy in [PaginationPolicy::merging(), PaginationPolicy::strict()] {
            for page_size in 1..=14 {
                let policy = policy.with_page_size(page_size);
                for len in 1..=60usize {
                    let rows: Vec<usize> = (0..len).collect();
                    let pages = paginate(&rows, &policy).unwrap();
                    assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), len);
                    assert_eq!(pages.concat(), rows);
                }
            }
        }
    }
}
