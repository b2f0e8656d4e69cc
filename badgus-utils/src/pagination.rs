/// Previous/next page numbers handed to templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PageLinks {
    pub page: usize,
    pub total: usize,
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

/// Number of pages needed for `total_items`, never less than one.
pub fn total_pages(total_items: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    let pages = total_items.div_ceil(per_page);
    pages.max(1)
}

/// Clamp a requested page (from a query string) into `1..=total`.
pub fn clamp_page(requested: Option<usize>, total: usize) -> usize {
    requested.unwrap_or(1).clamp(1, total.max(1))
}

/// SQL `OFFSET` for a one-based page.
pub fn page_offset(page: usize, per_page: usize) -> usize {
    page.max(1).saturating_sub(1).saturating_mul(per_page.max(1))
}

/// Navigation numbers for a rendered page.
pub fn page_links(page: usize, total: usize) -> PageLinks {
    let total = total.max(1);
    let page = page.clamp(1, total);
    PageLinks {
        page,
        total,
        previous: (page > 1).then(|| page - 1),
        next: (page < total).then(|| page + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::{clamp_page, page_links, page_offset, total_pages};

    #[test]
    fn total_pages_never_zero() {
        assert_eq!(total_pages(0, 50), 1);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(10, 0), 10);
    }

    #[test]
    fn clamps_requested_pages() {
        assert_eq!(clamp_page(None, 3), 1);
        assert_eq!(clamp_page(Some(0), 3), 1);
        assert_eq!(clamp_page(Some(7), 3), 3);
        assert_eq!(clamp_page(Some(2), 0), 1);
    }

    #[test]
    fn offsets_are_zero_based() {
        assert_eq!(page_offset(1, 50), 0);
        assert_eq!(page_offset(3, 50), 100);
        assert_eq!(page_offset(0, 50), 0);
    }

    #[test]
    fn links_only_point_at_existing_pages() {
        let first = page_links(1, 2);
        assert_eq!(first.previous, None);
        assert_eq!(first.next, Some(2));

        let last = page_links(2, 2);
        assert_eq!(last.previous, Some(1));
        assert_eq!(last.next, None);
    }
}
