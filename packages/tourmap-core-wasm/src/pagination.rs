use serde::Serialize;

/// Pages shown before the list collapses with ellipses.
const MAX_VISIBLE_PAGES: u32 = 5;

/// One slot of the page selector.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "page", rename_all = "camelCase")]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Page counters for the story list.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            total_pages: 1,
        }
    }
}

impl Pagination {
    pub fn prev_page(&self, current: u32) -> u32 {
        current.saturating_sub(1).max(1)
    }

    pub fn next_page(&self, current: u32) -> u32 {
        (current + 1).min(self.total_pages.max(1))
    }

    pub fn has_prev(&self, current: u32) -> bool {
        current > 1
    }

    pub fn has_next(&self, current: u32) -> bool {
        current < self.total_pages
    }

    /// The selector is hidden for a single page.
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }
}

/// Page selector entries, e.g. `1 … 4 5 6 … 10`.
pub fn page_numbers(current: u32, total: u32) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(Page).collect();
    }
    let mut pages = Vec::with_capacity(7);
    if current <= 3 {
        pages.extend((1..=4).map(Page));
        pages.push(Ellipsis);
        pages.push(Page(total));
    } else if current >= total - 2 {
        pages.push(Page(1));
        pages.push(Ellipsis);
        pages.extend((total - 3..=total).map(Page));
    } else {
        pages.push(Page(1));
        pages.push(Ellipsis);
        pages.extend((current - 1..=current + 1).map(Page));
        pages.push(Ellipsis);
        pages.push(Page(total));
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::PageItem::{Ellipsis, Page};
    use super::*;

    #[test]
    fn test_short_list_shows_everything() {
        assert_eq!(page_numbers(1, 3), vec![Page(1), Page(2), Page(3)]);
        assert!(page_numbers(1, 0).is_empty());
    }

    #[test]
    fn test_ellipses() {
        assert_eq!(
            page_numbers(2, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(10)]
        );
        assert_eq!(
            page_numbers(9, 10),
            vec![Page(1), Ellipsis, Page(7), Page(8), Page(9), Page(10)]
        );
        assert_eq!(
            page_numbers(5, 10),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn test_prev_next_clamp() {
        let p = Pagination {
            total_pages: 3,
            ..Default::default()
        };
        assert_eq!(p.prev_page(1), 1);
        assert_eq!(p.next_page(3), 3);
        assert_eq!(p.next_page(1), 2);
        assert!(!p.has_prev(1));
        assert!(p.has_next(2));
        assert!(!Pagination::default().is_visible());
    }
}
