//! # Viewport math for list panels
//!
//! Two windowing strategies share this module. [`ScrollViewport`] keeps a
//! selected row inside a sliding window by shifting the window start by
//! exactly the deficit, so arrow-key walks scroll one row at a time.
//! [`PagedViewport`] divides a collection into fixed-size pages; page
//! navigation resets the in-page selection and a changed collection snaps
//! back to page zero. An empty collection is always exactly one page or
//! window, never a negative or phantom index.

/// Sliding window over a list, identified by its start offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollViewport {
    offset: usize,
}

impl ScrollViewport {
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Shift the window so `selected` lies in `[offset, offset + visible)`.
    /// Moves by the deficit only; a selection already inside the window
    /// leaves the offset untouched.
    pub fn scroll_to(&mut self, selected: usize, visible: usize) {
        if visible == 0 {
            self.offset = selected;
            return;
        }
        if selected < self.offset {
            self.offset = selected;
        } else if selected >= self.offset + visible {
            self.offset = selected - visible + 1;
        }
    }
}

/// Fixed-size paging over a collection the viewport does not own; all
/// methods take the current collection length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagedViewport {
    page: usize,
    page_size: usize,
    selected: usize,
}

impl PagedViewport {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            // page_size 0 is nonsense; treat it as 1
            page_size: page_size.max(1),
            selected: 0,
        }
    }

    #[inline]
    pub fn page(&self) -> usize {
        self.page
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Selection relative to the current page start.
    #[inline]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// An empty collection still renders as one (empty) page.
    pub fn total_pages(&self, len: usize) -> usize {
        if len == 0 {
            1
        } else {
            len.div_ceil(self.page_size)
        }
    }

    /// Rows on the current page.
    pub fn page_len(&self, len: usize) -> usize {
        let start = self.page * self.page_size;
        len.saturating_sub(start).min(self.page_size)
    }

    /// Absolute index of the selected row, if the page holds one.
    pub fn absolute_selected(&self, len: usize) -> Option<usize> {
        let index = self.page * self.page_size + self.selected;
        (index < len).then_some(index)
    }

    /// Start..end bounds of the current page within the collection.
    pub fn page_bounds(&self, len: usize) -> std::ops::Range<usize> {
        let start = (self.page * self.page_size).min(len);
        let end = (start + self.page_size).min(len);
        start..end
    }

    /// Advance a page; a no-op on the last page. Selection resets to the
    /// top only when the page actually changes.
    pub fn next_page(&mut self, len: usize) {
        if self.page + 1 < self.total_pages(len) {
            self.page += 1;
            self.selected = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 0 {
            self.page -= 1;
            self.selected = 0;
        }
    }

    pub fn select_next(&mut self, len: usize) {
        if self.selected + 1 < self.page_len(len) {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Called when the backing collection was replaced: back to page zero
    /// with the selection clamped into the new page.
    pub fn collection_changed(&mut self, len: usize) {
        self.page = 0;
        let page_len = self.page_len(len);
        if page_len == 0 {
            self.selected = 0;
        } else if self.selected >= page_len {
            self.selected = page_len - 1;
        }
    }
}

impl Default for PagedViewport {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_keeps_selection_inside_the_window() {
        let mut vp = ScrollViewport::default();
        let visible = 3;

        // walk down through ten rows
        for selected in 0..10 {
            vp.scroll_to(selected, visible);
            assert!(
                selected >= vp.offset() && selected < vp.offset() + visible,
                "selected {selected} escaped window at offset {}",
                vp.offset()
            );
        }
        assert_eq!(vp.offset(), 7);

        // and back up
        for selected in (0..10).rev() {
            vp.scroll_to(selected, visible);
            assert!(selected >= vp.offset() && selected < vp.offset() + visible);
        }
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn scroll_shifts_by_exactly_the_deficit() {
        let mut vp = ScrollViewport::default();
        vp.scroll_to(0, 3);
        vp.scroll_to(2, 3);
        assert_eq!(vp.offset(), 0, "in-window selection must not scroll");
        vp.scroll_to(3, 3);
        assert_eq!(vp.offset(), 1);
        vp.scroll_to(9, 3);
        assert_eq!(vp.offset(), 7);
        vp.scroll_to(6, 3);
        assert_eq!(vp.offset(), 6);
    }

    #[test]
    fn empty_collection_is_one_page() {
        let vp = PagedViewport::new(50);
        assert_eq!(vp.total_pages(0), 1);
        assert_eq!(vp.page_len(0), 0);
        assert_eq!(vp.absolute_selected(0), None);
        assert_eq!(vp.page_bounds(0), 0..0);
    }

    #[test]
    fn hundred_one_items_at_fifty_is_three_pages() {
        let vp = PagedViewport::new(50);
        assert_eq!(vp.total_pages(101), 3);
        assert_eq!(vp.total_pages(100), 2);
        assert_eq!(vp.total_pages(1), 1);
    }

    #[test]
    fn next_page_from_last_is_a_noop() {
        let mut vp = PagedViewport::new(50);
        vp.next_page(101);
        vp.next_page(101);
        assert_eq!(vp.page(), 2);
        vp.select_next(101); // selection 1 on the last page
        vp.next_page(101);
        assert_eq!(vp.page(), 2);
        assert_eq!(vp.selected(), 1, "failed page turn must not reset selection");
    }

    #[test]
    fn page_navigation_resets_selection() {
        let mut vp = PagedViewport::new(50);
        for _ in 0..5 {
            vp.select_next(101);
        }
        assert_eq!(vp.selected(), 5);
        vp.next_page(101);
        assert_eq!(vp.selected(), 0);
        vp.select_next(101);
        vp.prev_page();
        assert_eq!(vp.selected(), 0);
    }

    #[test]
    fn collection_change_goes_to_page_zero_and_clamps() {
        let mut vp = PagedViewport::new(50);
        vp.next_page(101);
        vp.next_page(101);
        for _ in 0..40 {
            vp.select_next(10_000);
        }

        vp.collection_changed(3);
        assert_eq!(vp.page(), 0);
        assert_eq!(vp.selected(), 2);

        vp.collection_changed(0);
        assert_eq!(vp.selected(), 0);
        assert_eq!(vp.absolute_selected(0), None);
    }

    #[test]
    fn last_page_is_short() {
        let mut vp = PagedViewport::new(50);
        vp.next_page(101);
        vp.next_page(101);
        assert_eq!(vp.page_len(101), 1);
        assert_eq!(vp.page_bounds(101), 100..101);
        vp.select_next(101);
        assert_eq!(vp.selected(), 0, "single-row page cannot move down");
    }
}
