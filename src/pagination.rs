//! Windowed page list for the pagination control

use std::fmt;

/// One slot in the rendered pagination control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSlot::Page(number) => write!(f, "{}", number),
            PageSlot::Ellipsis => write!(f, "…"),
        }
    }
}

/// Compute the visible page list: first and last page, the current page
/// with one neighbour on each side, and a single ellipsis for every gap
/// of two or more hidden pages. A gap hiding exactly one page shows that
/// page instead.
pub fn compute_window(current: u32, total: u32) -> Vec<PageSlot> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let start = current.saturating_sub(1).max(1);
    let end = current.saturating_add(1).min(total);

    let mut pages = vec![1];
    pages.extend(start..=end);
    pages.push(total);
    pages.sort_unstable();
    pages.dedup();

    let mut window = Vec::with_capacity(pages.len() + 2);
    let mut previous: Option<u32> = None;
    for page in pages {
        if let Some(prev) = previous {
            match page - prev {
                1 => {}
                2 => window.push(PageSlot::Page(prev + 1)),
                _ => window.push(PageSlot::Ellipsis),
            }
        }
        window.push(PageSlot::Page(page));
        previous = Some(page);
    }
    window
}
