//! Fixed-size slicing of an ordered collection, with navigation metadata.

/// A bounded slice of a feed. `number` is 1-indexed and already clamped to
/// a valid page.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Deterministic: the same collection and page number always yield the same
/// slice. A page past the end clamps to the last valid page, a page below 1
/// clamps to the first, and an empty collection is a single empty page.
pub fn paginate<T: Clone>(items: &[T], per_page: usize, page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = if items.is_empty() {
        1
    } else {
        items.len().div_ceil(per_page)
    };
    let number = page.clamp(1, total_pages);
    let start = (number - 1) * per_page;

    Page {
        items: items.iter().skip(start).take(per_page).cloned().collect(),
        number,
        total_pages,
        has_next: number < total_pages,
        has_previous: number > 1,
    }
}
