use serde::Serialize;

pub const PAGE_SIZE: usize = 10;

/// One page of an ordered result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Cut `rows` into pages of `PAGE_SIZE` and return the requested one. Requests past the end get
/// the last page; an empty set still has one (empty) page.
pub fn paginate<T>(rows: Vec<T>, requested: usize) -> Page<T> {
    let num_pages = rows.len().div_ceil(PAGE_SIZE).max(1);
    let number = requested.clamp(1, num_pages);
    let items = rows
        .into_iter()
        .skip((number - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();

    Page {
        items,
        number,
        num_pages,
        per_page: PAGE_SIZE,
        has_previous: number > 1,
        has_next: number < num_pages,
    }
}
