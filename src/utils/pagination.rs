use serde::Serialize;

/// One page of a list that is paged client-side.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub per_page: usize,
}

/// Slice `items` into the requested page. `page == 0` (or `per_page == 0`)
/// returns everything as a single page.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let total_count = items.len();

    if page == 0 || per_page == 0 {
        return Page {
            items: items.to_vec(),
            total_count,
            current_page: 0,
            total_pages: 1,
            per_page: total_count,
        };
    }

    let total_pages = if total_count == 0 {
        1
    } else {
        (total_count + per_page - 1) / per_page
    };

    let current_page = page.max(1).min(total_pages);
    let start_idx = (current_page - 1) * per_page;
    let end_idx = (start_idx + per_page).min(total_count);

    let paged = if start_idx < total_count {
        items[start_idx..end_idx].to_vec()
    } else {
        vec![]
    };

    Page {
        items: paged,
        total_count,
        current_page,
        total_pages,
        per_page,
    }
}
