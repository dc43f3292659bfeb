use serde::Deserialize;

/// Posts per feed page.
pub const PAGE_SIZE: i64 = 10;

#[derive(Deserialize, Debug, Default)]
pub struct PageParams {
    pub page: Option<String>,
}

impl PageParams {
    /// Requested page number. Garbage and anything below one read as the
    /// first page; clamping at the far end needs the row count and happens
    /// in the feed.
    pub fn page(&self) -> i64 {
        self.page
            .as_ref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

/// Page number actually served and the total number of pages for `count`
/// rows. An empty listing still has one (empty) page.
pub fn clamp_page(requested: i64, count: i64) -> (i64, i64) {
    let num_pages = ((count + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
    (requested.clamp(1, num_pages), num_pages)
}
