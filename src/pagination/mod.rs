//! Pagination module
//!
//! Offset/limit paging driven by a metadata count.
//!
//! # Overview
//!
//! - [`PageCursor`] tracks `skipped` and the expected `total`
//! - [`PagedFetcher`] probes the total and yields page bodies one by one,
//!   either pulled with `next_page` or consumed as a `Stream`

mod fetcher;
mod types;

pub use fetcher::{probe_total, PagedFetcher};
pub use types::{Page, PageCursor};

#[cfg(test)]
mod tests;
