//! Pagination types
//!
//! The cursor is the only mutable state of a paged run. It is created when the
//! run starts, threaded through every iteration and dropped with the run.

use crate::error::{Error, Result};

/// Offset cursor over a result set of known size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page_size: u32,
    skipped: u64,
    total: Option<u64>,
    pages_issued: u64,
}

impl PageCursor {
    /// Create a cursor; the total stays unknown until the metadata probe
    pub fn new(page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        Ok(Self {
            page_size,
            skipped: 0,
            total: None,
            pages_issued: 0,
        })
    }

    /// Create a cursor whose total is already known
    pub fn with_total(page_size: u32, total: u64) -> Result<Self> {
        let mut cursor = Self::new(page_size)?;
        cursor.resolve_total(total);
        Ok(cursor)
    }

    /// Record the total reported by the metadata probe
    pub fn resolve_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Records per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Records skipped so far (the `$skip` of the next page)
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Expected total, once known
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Pages handed out so far
    pub fn pages_issued(&self) -> u64 {
        self.pages_issued
    }

    /// `$skip` of the next page, or `None` once `skipped >= total`.
    ///
    /// Also `None` while the total is unknown.
    pub fn next_skip(&self) -> Option<u64> {
        match self.total {
            Some(total) if self.skipped < total => Some(self.skipped),
            _ => None,
        }
    }

    /// Move past the page that was just fetched
    pub fn advance(&mut self) {
        self.skipped += u64::from(self.page_size);
        self.pages_issued += 1;
    }

    /// Whether every page has been handed out
    pub fn is_done(&self) -> bool {
        self.total.is_some_and(|total| self.skipped >= total)
    }

    /// `ceil(total / page_size)`, once the total is known
    pub fn expected_pages(&self) -> Option<u64> {
        self.total
            .map(|total| total.div_ceil(u64::from(self.page_size)))
    }

    /// Records expected on the page starting at `skip`
    pub fn expected_records_at(&self, skip: u64) -> Option<u64> {
        self.total
            .map(|total| total.saturating_sub(skip).min(u64::from(self.page_size)))
    }
}

/// One page body, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page number
    pub index: u64,
    /// `$skip` used for the request
    pub skip: u64,
    /// Records the upstream should have returned
    pub expected_records: u64,
    /// Response body
    pub body: String,
}
