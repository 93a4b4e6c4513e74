//! Page strategies for browsing record collections.
//!
//! # Responsibility
//! - Translate caller page parameters into document store queries.
//! - Provide offset paging (students) and cursor paging (teachers) behind
//!   one `PageStrategy` interface.
//!
//! # Invariants
//! - Missing, zero or negative page parameters yield an empty page, never an
//!   error.
//! - Results never exceed the requested page size.
//! - Cursor paging with an empty anchor batch yields an empty page.

use crate::store::{Document, DocumentQuery, DocumentStore, StoreResult};
use log::debug;
use serde::{Deserialize, Serialize};

/// A way of fetching one page of a collection.
pub trait PageStrategy {
    fn fetch(&self, store: &dyn DocumentStore, collection: &str) -> StoreResult<Vec<Document>>;
}

/// Resolved `LIMIT`/`OFFSET` pair for offset paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u32,
    pub offset: u64,
}

/// Numbered pages over one sort key. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPage {
    pub order_by: String,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl OffsetPage {
    pub fn new(order_by: impl Into<String>, page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            order_by: order_by.into(),
            page,
            size,
        }
    }

    /// Computes `offset = size * page - size`, or `None` for an unusable request.
    pub fn window(&self) -> Option<PageWindow> {
        let page = self.page.filter(|page| *page > 0)?;
        let size = self.size.filter(|size| *size > 0)?;
        let offset = size.checked_mul(page)?.checked_sub(size)?;
        Some(PageWindow {
            limit: u32::try_from(size).ok()?,
            offset: u64::try_from(offset).ok()?,
        })
    }
}

impl PageStrategy for OffsetPage {
    fn fetch(&self, store: &dyn DocumentStore, collection: &str) -> StoreResult<Vec<Document>> {
        let Some(window) = self.window() else {
            debug!(
                "event=page_rejected module=pagination strategy=offset collection={} page={:?} size={:?}",
                collection, self.page, self.size
            );
            return Ok(Vec::new());
        };

        store.query(
            &DocumentQuery::collection(collection)
                .order_by(self.order_by.as_str())
                .limit(window.limit)
                .offset(window.offset),
        )
    }
}

/// Which sort keys cursor paging uses for its two fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorOrdering {
    /// Anchor batch and page share one sort key.
    #[default]
    Consistent,
    /// Anchor batch sorted by `first_name`, page by `last_name`.
    ///
    /// Pages under this ordering are not slices of any single ordering; a
    /// record can appear on no page or on several.
    Split,
}

/// Anchor-then-continue paging.
///
/// Fetches the first `begin` records by `anchor_order`, then up to `size`
/// records by `page_order` strictly after the last anchor record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPage {
    pub anchor_order: String,
    pub page_order: String,
    pub begin: Option<i64>,
    pub size: Option<i64>,
}

impl CursorPage {
    /// Cursor paging over a single sort key.
    pub fn new(order_by: impl Into<String>, begin: Option<i64>, size: Option<i64>) -> Self {
        let order_by = order_by.into();
        Self {
            anchor_order: order_by.clone(),
            page_order: order_by,
            begin,
            size,
        }
    }

    /// Cursor paging whose anchor and page use different sort keys.
    pub fn split(
        anchor_order: impl Into<String>,
        page_order: impl Into<String>,
        begin: Option<i64>,
        size: Option<i64>,
    ) -> Self {
        Self {
            anchor_order: anchor_order.into(),
            page_order: page_order.into(),
            begin,
            size,
        }
    }
}

impl PageStrategy for CursorPage {
    fn fetch(&self, store: &dyn DocumentStore, collection: &str) -> StoreResult<Vec<Document>> {
        let (Some(begin), Some(size)) = (positive_u32(self.begin), positive_u32(self.size)) else {
            debug!(
                "event=page_rejected module=pagination strategy=cursor collection={} begin={:?} size={:?}",
                collection, self.begin, self.size
            );
            return Ok(Vec::new());
        };

        let anchor = store.query(
            &DocumentQuery::collection(collection)
                .order_by(self.anchor_order.as_str())
                .limit(begin),
        )?;
        let Some(cursor) = anchor.into_iter().last() else {
            return Ok(Vec::new());
        };
        // A split ordering can pick an anchor that lacks the page key.
        if cursor.field(&self.page_order).is_none() {
            debug!(
                "event=page_rejected module=pagination strategy=cursor collection={} reason=cursor_without_page_key cursor={}",
                collection, cursor.id
            );
            return Ok(Vec::new());
        }

        store.query(
            &DocumentQuery::collection(collection)
                .order_by(self.page_order.as_str())
                .start_after(cursor)
                .limit(size),
        )
    }
}

fn positive_u32(value: Option<i64>) -> Option<u32> {
    value
        .filter(|value| *value > 0)
        .and_then(|value| u32::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::{OffsetPage, PageWindow};

    #[test]
    fn window_is_zero_based_offset_of_page() {
        let page = OffsetPage::new("last_name", Some(2), Some(10));
        assert_eq!(
            page.window(),
            Some(PageWindow {
                limit: 10,
                offset: 10
            })
        );
        let first = OffsetPage::new("last_name", Some(1), Some(25));
        assert_eq!(first.window().map(|window| window.offset), Some(0));
    }

    #[test]
    fn window_rejects_unusable_parameters() {
        for (page, size) in [
            (Some(0), Some(10)),
            (Some(1), Some(0)),
            (Some(-1), Some(10)),
            (None, Some(10)),
            (Some(1), None),
            (Some(i64::MAX), Some(i64::MAX)),
        ] {
            assert_eq!(OffsetPage::new("last_name", page, size).window(), None);
        }
    }
}
