//! Lazy cursor-based pagination.
//!
//! A [`Page`] is an immutable slice of a remote collection plus the cursor
//! for the following slice. Calling [`Page::next`] performs exactly one fetch
//! and returns a new page; nothing is prefetched and the original page is
//! left untouched, so a page can be kept around and re-walked.
//!
//! Whether more data exists is known only from the cursor the source
//! returned. A page never guesses from its length.

use std::{fmt, future::Future, sync::Arc};

use lockboard_proto::{Cursor, RawPage};

use crate::error::BoardError;

/// A remote collection that can be read one slice at a time.
pub trait PageSource: Send + Sync + 'static {
    /// Item type after any client-side processing (e.g. decryption)
    type Item: Send + Sync;

    /// Fetch the slice starting at `cursor`, or the first slice when `None`.
    fn fetch(
        &self,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> impl Future<Output = Result<RawPage<Self::Item>, BoardError>> + Send;
}

/// One page of a remote collection.
pub struct Page<S: PageSource> {
    items: Vec<S::Item>,
    next: Option<Cursor>,
    limit: usize,
    source: Arc<S>,
}

impl<S: PageSource> Page<S> {
    /// Fetch the first page of `source`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `limit` is zero
    /// - Whatever the source reports
    pub async fn first(source: Arc<S>, limit: usize) -> Result<Self, BoardError> {
        if limit == 0 {
            return Err(BoardError::invalid("page limit must be positive"));
        }

        let raw = source.fetch(None, limit).await?;
        Ok(Self::from_raw(source, raw, limit))
    }

    /// A page that is already complete, such as the records a write just
    /// created.
    pub fn complete(source: Arc<S>, items: Vec<S::Item>, limit: usize) -> Self {
        Self { items, next: None, limit, source }
    }

    fn from_raw(source: Arc<S>, raw: RawPage<S::Item>, limit: usize) -> Self {
        Self { items: raw.items, next: raw.next, limit, source }
    }

    /// Returns true if another page can be fetched.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Fetch the following page.
    ///
    /// # Errors
    ///
    /// - `NoMoreData` if this is the last page
    /// - Whatever the source reports
    pub async fn next(&self) -> Result<Self, BoardError> {
        let Some(cursor) = &self.next else {
            return Err(BoardError::NoMoreData);
        };

        let raw = self.source.fetch(Some(cursor), self.limit).await?;
        Ok(Self::from_raw(Arc::clone(&self.source), raw, self.limit))
    }

    /// Items on this page, in collection order.
    pub fn items(&self) -> &[S::Item] {
        &self.items
    }

    /// Take ownership of the items.
    pub fn into_items(self) -> Vec<S::Item> {
        self.items
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if this page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Page size requested for this and following pages.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Iterate over the items on this page.
    pub fn iter(&self) -> std::slice::Iter<'_, S::Item> {
        self.items.iter()
    }

    /// Walk this page and every following one, collecting all items.
    ///
    /// # Errors
    ///
    /// Whatever the source reports for a later page.
    pub async fn collect_all(self) -> Result<Vec<S::Item>, BoardError> {
        let mut page = self;
        let mut items = Vec::new();

        loop {
            let next = if page.has_next() { Some(page.next().await?) } else { None };
            items.append(&mut page.items);

            match next {
                Some(following) => page = following,
                None => return Ok(items),
            }
        }
    }
}

impl<'a, S: PageSource> IntoIterator for &'a Page<S> {
    type Item = &'a S::Item;
    type IntoIter = std::slice::Iter<'a, S::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: PageSource> fmt::Debug for Page<S>
where
    S::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("items", &self.items)
            .field("has_next", &self.has_next())
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
