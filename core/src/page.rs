//! Cursor-based pagination.
//!
//! A list endpoint returns one `Page` at a time together with an opaque
//! cursor naming where the next page starts. [`get_all_pages`] follows the
//! cursors until the server returns none.
//!
//! There is no page-count cap: a server that keeps returning a cursor keeps
//! the traversal going.

use tracing::{debug, trace};

use crate::error::Result;
use crate::key::{self, Key};

/// One page of a listing. `next` is `None` at the end of the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, C = Key> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub fn new(items: Vec<T>, next: Option<C>) -> Self {
        Self { items, next }
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Addressing mode of a single list call. Directory scoping and forward
/// cursors are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageQuery {
    /// Everything, from the beginning.
    #[default]
    Root,
    /// Entries nested under a directory.
    Directory(Key),
    /// Entries starting at a cursor returned by a previous page.
    From(Key),
}

impl PageQuery {
    /// The list URL for this query under `base`. Empty keys address the root.
    pub fn path(&self, base: &str) -> String {
        match self {
            PageQuery::Directory(dir) => key::directory_path(base, Some(dir)),
            PageQuery::From(cursor) if !cursor.is_empty() => {
                format!("{base}?{}", key::from_query(cursor))
            }
            PageQuery::Root | PageQuery::From(_) => base.to_string(),
        }
    }
}

/// Fetches every page in order and concatenates their items.
///
/// `get_page` is called first with `None`, then with each cursor the previous
/// page returned. Items keep the order the server produced. Any error aborts
/// the whole traversal and discards what was accumulated.
pub fn get_all_pages<T, C, F>(mut get_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&C>) -> Result<Page<T, C>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<C> = None;
    let mut pages = 0usize;
    loop {
        let page = get_page(cursor.as_ref())?;
        pages += 1;
        items.extend(page.items);
        match page.next {
            Some(next) => {
                trace!(pages, "following page cursor");
                cursor = Some(next);
            }
            None => {
                debug!(pages, items = items.len(), "pagination complete");
                return Ok(items);
            }
        }
    }
}
