//! Page-by-page traversal of the users listing

use tracing::{debug, warn};

use super::{api::GitlabApi, error::Result};
use crate::domain::UserRecord;

const FIRST_PAGE: u32 = 1;

/// One page of a paginated listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Page to request next, or `None` when this was the last one
    pub next: Option<u32>,
}

impl<T> Page<T> {
    /// `next_header` is the decoded `X-Next-Page` header: absent (`None`),
    /// present but empty (`Some(None)`), or a page number.
    pub fn new(number: u32, items: Vec<T>, next_header: Option<Option<u32>>) -> Self {
        let next = if items.is_empty() {
            None
        } else {
            match next_header {
                Some(next) => next,
                None => number.checked_add(1),
            }
        };

        let next = match next {
            Some(next) if next <= number => {
                warn!(page = number, next, "Server pagination did not advance, stopping");
                None
            },
            next => next,
        };

        Self { items, next }
    }
}

/// Lazy cursor over the users of a GitLab instance.
///
/// Each call to [`UserPages::next_page`] issues exactly one request; pages are
/// fetched strictly in order and the cursor can be rewound with
/// [`UserPages::restart`].
#[derive(Debug)]
pub struct UserPages<'a> {
    api: &'a GitlabApi,
    per_page: u32,
    next: Option<u32>,
}

impl<'a> UserPages<'a> {
    pub fn new(api: &'a GitlabApi, per_page: u32) -> Self {
        Self { api, per_page, next: Some(FIRST_PAGE) }
    }

    /// Fetch the following page, `Ok(None)` once the listing is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<UserRecord>>> {
        let Some(number) = self.next else {
            return Ok(None);
        };

        let page = self.api.get_users_page(number, self.per_page).await?;
        debug!(page = number, users = page.items.len(), next = ?page.next, "Fetched users page");
        self.next = page.next;

        if page.items.is_empty() {
            return Ok(None);
        }

        Ok(Some(page.items.into_iter().map(UserRecord::from).collect()))
    }

    /// Rewind to the first page
    pub fn restart(&mut self) {
        self.next = Some(FIRST_PAGE);
    }

    /// Drain the remaining pages into one list, preserving server order
    pub async fn collect_all(&mut self) -> Result<Vec<UserRecord>> {
        let mut users = Vec::new();
        while let Some(page) = self.next_page().await? {
            users.extend(page);
        }
        Ok(users)
    }
}
