use log::debug;
use std::collections::BTreeMap;
use std::future::Future;

use crate::api::hipchat::{HipChatApi, HistoryWindow, PageRequest};
use crate::error::ApiError;
use crate::merger::MessageSet;
use crate::models::User;

pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Walks one paged resource from index 0 until a page comes back shorter
/// than `page_size`, handing every item to `on_item` as soon as its page
/// arrives. Returns the number of pages fetched.
///
/// Consecutive pages overlap: the next page starts at the last item of the
/// previous one, so callers must dedupe.
pub async fn paginate<T, F, Fut>(
    page_size: usize,
    mut fetch_page: F,
    mut on_item: impl FnMut(T),
) -> Result<usize, ApiError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
    let mut start_index = 0;
    let mut pages = 0;

    loop {
        let page = fetch_page(PageRequest {
            start_index,
            max_results: page_size,
        })
        .await?;
        pages += 1;

        let len = page.len();
        page.into_iter().for_each(&mut on_item);

        if len < page_size {
            return Ok(pages);
        }

        start_index += (len - 1).max(1);
    }
}

pub struct Fetcher<'a, A> {
    api: &'a A,
    page_size: usize,
}

impl<'a, A: HipChatApi + Sync> Fetcher<'a, A> {
    pub fn new(api: &'a A, page_size: usize) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
        }
    }

    pub fn api(&self) -> &A {
        self.api
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Loads the whole user directory keyed by stringified user ID.
    pub async fn fetch_users(
        &self,
        include_deleted: bool,
    ) -> Result<BTreeMap<String, User>, ApiError> {
        let mut users = BTreeMap::new();

        let pages = paginate(
            self.page_size,
            |page| self.api.list_users(page, include_deleted),
            |user: User| {
                users.insert(user.key(), user);
            },
        )
        .await?;

        debug!("fetched {} users in {} pages", users.len(), pages);
        Ok(users)
    }

    /// Sweeps a user's whole history for `window` into `messages`.
    ///
    /// On error `messages` keeps everything gathered before the failing page.
    pub async fn fetch_all(
        &self,
        user_id: u64,
        window: HistoryWindow,
        messages: &mut MessageSet,
    ) -> Result<usize, ApiError> {
        let before = messages.len();

        let pages = paginate(
            self.page_size,
            |page| self.api.user_history(user_id, window, page),
            |message| {
                messages.insert(message);
            },
        )
        .await?;

        debug!(
            "user {}: {} pages, {} new messages",
            user_id,
            pages,
            messages.len() - before
        );
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_paginate_rewinds_by_one_and_stops_on_short_page() {
        let requests = Mutex::new(Vec::new());
        let mut items = Vec::new();

        let pages = paginate(
            3,
            |page| {
                requests.lock().unwrap().push(page.start_index);
                let len = if page.start_index < 4 { 3 } else { 1 };
                let start = page.start_index;
                async move { Ok((start..start + len).collect::<Vec<_>>()) }
            },
            |item| items.push(item),
        )
        .await
        .unwrap();

        assert_eq!(pages, 3);
        assert_eq!(*requests.lock().unwrap(), vec![0, 2, 4]);
        assert_eq!(items, vec![0, 1, 2, 2, 3, 4, 4]);
    }

    #[tokio::test]
    async fn test_paginate_keeps_items_before_failure() {
        let mut items = Vec::new();

        let result = paginate(
            2,
            |page| async move {
                if page.start_index == 0 {
                    Ok(vec!["a", "b"])
                } else {
                    Err(ApiError::Status {
                        status: 502,
                        body: String::new(),
                    })
                }
            },
            |item| items.push(item),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(items, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_paginate_single_item_pages_still_advance() {
        let mut items = Vec::new();

        paginate(
            1,
            |page| async move {
                if page.start_index < 3 {
                    Ok(vec![page.start_index])
                } else {
                    Ok(vec![])
                }
            },
            |item| items.push(item),
        )
        .await
        .unwrap();

        assert_eq!(items, vec![0, 1, 2]);
    }
}
