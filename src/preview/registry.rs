//! In-flight render task registry
//!
//! Holds at most one live task per page. Starting a task for a page cancels
//! and evicts whatever was registered before, and a completion may only be
//! committed while its request id is still the registered one.

use std::collections::HashMap;

use log::debug;

use super::cancel::CancellationToken;
use super::request::RequestId;

#[derive(Debug)]
struct ActiveTask {
    id: RequestId,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    active: HashMap<u32, ActiveTask>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` as the live task for `page`, superseding any previous one
    pub fn start(&mut self, page: u32, id: RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self.active.insert(
            page,
            ActiveTask {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!(
                "Render {:?} for page {page} superseded by {:?}",
                previous.id, id
            );
            previous.token.cancel();
        }
        token
    }

    /// Whether `id` is the live task for `page`
    #[must_use]
    pub fn is_current(&self, page: u32, id: RequestId) -> bool {
        self.active.get(&page).is_some_and(|task| task.id == id)
    }

    /// Retire `id` if it is the live task for `page`.
    ///
    /// Returns `false` for superseded or cancelled tasks, whose results must
    /// be dropped.
    pub fn finish(&mut self, page: u32, id: RequestId) -> bool {
        if self.is_current(page, id) {
            self.active.remove(&page);
            true
        } else {
            false
        }
    }

    /// Cancel and evict the live task for `page`, if any
    pub fn cancel(&mut self, page: u32) -> bool {
        match self.active.remove(&page) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel and evict every live task, returning how many there were
    pub fn cancel_all(&mut self) -> usize {
        let count = self.active.len();
        for (_, task) in self.active.drain() {
            task.token.cancel();
        }
        count
    }

    #[must_use]
    pub fn in_flight(&self, page: u32) -> bool {
        self.active.contains_key(&page)
    }

    /// Pages with a live task, ascending
    #[must_use]
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.active.keys().copied().collect();
        pages.sort_unstable();
        pages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
