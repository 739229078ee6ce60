// Pagination controller: gates backward-history requests.
//
// State machine over idle/loading-older:
//   idle → loading   only when not loading, more history may exist, a
//                    cursor is known, and the initial load has completed
//   loading → idle   on any response, stale or not
//
// A blocked transition is a silent no-op. Scroll notifications arrive in
// bursts and the guard is what keeps them from fanning out into requests.

use chatsync_common::{LoadOlderRequest, Timestamp};
use tracing::debug;

/// Default backward page size.
pub const DEFAULT_PAGE_LIMIT: usize = 20;
/// Default initial/full-refresh page size.
pub const DEFAULT_INITIAL_LIMIT: usize = 50;

/// Snapshot of the pagination flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub is_loading_older: bool,
    pub has_more_older: bool,
    pub is_initial_load: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self { is_loading_older: false, has_more_older: true, is_initial_load: true }
    }
}

/// An outstanding backward request, tagged with the transcript generation
/// it was issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPage {
    pub generation: u64,
    pub before: Timestamp,
}

/// Why a backward request was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBlocked {
    AlreadyLoading,
    Exhausted,
    NoCursor,
    InitialLoadPending,
}

#[derive(Debug, Clone)]
pub struct PaginationController {
    page_limit: usize,
    initial_limit: usize,
    state: PaginationState,
    pending: Option<PendingPage>,
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT, DEFAULT_INITIAL_LIMIT)
    }
}

impl PaginationController {
    pub fn new(page_limit: usize, initial_limit: usize) -> Self {
        Self {
            page_limit: page_limit.max(1),
            initial_limit: initial_limit.max(1),
            state: PaginationState::default(),
            pending: None,
        }
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    pub fn initial_limit(&self) -> usize {
        self.initial_limit
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn is_loading_older(&self) -> bool {
        self.state.is_loading_older
    }

    pub fn has_more_older(&self) -> bool {
        self.state.has_more_older
    }

    pub fn is_initial_load(&self) -> bool {
        self.state.is_initial_load
    }

    pub fn pending(&self) -> Option<&PendingPage> {
        self.pending.as_ref()
    }

    /// Check every guard on the idle → loading transition.
    pub fn check(&self, oldest: Option<&Timestamp>) -> Result<(), PageBlocked> {
        if self.state.is_loading_older {
            return Err(PageBlocked::AlreadyLoading);
        }
        if !self.state.has_more_older {
            return Err(PageBlocked::Exhausted);
        }
        if self.state.is_initial_load {
            return Err(PageBlocked::InitialLoadPending);
        }
        if oldest.is_none() {
            return Err(PageBlocked::NoCursor);
        }
        Ok(())
    }

    /// Enter loading-older and build the request, or do nothing.
    pub fn begin(
        &mut self,
        oldest: Option<&Timestamp>,
        generation: u64,
    ) -> Option<LoadOlderRequest> {
        if let Err(reason) = self.check(oldest) {
            debug!(?reason, "backward page request suppressed");
            return None;
        }
        let before = oldest?.clone();

        self.state.is_loading_older = true;
        self.pending = Some(PendingPage { generation, before: before.clone() });
        Some(LoadOlderRequest { before_timestamp: before, limit: self.page_limit })
    }

    /// Roll back a request that never reached the transport.
    pub fn abandon(&mut self) {
        self.state.is_loading_older = false;
        self.pending = None;
    }

    /// Claim the outstanding request for an incoming response.
    ///
    /// Returns `false` for a stale response: nothing outstanding, or issued
    /// against an earlier generation. Either way the controller is idle after.
    pub fn claim_response(&mut self, generation: u64) -> bool {
        self.state.is_loading_older = false;
        match self.pending.take() {
            Some(page) => page.generation == generation,
            None => false,
        }
    }

    /// Apply the end-of-history rule to a backward response of `len` items.
    ///
    /// A short page ends history. So does a page that failed to move the
    /// oldest cursor, since the next request would repeat this one.
    pub fn finish_page(&mut self, len: usize, cursor_advanced: bool) {
        self.state.is_loading_older = false;
        if len < self.page_limit || !cursor_advanced {
            self.state.has_more_older = false;
        }
    }

    /// A full refresh was requested: drop any outstanding request and hold
    /// backward paging until the fresh history lands.
    pub fn begin_refresh(&mut self) {
        self.state.is_loading_older = false;
        self.state.is_initial_load = true;
        self.pending = None;
    }

    /// The initial (or refreshed) history arrived with `len` items.
    pub fn complete_initial_load(&mut self, len: usize) {
        self.state.is_loading_older = false;
        self.state.is_initial_load = false;
        self.state.has_more_older = len >= self.initial_limit;
        self.pending = None;
    }
}

/// Whether a scroll offset is close enough to the top to page backward.
pub fn is_near_top(scroll_top: f64, threshold: f64) -> bool {
    scroll_top <= threshold
}
