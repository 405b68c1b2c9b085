use crate::model::Cursor;
use crate::options::WalkOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last page carried no next cursor.
    Exhausted,
    /// A page drained and auto-advance was off.
    NotAutoAdvancing,
    /// The next page number was past `max_pages`.
    PageLimit,
    /// `max_index` pages were already fetched.
    IndexLimit,
    /// A page-boundary listener voted against advancing.
    Vetoed,
    /// The walk's cancellation token fired.
    Cancelled,
    /// A post from `until_post_ids` was reached.
    ReachedKnownPost,
    /// A fatal error was reported to an error listener.
    Error,
}

impl StopReason {
    /// True when the walk ended because there was nothing left to fetch.
    pub fn is_complete(self) -> bool {
        matches!(self, StopReason::Exhausted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    FetchingPage,
    DrainingPage,
    AwaitingAdvanceDecision,
    Done(StopReason),
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done(_) | Phase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalkState {
    phase: Phase,
    options: WalkOptions,
    /// Cursor of the page being fetched or drained.
    current_cursor: Option<Cursor>,
    next_cursor: Option<Cursor>,
    pages_fetched: u32,
    records_on_page: usize,
    records_emitted: u64,
}

impl WalkState {
    pub fn new(options: WalkOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    pub fn current_cursor(&self) -> Option<&Cursor> {
        self.current_cursor.as_ref()
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn records_on_page(&self) -> usize {
        self.records_on_page
    }

    pub fn records_emitted(&self) -> u64 {
        self.records_emitted
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Limit that forbids fetching `cursor`, if any.
    pub(crate) fn limit_for(&self, cursor: &Cursor) -> Option<StopReason> {
        if let Some(max_index) = self.options.max_index {
            if self.pages_fetched >= max_index {
                return Some(StopReason::IndexLimit);
            }
        }
        if let Some(max_pages) = self.options.max_pages {
            if cursor.page_number > max_pages {
                return Some(StopReason::PageLimit);
            }
        }
        None
    }

    pub(crate) fn begin_fetch(&mut self, cursor: Cursor) {
        self.phase = Phase::FetchingPage;
        self.current_cursor = Some(cursor);
        self.next_cursor = None;
        self.records_on_page = 0;
    }

    pub(crate) fn page_fetched(&mut self, next_cursor: Option<Cursor>) {
        self.phase = Phase::DrainingPage;
        self.pages_fetched += 1;
        self.next_cursor = next_cursor;
    }

    pub(crate) fn record_emitted(&mut self) {
        self.records_on_page += 1;
        self.records_emitted += 1;
    }
}
