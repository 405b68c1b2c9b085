use crate::model::Cursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The consumer pulled for the first time.
    Start,
    /// A page arrived and its posts were queued.
    PageFetched {
        next_cursor: Option<Cursor>,
        post_count: usize,
    },
    /// One record was handed to the consumer.
    RecordEmitted,
    /// Every queued post of the current page has been processed.
    PageDrained,
    /// Outcome of the page-boundary vote.
    AdvanceDecided { vetoed: bool, cancelled: bool },
    /// A post listed in `until_post_ids` was reached.
    KnownPostReached,
    /// A fatal error ended the walk; `raised` when it surfaces to the caller.
    FatalError { raised: bool },
}
