use crate::model::Cursor;
use crate::state::StopReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPage { cursor: Cursor },
    PublishPageBoundary { next_cursor: Cursor, records_on_page: usize },
    Finish { reason: StopReason },
}
