use engine_logging::{engine_debug, engine_info};

use crate::model::Cursor;
use crate::{Effect, Msg, Phase, StopReason, WalkState};

/// Pure transition function of a walk: applies a message and returns the effects
/// the driver has to carry out. Messages that do not fit the current phase are ignored.
pub fn update(mut state: WalkState, msg: Msg) -> (WalkState, Vec<Effect>) {
    if state.phase().is_terminal() {
        return (state, Vec::new());
    }

    let effects = match (state.phase(), msg) {
        (Phase::Idle, Msg::Start) => {
            let cursor = state.options().start_cursor();
            request_fetch(&mut state, cursor)
        }
        (
            Phase::FetchingPage,
            Msg::PageFetched {
                next_cursor,
                post_count,
            },
        ) => {
            engine_debug!(
                "page fetched: {} posts, next cursor {:?}",
                post_count,
                next_cursor
            );
            state.page_fetched(next_cursor);
            Vec::new()
        }
        (Phase::DrainingPage, Msg::RecordEmitted) => {
            state.record_emitted();
            Vec::new()
        }
        (Phase::DrainingPage, Msg::PageDrained) => {
            match (state.next_cursor().cloned(), state.options().auto_advance) {
                (None, _) => finish(&mut state, StopReason::Exhausted),
                (Some(_), false) => finish(&mut state, StopReason::NotAutoAdvancing),
                (Some(next_cursor), true) => {
                    state.set_phase(Phase::AwaitingAdvanceDecision);
                    vec![Effect::PublishPageBoundary {
                        next_cursor,
                        records_on_page: state.records_on_page(),
                    }]
                }
            }
        }
        (Phase::AwaitingAdvanceDecision, Msg::AdvanceDecided { vetoed, cancelled }) => {
            if cancelled {
                finish(&mut state, StopReason::Cancelled)
            } else if vetoed {
                engine_info!("advance vetoed by a page-boundary listener");
                finish(&mut state, StopReason::Vetoed)
            } else {
                match state.next_cursor().cloned() {
                    Some(next_cursor) => request_fetch(&mut state, next_cursor),
                    None => finish(&mut state, StopReason::Exhausted),
                }
            }
        }
        (Phase::DrainingPage, Msg::KnownPostReached) => {
            finish(&mut state, StopReason::ReachedKnownPost)
        }
        (_, Msg::FatalError { raised }) => {
            state.set_phase(if raised {
                Phase::Failed
            } else {
                Phase::Done(StopReason::Error)
            });
            vec![Effect::Finish {
                reason: StopReason::Error,
            }]
        }
        _ => Vec::new(),
    };

    (state, effects)
}

fn request_fetch(state: &mut WalkState, cursor: Cursor) -> Vec<Effect> {
    if let Some(reason) = state.limit_for(&cursor) {
        return finish(state, reason);
    }
    state.begin_fetch(cursor.clone());
    vec![Effect::FetchPage { cursor }]
}

fn finish(state: &mut WalkState, reason: StopReason) -> Vec<Effect> {
    state.set_phase(Phase::Done(reason));
    vec![Effect::Finish { reason }]
}
