use std::sync::Once;

use blogwalk_core::{update, Cursor, Effect, Msg, Phase, StopReason, WalkOptions, WalkState};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn fetched(state: WalkState, next: Option<Cursor>) -> WalkState {
    let (state, effects) = update(
        state,
        Msg::PageFetched {
            next_cursor: next,
            post_count: 2,
        },
    );
    assert!(effects.is_empty());
    state
}

fn started(options: WalkOptions) -> (WalkState, Vec<Effect>) {
    init_logging();
    update(WalkState::new(options), Msg::Start)
}

#[test]
fn start_fetches_the_configured_cursor() {
    let (state, effects) = started(WalkOptions {
        start_page: 3,
        start_offset: 40,
        ..WalkOptions::default()
    });
    assert_eq!(state.phase(), Phase::FetchingPage);
    assert_eq!(
        effects,
        vec![Effect::FetchPage {
            cursor: Cursor::start(3, 40)
        }]
    );
}

#[test]
fn missing_next_cursor_finishes_regardless_of_auto_advance() {
    for auto_advance in [true, false] {
        let (state, _) = started(WalkOptions {
            auto_advance,
            ..WalkOptions::default()
        });
        let state = fetched(state, None);
        let (state, effects) = update(state, Msg::PageDrained);
        assert_eq!(state.phase(), Phase::Done(StopReason::Exhausted));
        assert_eq!(
            effects,
            vec![Effect::Finish {
                reason: StopReason::Exhausted
            }]
        );
    }
}

#[test]
fn drained_page_publishes_boundary_with_record_count() {
    let (state, _) = started(WalkOptions::default());
    let state = fetched(state, Some(Cursor::start(2, 20)));
    let (state, _) = update(state, Msg::RecordEmitted);
    let (state, _) = update(state, Msg::RecordEmitted);
    let (state, effects) = update(state, Msg::PageDrained);
    assert_eq!(state.phase(), Phase::AwaitingAdvanceDecision);
    assert_eq!(
        effects,
        vec![Effect::PublishPageBoundary {
            next_cursor: Cursor::start(2, 20),
            records_on_page: 2
        }]
    );

    let (state, effects) = update(
        state,
        Msg::AdvanceDecided {
            vetoed: false,
            cancelled: false,
        },
    );
    assert_eq!(state.phase(), Phase::FetchingPage);
    assert_eq!(state.records_on_page(), 0);
    assert_eq!(state.records_emitted(), 2);
    assert_eq!(
        effects,
        vec![Effect::FetchPage {
            cursor: Cursor::start(2, 20)
        }]
    );
}

#[test]
fn without_auto_advance_the_walk_ends_after_one_page() {
    let (state, _) = started(WalkOptions {
        auto_advance: false,
        ..WalkOptions::default()
    });
    let state = fetched(state, Some(Cursor::start(2, 20)));
    let (state, _) = update(state, Msg::PageDrained);
    assert_eq!(state.phase(), Phase::Done(StopReason::NotAutoAdvancing));
}

#[test]
fn veto_and_cancellation_finish_the_walk() {
    for (vetoed, cancelled, reason) in [
        (true, false, StopReason::Vetoed),
        (false, true, StopReason::Cancelled),
        (true, true, StopReason::Cancelled),
    ] {
        let (state, _) = started(WalkOptions::default());
        let state = fetched(state, Some(Cursor::start(2, 20)));
        let (state, _) = update(state, Msg::PageDrained);
        let (state, effects) = update(state, Msg::AdvanceDecided { vetoed, cancelled });
        assert_eq!(state.phase(), Phase::Done(reason));
        assert_eq!(effects, vec![Effect::Finish { reason }]);
    }
}

#[test]
fn index_limit_is_checked_before_fetching() {
    let (state, effects) = started(WalkOptions {
        max_index: Some(0),
        ..WalkOptions::default()
    });
    assert_eq!(state.phase(), Phase::Done(StopReason::IndexLimit));
    assert_eq!(
        effects,
        vec![Effect::Finish {
            reason: StopReason::IndexLimit
        }]
    );

    let (state, _) = started(WalkOptions {
        max_index: Some(1),
        ..WalkOptions::default()
    });
    let state = fetched(state, Some(Cursor::start(2, 20)));
    let (state, _) = update(state, Msg::PageDrained);
    let (state, _) = update(
        state,
        Msg::AdvanceDecided {
            vetoed: false,
            cancelled: false,
        },
    );
    assert_eq!(state.phase(), Phase::Done(StopReason::IndexLimit));
    assert_eq!(state.pages_fetched(), 1);
}

#[test]
fn page_limit_stops_past_the_last_allowed_page() {
    let (state, _) = started(WalkOptions {
        start_page: 4,
        max_pages: Some(4),
        ..WalkOptions::default()
    });
    let state = fetched(state, Some(Cursor::start(5, 80)));
    let (state, _) = update(state, Msg::PageDrained);
    let (state, _) = update(
        state,
        Msg::AdvanceDecided {
            vetoed: false,
            cancelled: false,
        },
    );
    assert_eq!(state.phase(), Phase::Done(StopReason::PageLimit));
}

#[test]
fn fatal_error_fails_or_finishes_depending_on_listener() {
    let (state, _) = started(WalkOptions::default());
    let (failed, effects) = update(state.clone(), Msg::FatalError { raised: true });
    assert_eq!(failed.phase(), Phase::Failed);
    assert_eq!(
        effects,
        vec![Effect::Finish {
            reason: StopReason::Error
        }]
    );

    let (reported, _) = update(state, Msg::FatalError { raised: false });
    assert_eq!(reported.phase(), Phase::Done(StopReason::Error));
}

#[test]
fn terminal_state_ignores_further_messages() {
    let (state, _) = started(WalkOptions {
        max_index: Some(0),
        ..WalkOptions::default()
    });
    let (next, effects) = update(state.clone(), Msg::Start);
    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn known_post_stops_while_draining() {
    let (state, _) = started(WalkOptions::default());
    let state = fetched(state, Some(Cursor::start(2, 20)));
    let (state, _) = update(state, Msg::KnownPostReached);
    assert_eq!(state.phase(), Phase::Done(StopReason::ReachedKnownPost));
}
