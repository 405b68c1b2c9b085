use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use blogwalk_engine::{
    CandidateKind, Cursor, EventBus, EventKind, MediaRecord, PageBoundary, Scope,
};

fn record(blog: &str) -> MediaRecord {
    MediaRecord {
        photo_id: "1".to_string(),
        url: "https://m/1.jpg".to_string(),
        tags: Vec::new(),
        author: blog.to_string(),
        blog: blog.to_string(),
        post_id: "1".to_string(),
        kind: CandidateKind::Image,
        next_cursor: None,
    }
}

fn boundary(blog: &str) -> PageBoundary {
    PageBoundary {
        blog: blog.to_string(),
        next_cursor: Cursor::start(2, 20),
        records_on_page: 3,
        pages_fetched: 1,
    }
}

fn counter() -> (Arc<AtomicUsize>, impl Fn(&MediaRecord) + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = count.clone();
    (count, move |_: &MediaRecord| {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn media_reaches_scoped_and_wildcard_listeners() {
    let bus = EventBus::new();
    let (alice, on_alice) = counter();
    let (bob, on_bob) = counter();
    let (all, on_all) = counter();
    bus.on_media(Scope::blog("alice"), on_alice);
    bus.on_media(Scope::blog("bob"), on_bob);
    bus.on_media(Scope::All, on_all);

    bus.publish_media(&record("alice"));
    bus.publish_media(&record("carol"));

    assert_eq!(alice.load(Ordering::SeqCst), 1);
    assert_eq!(bob.load(Ordering::SeqCst), 0);
    assert_eq!(all.load(Ordering::SeqCst), 2);
}

#[test]
fn unsubscribed_listener_is_not_called() {
    let bus = EventBus::new();
    let (count, on_media) = counter();
    let id = bus.on_media(Scope::All, on_media);
    assert!(bus.has_listeners("anyone", EventKind::Media));

    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    bus.publish_media(&record("alice"));

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(!bus.has_listeners("anyone", EventKind::Media));
}

#[test]
fn error_handling_follows_scope() {
    let bus = EventBus::new();
    assert!(!bus.handles_errors("alice"));

    let id = bus.on_walk_error(Scope::blog("alice"), |_| {});
    assert!(bus.handles_errors("alice"));
    assert!(!bus.handles_errors("bob"));

    bus.unsubscribe(id);
    bus.on_walk_error(Scope::All, |_| {});
    assert!(bus.handles_errors("bob"));
}

#[tokio::test]
async fn boundary_without_listeners_proceeds() {
    let bus = EventBus::new();
    assert!(bus.vote_page_boundary(&boundary("alice")).await);
}

#[tokio::test]
async fn any_false_vote_vetoes_and_every_listener_runs() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    for vote in [true, false, true] {
        let calls = calls.clone();
        bus.on_page_boundary(Scope::All, move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            vote
        });
    }

    assert!(!bus.vote_page_boundary(&boundary("alice")).await);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn async_votes_are_awaited() {
    let bus = EventBus::new();
    bus.on_page_boundary_async(Scope::blog("alice"), |b: PageBoundary| async move {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        b.records_on_page > 0
    });

    assert!(bus.vote_page_boundary(&boundary("alice")).await);
    let mut empty = boundary("alice");
    empty.records_on_page = 0;
    assert!(!bus.vote_page_boundary(&empty).await);
    assert!(bus.vote_page_boundary(&boundary("bob")).await);
}

#[test]
fn listener_may_unsubscribe_itself_while_called() {
    let bus = Arc::new(EventBus::new());
    let count = Arc::new(AtomicUsize::new(0));
    let slot = Arc::new(AtomicUsize::new(0));
    let weak = Arc::downgrade(&bus);
    let id = {
        let count = count.clone();
        let slot = slot.clone();
        bus.on_media(Scope::All, move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            if let Some(bus) = weak.upgrade() {
                bus.unsubscribe(slot.load(Ordering::SeqCst) as u64);
            }
        })
    };
    slot.store(id as usize, Ordering::SeqCst);

    bus.publish_media(&record("alice"));
    bus.publish_media(&record("alice"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
