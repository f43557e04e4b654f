mod helpers;

use helpers::{backdated_message, backdated_session, memory_store_with, snapshot_of, test_config};
use mnemo::store::engine::ConversationStore;
use mnemo::store::types::{MessageDraft, Role};

#[tokio::test]
async fn sessions_past_max_age_are_evicted_with_their_messages() {
    let mut store = memory_store_with(&test_config());
    let old = backdated_session("session-old", 40, 40);
    let fresh = backdated_session("session-fresh", 5, 5);
    let snapshot = snapshot_of(vec![
        (old.clone(), vec![backdated_message("msg-1", &old.id, "ancient", 40)]),
        (fresh.clone(), vec![]),
    ]);
    store.import(&snapshot).await.unwrap();

    let report = store.cleanup().await.unwrap();
    assert_eq!(report.expired_sessions, 1);

    assert!(store.get_session(&old.id).await.unwrap().is_none());
    assert!(store.messages(&old.id, None).await.unwrap().is_empty());
    assert!(store.get_session(&fresh.id).await.unwrap().is_some());
    store.check_integrity().unwrap();
}

#[tokio::test]
async fn session_count_is_capped_by_evicting_the_stalest() {
    let mut config = test_config();
    config.retention.max_sessions = 2;
    let mut store = memory_store_with(&config);

    let snapshot = snapshot_of(vec![
        (backdated_session("session-stale", 10, 9), vec![]),
        (backdated_session("session-older", 10, 5), vec![]),
        (backdated_session("session-recent", 10, 1), vec![]),
    ]);
    store.import(&snapshot).await.unwrap();

    let report = store.cleanup().await.unwrap();
    assert_eq!(report.overflow_sessions, 1);

    assert!(store.get_session("session-stale").await.unwrap().is_none());
    assert!(store.get_session("session-older").await.unwrap().is_some());
    assert!(store.get_session("session-recent").await.unwrap().is_some());
}

#[tokio::test]
async fn sessions_are_trimmed_to_the_message_cap() {
    let mut config = test_config();
    config.retention.max_messages_per_session = 3;
    let mut store = memory_store_with(&config);

    let session = store.create_session(None).await.unwrap();
    for i in 0..5 {
        store
            .add_message(&MessageDraft::new(&session.id, Role::User, format!("msg {i}")))
            .await
            .unwrap();
    }

    let report = store.cleanup().await.unwrap();
    assert_eq!(report.trimmed_messages, 2);

    let remaining = store.messages(&session.id, None).await.unwrap();
    let contents: Vec<&str> = remaining.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["msg 2", "msg 3", "msg 4"], "oldest are trimmed first");

    let session = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(session.message_count, 3);
    store.check_integrity().unwrap();
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    let mut store = memory_store_with(&test_config());
    let old = backdated_session("session-old", 45, 45);
    store
        .import(&snapshot_of(vec![(old, vec![])]))
        .await
        .unwrap();

    let first = store.cleanup().await.unwrap();
    assert_eq!(first.expired_sessions, 1);

    let second = store.cleanup().await.unwrap();
    assert!(second.is_noop());
}

#[tokio::test]
async fn cleanup_on_an_empty_store_is_a_noop() {
    let mut store = memory_store_with(&test_config());
    let report = store.cleanup().await.unwrap();
    assert!(report.is_noop());
}
