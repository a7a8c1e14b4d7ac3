use super::fakes::*;
use crate::conversation::Role;
use futures::future::join_all;
use std::time::Duration;

const PASSWORD: &str = "How do I reset my password?";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_turns_do_not_interleave() {
    let h = harness(
        password_hits(),
        RecordingLlm::echo().with_delay(Duration::from_millis(50)),
    );

    let turns = (0..4).map(|i| {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            let options = engine.default_options().with_conversation("shared");
            engine
                .query(&format!("password question {}", i), &options)
                .await
        })
    });
    for result in join_all(turns).await {
        result.unwrap().unwrap();
    }

    let history = h.conversations.get_conversation_history("shared");
    assert_eq!(history.len(), 8);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("Answer for: {}", pair[0].content));
    }

    // each turn saw every earlier exchange
    let mut seen: Vec<usize> = h
        .llm
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.history.len())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 2, 4, 6]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_separate_conversations_run_independently() {
    let h = harness(
        password_hits(),
        RecordingLlm::echo().with_delay(Duration::from_millis(20)),
    );

    let a = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            let options = engine.default_options().with_conversation("a");
            engine.query("wifi on campus", &options).await
        })
    };
    let b = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            let options = engine.default_options().with_conversation("b");
            engine.query("printing from laptops", &options).await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let a = h.conversations.get_conversation_history("a");
    let b = h.conversations.get_conversation_history("b");
    assert_eq!(a[0].content, "wifi on campus");
    assert_eq!(b[0].content, "printing from laptops");
    assert_eq!(h.conversations.conversation_count(), 2);
}

#[tokio::test]
async fn test_cancelled_turn_appends_nothing_and_releases_lock() {
    let h = harness(
        password_hits(),
        RecordingLlm::echo().with_delay(Duration::from_secs(10)),
    );

    let engine = h.engine.clone();
    let turn = tokio::spawn(async move {
        let options = engine.default_options().with_conversation("c1");
        engine.query("How do I reset my password?", &options).await
    });

    while h.llm.call_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    turn.abort();
    assert!(turn.await.unwrap_err().is_cancelled());

    assert!(h.conversations.get_conversation_history("c1").is_empty());

    let relock =
        tokio::time::timeout(Duration::from_secs(1), h.conversations.lock_turn("c1")).await;
    assert!(relock.is_ok());
}

#[tokio::test]
async fn test_finished_turns_leave_no_lock_entries() {
    let h = harness(password_hits(), RecordingLlm::echo());

    for i in 0..20 {
        let answered = h.engine.default_options().with_conversation(format!("a{}", i));
        h.engine.query(PASSWORD, &answered).await.unwrap();

        let nothing = h
            .engine
            .default_options()
            .with_min_score(0.99)
            .with_conversation(format!("n{}", i));
        h.engine.query(PASSWORD, &nothing).await.unwrap();
    }

    assert_eq!(h.conversations.turn_lock_count(), 0);
    assert_eq!(h.conversations.conversation_count(), 20);
}
