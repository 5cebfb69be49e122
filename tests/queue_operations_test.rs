mod common;

use common::{elements, TestQueues};
use simpleq::SimpleqError;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_push_then_pop_returns_element() {
    let queues = TestQueues::new();

    assert_eq!(queues.source.push(b"hello").await.unwrap(), 1);
    assert_eq!(queues.source.pop().await.unwrap(), Some(b"hello".to_vec()));
    assert_eq!(queues.source.pop().await.unwrap(), None);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let queues = TestQueues::new();

    for item in ["a", "b", "c"] {
        queues.source.push(item.as_bytes()).await.unwrap();
    }

    assert_eq!(
        queues.source.list().await.unwrap(),
        elements(&["c", "b", "a"])
    );

    // Popping drains from the other end
    assert_eq!(queues.source.pop().await.unwrap(), Some(b"a".to_vec()));
    assert_eq!(queues.source.len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_pull_removes_oldest_matching_occurrence() {
    let queues = TestQueues::new();
    for item in ["x", "y", "x"] {
        queues.source.push(item.as_bytes()).await.unwrap();
    }

    assert_eq!(queues.source.pull(b"x").await.unwrap(), 1);
    assert_eq!(queues.source.list().await.unwrap(), elements(&["x", "y"]));
    assert_eq!(queues.source.pull(b"nope").await.unwrap(), 0);
}

#[tokio::test]
async fn test_pop_pipe_moves_oldest_element() {
    let queues = TestQueues::new();
    queues.source.push(b"a").await.unwrap();
    queues.source.push(b"b").await.unwrap();

    let moved = queues.source.pop_pipe(&queues.destination).await.unwrap();
    assert_eq!(moved, Some(b"a".to_vec()));

    assert_eq!(queues.source.list().await.unwrap(), elements(&["b"]));
    assert_eq!(queues.destination.list().await.unwrap(), elements(&["a"]));
}

#[tokio::test]
async fn test_pop_pipe_on_empty_queue() {
    let queues = TestQueues::new();

    let moved = queues.source.pop_pipe(&queues.destination).await.unwrap();
    assert_eq!(moved, None);
    assert!(queues.destination.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_pull_pipe_pushes_even_when_absent() {
    let queues = TestQueues::new();
    queues.source.push(b"present").await.unwrap();

    let length = queues
        .source
        .pull_pipe(&queues.destination, b"absent")
        .await
        .unwrap();

    assert_eq!(length, 1);
    assert_eq!(queues.source.list().await.unwrap(), elements(&["present"]));
    assert_eq!(
        queues.destination.list().await.unwrap(),
        elements(&["absent"])
    );
}

#[tokio::test]
async fn test_pull_pipe_moves_present_element() {
    let queues = TestQueues::new();
    queues.source.push(b"job").await.unwrap();
    queues.destination.push(b"other").await.unwrap();

    let length = queues
        .source
        .pull_pipe(&queues.destination, b"job")
        .await
        .unwrap();

    assert_eq!(length, 2);
    assert!(queues.source.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_safe_pull_pipe_absent_element_is_noop() {
    let queues = TestQueues::new();
    queues.source.push(b"present").await.unwrap();

    let result = queues
        .source
        .safe_pull_pipe(&queues.destination, b"absent")
        .await
        .unwrap();

    assert_eq!(result, 0);
    assert_eq!(queues.source.list().await.unwrap(), elements(&["present"]));
    assert!(queues.destination.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_safe_pull_pipe_moves_exactly_one_occurrence() {
    let queues = TestQueues::new();
    for item in ["dup", "other", "dup"] {
        queues.source.push(item.as_bytes()).await.unwrap();
    }

    let result = queues
        .source
        .safe_pull_pipe(&queues.destination, b"dup")
        .await
        .unwrap();

    assert_eq!(result, 1);
    assert_eq!(
        queues.source.list().await.unwrap(),
        elements(&["dup", "other"])
    );
    assert_eq!(queues.destination.list().await.unwrap(), elements(&["dup"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_safe_pull_pipe_is_atomic_to_observers() {
    let queues = TestQueues::new();
    let total = 200;
    for i in 0..total {
        queues.source.push(format!("item-{i}").as_bytes()).await.unwrap();
    }

    let mover = {
        let source = queues.source.clone();
        let destination = queues.destination.clone();
        tokio::spawn(async move {
            for i in 0..total {
                let element = format!("item-{i}");
                source
                    .safe_pull_pipe(&destination, element.as_bytes())
                    .await
                    .unwrap();
            }
        })
    };

    // Destination is read first: anything already moved must be gone from
    // the source by the time the source is read.
    while !mover.is_finished() {
        let in_destination = queues.destination.list().await.unwrap();
        let in_source = queues.source.list().await.unwrap();
        for element in &in_destination {
            assert!(!in_source.contains(element), "element visible in both queues");
        }
        tokio::task::yield_now().await;
    }
    mover.await.unwrap();

    assert!(queues.source.is_empty().await.unwrap());
    assert_eq!(queues.destination.len().await.unwrap(), total as i64);
}

#[tokio::test]
async fn test_blocking_pop_timeout_is_an_error() {
    let queues = TestQueues::new();

    let started = Instant::now();
    let result = queues.source.blocking_pop(1).await;
    let elapsed = started.elapsed();

    match result {
        Err(SimpleqError::Timeout { key, timeout_secs }) => {
            assert_eq!(key, queues.source.key());
            assert_eq!(timeout_secs, 1);
        }
        other => panic!("expected timeout error, got {other:?}"),
    }
    assert!(elapsed >= Duration::from_millis(900));
    assert!(elapsed < Duration::from_secs(3));
}

#[tokio::test]
async fn test_blocking_pop_pipe_timeout_is_empty() {
    let queues = TestQueues::new();

    let started = Instant::now();
    let result = queues
        .source
        .blocking_pop_pipe(&queues.destination, 1)
        .await;
    let elapsed = started.elapsed();

    assert_eq!(result.unwrap(), None);
    assert!(elapsed >= Duration::from_millis(900));
    assert!(elapsed < Duration::from_secs(3));
}

#[tokio::test]
async fn test_blocking_pop_receives_later_push() {
    let queues = TestQueues::new();

    let popper = {
        let source = queues.source.clone();
        tokio::spawn(async move { source.blocking_pop(0).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    queues.source.push(b"eventually").await.unwrap();

    let popped = tokio::time::timeout(Duration::from_secs(2), popper)
        .await
        .expect("blocking pop should wake up")
        .unwrap()
        .unwrap();
    assert_eq!(popped, Some(b"eventually".to_vec()));
}

#[tokio::test]
async fn test_blocking_pop_pipe_receives_later_push() {
    let queues = TestQueues::new();

    let piper = {
        let source = queues.source.clone();
        let destination = queues.destination.clone();
        tokio::spawn(async move { source.blocking_pop_pipe(&destination, 2).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    queues.source.push(b"moved").await.unwrap();

    assert_eq!(piper.await.unwrap().unwrap(), Some(b"moved".to_vec()));
    assert_eq!(queues.destination.list().await.unwrap(), elements(&["moved"]));
}

#[tokio::test]
async fn test_clear_then_list_is_empty() {
    let queues = TestQueues::new();
    queues.source.push(b"a").await.unwrap();
    queues.source.push(b"b").await.unwrap();

    assert_eq!(queues.source.clear().await.unwrap(), 1);
    assert!(queues.source.list().await.unwrap().is_empty());
    assert_eq!(queues.source.clear().await.unwrap(), 0);
}

#[tokio::test]
async fn test_store_errors_propagate_unchanged() {
    let queues = TestQueues::new();
    queues.store.fail_next(1);

    let result = queues.source.push(b"lost").await;
    assert!(matches!(result, Err(SimpleqError::Store { .. })));
    assert!(queues.source.is_empty().await.unwrap());
}
