//! Release → fetch → submit lifecycle over the filesystem exchange

mod support;

use coursework_common::{Entry, Error, LifecycleState, ListKind, NotebookItem};
use coursework_tracker::AssignmentTracker;
use support::{items, Classroom};
use test_case::test_case;

fn names(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.name()).collect()
}

#[tokio::test]
async fn released_assignment_is_listed_for_its_course() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker
        .release("abc101", "Problem Set 1", items(&["Problem 1", "Problem 2"]))
        .await
        .unwrap();

    let released = tracker.list("abc101", ListKind::Released);
    assert_eq!(names(&released), vec!["Problem Set 1"]);
    assert_eq!(released[0].course(), "abc101");
    assert!(tracker.list("abc101", ListKind::Fetched).is_empty());
    assert!(tracker.list("abc101", ListKind::Submitted).is_empty());
}

#[tokio::test]
async fn identical_release_does_not_duplicate() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker.release("abc101", "ps.01", items(&["problem 1"])).await.unwrap();
    let err = tracker
        .release("abc101", "ps.01", items(&["problem 1"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DuplicateRelease { .. }));
    assert_eq!(tracker.list("abc101", ListKind::Released).len(), 1);
}

#[tokio::test]
async fn course_with_spaces_is_independent() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker
        .release("abc101", "Problem Set 1", items(&["Problem 1", "Problem 2"]))
        .await
        .unwrap();
    let before = tracker.course_records("abc101");

    tracker.release("xyz 200", "ps.01", items(&["problem 1"])).await.unwrap();
    tracker.fetch("xyz 200", "ps.01", &room.workspace()).await.unwrap();
    tracker.submit("xyz 200", "ps.01").await.unwrap();

    assert_eq!(tracker.course_records("abc101"), before);
    assert_eq!(names(&tracker.list("xyz 200", ListKind::Released)), vec!["ps.01"]);
    assert_eq!(tracker.courses(), vec!["abc101", "xyz 200"]);
}

#[tokio::test]
async fn fetch_then_submit_twice() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker.release("xyz 200", "ps.01", items(&["problem 1"])).await.unwrap();

    let fetched = tracker.fetch("xyz 200", "ps.01", &room.workspace()).await.unwrap();
    assert_eq!(fetched.local_path, room.workspace().join("ps.01"));
    assert!(room.workspace().join("ps.01").join("problem 1.ipynb").is_file());
    assert_eq!(names(&tracker.list("xyz 200", ListKind::Fetched)), vec!["ps.01"]);
    assert_eq!(tracker.expand("xyz 200", "ps.01").unwrap(), vec!["problem 1"]);

    tracker.submit("xyz 200", "ps.01").await.unwrap();
    assert_eq!(tracker.list("xyz 200", ListKind::Submitted).len(), 1);

    tracker.submit("xyz 200", "ps.01").await.unwrap();
    let submitted = tracker.list("xyz 200", ListKind::Submitted);
    assert_eq!(names(&submitted), vec!["ps.01", "ps.01"]);
    assert!(submitted.iter().all(|e| e.course() == "xyz 200"));
    assert_ne!(submitted[0].status(), submitted[1].status());
    assert_eq!(tracker.state("xyz 200", "ps.01"), LifecycleState::Submitted(2));

    let inbound = room.exchange().await.inbound_dir("xyz 200");
    assert_eq!(std::fs::read_dir(inbound).unwrap().count(), 2);
}

#[tokio::test]
async fn fetch_without_release_fails() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    let err = tracker
        .fetch("abc101", "ps.01", &room.workspace())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotReleased { .. }));
    assert!(tracker.list("abc101", ListKind::Fetched).is_empty());
    assert!(!room.workspace().join("ps.01").exists());
}

#[tokio::test]
async fn submit_without_fetch_fails() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker.release("abc101", "ps.01", items(&["problem 1"])).await.unwrap();
    let err = tracker.submit("abc101", "ps.01").await.unwrap_err();

    assert!(matches!(err, Error::NotFetched { .. }));
    assert!(tracker.list("abc101", ListKind::Submitted).is_empty());
    assert_eq!(tracker.state("abc101", "ps.01"), LifecycleState::Released);
}

#[tokio::test]
async fn expand_sorts_items() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker
        .release("abc101", "Problem Set 1", items(&["Problem 2", "Problem 1"]))
        .await
        .unwrap();

    assert_eq!(
        tracker.expand("abc101", "Problem Set 1").unwrap(),
        vec!["Problem 1", "Problem 2"]
    );
    assert!(matches!(
        tracker.expand("abc101", "Problem Set 2"),
        Err(Error::UnknownAssignment { .. })
    ));
    assert!(matches!(
        tracker.expand("xyz 200", "Problem Set 1"),
        Err(Error::UnknownAssignment { .. })
    ));
}

#[tokio::test]
async fn validate_reports_without_mutating() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker
        .release("abc101", "Problem Set 1", items(&["Problem 1", "Problem 2"]))
        .await
        .unwrap();
    tracker
        .fetch("abc101", "Problem Set 1", &room.workspace())
        .await
        .unwrap();
    let before = tracker.course_records("abc101");

    let ok = tracker.validate("abc101", "Problem Set 1", "Problem 1").await.unwrap();
    assert!(ok.is_success());

    let failed = tracker.validate("abc101", "Problem Set 1", "Problem 2").await.unwrap();
    assert!(!failed.is_success());
    assert!(!failed.diagnostics.is_empty());
    assert!(failed.diagnostics[0].contains("AssertionError"));

    assert_eq!(tracker.course_records("abc101"), before);
}

#[tokio::test]
async fn non_empty_destination_is_refused() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    tracker.release("xyz 200", "ps.01", items(&["problem 1"])).await.unwrap();
    std::fs::create_dir_all(room.workspace().join("ps.01")).unwrap();
    std::fs::write(room.workspace().join("ps.01").join("notes.txt"), b"mine").unwrap();

    let err = tracker
        .fetch("xyz 200", "ps.01", &room.workspace())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DestinationExists { .. }));
    assert!(tracker.list("xyz 200", ListKind::Fetched).is_empty());
    assert!(room.workspace().join("ps.01").join("notes.txt").is_file());
}

#[tokio::test]
async fn refetch_with_overwrite_updates_entry() {
    let mut room = Classroom::new();
    room.config.fetch.allow_overwrite = true;
    let tracker = room.tracker().await;

    tracker.release("xyz 200", "ps.01", items(&["problem 1"])).await.unwrap();
    let first = tracker.fetch("xyz 200", "ps.01", &room.workspace()).await.unwrap();
    let second = tracker.fetch("xyz 200", "ps.01", &room.workspace()).await.unwrap();

    assert_eq!(tracker.list("xyz 200", ListKind::Fetched).len(), 1);
    assert!(second.fetched_at >= first.fetched_at);
    assert!(room.workspace().join("ps.01").join("problem 1.ipynb").is_file());
}

#[tokio::test]
async fn state_survives_reopen() {
    let room = Classroom::new();

    {
        let tracker = AssignmentTracker::open(&room.config).await.unwrap();
        tracker.release("xyz 200", "ps.01", items(&["problem 1"])).await.unwrap();
        tracker.fetch("xyz 200", "ps.01", &room.workspace()).await.unwrap();
        tracker.submit("xyz 200", "ps.01").await.unwrap();
    }

    let tracker = AssignmentTracker::open(&room.config).await.unwrap();
    assert_eq!(tracker.courses(), vec!["xyz 200"]);
    assert_eq!(tracker.state("xyz 200", "ps.01"), LifecycleState::Submitted(1));

    let second = tracker.submit("xyz 200", "ps.01").await.unwrap();
    assert_eq!(second.attempt, 2);
}

#[test_case("abc101", "" ; "empty assignment")]
#[test_case("abc101", "." ; "current directory")]
#[test_case("abc101", ".." ; "parent directory")]
#[test_case("abc101", "ps/01" ; "nested assignment")]
#[test_case("../abc101", "ps.01" ; "escaping course")]
#[tokio::test]
async fn unsafe_names_are_rejected_before_touching_disk(course: &str, name: &str) {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    let err = tracker.release(course, name, Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidName { .. }), "{err}");
    let err = tracker.fetch(course, name, &room.workspace()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidName { .. }), "{err}");
    let err = tracker.submit(course, name).await.unwrap_err();
    assert!(matches!(err, Error::InvalidName { .. }), "{err}");

    assert!(tracker.courses().is_empty());
    assert_eq!(std::fs::read_dir(room.config.exchange_root()).unwrap().count(), 0);
    assert!(!room.workspace().exists());
}

#[tokio::test]
async fn notebook_outside_assignment_is_rejected() {
    let room = Classroom::new();
    let tracker = room.tracker().await;

    let escaping = vec![NotebookItem::new("problem 1").with_path("../ps.01/problem 1.ipynb")];
    let err = tracker
        .release("abc101", "Problem Set 1", escaping)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_name");
    assert!(tracker.list("abc101", ListKind::Released).is_empty());
}
