//! Integration tests for `PgTrackerRepository`.

use chrono::{TimeZone, Utc};
use custodian_core::error::DomainError;
use custodian_core::repository::{
    CursorRecord, ParticipantRecord, RosterChange, TrackerRecord, TrackerRepository,
};
use custodian_store::pg_tracker_repository::PgTrackerRepository;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `TrackerRecord` with sensible defaults.
fn make_tracker(channel_id: &str) -> TrackerRecord {
    let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
    TrackerRecord {
        id: Uuid::new_v4(),
        channel_id: channel_id.to_owned(),
        current_round: 1,
        current_index: 0,
        created_at: now,
        updated_at: now,
    }
}

fn make_participant(name: &str, initiative_value: i32, tiebreaker: i32) -> ParticipantRecord {
    ParticipantRecord {
        name: name.to_owned(),
        initiative_value,
        tiebreaker,
    }
}

// --- trackers ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_tracker_returns_none_for_unknown_channel(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);

    let tracker = repo.fetch_tracker("404").await.unwrap();

    assert!(tracker.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_insert_and_fetch_tracker(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");

    let id = repo.insert_tracker(&tracker).await.unwrap();

    assert_eq!(id, tracker.id);
    let loaded = repo.fetch_tracker("123456").await.unwrap().unwrap();
    assert_eq!(loaded, tracker);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_second_tracker_for_channel_returns_already_exists(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    repo.insert_tracker(&make_tracker("123456")).await.unwrap();

    let result = repo.insert_tracker(&make_tracker("123456")).await;

    match result.unwrap_err() {
        DomainError::AlreadyExists(msg) => assert_eq!(msg, "initiative for channel 123456"),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_tracker_cursor_persists_position(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();
    let later = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();

    repo.update_tracker_cursor(tracker.id, 2, 3, later)
        .await
        .unwrap();

    let loaded = repo.fetch_tracker("123456").await.unwrap().unwrap();
    assert_eq!(loaded.current_index, 2);
    assert_eq!(loaded.current_round, 3);
    assert_eq!(loaded.updated_at, later);
    assert_eq!(loaded.created_at, tracker.created_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_tracker_cascades_to_participants(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();
    repo.insert_participant(tracker.id, &make_participant("Bob", 10, 0))
        .await
        .unwrap();

    assert!(repo.delete_tracker("123456").await.unwrap());

    assert!(repo.fetch_tracker("123456").await.unwrap().is_none());
    assert!(repo.fetch_participants(tracker.id).await.unwrap().is_empty());
    assert!(!repo.delete_tracker("123456").await.unwrap());
}

// --- participants ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_participants_are_returned_in_insertion_order(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();
    let roster = vec![
        make_participant("Charlie", 5, 0),
        make_participant("Alice", 15, 0),
        make_participant("Bob", 10, 2),
    ];
    for participant in &roster {
        repo.insert_participant(tracker.id, participant)
            .await
            .unwrap();
    }

    let loaded = repo.fetch_participants(tracker.id).await.unwrap();

    assert_eq!(loaded, roster);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_duplicate_participant_name_returns_already_exists(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();
    repo.insert_participant(tracker.id, &make_participant("Bob", 10, 0))
        .await
        .unwrap();

    let result = repo
        .insert_participant(tracker.id, &make_participant("Bob", 12, 0))
        .await;

    assert!(matches!(result, Err(DomainError::AlreadyExists(_))));
    assert_eq!(repo.fetch_participants(tracker.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_same_name_in_different_trackers_is_allowed(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let first = make_tracker("111");
    let second = make_tracker("222");
    repo.insert_tracker(&first).await.unwrap();
    repo.insert_tracker(&second).await.unwrap();

    repo.insert_participant(first.id, &make_participant("Bob", 10, 0))
        .await
        .unwrap();
    repo.insert_participant(second.id, &make_participant("Bob", 4, 0))
        .await
        .unwrap();

    assert_eq!(repo.fetch_participants(first.id).await.unwrap().len(), 1);
    assert_eq!(repo.fetch_participants(second.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_participant_keeps_insertion_position(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();
    repo.insert_participant(tracker.id, &make_participant("Bob", 10, 0))
        .await
        .unwrap();
    repo.insert_participant(tracker.id, &make_participant("Alice", 15, 0))
        .await
        .unwrap();

    let updated = repo
        .update_participant(tracker.id, &make_participant("Bob", 20, 1))
        .await
        .unwrap();

    assert!(updated);
    let loaded = repo.fetch_participants(tracker.id).await.unwrap();
    assert_eq!(loaded[0], make_participant("Bob", 20, 1));
    assert_eq!(loaded[1], make_participant("Alice", 15, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_and_delete_absent_participant_report_false(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();

    let updated = repo
        .update_participant(tracker.id, &make_participant("Nobody", 1, 0))
        .await
        .unwrap();
    let deleted = repo.delete_participant(tracker.id, "Nobody").await.unwrap();

    assert!(!updated);
    assert!(!deleted);
}

// --- roster changes ---

fn make_cursor(current_index: i32, current_round: i32) -> CursorRecord {
    CursorRecord {
        current_index,
        current_round,
        updated_at: Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roster_change_writes_participant_and_cursor(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();
    repo.insert_participant(tracker.id, &make_participant("Bob", 10, 0))
        .await
        .unwrap();

    let applied = repo
        .apply_roster_change(
            tracker.id,
            &RosterChange::Insert(make_participant("Alice", 15, 0)),
            Some(&make_cursor(1, 1)),
        )
        .await
        .unwrap();

    assert!(applied);
    assert_eq!(repo.fetch_participants(tracker.id).await.unwrap().len(), 2);
    let loaded = repo.fetch_tracker("123456").await.unwrap().unwrap();
    assert_eq!(loaded.current_index, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_rejected_cursor_rolls_back_participant_insert(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();

    // Round 0 violates the tracker's CHECK constraint.
    let result = repo
        .apply_roster_change(
            tracker.id,
            &RosterChange::Insert(make_participant("Alice", 15, 0)),
            Some(&make_cursor(0, 0)),
        )
        .await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert!(repo.fetch_participants(tracker.id).await.unwrap().is_empty());
    let loaded = repo.fetch_tracker("123456").await.unwrap().unwrap();
    assert_eq!(loaded, tracker);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roster_change_for_absent_participant_leaves_cursor(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();

    let applied = repo
        .apply_roster_change(
            tracker.id,
            &RosterChange::Delete("Nobody".to_owned()),
            Some(&make_cursor(0, 4)),
        )
        .await
        .unwrap();

    assert!(!applied);
    let loaded = repo.fetch_tracker("123456").await.unwrap().unwrap();
    assert_eq!(loaded.current_round, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roster_change_duplicate_insert_returns_already_exists(pool: PgPool) {
    let repo = PgTrackerRepository::new(pool);
    let tracker = make_tracker("123456");
    repo.insert_tracker(&tracker).await.unwrap();
    repo.insert_participant(tracker.id, &make_participant("Bob", 10, 0))
        .await
        .unwrap();

    let result = repo
        .apply_roster_change(
            tracker.id,
            &RosterChange::Insert(make_participant("Bob", 3, 0)),
            Some(&make_cursor(0, 2)),
        )
        .await;

    assert!(matches!(result, Err(DomainError::AlreadyExists(_))));
    let loaded = repo.fetch_tracker("123456").await.unwrap().unwrap();
    assert_eq!(loaded.current_round, 1);
}
