//! `PostgreSQL` implementation of the `TrackerRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use custodian_core::error::DomainError;
use custodian_core::repository::{
    CursorRecord, ParticipantRecord, RosterChange, TrackerRecord, TrackerRepository,
};

/// PostgreSQL-backed tracker repository.
#[derive(Debug, Clone)]
pub struct PgTrackerRepository {
    pool: PgPool,
}

impl PgTrackerRepository {
    /// Creates a new `PgTrackerRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TrackerRow {
    id: Uuid,
    channel_id: String,
    current_round: i32,
    current_index: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TrackerRow> for TrackerRecord {
    fn from(row: TrackerRow) -> Self {
        Self {
            id: row.id,
            channel_id: row.channel_id,
            current_round: row.current_round,
            current_index: row.current_index,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    player_name: String,
    init_value: i32,
    tiebreaker: i32,
}

impl From<MemberRow> for ParticipantRecord {
    fn from(row: MemberRow) -> Self {
        Self {
            name: row.player_name,
            initiative_value: row.init_value,
            tiebreaker: row.tiebreaker,
        }
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

/// Maps a unique-constraint violation to `AlreadyExists`, anything else to
/// `Infrastructure`.
fn conflict_or_infrastructure(err: sqlx::Error, what: impl FnOnce() -> String) -> DomainError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DomainError::AlreadyExists(what())
        }
        _ => infrastructure(err),
    }
}

async fn insert_member<'e>(
    executor: impl PgExecutor<'e>,
    tracker_id: Uuid,
    participant: &ParticipantRecord,
) -> Result<(), DomainError> {
    sqlx::query(
        r"
        INSERT INTO initiative_members (initiative_id, player_name, init_value, tiebreaker)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(tracker_id)
    .bind(&participant.name)
    .bind(participant.initiative_value)
    .bind(participant.tiebreaker)
    .execute(executor)
    .await
    .map_err(|e| conflict_or_infrastructure(e, || format!("participant {}", participant.name)))?;
    Ok(())
}

async fn update_member<'e>(
    executor: impl PgExecutor<'e>,
    tracker_id: Uuid,
    participant: &ParticipantRecord,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r"
        UPDATE initiative_members
        SET init_value = $3, tiebreaker = $4
        WHERE initiative_id = $1 AND player_name = $2
        ",
    )
    .bind(tracker_id)
    .bind(&participant.name)
    .bind(participant.initiative_value)
    .bind(participant.tiebreaker)
    .execute(executor)
    .await
    .map_err(infrastructure)?;

    Ok(result.rows_affected() > 0)
}

async fn delete_member<'e>(
    executor: impl PgExecutor<'e>,
    tracker_id: Uuid,
    name: &str,
) -> Result<bool, DomainError> {
    let result =
        sqlx::query("DELETE FROM initiative_members WHERE initiative_id = $1 AND player_name = $2")
            .bind(tracker_id)
            .bind(name)
            .execute(executor)
            .await
            .map_err(infrastructure)?;

    Ok(result.rows_affected() > 0)
}

async fn move_cursor<'e>(
    executor: impl PgExecutor<'e>,
    tracker_id: Uuid,
    cursor: &CursorRecord,
) -> Result<(), DomainError> {
    let result = sqlx::query(
        r"
        UPDATE initiative_trackers
        SET current_index = $2, current_round = $3, updated_at = $4
        WHERE id = $1
        ",
    )
    .bind(tracker_id)
    .bind(cursor.current_index)
    .bind(cursor.current_round)
    .bind(cursor.updated_at)
    .execute(executor)
    .await
    .map_err(infrastructure)?;

    if result.rows_affected() == 0 {
        return Err(DomainError::NotFound(format!("tracker {tracker_id}")));
    }
    Ok(())
}

#[async_trait]
impl TrackerRepository for PgTrackerRepository {
    async fn insert_tracker(&self, tracker: &TrackerRecord) -> Result<Uuid, DomainError> {
        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO initiative_trackers
                (id, channel_id, current_round, current_index, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(tracker.id)
        .bind(&tracker.channel_id)
        .bind(tracker.current_round)
        .bind(tracker.current_index)
        .bind(tracker.created_at)
        .bind(tracker.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_infrastructure(e, || {
                format!("initiative for channel {}", tracker.channel_id)
            })
        })?;

        debug!(tracker_id = %id, channel_id = %tracker.channel_id, "inserted tracker");
        Ok(id)
    }

    async fn fetch_tracker(&self, channel_id: &str) -> Result<Option<TrackerRecord>, DomainError> {
        let row: Option<TrackerRow> = sqlx::query_as(
            r"
            SELECT id, channel_id, current_round, current_index, created_at, updated_at
            FROM initiative_trackers
            WHERE channel_id = $1
            ",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(row.map(TrackerRecord::from))
    }

    async fn fetch_participants(
        &self,
        tracker_id: Uuid,
    ) -> Result<Vec<ParticipantRecord>, DomainError> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r"
            SELECT player_name, init_value, tiebreaker
            FROM initiative_members
            WHERE initiative_id = $1
            ORDER BY id
            ",
        )
        .bind(tracker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(rows.into_iter().map(ParticipantRecord::from).collect())
    }

    async fn insert_participant(
        &self,
        tracker_id: Uuid,
        participant: &ParticipantRecord,
    ) -> Result<(), DomainError> {
        insert_member(&self.pool, tracker_id, participant).await?;
        debug!(%tracker_id, name = %participant.name, "inserted participant");
        Ok(())
    }

    async fn delete_participant(&self, tracker_id: Uuid, name: &str) -> Result<bool, DomainError> {
        delete_member(&self.pool, tracker_id, name).await
    }

    async fn update_participant(
        &self,
        tracker_id: Uuid,
        participant: &ParticipantRecord,
    ) -> Result<bool, DomainError> {
        update_member(&self.pool, tracker_id, participant).await
    }

    async fn apply_roster_change(
        &self,
        tracker_id: Uuid,
        change: &RosterChange,
        cursor: Option<&CursorRecord>,
    ) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let applied = match change {
            RosterChange::Insert(participant) => {
                insert_member(&mut *tx, tracker_id, participant).await?;
                true
            }
            RosterChange::Update(participant) => {
                update_member(&mut *tx, tracker_id, participant).await?
            }
            RosterChange::Delete(name) => delete_member(&mut *tx, tracker_id, name).await?,
        };
        if !applied {
            tx.rollback().await.map_err(infrastructure)?;
            return Ok(false);
        }
        if let Some(cursor) = cursor {
            move_cursor(&mut *tx, tracker_id, cursor).await?;
        }

        tx.commit().await.map_err(infrastructure)?;
        debug!(%tracker_id, ?change, moved_cursor = cursor.is_some(), "applied roster change");
        Ok(true)
    }

    async fn update_tracker_cursor(
        &self,
        tracker_id: Uuid,
        current_index: i32,
        current_round: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let cursor = CursorRecord {
            current_index,
            current_round,
            updated_at,
        };
        move_cursor(&self.pool, tracker_id, &cursor).await
    }

    async fn delete_tracker(&self, channel_id: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM initiative_trackers WHERE channel_id = $1")
            .bind(channel_id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;

        debug!(%channel_id, deleted = result.rows_affected(), "deleted tracker");
        Ok(result.rows_affected() > 0)
    }
}
