use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{NewTimerEntry, TimerEntry};
use crate::db::{unique_violation, StoreError};

/// Partial unique index guarding "one open entry per user".
const ONE_OPEN_PER_USER: &str = "timer_entries_one_open_per_user";

#[async_trait]
pub trait TimerEntryRepo: Send + Sync {
    async fn find_in_progress_for_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TimerEntry>, StoreError>;

    /// Newest `start_time` first.
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<TimerEntry>, StoreError>;

    /// Like `find_by_user_id`, restricted to titles containing `title`
    /// case-insensitively.
    async fn find_by_user_id_with_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Vec<TimerEntry>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimerEntry>, StoreError>;

    /// Inserts an open entry. Fails with `StoreError::OpenEntryConflict`
    /// if the user already has one.
    async fn insert(&self, entry: NewTimerEntry) -> Result<TimerEntry, StoreError>;

    /// Rewrites an existing entry. Fails with `StoreError::OpenEntryConflict`
    /// if this would leave the user with two open entries.
    async fn save(&self, entry: &TimerEntry) -> Result<TimerEntry, StoreError>;
}

#[derive(Clone)]
pub struct PgTimerEntryRepo {
    db: PgPool,
}

impl PgTimerEntryRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    match unique_violation(&e) {
        Some(constraint) if constraint == ONE_OPEN_PER_USER => StoreError::OpenEntryConflict,
        _ => e.into(),
    }
}

#[async_trait]
impl TimerEntryRepo for PgTimerEntryRepo {
    async fn find_in_progress_for_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TimerEntry>, StoreError> {
        let row = sqlx::query_as::<_, TimerEntry>(
            r#"
            SELECT id, user_id, title, start_time, end_time, duration
            FROM timer_entries
            WHERE user_id = $1 AND end_time IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<TimerEntry>, StoreError> {
        let rows = sqlx::query_as::<_, TimerEntry>(
            r#"
            SELECT id, user_id, title, start_time, end_time, duration
            FROM timer_entries
            WHERE user_id = $1
            ORDER BY start_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_user_id_with_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Vec<TimerEntry>, StoreError> {
        let rows = sqlx::query_as::<_, TimerEntry>(
            r#"
            SELECT id, user_id, title, start_time, end_time, duration
            FROM timer_entries
            WHERE user_id = $1 AND strpos(lower(title), lower($2)) > 0
            ORDER BY start_time DESC
            "#,
        )
        .bind(user_id)
        .bind(title)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimerEntry>, StoreError> {
        let row = sqlx::query_as::<_, TimerEntry>(
            r#"
            SELECT id, user_id, title, start_time, end_time, duration
            FROM timer_entries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, entry: NewTimerEntry) -> Result<TimerEntry, StoreError> {
        sqlx::query_as::<_, TimerEntry>(
            r#"
            INSERT INTO timer_entries (id, user_id, title, start_time, end_time, duration)
            VALUES ($1, $2, $3, $4, NULL, 0)
            RETURNING id, user_id, title, start_time, end_time, duration
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(&entry.title)
        .bind(entry.start_time)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_error)
    }

    async fn save(&self, entry: &TimerEntry) -> Result<TimerEntry, StoreError> {
        sqlx::query_as::<_, TimerEntry>(
            r#"
            UPDATE timer_entries
               SET title = $2, start_time = $3, end_time = $4, duration = $5
             WHERE id = $1
            RETURNING id, user_id, title, start_time, end_time, duration
            "#,
        )
        .bind(entry.id)
        .bind(&entry.title)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.duration)
        .fetch_optional(&self.db)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| anyhow::anyhow!("timer entry {} vanished during save", entry.id).into())
    }
}

/// Process-local store. The open-entry check and the write share one lock.
#[derive(Default)]
pub struct MemoryTimerEntryRepo {
    entries: RwLock<HashMap<Uuid, TimerEntry>>,
}

impl MemoryTimerEntryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut rows: Vec<TimerEntry>) -> Vec<TimerEntry> {
    rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    rows
}

#[async_trait]
impl TimerEntryRepo for MemoryTimerEntryRepo {
    async fn find_in_progress_for_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TimerEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|e| e.user_id == user_id && e.is_running())
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<TimerEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(newest_first(
            entries.values().filter(|e| e.user_id == user_id).cloned().collect(),
        ))
    }

    async fn find_by_user_id_with_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Vec<TimerEntry>, StoreError> {
        let needle = title.to_lowercase();
        let entries = self.entries.read().await;
        Ok(newest_first(
            entries
                .values()
                .filter(|e| e.user_id == user_id && e.title.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimerEntry>, StoreError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn insert(&self, entry: NewTimerEntry) -> Result<TimerEntry, StoreError> {
        let mut entries = self.entries.write().await;
        if entries
            .values()
            .any(|e| e.user_id == entry.user_id && e.is_running())
        {
            return Err(StoreError::OpenEntryConflict);
        }
        let entry = TimerEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            title: entry.title,
            start_time: entry.start_time,
            end_time: None,
            duration: 0,
        };
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn save(&self, entry: &TimerEntry) -> Result<TimerEntry, StoreError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&entry.id) {
            return Err(anyhow::anyhow!("timer entry {} vanished during save", entry.id).into());
        }
        if entry.is_running()
            && entries
                .values()
                .any(|e| e.id != entry.id && e.user_id == entry.user_id && e.is_running())
        {
            return Err(StoreError::OpenEntryConflict);
        }
        entries.insert(entry.id, entry.clone());
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn started(user_id: Uuid, title: &str, start: time::OffsetDateTime) -> NewTimerEntry {
        NewTimerEntry {
            user_id,
            title: title.into(),
            start_time: start,
        }
    }

    async fn closed(
        repo: &MemoryTimerEntryRepo,
        user_id: Uuid,
        title: &str,
        start: time::OffsetDateTime,
    ) -> TimerEntry {
        let mut e = repo.insert(started(user_id, title, start)).await.unwrap();
        e.end_time = Some(start + time::Duration::minutes(30));
        e.duration = 1800;
        repo.save(&e).await.unwrap()
    }

    #[tokio::test]
    async fn second_open_entry_is_rejected() {
        let repo = MemoryTimerEntryRepo::new();
        let user = Uuid::new_v4();
        repo.insert(started(user, "a", datetime!(2020-07-08 20:00 UTC)))
            .await
            .unwrap();
        let err = repo
            .insert(started(user, "b", datetime!(2020-07-08 21:00 UTC)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OpenEntryConflict));

        // other users are unaffected
        repo.insert(started(Uuid::new_v4(), "c", datetime!(2020-07-08 21:00 UTC)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reopening_while_another_is_open_is_rejected() {
        let repo = MemoryTimerEntryRepo::new();
        let user = Uuid::new_v4();
        let mut old = closed(&repo, user, "old", datetime!(2020-07-08 18:00 UTC)).await;
        repo.insert(started(user, "open", datetime!(2020-07-08 20:00 UTC)))
            .await
            .unwrap();

        old.end_time = None;
        old.duration = 0;
        let err = repo.save(&old).await.unwrap_err();
        assert!(matches!(err, StoreError::OpenEntryConflict));
    }

    #[tokio::test]
    async fn open_entry_can_be_saved_again() {
        let repo = MemoryTimerEntryRepo::new();
        let user = Uuid::new_v4();
        let mut open = repo
            .insert(started(user, "open", datetime!(2020-07-08 20:00 UTC)))
            .await
            .unwrap();
        open.title = "renamed".into();
        let saved = repo.save(&open).await.unwrap();
        assert_eq!(saved.title, "renamed");
    }

    #[tokio::test]
    async fn list_is_newest_first_and_scoped_to_user() {
        let repo = MemoryTimerEntryRepo::new();
        let user = Uuid::new_v4();
        closed(&repo, user, "first", datetime!(2020-07-08 08:00 UTC)).await;
        closed(&repo, user, "third", datetime!(2020-07-08 12:00 UTC)).await;
        closed(&repo, user, "second", datetime!(2020-07-08 10:00 UTC)).await;
        closed(&repo, Uuid::new_v4(), "foreign", datetime!(2020-07-08 11:00 UTC)).await;

        let titles: Vec<_> = repo
            .find_by_user_id(user)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn title_filter_is_case_insensitive_substring() {
        let repo = MemoryTimerEntryRepo::new();
        let user = Uuid::new_v4();
        closed(&repo, user, "Write SPEC", datetime!(2020-07-08 08:00 UTC)).await;
        closed(&repo, user, "Review spec draft", datetime!(2020-07-08 09:00 UTC)).await;
        closed(&repo, user, "Lunch", datetime!(2020-07-08 12:00 UTC)).await;

        let titles: Vec<_> = repo
            .find_by_user_id_with_title(user, "Spec")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["Review spec draft", "Write SPEC"]);
    }

    #[tokio::test]
    async fn saving_unknown_entry_fails() {
        let repo = MemoryTimerEntryRepo::new();
        let ghost = TimerEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "ghost".into(),
            start_time: datetime!(2020-07-08 08:00 UTC),
            end_time: None,
            duration: 0,
        };
        assert!(matches!(repo.save(&ghost).await, Err(StoreError::Other(_))));
    }
}
