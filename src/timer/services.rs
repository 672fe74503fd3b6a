use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

use super::{
    repo::TimerEntryRepo,
    repo_types::{NewTimerEntry, TimerEntry},
    rules::{duration_seconds, now_millis, validate_range},
};
use crate::{auth::repo_types::User, db::StoreError, error::AppError};

/// Per-user timer state machine: Idle (no open entry) or Running (one).
#[derive(Clone)]
pub struct TimerService {
    entries: Arc<dyn TimerEntryRepo>,
    span: Span,
}

/// Fields rewritten by [`TimerService::update`].
#[derive(Debug, Clone)]
pub struct EntryUpdate {
    pub title: String,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
}

impl TimerService {
    /// Every operation span opened by this service follows from `span`.
    pub fn new(entries: Arc<dyn TimerEntryRepo>, span: Span) -> Self {
        Self { entries, span }
    }

    /// Links an operation span, opened inside the caller's context, to the service span.
    fn op(&self, span: Span) -> Span {
        span.follows_from(&self.span);
        span
    }

    /// Entries owned by `user`, newest first. An empty filter means none.
    pub async fn list(&self, user: &User, title: Option<&str>) -> Result<Vec<TimerEntry>, AppError> {
        let span = self.op(info_span!("list_timer_entries", user_id = %user.id));
        async {
            let rows = match title.filter(|t| !t.is_empty()) {
                Some(title) => self.entries.find_by_user_id_with_title(user.id, title).await,
                None => self.entries.find_by_user_id(user.id).await,
            }
            .map_err(store)?;
            debug!(count = rows.len(), "listed timer entries");
            Ok::<_, AppError>(rows)
        }
        .instrument(span)
        .await
    }

    pub async fn start(&self, user: &User, title: &str) -> Result<TimerEntry, AppError> {
        let span = self.op(info_span!("start_timer", user_id = %user.id));
        async {
            self.ensure_idle(user, None).await?;

            let entry = self
                .entries
                .insert(NewTimerEntry {
                    user_id: user.id,
                    title: title.to_string(),
                    start_time: now_millis(),
                })
                .await
                .map_err(store)?;

            info!(entry_id = %entry.id, "started timer");
            Ok::<_, AppError>(entry)
        }
        .instrument(span)
        .await
    }

    pub async fn stop(&self, user: &User) -> Result<TimerEntry, AppError> {
        let span = self.op(info_span!("stop_timer", user_id = %user.id));
        async {
            let mut entry = self
                .entries
                .find_in_progress_for_user_id(user.id)
                .await
                .map_err(store)?
                .ok_or(AppError::NotRunning)?;

            let end_time = now_millis();
            entry.end_time = Some(end_time);
            entry.duration = duration_seconds(entry.start_time, end_time).max(0);

            let entry = self.entries.save(&entry).await.map_err(store)?;
            info!(entry_id = %entry.id, duration = entry.duration, "stopped timer");
            Ok::<_, AppError>(entry)
        }
        .instrument(span)
        .await
    }

    /// Rewrites an existing entry. Ownership is checked before the payload.
    pub async fn update(
        &self,
        user: &User,
        entry_id: Uuid,
        update: EntryUpdate,
    ) -> Result<TimerEntry, AppError> {
        let span = self.op(info_span!("update_timer_entry", user_id = %user.id, %entry_id));
        async {
            let mut entry = self.find_owned(user, entry_id).await?;

            let duration = match update.end_time {
                Some(end_time) => {
                    validate_range(update.start_time, end_time)?;
                    duration_seconds(update.start_time, end_time)
                }
                None => {
                    // the entry being edited may itself be the open one
                    self.ensure_idle(user, Some(entry.id)).await?;
                    0
                }
            };

            entry.title = update.title;
            entry.start_time = update.start_time;
            entry.end_time = update.end_time;
            entry.duration = duration;

            let entry = self.entries.save(&entry).await.map_err(store)?;
            info!("updated timer entry");
            Ok::<_, AppError>(entry)
        }
        .instrument(span)
        .await
    }

    /// Looks up an entry the acting user is allowed to modify.
    pub async fn find_owned(&self, user: &User, entry_id: Uuid) -> Result<TimerEntry, AppError> {
        let entry = self
            .entries
            .find_by_id(entry_id)
            .await
            .map_err(store)?
            .ok_or(AppError::NotFound(entry_id))?;

        if entry.user_id != user.id {
            return Err(AppError::Forbidden);
        }
        Ok(entry)
    }

    /// Fails with `AlreadyRunning` if the user has an open entry other than `except`.
    async fn ensure_idle(&self, user: &User, except: Option<Uuid>) -> Result<(), AppError> {
        let open = self
            .entries
            .find_in_progress_for_user_id(user.id)
            .await
            .map_err(store)?;
        match open {
            Some(e) if Some(e.id) != except => Err(AppError::AlreadyRunning),
            _ => Ok(()),
        }
    }
}

fn store(e: StoreError) -> AppError {
    match e {
        StoreError::OpenEntryConflict => AppError::AlreadyRunning,
        other => AppError::Internal(anyhow::Error::new(other)),
    }
}
