use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Timer entry record. `end_time == None` means the entry is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimerEntry {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub duration: i64, // seconds, 0 while in progress
}

impl TimerEntry {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }
}

/// A freshly started entry; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTimerEntry {
    pub user_id: Uuid,
    pub title: String,
    pub start_time: OffsetDateTime,
}
