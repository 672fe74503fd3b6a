use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Never sent to clients as-is.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub email: String,              // user email
    pub password_hash: String,      // Argon2 hash
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Fields needed to create a user; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}
