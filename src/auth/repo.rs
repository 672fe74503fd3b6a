use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{NewUser, User};
use crate::db::{unique_violation, StoreError};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Exact, case-sensitive match.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with `StoreError::DuplicateEmail` if the email is taken.
    async fn save(&self, user: NewUser) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn save(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => StoreError::DuplicateEmail,
            None => e.into(),
        })
    }
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn save(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn save_and_find() {
        let repo = MemoryUserRepo::new();
        let saved = repo.save(new_user("john.doe@example.com")).await.unwrap();

        let by_email = repo.find_by_email("john.doe@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(saved.id));

        let by_id = repo.find_by_id(saved.id).await.unwrap();
        assert_eq!(by_id.map(|u| u.email), Some("john.doe@example.com".to_string()));
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let repo = MemoryUserRepo::new();
        repo.save(new_user("john.doe@example.com")).await.unwrap();
        assert!(repo.find_by_email("John.Doe@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = MemoryUserRepo::new();
        repo.save(new_user("john.doe@example.com")).await.unwrap();
        let err = repo.save(new_user("john.doe@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let repo = MemoryUserRepo::new();
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
