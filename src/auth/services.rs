use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::{
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::UserRepo,
    repo_types::{NewUser, User},
};
use crate::{db::StoreError, error::AppError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Sign-up, sign-in and token validation over a user store.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepo>,
    keys: JwtKeys,
    span: Span,
}

impl AuthService {
    /// Every operation span opened by this service follows from `span`.
    pub fn new(users: Arc<dyn UserRepo>, keys: JwtKeys, span: Span) -> Self {
        Self { users, keys, span }
    }

    /// Links an operation span, opened inside the caller's context, to the service span.
    fn op(&self, span: Span) -> Span {
        span.follows_from(&self.span);
        span
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AppError> {
        let span = self.op(info_span!("sign_up"));
        async {
            if self.users.find_by_email(email).await.map_err(store)?.is_some() {
                return Err(AppError::DuplicateEmail);
            }

            let password_hash = hash_password(password)?;
            let user = self
                .users
                .save(NewUser {
                    email: email.to_string(),
                    password_hash,
                })
                .await
                .map_err(|e| match e {
                    StoreError::DuplicateEmail => AppError::DuplicateEmail,
                    other => store(other),
                })?;

            info!(user_id = %user.id, email = %user.email, "created a new user");
            Ok::<_, AppError>(())
        }
        .instrument(span)
        .await
    }

    /// Returns a signed token for the user on success.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String, AppError> {
        let span = self.op(info_span!("sign_in"));
        async {
            let user = match self.users.find_by_email(email).await.map_err(store)? {
                Some(u) => u,
                None => {
                    warn!(email = %email, "sign-in with unknown email");
                    return Err(AppError::unauthorized());
                }
            };

            if !verify_password(password, &user.password_hash)? {
                warn!(user_id = %user.id, "sign-in with invalid password");
                return Err(AppError::unauthorized());
            }

            let token = self.keys.sign(user.id)?;
            info!(user_id = %user.id, email = %user.email, "successful sign-in");
            Ok::<_, AppError>(token)
        }
        .instrument(span)
        .await
    }

    /// Resolves a bearer token to the user it was issued for.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let span = self.op(info_span!("validate_token"));
        async {
            let claims = self.keys.verify(token).map_err(|e| {
                warn!(error = %e, "invalid or expired token");
                AppError::Unauthorized("Invalid or expired token".into())
            })?;
            self.find_user(claims.sub).await
        }
        .instrument(span)
        .await
    }

    async fn find_user(&self, id: Uuid) -> Result<User, AppError> {
        match self.users.find_by_id(id).await.map_err(store)? {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %id, "token for unknown user");
                Err(AppError::unauthorized())
            }
        }
    }
}

fn store(e: StoreError) -> AppError {
    AppError::Internal(anyhow::Error::new(e))
}
