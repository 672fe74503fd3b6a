use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CredentialsRequest, TokenResponse},
    services::AuthService,
};
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
}

#[instrument(skip(auth, payload))]
pub async fn sign_up(
    State(auth): State<AuthService>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(payload) = payload?;
    let payload = payload.validate()?;
    auth.sign_up(&payload.email, &payload.password).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(auth, payload))]
pub async fn sign_in(
    State(auth): State<AuthService>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(payload) = payload?;
    let payload = payload.validate()?;
    let token = auth.sign_in(&payload.email, &payload.password).await?;
    Ok(Json(TokenResponse { token }))
}
