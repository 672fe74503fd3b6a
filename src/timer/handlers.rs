use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ListQuery, StartRequest, UpdateRequest},
    repo_types::TimerEntry,
    services::TimerService,
};
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn timer_routes() -> Router<AppState> {
    Router::new()
        .route("/timer/list", get(list))
        .route("/timer/start", post(start))
        .route("/timer/stop", post(stop))
        .route("/timer/update/:id", put(update))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list(
    State(timer): State<TimerService>,
    AuthUser(user): AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<TimerEntry>>, AppError> {
    let Query(query) = query?;
    let entries = timer.list(&user, query.title.as_deref()).await?;
    Ok(Json(entries))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn start(
    State(timer): State<TimerService>,
    AuthUser(user): AuthUser,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(payload) = payload?;
    let title = payload.validate()?;
    timer.start(&user, &title).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn stop(
    State(timer): State<TimerService>,
    AuthUser(user): AuthUser,
) -> Result<StatusCode, AppError> {
    timer.stop(&user).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(timer): State<TimerService>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    // ownership is decided before the body is looked at
    timer.find_owned(&user, id).await?;
    let Json(payload) = payload?;
    let update = payload.validate()?;
    timer.update(&user, id, update).await?;
    Ok(StatusCode::OK)
}
