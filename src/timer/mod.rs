use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod rules;
pub mod services;

pub use services::TimerService;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::timer_routes())
}
