pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod timer;

pub use app::{build_app, serve};
pub use state::AppState;

#[cfg(test)]
mod test_support;
