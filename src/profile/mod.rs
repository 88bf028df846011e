mod handlers;
pub mod repo;
pub mod services;
pub mod streak;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
