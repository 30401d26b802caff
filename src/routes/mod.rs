//! Route modules for the PDF gate server

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod pdf;

/// Assemble the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/pdf", pdf::router())
        .with_state(state)
}
