pub mod family;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /family                      assembled tree
/// /family/members              add
/// /family/members/{id}         update, delete
/// /family/link                 link spouses
/// /family/unlink               unlink spouses
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/family", family::router())
}
