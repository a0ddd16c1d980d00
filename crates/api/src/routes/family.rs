//! Route definitions for the `/family` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::family;
use crate::state::AppState;

/// Routes mounted at `/family`.
///
/// ```text
/// GET    /                 -> get_tree
/// POST   /members          -> add_member
/// PUT    /members/{id}     -> update_member   ({id} may be `root`)
/// DELETE /members/{id}     -> delete_member
/// POST   /link             -> link
/// POST   /unlink           -> unlink
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(family::get_tree))
        .route("/members", post(family::add_member))
        .route(
            "/members/{id}",
            put(family::update_member).delete(family::delete_member),
        )
        .route("/link", post(family::link))
        .route("/unlink", post(family::unlink))
}
