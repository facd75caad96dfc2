use axum::middleware::from_fn;
use axum::Router;

use crate::middleware::auth::{require_admin, require_auth};
use crate::state::AppState;

mod curriculum;
mod faculty;
mod programs;

/// Administration surface. Program and faculty management is admin-only;
/// curriculum editing is open to any authenticated user.
pub fn router() -> Router<AppState> {
    let gated = Router::new()
        .merge(programs::router())
        .merge(faculty::router())
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(require_auth));

    Router::new()
        .merge(gated)
        .nest("/curriculum", curriculum::router())
}
