use axum::routing::{get, post};
use axum::Router;

use crate::handlers::gacha;
use crate::state::AppState;

/// Routes mounted under `/gacha`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/versions", get(gacha::list_versions))
        .route("/draw", post(gacha::draw))
        .route("/draws", get(gacha::list_draws))
}
