pub mod gacha;
pub mod health;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /gacha/versions          version summaries with cover URLs (GET)
/// /gacha/draw              run a draw (POST)
/// /gacha/draws             draw history (GET)
/// /signed-urls             resolve keys to signed URLs (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/gacha", gacha::router())
        .route(
            "/signed-urls",
            post(handlers::signed_urls::resolve_signed_urls),
        )
}
