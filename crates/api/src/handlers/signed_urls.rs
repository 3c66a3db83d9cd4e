use std::collections::HashMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use clubroom_core::resource_key::derive_asset_key;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum keys accepted per request.
pub const MAX_KEYS_PER_REQUEST: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SignedUrlsRequest {
    pub keys: Vec<String>,
}

/// POST /api/v1/signed-urls
///
/// Resolve asset paths or resource keys under the gacha asset root to signed
/// URLs. The response maps each key exactly as sent to its URL, or `null` if
/// it could not be signed.
pub async fn resolve_signed_urls(
    State(state): State<AppState>,
    Json(input): Json<SignedUrlsRequest>,
) -> AppResult<impl IntoResponse> {
    if input.keys.len() > MAX_KEYS_PER_REQUEST {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_KEYS_PER_REQUEST} keys may be requested at once"
        )));
    }

    let mut canonical: Vec<(String, String)> = Vec::with_capacity(input.keys.len());
    for key in input.keys {
        let resource_key = derive_asset_key(&key)?;
        canonical.push((key, resource_key));
    }

    let resource_keys: Vec<String> = canonical.iter().map(|(_, k)| k.clone()).collect();
    let urls = state.cache.resolve(&resource_keys).await;

    let data: HashMap<String, Option<String>> = canonical
        .into_iter()
        .map(|(requested, resource_key)| {
            let url = urls.get(&resource_key).cloned().flatten();
            (requested, url)
        })
        .collect();

    Ok(Json(DataResponse { data }))
}
