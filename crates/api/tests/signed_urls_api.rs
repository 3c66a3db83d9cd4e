mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use common::{build_memory_app, build_test_app_with, lazy_pool, post_json, send, FakeSigner, MemoryRecorder};

#[tokio::test]
async fn resolves_keys_as_sent() {
    let (app, _) = build_memory_app();

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/v1/signed-urls",
            json!({ "keys": ["/gacha/version1/rare/rare_1.webp", "gacha/version1/cover.webp"] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["/gacha/version1/rare/rare_1.webp"],
        "https://signed/gacha/version1/rare/rare_1.webp"
    );
    assert_eq!(
        body["data"]["gacha/version1/cover.webp"],
        "https://signed/gacha/version1/cover.webp"
    );
    assert_eq!(app.signer.calls(), 1);
}

#[tokio::test]
async fn duplicate_spellings_share_one_fetch() {
    let (app, _) = build_memory_app();

    let (_, body) = send(
        &app.router,
        post_json(
            "/api/v1/signed-urls",
            json!({ "keys": ["/gacha/a.webp", "gacha/a.webp", "gacha/a.webp"] }),
        ),
    )
    .await;

    assert_eq!(body["data"].as_object().unwrap().len(), 2);
    assert_eq!(app.signer.calls(), 1);
}

#[tokio::test]
async fn omitted_keys_are_null_and_negatively_cached() {
    let signer = Arc::new(FakeSigner {
        omit: vec!["gacha/missing.webp".to_string()],
        ..Default::default()
    });
    let app = build_test_app_with(lazy_pool(), Arc::new(MemoryRecorder::default()), signer);
    let request = || post_json("/api/v1/signed-urls", json!({ "keys": ["gacha/missing.webp"] }));

    let (status, body) = send(&app.router, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["gacha/missing.webp"].is_null());

    send(&app.router, request()).await;
    assert_eq!(app.signer.calls(), 1);
}

#[tokio::test]
async fn invalid_key_is_rejected_before_signing() {
    let (app, _) = build_memory_app();

    let (status, body) = send(
        &app.router,
        post_json("/api/v1/signed-urls", json!({ "keys": ["gacha/../secret.txt"] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.signer.calls(), 0);
}

#[tokio::test]
async fn keys_outside_asset_root_are_rejected_before_signing() {
    let (app, _) = build_memory_app();

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/v1/signed-urls",
            json!({ "keys": ["gacha/version1/cover.webp", "private/members/payroll.pdf"] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.signer.calls(), 0);
    assert!(app.cache.is_empty().await);
}

#[tokio::test]
async fn too_many_keys_rejected() {
    let (app, _) = build_memory_app();
    let keys: Vec<String> = (0..101).map(|i| format!("gacha/{i}.webp")).collect();

    let (status, _) = send(&app.router, post_json("/api/v1/signed-urls", json!({ "keys": keys }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_key_list_returns_empty_map() {
    let (app, _) = build_memory_app();

    let (status, body) = send(&app.router, post_json("/api/v1/signed-urls", json!({ "keys": [] }))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_object().unwrap().is_empty());
    assert_eq!(app.signer.calls(), 0);
}
