//! Common helpers for fault-agent integration tests

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use shared::FaultServiceInfo;

/// Descriptor file shipped with the crate
pub fn order_descriptors() -> FaultServiceInfo {
    let raw = include_str!("../../faults/ts-order-service.json");
    FaultServiceInfo::from_json(raw).unwrap()
}

pub async fn get_json<T: DeserializeOwned>(router: &Router, uri: &str) -> (StatusCode, T) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_json<T: DeserializeOwned>(router: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, T) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> (StatusCode, T) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
