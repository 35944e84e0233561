//! Ingress validation: bad records never reach the collection.

#![allow(clippy::unwrap_used)]

use dealdesk_client::{ApiError, AppState, MalformedResponseError};
use dealdesk_integration_tests::{MockBackend, coupon_json};
use serde_json::json;

const EMAIL: &str = "owner@cafe.test";
const PASSWORD: &str = "correct horse battery";

async fn signed_in() -> (MockBackend, AppState) {
    let backend = MockBackend::start().await.unwrap();
    backend.add_user(EMAIL, PASSWORD, "u_1").await;
    backend.set_shop("u_1", true, Some("active")).await;

    let state = AppState::new(backend.config_as(EMAIL, PASSWORD).unwrap()).unwrap();
    state.bootstrap().await.unwrap();
    (backend, state)
}

fn malformed(err: &ApiError) -> &MalformedResponseError {
    match err {
        ApiError::Malformed(e) => e,
        other => panic!("expected a malformed response, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_title_fails_the_page() {
    let (backend, state) = signed_in().await;
    backend.add_coupon(coupon_json("cpn_1", "Fine")).await;
    let mut broken = coupon_json("cpn_2", "Broken");
    broken["title"] = json!(null);
    backend.add_coupon(broken).await;

    let viewer = state.coupon_viewer("");
    let mut notices = state.notifier().subscribe();
    let err = viewer.fetch_initial().await.unwrap_err();

    let cause = malformed(&err.source);
    assert_eq!(cause.resource, "coupons");
    assert_eq!(cause.field, "title");

    let snapshot = viewer.snapshot().await;
    assert!(snapshot.records.is_empty());
    assert!(!snapshot.loading_initial);
    assert!(notices.recv().await.is_ok());
}

#[tokio::test]
async fn test_out_of_range_discount() {
    let (backend, state) = signed_in().await;
    let mut broken = coupon_json("cpn_1", "Too generous");
    broken["discount"] = json!({ "type": "percentage", "percent": "150" });
    backend.add_coupon(broken).await;

    let err = state.coupon_viewer("").fetch_initial().await.unwrap_err();
    assert_eq!(malformed(&err.source).field, "discount");
}

#[tokio::test]
async fn test_oversized_page_is_rejected() {
    let (backend, state) = signed_in().await;
    backend.add_coupons("Coupon", 10).await;
    backend.set_oversize_pages(true).await;

    let err = state.coupon_viewer("").fetch_initial().await.unwrap_err();
    assert_eq!(malformed(&err.source).field, "length");
}

#[tokio::test]
async fn test_failed_next_page_keeps_loaded_pages() {
    let (backend, state) = signed_in().await;
    backend.add_coupons("Coupon", 6).await;
    let mut broken = coupon_json("cpn_bad", "Broken");
    broken["createdAt"] = json!("yesterday");
    backend.add_coupon(broken).await;

    let viewer = state.coupon_viewer("");
    viewer.fetch_initial().await.unwrap();
    let err = viewer.fetch_next().await.unwrap_err();
    assert_eq!(malformed(&err.source).field, "createdAt");

    let snapshot = viewer.snapshot().await;
    assert_eq!(snapshot.records.len(), 6);
    assert!(!snapshot.exhausted);
    assert!(!snapshot.loading_more);
}
