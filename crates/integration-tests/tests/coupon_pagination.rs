//! Infinite-scroll coupon list against the mock backend.

#![allow(clippy::unwrap_used)]

use dealdesk_client::{AppState, FetchOutcome};
use dealdesk_core::{CouponInput, DiscountValue, ScrollMetrics};
use dealdesk_integration_tests::{MockBackend, PageHit};
use rust_decimal::Decimal;
use secrecy::SecretString;

const EMAIL: &str = "owner@cafe.test";
const PASSWORD: &str = "correct horse battery";

async fn signed_in(coupons: usize) -> (MockBackend, AppState) {
    let backend = MockBackend::start().await.unwrap();
    backend.add_user(EMAIL, PASSWORD, "u_1").await;
    backend.set_shop("u_1", true, Some("active")).await;
    backend.add_coupons("Coupon", coupons).await;

    let state = AppState::new(backend.config_as(EMAIL, PASSWORD).unwrap()).unwrap();
    assert!(state.bootstrap().await.unwrap().is_authorized());
    (backend, state)
}

fn offsets(hits: &[PageHit]) -> Vec<(usize, usize)> {
    hits.iter().map(|hit| (hit.offset, hit.limit)).collect()
}

#[tokio::test]
async fn test_ten_records_in_pages_of_six() {
    let (backend, state) = signed_in(10).await;
    let viewer = state.coupon_viewer("");

    assert_eq!(
        viewer.fetch_initial().await.unwrap(),
        FetchOutcome::Applied {
            received: 6,
            exhausted: false
        }
    );
    assert_eq!(
        viewer.fetch_next().await.unwrap(),
        FetchOutcome::Applied {
            received: 4,
            exhausted: true
        }
    );
    assert_eq!(viewer.fetch_next().await.unwrap(), FetchOutcome::Skipped);

    let snapshot = viewer.snapshot().await;
    assert_eq!(snapshot.records.len(), 10);
    assert_eq!(snapshot.pages_loaded, 2);
    assert!(snapshot.exhausted);
    assert_eq!(offsets(&backend.hits("coupons").await), vec![(0, 6), (6, 6)]);
}

#[tokio::test]
async fn test_exact_multiple_needs_one_empty_page() {
    let (backend, state) = signed_in(12).await;
    let viewer = state.coupon_viewer("");

    viewer.fetch_initial().await.unwrap();
    viewer.fetch_next().await.unwrap();
    assert!(!viewer.snapshot().await.exhausted);

    assert_eq!(
        viewer.fetch_next().await.unwrap(),
        FetchOutcome::Applied {
            received: 0,
            exhausted: true
        }
    );
    assert_eq!(viewer.snapshot().await.pages_loaded, 2);
    assert_eq!(
        offsets(&backend.hits("coupons").await),
        vec![(0, 6), (6, 6), (12, 6)]
    );
}

#[tokio::test]
async fn test_search_resets_to_offset_zero() {
    let (backend, state) = signed_in(10).await;
    backend.add_coupons("Latte", 2).await;
    let viewer = state.coupon_viewer("");

    viewer.fetch_initial().await.unwrap();
    viewer.fetch_next().await.unwrap();

    assert!(viewer.set_search_term("latte").await);
    assert!(viewer.snapshot().await.records.is_empty());
    viewer.fetch_initial().await.unwrap();

    let snapshot = viewer.snapshot().await;
    assert_eq!(snapshot.records.len(), 2);
    assert!(snapshot.exhausted);

    let last = backend.hits("coupons").await.pop().unwrap();
    assert_eq!(last.search, "latte");
    assert_eq!(last.offset, 0);
}

#[tokio::test]
async fn test_scroll_loads_next_page_near_bottom() {
    let (backend, state) = signed_in(10).await;
    let viewer = state.coupon_viewer("");
    viewer.fetch_initial().await.unwrap();

    let far = ScrollMetrics {
        scroll_top: 0.0,
        viewport_height: 600.0,
        content_height: 2000.0,
    };
    assert_eq!(viewer.on_scroll(far).await.unwrap(), FetchOutcome::Skipped);

    let near = ScrollMetrics {
        scroll_top: 1350.0,
        ..far
    };
    assert!(matches!(
        viewer.on_scroll(near).await.unwrap(),
        FetchOutcome::Applied { received: 4, .. }
    ));
    assert_eq!(backend.hits("coupons").await.len(), 2);
}

#[tokio::test]
async fn test_pages_are_cached_across_viewers() {
    let (backend, state) = signed_in(10).await;

    state.coupon_viewer("").fetch_initial().await.unwrap();
    state.coupon_viewer("").fetch_initial().await.unwrap();

    assert_eq!(backend.hits("coupons").await.len(), 1);
}

#[tokio::test]
async fn test_next_vendor_is_not_served_cached_pages() {
    let (backend, state) = signed_in(3).await;
    backend.add_user("owner@bakery.test", "flour and water", "u_2").await;
    backend.set_shop("u_2", true, Some("active")).await;

    state.coupon_viewer("").fetch_initial().await.unwrap();
    assert_eq!(backend.hits("coupons").await.len(), 1);

    state.session().sign_out().await.unwrap();
    state
        .session()
        .sign_in(
            "owner@bakery.test",
            &SecretString::from("flour and water".to_string()),
        )
        .await
        .unwrap();
    assert!(state.guard().sync().await.is_authorized());

    state.coupon_viewer("").fetch_initial().await.unwrap();
    assert_eq!(backend.hits("coupons").await.len(), 2);
}

#[tokio::test]
async fn test_create_then_refetch_window() {
    let (backend, state) = signed_in(10).await;
    let viewer = state.coupon_viewer("");
    viewer.fetch_initial().await.unwrap();
    viewer.fetch_next().await.unwrap();

    let input = CouponInput::new(
        "Half-price pastry",
        DiscountValue::Percentage {
            percent: Decimal::from(50),
        },
    );
    let created = state.coupons().create(&input).await.unwrap();
    assert_eq!(created.title, "Half-price pastry");

    assert!(matches!(
        viewer.invalidate_and_refetch().await.unwrap(),
        FetchOutcome::Applied {
            received: 11,
            exhausted: true
        }
    ));
    let snapshot = viewer.snapshot().await;
    assert_eq!(snapshot.records.first().unwrap().title, "Half-price pastry");
    assert_eq!(
        backend.hits("coupons").await.last().map(|hit| (hit.offset, hit.limit)),
        Some((0, 12))
    );
}

#[tokio::test]
async fn test_delete_and_update() {
    let (_backend, state) = signed_in(3).await;
    let viewer = state.coupon_viewer("");
    viewer.fetch_initial().await.unwrap();
    let first = viewer.snapshot().await.records.first().cloned().unwrap();

    let mut input = CouponInput::new(
        "Renamed",
        DiscountValue::Percentage {
            percent: Decimal::from(15),
        },
    );
    input.status = first.status;
    let updated = state.coupons().update(&first.id, &input).await.unwrap();
    assert_eq!(updated.title, "Renamed");

    state.coupons().delete(&first.id).await.unwrap();
    viewer.invalidate_and_refetch().await.unwrap();
    assert_eq!(viewer.snapshot().await.records.len(), 2);
    assert!(state.coupons().get(&first.id).await.is_err());
}
