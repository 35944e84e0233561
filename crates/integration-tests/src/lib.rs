//! Integration tests for Dealdesk.
//!
//! [`MockBackend`] serves the marketplace REST API from memory on an
//! ephemeral port, so the tests drive the real `reqwest` client end to end
//! without any external service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dealdesk-integration-tests
//! ```
//!
//! # Routes
//!
//! - `POST /auth/sign-in`, `POST /auth/sign-out`, `GET /auth/me`
//! - `GET /shops/me`, `POST /shops`
//! - `GET|POST /coupons`, `GET|PATCH|DELETE /coupons/{id}`
//! - `GET /redemptions`, `GET /redemptions/validate/{code}`,
//!   `POST /redemptions/{id}/confirm`

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use dealdesk_client::{ClientConfig, ConfigError};
use dealdesk_client::config::Credentials;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// One list request received by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHit {
    pub resource: &'static str,
    pub search: String,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Default)]
struct Inner {
    /// email -> (password, uid)
    users: HashMap<String, (String, String)>,
    /// token -> uid
    tokens: HashMap<String, String>,
    /// uid -> account
    shops: HashMap<String, Value>,
    coupons: Vec<Value>,
    redemptions: Vec<Value>,
    hits: Vec<PageHit>,
    oversize_pages: bool,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn caller(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.tokens.get(token).cloned()
    }
}

type Shared = Arc<Mutex<Inner>>;

/// In-memory marketplace backend.
pub struct MockBackend {
    addr: SocketAddr,
    inner: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let inner: Shared = Arc::default();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(inner.clone());

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            inner,
            server,
        })
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Never in practice; the URL is always valid.
    pub fn config(&self) -> Result<ClientConfig, ConfigError> {
        ClientConfig::new(&self.url())
    }

    /// Client configuration that signs in as `email` on bootstrap.
    ///
    /// # Errors
    ///
    /// Never in practice; the URL is always valid.
    pub fn config_as(&self, email: &str, password: &str) -> Result<ClientConfig, ConfigError> {
        let mut config = self.config()?;
        config.credentials = Some(Credentials {
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
        });
        Ok(config)
    }

    pub async fn add_user(&self, email: &str, password: &str, uid: &str) {
        self.inner
            .lock()
            .await
            .users
            .insert(email.to_string(), (password.to_string(), uid.to_string()));
    }

    /// Create or replace the shop account of `uid`.
    pub async fn set_shop(&self, uid: &str, approved: bool, subscription: Option<&str>) {
        let account = json!({
            "shopId": format!("shop_{uid}"),
            "shopName": "Corner Cafe",
            "registered": true,
            "approved": approved,
            "activeSubscriptionId": subscription.map(|_| format!("sub_{uid}")),
            "subscriptionState": subscription.unwrap_or("none"),
        });
        self.inner
            .lock()
            .await
            .shops
            .insert(uid.to_string(), account);
    }

    /// Flip the approval flag, as an admin would.
    pub async fn approve(&self, uid: &str) {
        if let Some(account) = self.inner.lock().await.shops.get_mut(uid) {
            account["approved"] = json!(true);
        }
    }

    /// Start a subscription, as the payment webhook would.
    pub async fn subscribe(&self, uid: &str, state: &str) {
        if let Some(account) = self.inner.lock().await.shops.get_mut(uid) {
            account["activeSubscriptionId"] = json!(format!("sub_{uid}"));
            account["subscriptionState"] = json!(state);
        }
    }

    /// Append a raw coupon record (it is served as-is, valid or not).
    pub async fn add_coupon(&self, coupon: Value) {
        self.inner.lock().await.coupons.push(coupon);
    }

    /// Append `count` valid coupons titled `"{prefix} {n}"`.
    pub async fn add_coupons(&self, prefix: &str, count: usize) {
        let mut inner = self.inner.lock().await;
        for n in 0..count {
            let id = inner.next_id("cpn");
            inner.coupons.push(coupon_json(&id, &format!("{prefix} {n}")));
        }
    }

    pub async fn add_redemption(&self, redemption: Value) {
        self.inner.lock().await.redemptions.push(redemption);
    }

    /// Serve one record more than requested on every list call.
    pub async fn set_oversize_pages(&self, enabled: bool) {
        self.inner.lock().await.oversize_pages = enabled;
    }

    /// List requests received for `resource`, in order.
    pub async fn hits(&self, resource: &str) -> Vec<PageHit> {
        self.inner
            .lock()
            .await
            .hits
            .iter()
            .filter(|hit| hit.resource == resource)
            .cloned()
            .collect()
    }

    pub async fn redemption_status(&self, code: &str) -> Option<String> {
        self.inner
            .lock()
            .await
            .redemptions
            .iter()
            .find(|r| r["code"] == code)
            .and_then(|r| r["status"].as_str().map(str::to_string))
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A valid coupon record.
#[must_use]
pub fn coupon_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "shopId": "shop_1",
        "title": title,
        "discount": { "type": "percentage", "percent": "10" },
        "status": "active",
        "quantity": 100,
        "redeemedCount": 0,
        "createdAt": "2026-03-01T09:00:00Z",
    })
}

/// A valid redemption record.
#[must_use]
pub fn redemption_json(id: &str, code: &str, status: &str) -> Value {
    let redeemed_at = if status == "redeemed" {
        json!("2026-03-02T10:00:00Z")
    } else {
        Value::Null
    };
    json!({
        "id": id,
        "couponId": "cpn_1",
        "couponTitle": "Free coffee",
        "code": code,
        "customerEmail": "guest@example.test",
        "status": status,
        "claimedAt": "2026-03-01T09:00:00Z",
        "redeemedAt": redeemed_at,
    })
}

fn router(inner: Shared) -> Router {
    Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/me", get(me))
        .route("/shops/me", get(my_shop))
        .route("/shops", post(register_shop))
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route(
            "/coupons/{id}",
            get(get_coupon).patch(update_coupon).delete(delete_coupon),
        )
        .route("/redemptions", get(list_redemptions))
        .route("/redemptions/validate/{code}", get(validate_code))
        .route("/redemptions/{id}/confirm", post(confirm_redemption))
        .with_state(inner)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "Sign in required")
}

#[derive(Deserialize)]
struct SignIn {
    email: String,
    password: String,
}

async fn sign_in(State(inner): State<Shared>, Json(body): Json<SignIn>) -> Response {
    let mut inner = inner.lock().await;
    let Some((password, uid)) = inner.users.get(&body.email).cloned() else {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };
    if password != body.password {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }

    let token = inner.next_id("tok");
    inner.tokens.insert(token.clone(), uid.clone());
    Json(json!({
        "uid": uid,
        "email": body.email,
        "displayName": null,
        "token": token,
    }))
    .into_response()
}

async fn sign_out(State(inner): State<Shared>, headers: HeaderMap) -> Response {
    let mut inner = inner.lock().await;
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        inner.tokens.remove(token);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn me(State(inner): State<Shared>, headers: HeaderMap) -> Response {
    let inner = inner.lock().await;
    let Some(uid) = inner.caller(&headers) else {
        return unauthorized();
    };
    let email = inner
        .users
        .iter()
        .find(|(_, (_, u))| *u == uid)
        .map(|(email, _)| email.clone());
    Json(json!({ "uid": uid, "email": email })).into_response()
}

async fn my_shop(State(inner): State<Shared>, headers: HeaderMap) -> Response {
    let inner = inner.lock().await;
    let Some(uid) = inner.caller(&headers) else {
        return unauthorized();
    };
    match inner.shops.get(&uid) {
        Some(account) => Json(account.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "No shop registered"),
    }
}

async fn register_shop(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = inner.lock().await;
    let Some(uid) = inner.caller(&headers) else {
        return unauthorized();
    };
    if inner.shops.contains_key(&uid) {
        return error(StatusCode::CONFLICT, "Shop already registered");
    }
    let account = json!({
        "shopId": format!("shop_{uid}"),
        "shopName": body["shopName"],
        "registered": true,
        "approved": false,
        "activeSubscriptionId": null,
        "subscriptionState": "none",
    });
    inner.shops.insert(uid, account.clone());
    (StatusCode::CREATED, Json(account)).into_response()
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    20
}

fn list(
    inner: &mut Inner,
    resource: &'static str,
    query: ListQuery,
    matches: impl Fn(&Value, &str) -> bool,
) -> Response {
    let search = query.search.to_lowercase();
    inner.hits.push(PageHit {
        resource,
        search: query.search,
        offset: query.offset,
        limit: query.limit,
    });

    let records = if resource == "coupons" {
        &inner.coupons
    } else {
        &inner.redemptions
    };
    let take = if inner.oversize_pages {
        query.limit + 1
    } else {
        query.limit
    };
    let page: Vec<Value> = records
        .iter()
        .filter(|record| search.is_empty() || matches(record, &search))
        .skip(query.offset)
        .take(take)
        .cloned()
        .collect();
    Json(page).into_response()
}

fn field_contains(record: &Value, field: &str, search: &str) -> bool {
    record[field]
        .as_str()
        .is_some_and(|value| value.to_lowercase().contains(search))
}

async fn list_coupons(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    let mut inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    list(&mut inner, "coupons", query, |record, search| {
        field_contains(record, "title", search)
    })
}

async fn list_redemptions(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    let mut inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    list(&mut inner, "redemptions", query, |record, search| {
        field_contains(record, "code", search) || field_contains(record, "couponTitle", search)
    })
}

async fn create_coupon(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    let mut coupon = body;
    coupon["id"] = json!(inner.next_id("cpn"));
    coupon["shopId"] = json!("shop_1");
    coupon["redeemedCount"] = json!(0);
    coupon["createdAt"] = json!(Utc::now().to_rfc3339());
    inner.coupons.insert(0, coupon.clone());
    (StatusCode::CREATED, Json(coupon)).into_response()
}

async fn get_coupon(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    match inner.coupons.iter().find(|c| c["id"] == id.as_str()) {
        Some(coupon) => Json(coupon.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Coupon not found"),
    }
}

async fn update_coupon(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    let Some(coupon) = inner.coupons.iter_mut().find(|c| c["id"] == id.as_str()) else {
        return error(StatusCode::NOT_FOUND, "Coupon not found");
    };
    if let (Some(target), Some(fields)) = (coupon.as_object_mut(), body.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(coupon.clone()).into_response()
}

async fn delete_coupon(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    let before = inner.coupons.len();
    inner.coupons.retain(|c| c["id"] != id.as_str());
    if inner.coupons.len() == before {
        return error(StatusCode::NOT_FOUND, "Coupon not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn validate_code(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    let inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    match inner
        .redemptions
        .iter()
        .find(|r| r["code"] == code.as_str() && r["status"] != "expired")
    {
        Some(redemption) => Json(redemption.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Unknown code"),
    }
}

async fn confirm_redemption(
    State(inner): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut inner = inner.lock().await;
    if inner.caller(&headers).is_none() {
        return unauthorized();
    }
    let Some(redemption) = inner.redemptions.iter_mut().find(|r| r["id"] == id.as_str()) else {
        return error(StatusCode::NOT_FOUND, "Redemption not found");
    };
    if redemption["status"] != "claimed" {
        return error(StatusCode::CONFLICT, "Redemption already used");
    }
    redemption["status"] = json!("redeemed");
    redemption["redeemedAt"] = json!(Utc::now().to_rfc3339());
    Json(redemption.clone()).into_response()
}
