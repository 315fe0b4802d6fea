#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use rapido_client::config::ApiConfig;
use rapido_client::guard::MemoryNavigator;
use rapido_client::notify::MemoryNotifier;
use rapido_client::session::SessionStore;
use rapido_client::storage::{CredentialStore, MemoryCredentialStore, PersistedSession};
use rapido_client::types::{Credentials, UserProfile};

pub const PASSWORD: &str = "secret1";
pub const USER_EMAIL: &str = "asha@corp.test";
pub const ADMIN_EMAIL: &str = "admin@corp.test";

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    tokens: HashMap<String, String>,
    rides: Vec<Value>,
    next_token: u32,
    mutation_delay: Duration,
    slow_status: Option<(String, Duration)>,
    path_delays: HashMap<String, Duration>,
}

/// In-process stand-in for the ride-booking API, one per test
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Mutex<Inner>>,
}

pub struct MockBackend {
    pub port: u16,
    /// Includes the `/api` prefix
    pub base_url: String,
    pub state: MockState,
}

impl MockBackend {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;

        let state = MockState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            port,
            base_url: format!("http://127.0.0.1:{}/api", port),
            state,
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    pub fn set_rides(&self, rides: Vec<Value>) {
        self.state.inner.lock().unwrap().rides = rides;
    }

    pub fn ride_status(&self, id: &str) -> Option<String> {
        let inner = self.state.inner.lock().unwrap();
        inner
            .rides
            .iter()
            .find(|r| r["_id"] == id)
            .and_then(|r| r["status"].as_str().map(str::to_string))
    }

    /// Hold every mutation this long before answering
    pub fn set_mutation_delay(&self, delay: Duration) {
        self.state.inner.lock().unwrap().mutation_delay = delay;
    }

    /// Delay ride listings filtered by `status`
    pub fn set_slow_status(&self, status: &str, delay: Duration) {
        self.state.inner.lock().unwrap().slow_status = Some((status.to_string(), delay));
    }

    /// Hold every request to `path` (without the `/api` prefix) this long
    pub fn set_path_delay(&self, path: &str, delay: Duration) {
        self.state.inner.lock().unwrap().path_delays.insert(path.to_string(), delay);
    }

    /// Server-side session expiry for every issued token
    pub fn revoke_all_tokens(&self) {
        self.state.inner.lock().unwrap().tokens.clear();
    }

    pub fn issue_token(&self, email: &str) -> String {
        let mut inner = self.state.inner.lock().unwrap();
        issue(&mut inner, email)
    }
}

/// A wired-up client session against a mock backend
pub struct TestClient {
    pub session: SessionStore,
    pub notifier: MemoryNotifier,
    pub navigator: MemoryNavigator,
    pub credentials: Arc<MemoryCredentialStore>,
}

impl TestClient {
    pub fn new(backend: &MockBackend) -> Result<Self> {
        Self::with_credentials(backend, MemoryCredentialStore::new())
    }

    pub fn with_credentials(backend: &MockBackend, credentials: MemoryCredentialStore) -> Result<Self> {
        let notifier = MemoryNotifier::new();
        let navigator = MemoryNavigator::new();
        let credentials = Arc::new(credentials);
        let session = SessionStore::new(
            &ApiConfig::new(backend.base_url.clone()),
            credentials.clone(),
            Arc::new(notifier.clone()),
            Arc::new(navigator.clone()),
        )?;
        Ok(Self {
            session,
            notifier,
            navigator,
            credentials,
        })
    }

    /// Initialize and sign in, then forget the notifications that produced
    pub async fn signed_in(backend: &MockBackend, email: &str) -> Result<Self> {
        let client = Self::new(backend)?;
        client.session.initialize().await;
        client
            .session
            .login(&Credentials {
                email: email.to_string(),
                password: PASSWORD.to_string(),
            })
            .await?;
        client.notifier.clear();
        Ok(client)
    }

    pub fn stored_token(&self) -> Option<String> {
        self.credentials.token()
    }
}

/// Poll `check` until it holds or `timeout` passes
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn persisted(token: &str, email: &str) -> PersistedSession {
    PersistedSession {
        token: token.to_string(),
        user: serde_json::from_value::<UserProfile>(user_json(email)).unwrap(),
    }
}

pub fn ride_json(id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "userId": "u-user",
        "pickup": "HQ",
        "drop": "Airport",
        "scheduleTime": "2026-10-20T09:00:00Z",
        "status": status,
        "estimatedFare": 450,
    })
}

pub fn user_json(email: &str) -> Value {
    let admin = email == ADMIN_EMAIL;
    json!({
        "_id": if admin { "u-admin" } else { "u-user" },
        "firstName": if admin { "Ravi" } else { "Asha" },
        "lastName": "Test",
        "email": email,
        "role": if admin { "admin" } else { "user" },
        "department": "Finance",
        "isActive": true,
    })
}

fn issue(inner: &mut Inner, email: &str) -> String {
    inner.next_token += 1;
    let token = format!("tok-{}", inner.next_token);
    inner.tokens.insert(token.clone(), email.to_string());
    token
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn ok(data: Value) -> Response {
    reply(StatusCode::OK, json!({ "success": true, "data": data }))
}

fn fail(status: StatusCode, message: &str) -> Response {
    reply(status, json!({ "success": false, "message": message }))
}

async fn handle(State(state): State<MockState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().trim_start_matches("/api").to_string();
    let query: HashMap<String, String> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    let delay = {
        let mut inner = state.inner.lock().unwrap();
        inner.calls.push(Call {
            method: method.clone(),
            path: path.clone(),
            query: query.clone(),
            body: body.clone(),
        });
        match &inner.slow_status {
            _ if inner.path_delays.contains_key(&path) => inner.path_delays[&path],
            Some((status, delay)) if method == Method::GET && query.get("status") == Some(status) => *delay,
            _ if method != Method::GET => inner.mutation_delay,
            _ => Duration::ZERO,
        }
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let mut inner = state.inner.lock().unwrap();

    // Public endpoints
    match (method.clone(), segments.as_slice()) {
        (Method::POST, ["auth", "login"]) => {
            let email = body.as_ref().and_then(|b| b["email"].as_str()).unwrap_or_default();
            let password = body.as_ref().and_then(|b| b["password"].as_str()).unwrap_or_default();
            if password != PASSWORD || (email != USER_EMAIL && email != ADMIN_EMAIL) {
                return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
            }
            let token = issue(&mut inner, email);
            return ok(json!({ "token": token, "user": user_json(email) }));
        }
        (Method::POST, ["auth", "register"]) => {
            let email = body.as_ref().and_then(|b| b["email"].as_str()).unwrap_or_default().to_string();
            if email == USER_EMAIL || email == ADMIN_EMAIL {
                return fail(StatusCode::BAD_REQUEST, "User already exists with this email");
            }
            let token = issue(&mut inner, &email);
            return ok(json!({ "token": token, "user": user_json(&email) }));
        }
        _ => {}
    }

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(email) = bearer.and_then(|t| inner.tokens.get(t)).cloned() else {
        return fail(StatusCode::UNAUTHORIZED, "Token is not valid");
    };
    let admin = email == ADMIN_EMAIL;

    match (method, segments.as_slice()) {
        (Method::GET, ["auth", "me"]) => ok(json!({ "user": user_json(&email) })),
        (Method::POST, ["auth", "logout"]) => ok(json!({})),
        (Method::PUT, ["auth", "profile"]) => {
            let mut user = user_json(&email);
            if let (Some(user), Some(Value::Object(update))) = (user.as_object_mut(), body) {
                user.extend(update);
            }
            ok(json!({ "user": user }))
        }
        (Method::PUT, ["auth", "change-password"]) => {
            let current = body.as_ref().and_then(|b| b["currentPassword"].as_str()).unwrap_or_default();
            if current != PASSWORD {
                return fail(StatusCode::BAD_REQUEST, "Current password is incorrect");
            }
            ok(json!({}))
        }
        (Method::DELETE, ["users", "delete-account"]) => {
            inner.tokens.retain(|_, owner| *owner != email);
            ok(json!({}))
        }
        (Method::GET, ["rides"]) => list(&inner.rides, &query),
        (Method::GET, ["admin", "rides"]) if admin => list(&inner.rides, &query),
        (Method::GET, ["rides", id]) => match inner.rides.iter().find(|r| r["_id"] == *id) {
            Some(ride) => ok(json!({ "ride": ride })),
            None => fail(StatusCode::NOT_FOUND, "Ride not found"),
        },
        (Method::DELETE, ["rides", id]) => {
            let Some(ride) = inner.rides.iter_mut().find(|r| r["_id"] == *id) else {
                return fail(StatusCode::NOT_FOUND, "Ride not found");
            };
            if matches!(ride["status"].as_str(), Some("completed" | "cancelled")) {
                return fail(StatusCode::BAD_REQUEST, "Ride cannot be cancelled");
            }
            ride["status"] = json!("cancelled");
            ok(json!({ "ride": ride.clone() }))
        }
        (Method::DELETE, ["rides", id, "permanent"]) => {
            let Some(index) = inner.rides.iter().position(|r| r["_id"] == *id) else {
                return fail(StatusCode::NOT_FOUND, "Ride not found");
            };
            if inner.rides[index]["status"] != "cancelled" {
                return fail(StatusCode::BAD_REQUEST, "Ride must be cancelled first");
            }
            inner.rides.remove(index);
            ok(json!({}))
        }
        (Method::PUT, ["admin", "rides", id, decision]) if admin => {
            let Some(ride) = inner.rides.iter_mut().find(|r| r["_id"] == *id) else {
                return fail(StatusCode::NOT_FOUND, "Ride not found");
            };
            if ride["status"] != "pending" {
                return fail(StatusCode::BAD_REQUEST, "Ride is not pending");
            }
            ride["status"] = match *decision {
                "approve" => json!("approved"),
                _ => json!("rejected"),
            };
            ok(json!({ "ride": ride.clone() }))
        }
        (Method::GET, ["admin", "analytics"]) if admin => ok(json!({
            "summary": { "totalRides": 4, "pendingRides": 1, "approvedRides": 2, "totalUsers": 3 },
            "departmentAnalytics": [{ "_id": "Finance", "totalRides": 4 }],
            "monthlyAnalytics": [{ "_id": { "year": 2026, "month": 10 }, "count": 4 }],
            "fareAnalytics": { "totalFare": 1800, "avgFare": 450, "maxFare": 600 }
        })),
        (Method::GET, ["admin", "recent-activity"]) if admin => {
            let limit = query.get("limit").and_then(|l| l.parse::<usize>().ok()).unwrap_or(10);
            let activities: Vec<Value> = (0..3)
                .map(|i| {
                    json!({
                        "id": format!("a{}", i),
                        "type": "ride_booked",
                        "description": format!("Ride {} booked", i),
                        "timestamp": "2026-10-18T10:00:00Z",
                        "data": { "destination": "Airport" }
                    })
                })
                .take(limit)
                .collect();
            ok(json!({ "activities": activities }))
        }
        (Method::GET, ["users"]) if admin => ok(json!({
            "users": [user_json(USER_EMAIL), user_json(ADMIN_EMAIL)],
            "pagination": { "page": 1, "limit": 10, "total": 2, "totalPages": 1 }
        })),
        (Method::DELETE, ["users", _]) if admin => ok(json!({})),
        (_, ["admin", ..]) | (_, ["users", ..]) => fail(StatusCode::FORBIDDEN, "Admin access required"),
        _ => fail(StatusCode::NOT_FOUND, "Route not found"),
    }
}

fn list(rides: &[Value], query: &HashMap<String, String>) -> Response {
    let matching: Vec<&Value> = rides
        .iter()
        .filter(|r| query.get("status").map_or(true, |s| r["status"] == s.as_str()))
        .collect();
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    let items: Vec<&Value> = matching.iter().skip((page - 1) * limit).take(limit).copied().collect();

    ok(json!({
        "rides": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": matching.len(),
            "totalPages": matching.len().div_ceil(limit.max(1)),
        }
    }))
}
