//! Logbook against a real HTTP server.
//!
//! Each test starts an in-process axum server on an ephemeral port that
//! mimics the endpoints it needs, then drives the `Logbook` facade through a
//! real `ApiClient`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use captains_log_core::cache::{BoatDetail, BoatsList, SettingsKey, TodoListKey};
use captains_log_core::models::{Boat, TodoList};
use captains_log_core::{ApiClient, CacheEntry, Logbook, QueryCache, RetryPolicy};

const TOKEN: &str = "t-1";

#[derive(Default)]
struct Server {
    boat_enabled: bool,
    fail_writes: bool,
    boat_reads: usize,
    todo_items: Vec<Value>,
    toggles: BTreeMap<String, bool>,
    /// Body of every PATCH, in arrival order
    patches: Vec<Value>,
}

type Shared = Arc<Mutex<Server>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn expired() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"message": "Token expired", "code": "TOKEN_EXPIRED"}})),
    )
        .into_response()
}

fn boat_json(enabled: bool) -> Value {
    json!({"id": "b1", "name": "Osprey", "make": "Catalina", "enabled": enabled})
}

fn todo_json(items: &[Value]) -> Value {
    json!({"id": "l1", "title": "Haul-out", "items": items})
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "hunter2" {
        Json(json!({"token": TOKEN, "user": {"id": "u1", "email": body["email"]}})).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"}))).into_response()
    }
}

async fn get_boat(State(state): State<Shared>, headers: HeaderMap, Path(_id): Path<String>) -> Response {
    if !authorized(&headers) {
        return expired();
    }
    let mut server = state.lock().unwrap();
    server.boat_reads += 1;
    Json(boat_json(server.boat_enabled)).into_response()
}

async fn patch_boat(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return expired();
    }
    let mut server = state.lock().unwrap();
    if server.fail_writes {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Database unavailable"})),
        )
            .into_response();
    }
    server.boat_enabled = body["enabled"].as_bool().unwrap_or(server.boat_enabled);
    server.patches.push(body);
    Json(boat_json(server.boat_enabled)).into_response()
}

async fn get_todos(State(state): State<Shared>, Path(_id): Path<String>) -> Response {
    let server = state.lock().unwrap();
    Json(todo_json(&server.todo_items)).into_response()
}

async fn add_todo(State(state): State<Shared>, Path(_id): Path<String>, Json(body): Json<Value>) -> Response {
    let mut server = state.lock().unwrap();
    if server.fail_writes {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response();
    }
    let id = format!("i{}", server.todo_items.len() + 1);
    server.todo_items.push(json!({"id": id, "text": body["text"], "done": false}));
    Json(todo_json(&server.todo_items)).into_response()
}

async fn patch_todo_item(
    State(state): State<Shared>,
    Path((_id, item_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut server = state.lock().unwrap();
    let Some(item) = server.todo_items.iter_mut().find(|item| item["id"] == item_id.as_str()) else {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "No such item"}))).into_response();
    };
    item["done"] = body["done"].clone();
    server.patches.push(body);
    Json(todo_json(&server.todo_items)).into_response()
}

fn settings_json(toggles: &BTreeMap<String, bool>) -> Value {
    json!({"units": "nautical", "toggles": toggles})
}

async fn get_settings(State(state): State<Shared>) -> Response {
    let server = state.lock().unwrap();
    Json(settings_json(&server.toggles)).into_response()
}

async fn patch_toggle(
    State(state): State<Shared>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut server = state.lock().unwrap();
    let enabled = body["enabled"].as_bool().unwrap_or(false);
    server.toggles.insert(name.clone(), enabled);
    server.patches.push(json!({"name": name, "enabled": enabled}));
    Json(settings_json(&server.toggles)).into_response()
}

async fn spawn_server(state: Shared) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/boats/{id}", get(get_boat).patch(patch_boat))
        .route("/api/todos/{id}", get(get_todos))
        .route("/api/todos/{id}/items", post(add_todo))
        .route("/api/todos/{id}/items/{item_id}", patch(patch_todo_item))
        .route("/api/settings", get(get_settings))
        .route("/api/settings/toggles/{name}", patch(patch_toggle))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

async fn setup(server: Server) -> (Shared, Logbook) {
    let state = Arc::new(Mutex::new(server));
    let base_url = spawn_server(state.clone()).await;
    let api = ApiClient::with_base_url(base_url).unwrap();
    api.set_token(TOKEN);
    let logbook = Logbook::from_parts(
        api,
        Arc::new(QueryCache::new()),
        chrono::Duration::minutes(5),
        RetryPolicy::none(),
    );
    (state, logbook)
}

fn boat(enabled: bool) -> Boat {
    serde_json::from_value(boat_json(enabled)).unwrap()
}

#[tokio::test]
async fn test_toggle_confirms_then_refetches_server_truth() {
    let (state, logbook) = setup(Server::default()).await;
    let key = BoatDetail("b1".into());

    assert!(!logbook.load_boat("b1").await.unwrap().enabled);
    assert_eq!(logbook.cache().entry(&key), CacheEntry::Fresh(boat(false)));

    let returned = logbook.toggle_boat_enabled("b1").await.unwrap();
    assert!(returned.enabled);
    assert_eq!(logbook.cache().entry(&key), CacheEntry::Stale(boat(true)));

    let reloaded = logbook.load_boat("b1").await.unwrap();
    assert!(reloaded.enabled);
    assert_eq!(state.lock().unwrap().boat_reads, 2);
    assert_eq!(logbook.cache().entry(&key), CacheEntry::Fresh(boat(true)));
}

#[tokio::test]
async fn test_second_toggle_reads_server_after_external_change() {
    let (state, logbook) = setup(Server::default()).await;
    logbook.load_boat("b1").await.unwrap();

    assert!(logbook.toggle_boat_enabled("b1").await.unwrap().enabled);
    // Another client turns the boat back off; our entry is stale but still says true
    state.lock().unwrap().boat_enabled = false;
    assert!(logbook.cache().entry(&BoatDetail("b1".into())).is_stale());

    let boat = logbook.toggle_boat_enabled("b1").await.unwrap();

    assert!(boat.enabled);
    let server = state.lock().unwrap();
    let sent: Vec<&Value> = server.patches.iter().map(|body| &body["enabled"]).collect();
    assert_eq!(sent, vec![&json!(true), &json!(true)]);
    assert_eq!(server.boat_reads, 2);
}

#[tokio::test]
async fn test_toggle_trusts_fresh_boat_list() {
    let (state, logbook) = setup(Server::default()).await;
    logbook.cache().set(&BoatsList, vec![boat(false)]);

    assert!(logbook.toggle_boat_enabled("b1").await.unwrap().enabled);

    let server = state.lock().unwrap();
    assert_eq!(server.boat_reads, 0);
    assert_eq!(server.patches, vec![json!({"enabled": true})]);
}

#[tokio::test]
async fn test_setting_toggle_refetches_after_external_change() {
    let (state, logbook) = setup(Server::default()).await;
    logbook.load_settings().await.unwrap();

    let settings = logbook.toggle_setting("night mode").await.unwrap();
    assert!(settings.is_enabled("night mode"));
    state.lock().unwrap().toggles.insert("night mode".into(), false);

    let settings = logbook.toggle_setting("night mode").await.unwrap();

    assert!(settings.is_enabled("night mode"));
    let server = state.lock().unwrap();
    assert_eq!(
        server.patches,
        vec![
            json!({"name": "night mode", "enabled": true}),
            json!({"name": "night mode", "enabled": true}),
        ]
    );
    assert!(logbook.cache().entry(&SettingsKey).is_stale());
}

#[tokio::test]
async fn test_toggle_rejected_by_server_rolls_back() {
    let (state, logbook) = setup(Server::default()).await;
    let key = BoatDetail("b1".into());
    logbook.load_boat("b1").await.unwrap();
    state.lock().unwrap().fail_writes = true;

    let err = logbook.toggle_boat_enabled("b1").await.unwrap_err();

    assert_eq!(err.message(), "Database unavailable");
    assert_eq!(err.code(), "SERVER_ERROR");
    assert_eq!(err.status(), Some(500));
    assert_eq!(logbook.cache().entry(&key), CacheEntry::Fresh(boat(false)));
}

#[tokio::test]
async fn test_unauthorized_clears_token() {
    let (_state, logbook) = setup(Server::default()).await;
    logbook.api().set_token("revoked");

    let err = logbook.load_boat("b1").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.message(), "Token expired");
    assert_eq!(err.code(), "TOKEN_EXPIRED");
    assert!(!logbook.api().is_authenticated());
    assert!(logbook.cache().entry(&BoatDetail("b1".into())).is_absent());
}

#[tokio::test]
async fn test_failed_login_keeps_token() {
    let (_state, logbook) = setup(Server::default()).await;

    let err = logbook.login("skipper@example.com", "wrong").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(logbook.api().tokens().get().as_deref(), Some(TOKEN));
}

#[tokio::test]
async fn test_login_marks_cache_stale() {
    let (_state, logbook) = setup(Server::default()).await;
    logbook.load_boat("b1").await.unwrap();
    logbook.api().tokens().clear();

    let login = logbook.login("skipper@example.com", "hunter2").await.unwrap();

    assert_eq!(login.user.email, "skipper@example.com");
    assert!(logbook.api().is_authenticated());
    assert!(logbook.cache().entry(&BoatDetail("b1".into())).is_stale());
}

#[tokio::test]
async fn test_add_todo_item_without_cached_list() {
    let (_state, logbook) = setup(Server::default()).await;
    let key = TodoListKey("l1".into());

    let list = logbook.add_todo_item("l1", "Bottom paint").await.unwrap();

    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].id, "i1");
    assert_eq!(logbook.cache().entry(&key), CacheEntry::Stale(list));
}

#[tokio::test]
async fn test_add_todo_item_replaces_placeholder_with_server_list() {
    let (_state, logbook) = setup(Server::default()).await;
    let key = TodoListKey("l1".into());
    logbook.add_todo_item("l1", "Bottom paint").await.unwrap();
    logbook.load_todo_list("l1").await.unwrap();

    let list = logbook.add_todo_item("l1", "Zincs").await.unwrap();

    let ids: Vec<&str> = list.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["i1", "i2"]);
    assert!(list.items.iter().all(|i| !i.is_pending()));
    assert_eq!(logbook.cache().get(&key), Some(list));
}

#[tokio::test]
async fn test_add_todo_item_failure_restores_list() {
    let (state, logbook) = setup(Server::default()).await;
    let key = TodoListKey("l1".into());
    let before: TodoList = logbook.load_todo_list("l1").await.unwrap();
    state.lock().unwrap().fail_writes = true;

    let err = logbook.add_todo_item("l1", "Zincs").await.unwrap_err();

    assert_eq!(err.message(), "upstream down");
    assert_eq!(err.status(), Some(503));
    assert_eq!(logbook.cache().entry(&key), CacheEntry::Fresh(before));
}

fn todo_items() -> Vec<Value> {
    vec![
        json!({"id": "i1", "text": "Bottom paint", "done": false}),
        json!({"id": "i2", "text": "Zincs", "done": false}),
    ]
}

/// Cache a list that only knows about the first server item, marked stale.
fn seed_outdated_list(logbook: &Logbook) -> TodoListKey {
    let key = TodoListKey("l1".into());
    let outdated: TodoList = serde_json::from_value(todo_json(&todo_items()[..1])).unwrap();
    logbook.cache().set(&key, outdated);
    logbook.cache().invalidate(&key);
    key
}

#[tokio::test]
async fn test_item_missing_from_outdated_list_still_reaches_server() {
    let (state, logbook) = setup(Server {
        todo_items: todo_items(),
        ..Default::default()
    })
    .await;
    let key = seed_outdated_list(&logbook);

    let list = logbook.set_todo_item_done("l1", "i2", true).await.unwrap();

    assert_eq!(list.items.len(), 2);
    assert!(list.item("i2").unwrap().done);
    assert_eq!(state.lock().unwrap().patches, vec![json!({"done": true})]);
    assert_eq!(logbook.cache().entry(&key), CacheEntry::Stale(list));
}

#[tokio::test]
async fn test_toggle_item_refetches_outdated_list() {
    let (state, logbook) = setup(Server {
        todo_items: todo_items(),
        ..Default::default()
    })
    .await;
    seed_outdated_list(&logbook);
    // Another client already ticked i1
    state.lock().unwrap().todo_items[0]["done"] = json!(true);

    let list = logbook.toggle_todo_item("l1", "i1").await.unwrap();

    assert!(!list.item("i1").unwrap().done);
    assert_eq!(state.lock().unwrap().patches, vec![json!({"done": false})]);
}
