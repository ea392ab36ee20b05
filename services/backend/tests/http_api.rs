/// HTTP-level tests against the full router
mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use common::{parse_error, safe_tile, user_header, TestContext};
use serde_json::{json, Value};
use uuid::Uuid;

fn server(ctx: &TestContext) -> TestServer {
    TestServer::new(ctx.router()).expect("test server starts")
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server.get("/health/detailed").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["store"]["backend"], "memory");
    assert_eq!(body["components"]["events"]["sink"], "noop");
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server.get("/api/wallet/balance").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let (code, _, category) = parse_error(&response.json::<Value>()).expect("error body");
    assert_eq!(code, "UNAUTHORIZED_MISSING_PRINCIPAL");
    assert_eq!(category, "Unauthorized");
}

#[tokio::test]
async fn test_oversized_user_header_is_unauthorized() {
    let ctx = TestContext::new();
    let server = server(&ctx);
    let header = HeaderName::from_static("x-user-id");

    let response = server
        .get("/api/wallet/balance")
        .add_header(header.clone(), HeaderValue::from_str(&"u".repeat(129)).unwrap())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let (code, message, _) = parse_error(&response.json::<Value>()).expect("error body");
    assert_eq!(code, "UNAUTHORIZED_MISSING_PRINCIPAL");
    assert!(message.contains("128"));

    let response = server
        .get("/api/wallet/balance")
        .add_header(header, HeaderValue::from_str(&"u".repeat(128)).unwrap())
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_missing_field_error_shape() {
    let ctx = TestContext::new();
    let server = server(&ctx);
    let (name, value) = user_header("alice");

    let response = server
        .post("/api/coinflip/play")
        .add_header(name, value)
        .json(&json!({ "chosen_side": "heads" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let (code, message, category) = parse_error(&response.json::<Value>()).expect("error body");
    assert_eq!(code, "VALIDATION_MISSING_FIELD");
    assert_eq!(category, "Validation");
    assert!(message.contains("bet_amount"));
}

#[tokio::test]
async fn test_out_of_range_mines_count_rejected() {
    let ctx = TestContext::new();
    ctx.deposit("alice", 1_000).await;
    let server = server(&ctx);
    let (name, value) = user_header("alice");

    let response = server
        .post("/api/mines/start")
        .add_header(name, value)
        .json(&json!({ "bet_amount": 100, "mines_count": 25 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let (code, message, _) = parse_error(&response.json::<Value>()).expect("error body");
    assert_eq!(code, "VALIDATION_INVALID_INPUT");
    assert!(message.contains("mines_count"));
    assert_eq!(ctx.balance("alice").await, 1_000);
}

#[tokio::test]
async fn test_insufficient_balance_response() {
    let ctx = TestContext::new();
    let server = server(&ctx);
    let (name, value) = user_header("alice");

    let response = server
        .post("/api/coinflip/play")
        .add_header(name, value)
        .json(&json!({ "bet_amount": 100, "chosen_side": "tails" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let (code, _, category) = parse_error(&response.json::<Value>()).expect("error body");
    assert_eq!(code, "INSUFFICIENT_BALANCE");
    assert_eq!(category, "InsufficientBalance");
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let ctx = TestContext::new();
    let server = server(&ctx);
    let (name, value) = user_header("alice");

    let response = server
        .get(&format!("/api/crash/games/{}", Uuid::new_v4()))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let (_, _, category) = parse_error(&response.json::<Value>()).expect("error body");
    assert_eq!(category, "NotFound");
}

#[tokio::test]
async fn test_coinflip_round_trip_over_http() {
    let ctx = TestContext::new();
    ctx.deposit("alice", 1_000).await;
    let server = server(&ctx);

    let (name, value) = user_header("alice");
    let response = server
        .post("/api/coinflip/play")
        .add_header(name, value)
        .json(&json!({ "bet_amount": 100, "chosen_side": "heads", "request_id": "r-1" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let game_id = body["game"]["id"].as_str().expect("game id").to_string();
    assert_eq!(body["replayed"], false);
    assert_eq!(body["game"]["nonce"], 1);
    assert_eq!(body["game"]["house_edge"], 0.02);
    assert!(body["game"].get("server_seed").is_none());

    let (name, value) = user_header("alice");
    let fetched = server
        .get(&format!("/api/coinflip/games/{}", game_id))
        .add_header(name, value)
        .await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["id"], game_id.as_str());

    let (name, value) = user_header("alice");
    let wallet = server.get("/api/wallet/balance").add_header(name, value).await;
    wallet.assert_status_ok();
    assert_eq!(wallet.json::<Value>()["total_wagered"], 100);
}

#[tokio::test]
async fn test_mines_flow_over_http() {
    let ctx = TestContext::new();
    ctx.deposit("alice", 1_000).await;
    let server = server(&ctx);

    let (name, value) = user_header("alice");
    let started = server
        .post("/api/mines/start")
        .add_header(name, value)
        .json(&json!({ "bet_amount": 100, "mines_count": 3 }))
        .await;
    started.assert_status_ok();
    let body: Value = started.json();
    assert!(body["game"]["mine_positions"].is_null());
    let game_id: Uuid = body["game"]["id"].as_str().unwrap().parse().unwrap();

    let (name, value) = user_header("alice");
    let second = server
        .post("/api/mines/start")
        .add_header(name, value)
        .json(&json!({ "bet_amount": 100, "mines_count": 3 }))
        .await;
    second.assert_status(StatusCode::CONFLICT);

    let row = ctx.mines_row("alice", game_id).await;
    let (name, value) = user_header("alice");
    let revealed = server
        .post("/api/mines/reveal")
        .add_header(name, value)
        .json(&json!({ "game_id": game_id, "tile_index": safe_tile(&row) }))
        .await;
    revealed.assert_status_ok();
    assert_eq!(revealed.json::<Value>()["is_mine"], false);

    let (name, value) = user_header("alice");
    let cashed = server
        .post("/api/mines/cashout")
        .add_header(name, value)
        .json(&json!({ "game_id": game_id }))
        .await;
    cashed.assert_status_ok();
    let body: Value = cashed.json();
    assert_eq!(body["game"]["status"], "won");
    assert_eq!(body["game"]["mine_positions"].as_array().map(Vec::len), Some(3));

    let (name, value) = user_header("alice");
    let active = server.get("/api/mines/active").add_header(name, value).await;
    active.assert_status_ok();
    assert!(active.json::<Value>()["game"].is_null());
}

#[tokio::test]
async fn test_seed_endpoints() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let (name, value) = user_header("alice");
    let current = server.get("/api/seeds/current").add_header(name, value).await;
    current.assert_status_ok();
    let hash = current.json::<Value>()["server_seed_hash"]
        .as_str()
        .unwrap()
        .to_string();

    let (name, value) = user_header("alice");
    let too_long = server
        .post("/api/seeds/client-seed")
        .add_header(name, value)
        .json(&json!({ "client_seed": "x".repeat(65) }))
        .await;
    too_long.assert_status(StatusCode::BAD_REQUEST);

    let (name, value) = user_header("alice");
    let rotated = server.post("/api/seeds/rotate").add_header(name, value).await;
    rotated.assert_status_ok();
    let reveal: Value = rotated.json();
    assert_eq!(reveal["previous_server_seed_hash"], hash.as_str());

    let response = server
        .post("/api/fairness/verify")
        .json(&json!({
            "server_seed": reveal["previous_server_seed"],
            "server_seed_hash": hash,
            "client_seed": "anything",
            "nonce": 1,
            "game": { "type": "crash" }
        }))
        .await;
    response.assert_status_ok();
    let verified: Value = response.json();
    assert_eq!(verified["commitment_matches"], true);
    assert_eq!(verified["outcome"]["type"], "crash");
    assert!(verified["outcome"]["crash_point"].as_f64().unwrap() >= 1.0);
}
