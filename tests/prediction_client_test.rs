//! Prediction client tests against a local mock of the recognition service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::post,
};
use image::{Rgb, RgbImage};
use rps_vision::{
    EncodedFrame, Move, PredictionClient, PredictionErrorKind, Predictor, Winner, encode_frame,
};
use serde_json::{Value, json};

/// What the mock service saw on its last request.
#[derive(Debug, Default, Clone)]
struct Seen {
    cheat_mode: Option<String>,
    image: Option<String>,
}

#[derive(Clone)]
struct MockState {
    seen: Arc<Mutex<Seen>>,
    status: StatusCode,
    reply: String,
}

async fn predicao(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let mut seen = state.seen.lock().expect("lock");
    seen.cheat_mode = params.get("cheat_mode").cloned();
    seen.image = body.get("image").and_then(Value::as_str).map(str::to_string);
    (state.status, state.reply.clone())
}

/// Starts the mock on an ephemeral port and returns its base URL.
async fn spawn_service(status: StatusCode, reply: &str) -> (String, Arc<Mutex<Seen>>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let state = MockState {
        seen: Arc::clone(&seen),
        status,
        reply: reply.to_string(),
    };
    let app = Router::new()
        .route("/predicao", post(predicao))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock service");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock service failed");
    });
    (format!("http://{}", addr), seen)
}

fn sample_frame() -> EncodedFrame {
    let image = RgbImage::from_pixel(32, 24, Rgb([90, 60, 30]));
    encode_frame(&image, 80).expect("Encoding should succeed")
}

fn client(url: &str) -> PredictionClient {
    PredictionClient::new(url, Duration::from_secs(5)).expect("Valid URL")
}

#[tokio::test]
async fn test_successful_prediction_resolves_round() {
    let (url, seen) = spawn_service(
        StatusCode::OK,
        r#"{"player_move":"pedra","computer_move":"tesoura","winner":"player"}"#,
    )
    .await;
    let frame = sample_frame();

    let result = client(&url)
        .predict(&frame, false)
        .await
        .expect("Prediction should succeed");

    assert_eq!(*result.player_move(), Move::Rock);
    assert_eq!(*result.computer_move(), Move::Scissors);
    assert_eq!(*result.winner(), Winner::Player);

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(seen.cheat_mode.as_deref(), Some("false"));
    assert_eq!(seen.image.as_deref(), Some(frame.base64().as_str()));
}

#[tokio::test]
async fn test_cheat_flag_is_sent_as_query_parameter() {
    let (url, seen) = spawn_service(
        StatusCode::OK,
        r#"{"player_move":"papel","computer_move":"tesoura","winner":"computer"}"#,
    )
    .await;

    let result = client(&url)
        .predict(&sample_frame(), true)
        .await
        .expect("Prediction should succeed");

    assert_eq!(*result.winner(), Winner::Computer);
    assert_eq!(*result.computer_move(), result.player_move().counter());
    assert_eq!(seen.lock().expect("lock").cheat_mode.as_deref(), Some("true"));
}

#[tokio::test]
async fn test_trailing_slash_in_service_url_is_accepted() {
    let (url, _seen) = spawn_service(
        StatusCode::OK,
        r#"{"player_move":"papel","computer_move":"papel","winner":"draw"}"#,
    )
    .await;

    let result = client(&format!("{}/", url))
        .predict(&sample_frame(), false)
        .await
        .expect("Prediction should succeed");
    assert_eq!(*result.winner(), Winner::Draw);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (url, _seen) = spawn_service(StatusCode::INTERNAL_SERVER_ERROR, "model crashed").await;

    let err = client(&url)
        .predict(&sample_frame(), false)
        .await
        .expect_err("500 must fail");

    assert_eq!(
        err.kind,
        PredictionErrorKind::Status {
            code: 500,
            body: "model crashed".to_string()
        }
    );
}

#[tokio::test]
async fn test_garbage_body_is_malformed() {
    let (url, _seen) = spawn_service(StatusCode::OK, "<html>not json</html>").await;

    let err = client(&url)
        .predict(&sample_frame(), false)
        .await
        .expect_err("Non-JSON must fail");
    assert!(matches!(err.kind, PredictionErrorKind::Malformed(_)));
}

#[tokio::test]
async fn test_null_fields_mean_unrecognized_gesture() {
    let reply = json!({"player_move": null, "computer_move": null, "winner": null}).to_string();
    let (url, _seen) = spawn_service(StatusCode::OK, &reply).await;

    let err = client(&url)
        .predict(&sample_frame(), false)
        .await
        .expect_err("Null moves must fail");
    assert_eq!(err.kind, PredictionErrorKind::Unrecognized);
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    // Grab a free port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);

    let err = client(&format!("http://{}", addr))
        .predict(&sample_frame(), false)
        .await
        .expect_err("Nothing is listening");
    assert!(matches!(err.kind, PredictionErrorKind::Network(_)));
}
