// tests/http_services.rs
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use serde_json::json;

use vix_range::domain::errors::{FeedError, StrategyError};
use vix_range::domain::models::{MarketSnapshot, StrategyInput, TradeSide};
use vix_range::domain::service::{MarketDataSource, StrategyCalculator};
use vix_range::infrastructure::{HttpMarketSource, LocalStrategyCalculator, RemoteStrategyCalculator};

type Handler = Arc<dyn Fn(&Request<Body>) -> Response<Body> + Send + Sync>;

async fn spawn_server(handler: Handler, delay: Option<Duration>) -> SocketAddr {
    let make_service = make_service_fn(move |_conn| {
        let handler = handler.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let response = handler(&req);
                async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    Ok::<_, Infallible>(response)
                }
            }))
        }
    });

    let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_service);
    let addr = server.local_addr();
    tokio::spawn(server);
    addr
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn previous() -> MarketSnapshot {
    MarketSnapshot::new(15.5, 23500.0, "test")
}

#[tokio::test]
async fn http_source_decodes_quote() {
    let addr = spawn_server(
        Arc::new(|_req: &Request<Body>| {
            json_response(StatusCode::OK, json!({ "vix": 14.87, "nifty": 23612.4 }))
        }),
        None,
    )
    .await;
    let url = format!("http://{}/quote", addr);
    let source = HttpMarketSource::new(&url);

    let snapshot = source.next_snapshot(&previous()).await.unwrap();
    assert_eq!(snapshot.volatility_percent, 14.87);
    assert_eq!(snapshot.index_price, 23612.4);
    assert_eq!(snapshot.source, url);
}

#[tokio::test]
async fn http_source_maps_server_error_to_fetch_error() {
    let addr = spawn_server(
        Arc::new(|_req: &Request<Body>| json_response(StatusCode::BAD_GATEWAY, json!({}))),
        None,
    )
    .await;
    let source = HttpMarketSource::new(&format!("http://{}/quote", addr));

    let err = source.next_snapshot(&previous()).await.unwrap_err();
    assert!(matches!(err, FeedError::Fetch(msg) if msg.contains("502")));
}

fn envelope_with(answer: serde_json::Value) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": answer.to_string() }]
            },
            "finishReason": "STOP"
        }]
    })
}

fn strategy_envelope() -> serde_json::Value {
    let input = StrategyInput::new(15.5, 23500.0).unwrap();
    let result = LocalStrategyCalculator::default().calculate(&input);
    envelope_with(serde_json::to_value(&result).unwrap())
}

#[tokio::test]
async fn remote_calculator_posts_to_model_endpoint() {
    let addr = spawn_server(
        Arc::new(|req: &Request<Body>| {
            let authorized = req
                .headers()
                .get("x-goog-api-key")
                .map(|v| v.as_bytes() == b"test-key")
                .unwrap_or(false);
            let path_ok = req.uri().path() == "/v1beta/models/test-model:generateContent";

            if req.method() == hyper::Method::POST && authorized && path_ok {
                json_response(StatusCode::OK, strategy_envelope())
            } else {
                json_response(StatusCode::UNAUTHORIZED, json!({ "error": "denied" }))
            }
        }),
        None,
    )
    .await;
    let calculator = RemoteStrategyCalculator::new(
        &format!("http://{}/v1beta", addr),
        "test-model",
        "test-key",
        Duration::from_secs(5),
    );

    let input = StrategyInput::new(15.5, 23500.0).unwrap();
    let result = calculator.compute(&input).await.unwrap();

    assert_eq!((result.support, result.resistance), (23257, 23743));
    assert_eq!((result.support_sqrt, result.resistance_sqrt), (22835, 24165));
    assert_eq!(result.trade_recommendation.side(), TradeSide::NoTrade);
}

#[tokio::test]
async fn remote_calculator_accepts_anchored_answer_without_anchor_field() {
    let input = StrategyInput::new(15.5, 23260.0).unwrap().with_anchor(23500.0).unwrap();
    let mut answer = serde_json::to_value(LocalStrategyCalculator::default().calculate(&input)).unwrap();
    answer.as_object_mut().unwrap().remove("anchor_price");
    let envelope = envelope_with(answer);

    let addr = spawn_server(
        Arc::new(move |_req: &Request<Body>| json_response(StatusCode::OK, envelope.clone())),
        None,
    )
    .await;
    let calculator =
        RemoteStrategyCalculator::new(&format!("http://{}", addr), "m", "k", Duration::from_secs(5));

    let result = calculator.compute(&input).await.unwrap();

    assert_eq!(result.anchor_price, Some(23500.0));
    assert_eq!((result.support, result.resistance), (23257, 23743));
    assert_eq!(result.trade_recommendation.side(), TradeSide::Long);
}

#[tokio::test]
async fn remote_calculator_rejects_answer_for_other_price() {
    let addr = spawn_server(
        Arc::new(|_req: &Request<Body>| json_response(StatusCode::OK, strategy_envelope())),
        None,
    )
    .await;
    let calculator =
        RemoteStrategyCalculator::new(&format!("http://{}", addr), "m", "k", Duration::from_secs(5));

    let err = calculator
        .compute(&StrategyInput::new(15.5, 23600.0).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::InvalidResponse(msg) if msg.contains("nifty_price")));
}

#[tokio::test]
async fn remote_calculator_reports_blocked_answers() {
    let addr = spawn_server(
        Arc::new(|_req: &Request<Body>| {
            json_response(StatusCode::OK, json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
        }),
        None,
    )
    .await;
    let calculator =
        RemoteStrategyCalculator::new(&format!("http://{}", addr), "m", "k", Duration::from_secs(5));

    let err = calculator
        .compute(&StrategyInput::new(15.5, 23500.0).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, StrategyError::ComputationBlocked("SAFETY".to_string()));
}

#[tokio::test]
async fn remote_calculator_maps_overload_to_unavailable() {
    let addr = spawn_server(
        Arc::new(|_req: &Request<Body>| {
            json_response(StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "overloaded" }))
        }),
        None,
    )
    .await;
    let calculator =
        RemoteStrategyCalculator::new(&format!("http://{}", addr), "m", "k", Duration::from_secs(5));

    let err = calculator
        .compute(&StrategyInput::new(15.5, 23500.0).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::Unavailable(msg) if msg.contains("503")));
}

#[tokio::test]
async fn remote_calculator_gives_up_after_timeout() {
    let addr = spawn_server(
        Arc::new(|_req: &Request<Body>| json_response(StatusCode::OK, strategy_envelope())),
        Some(Duration::from_secs(5)),
    )
    .await;
    let calculator =
        RemoteStrategyCalculator::new(&format!("http://{}", addr), "m", "k", Duration::from_millis(200));

    let err = calculator
        .compute(&StrategyInput::new(15.5, 23500.0).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::Unavailable(msg) if msg.contains("timed out")));
}
