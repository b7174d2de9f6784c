use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use triage_api::{
    models::{ClearResponse, HealthResponse, PushResponse, StatusResponse},
    router::create_router,
    state::AppState,
};
use triage_core::{
    body::{BodyApi, BodyClient},
    breaker::BreakerConfig,
    conversation::Turn,
    dispatch::Dispatcher,
    ingress::Ingress,
    llm_client::{CompletionParams, LLMClient},
    prompts::Prompts,
    reflex::ReflexTable,
};

type Received = Arc<Mutex<Vec<Value>>>;

struct CannedLlm;

#[async_trait]
impl LLMClient for CannedLlm {
    async fn complete(
        &self,
        _system_prompt: String,
        _messages: Vec<Turn>,
        _params: CompletionParams,
    ) -> anyhow::Result<String> {
        Ok(r#"{"speak":"Woof, nice to meet you!","actions":["wag_tail"],"emotion":"happy"}"#.to_string())
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Stands in for the robot body: reports a healthy battery and records every
/// combo it receives.
async fn spawn_fake_body() -> (String, Received) {
    let combos: Received = Arc::default();
    let router = Router::new()
        .route(
            "/status",
            get(|| async { Json(json!({ "sensors": { "battery_v": 7.6, "charging": false } })) }),
        )
        .route("/look", get(|| async { Json(json!({ "faces": [] })) }))
        .route("/speak", post(|| async { Json(json!({ "ok": true })) }))
        .route(
            "/combo",
            post(|State(combos): State<Received>, Json(body): Json<Value>| async move {
                combos.lock().unwrap().push(body);
                Json(json!({ "ok": true }))
            }),
        )
        .with_state(combos.clone());
    (serve(router).await, combos)
}

async fn spawn_service(body_url: &str) -> String {
    let body_client = Arc::new(BodyClient::new(BreakerConfig::default(), body_url, body_url));
    let body: Arc<dyn BodyApi> = body_client.clone();
    let dispatcher = Dispatcher::new(
        ReflexTable::builtin().unwrap(),
        body,
        Arc::new(CannedLlm),
        Prompts::new("You are a robot dog.", "It is {now}."),
    );
    let state = AppState::new(Ingress::new(Arc::new(dispatcher)), body_client);
    serve(create_router(Arc::new(state))).await
}

async fn wait_for_combos(combos: &Received, count: usize) -> Vec<Value> {
    for _ in 0..100 {
        {
            let received = combos.lock().unwrap();
            if received.len() >= count {
                return received.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("body did not receive {count} combo(s)");
}

async fn wait_until_idle(http: &reqwest::Client, base: &str) -> StatusResponse {
    for _ in 0..100 {
        let status: StatusResponse = http
            .get(format!("{base}/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if !status.busy {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("dispatch never finished");
}

#[tokio::test]
async fn test_health() {
    let (body_url, _) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let health: HealthResponse = response.json().await.unwrap();
    assert!(health.ok);
}

#[tokio::test]
async fn test_reflex_push_reaches_body() {
    let (body_url, combos) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{base}/voice/push"))
        .json(&json!({ "text": "Sitz!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let ack: PushResponse = response.json().await.unwrap();
    assert!(ack.accepted);
    assert_eq!(ack.tier, "pending");
    assert_eq!(ack.text_preview, "Sitz!");

    let received = wait_for_combos(&combos, 1).await;
    assert_eq!(received[0]["actions"], json!(["sit"]));
    assert_eq!(received[0]["speak"], "On it!");
    assert_eq!(received[0]["rgb"]["mode"], "breath");

    let status = wait_until_idle(&http, &base).await;
    assert_eq!(status.conversation_length, 0);
}

#[tokio::test]
async fn test_conversation_push_records_exchange_and_clear_forgets_it() {
    let (body_url, combos) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;
    let http = reqwest::Client::new();

    http.post(format!("{base}/voice/push"))
        .json(&json!({ "text": "tell me about yourself" }))
        .send()
        .await
        .unwrap();
    let received = wait_for_combos(&combos, 1).await;
    assert_eq!(received[0]["speak"], "Woof, nice to meet you!");
    assert_eq!(received[0]["actions"], json!(["wag_tail"]));

    let status = wait_until_idle(&http, &base).await;
    assert_eq!(status.conversation_length, 1);

    let cleared: ClearResponse = http
        .post(format!("{base}/conversation/clear"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(cleared.ok);
    assert_eq!(cleared.message, "history cleared");

    let status = wait_until_idle(&http, &base).await;
    assert_eq!(status.conversation_length, 0);
}

#[tokio::test]
async fn test_blank_or_missing_text_is_rejected() {
    let (body_url, combos) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;
    let http = reqwest::Client::new();

    for payload in [json!({ "text": "   " }), json!({})] {
        let response = http
            .post(format!("{base}/voice/push"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["message"], "text must not be empty");
    }
    assert!(combos.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_json_400() {
    let (body_url, combos) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;
    let http = reqwest::Client::new();

    let requests = [
        http.post(format!("{base}/voice/push"))
            .header("content-type", "application/json")
            .body("{not json"),
        http.post(format!("{base}/voice/push")).body("sitz"),
        http.post(format!("{base}/voice/push"))
            .json(&json!({ "text": 42 })),
    ];
    for request in requests {
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 400);
        let error: Value = response.json().await.unwrap();
        assert!(error["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
    assert!(combos.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_polling_does_not_drop_pushes() {
    let (body_url, combos) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;
    let http = reqwest::Client::new();

    let poller = {
        let http = http.clone();
        let base = base.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                http.get(format!("{base}/status")).send().await.unwrap();
            }
        })
    };
    for i in 1..=20 {
        let ack: PushResponse = http
            .post(format!("{base}/voice/push"))
            .json(&json!({ "text": "sitz" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(ack.accepted);
        wait_for_combos(&combos, i).await;
        wait_until_idle(&http, &base).await;
    }
    poller.await.unwrap();
    assert_eq!(combos.lock().unwrap().len(), 20);
}

#[tokio::test]
async fn test_status_reports_breaker_and_reflexes() {
    let (body_url, _) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;

    let status: StatusResponse = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status.service, "triage-api");
    assert_eq!(status.breaker.state, "closed");
    assert_eq!(status.breaker.failures, 0);
    assert_eq!(status.breaker.active_endpoint, body_url);
    assert!(status.reflexes > 50);
    assert!(!status.busy);
}

#[tokio::test]
async fn test_unreachable_body_opens_breaker() {
    let dead = "http://127.0.0.1:9";
    let base = spawn_service(dead).await;
    let http = reqwest::Client::new();

    for _ in 0..5 {
        http.post(format!("{base}/voice/push"))
            .json(&json!({ "text": "sitz" }))
            .send()
            .await
            .unwrap();
        wait_until_idle(&http, &base).await;
    }

    let status = wait_until_idle(&http, &base).await;
    assert_eq!(status.breaker.state, "open");
    assert_eq!(status.breaker.failures, 5);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (body_url, _) = spawn_fake_body().await;
    let base = spawn_service(&body_url).await;

    let response = reqwest::get(format!("{base}/nope")).await.unwrap();
    assert_eq!(response.status(), 404);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["message"], "no such route");
}
