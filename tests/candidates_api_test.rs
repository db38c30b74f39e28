use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

/// Stand-in for the legacy system: accepts every candidate except those whose
/// email starts with "reject".
async fn spawn_legacy_stub() -> String {
    async fn accept(Json(body): Json<JsonValue>) -> (StatusCode, Json<JsonValue>) {
        let email = body["email"].as_str().unwrap_or_default();
        if email.starts_with("reject") {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "duplicate upstream" })),
            )
        } else {
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
    }

    let router = Router::new().route("/candidates", post(accept));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind legacy stub");
    let addr = listener.local_addr().expect("legacy stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("legacy stub");
    });

    format!("http://{}", addr)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn post_candidate(body: JsonValue, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/candidates")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn candidate_body(email: &str, job_offer_ids: JsonValue) -> JsonValue {
    json!({
        "firstName": "Ann",
        "lastName": "Lee",
        "email": email,
        "jobOfferIds": job_offer_ids,
    })
}

#[tokio::test]
async fn candidates_api_end_to_end() {
    let legacy_url = spawn_legacy_stub().await;

    std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    std::env::set_var(
        "DATABASE_URL",
        "sqlite:file:candidates_api_test?mode=memory&cache=shared",
    );
    std::env::set_var("API_KEY", "secret-key");
    std::env::set_var("LEGACY_API_KEY", "legacy-key");
    std::env::set_var("LEGACY_API_URL", &legacy_url);

    recruitment_api::config::init_config().expect("init config");
    let pool = recruitment_api::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    sqlx::query(
        "INSERT INTO job_offers (id, title) VALUES (1, 'Backend Engineer'), (2, 'Data Engineer')",
    )
    .execute(&pool)
    .await
    .expect("seed job offers");

    let state = recruitment_api::AppState::new(pool.clone());
    let app = Router::new()
        .route(
            "/candidates",
            get(recruitment_api::routes::candidate_routes::list_candidates)
                .post(recruitment_api::routes::candidate_routes::create_candidate),
        )
        .with_state(state);

    // Missing credential never reaches validation or the store.
    let (status, body) = send(
        &app,
        post_candidate(candidate_body("ann@example.com", json!([1])), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden: Invalid API Key.");

    let (status, _) = send(
        &app,
        post_candidate(
            candidate_body("ann@example.com", json!([1])),
            Some("wrong-key"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Shape validation runs after the key check.
    let (status, body) = send(
        &app,
        post_candidate(
            json!({
                "firstName": "",
                "lastName": "Lee",
                "email": "not-an-email",
                "jobOfferIds": [1],
            }),
            Some("secret-key"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    let errors = body["errors"].as_array().expect("errors array");
    assert!(errors.iter().any(|e| e == "First name is required"));
    assert!(errors.iter().any(|e| e == "Invalid email format"));

    // Duplicate ids collapse; unknown offers are rejected.
    let (status, body) = send(
        &app,
        post_candidate(candidate_body("ann@example.com", json!([1, 999])), Some("secret-key")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0], "One or more job offers do not exist.");

    // Successful registration.
    let (status, body) = send(
        &app,
        post_candidate(candidate_body("ann@example.com", json!([1, 1, 2])), Some("secret-key")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Candidate added successfully");
    let candidate = &body["candidate"];
    assert!(candidate["id"].as_i64().expect("id") > 0);
    assert_eq!(candidate["firstName"], "Ann");
    assert_eq!(candidate["lastName"], "Lee");
    assert_eq!(candidate["email"], "ann@example.com");
    assert!(!candidate["createdAt"].as_str().expect("createdAt").is_empty());
    let mut job_offer_ids: Vec<i64> = candidate["jobOfferIds"]
        .as_array()
        .expect("jobOfferIds")
        .iter()
        .map(|id| id.as_i64().expect("id"))
        .collect();
    job_offer_ids.sort_unstable();
    assert_eq!(job_offer_ids, vec![1, 2]);

    // Same email again conflicts.
    let (status, body) = send(
        &app,
        post_candidate(candidate_body("ann@example.com", json!([1])), Some("secret-key")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Candidate with this email already exists.");

    // A legacy rejection surfaces its status and message, and nothing is kept.
    let (status, body) = send(
        &app,
        post_candidate(candidate_body("reject@example.com", json!([1])), Some("secret-key")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "duplicate upstream");

    let rejected = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM candidates WHERE email = 'reject@example.com'",
    )
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(rejected, 0);

    // The read path needs no credential.
    let (status, body) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/candidates?page=1&limit=10")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().expect("data").len(), 1);
    assert_eq!(body["data"][0]["email"], "ann@example.com");
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["limit"], 10);
    assert_eq!(body["meta"]["totalItems"], 1);
    assert_eq!(body["meta"]["totalPages"], 1);

    // A page far past the data is an empty slice, not an error.
    let (status, body) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/candidates?page=9223372036854775807&limit=10")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().expect("data").is_empty());
    assert_eq!(body["meta"]["totalItems"], 1);

    // Out-of-range paging parameters fall back to defaults.
    let (status, body) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/candidates?page=0&limit=-5")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["limit"], 10);
}
