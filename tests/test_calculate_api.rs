mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ddd_calculator::bootstrap::build_app_state_with_source;
use ddd_calculator::domain::ports::holiday_source::HolidaySource;
use ddd_calculator::infrastructure::http::router::build_router;
use ddd_calculator::infrastructure::providers::StaticRulesSource;
use ddd_calculator::Config;
use helpers::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        holiday_fetch_backoff: Duration::from_millis(1),
        ..Config::default()
    }
}

fn app_with(source: Arc<dyn HolidaySource>, config: &Config) -> Router {
    let state = build_app_state_with_source(source, config);
    build_router(state, &config.api_prefix)
}

fn static_app() -> Router {
    app_with(Arc::new(StaticRulesSource::new()), &test_config())
}

async fn post_json(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn calculate(app: Router, body: Value) -> (StatusCode, Value) {
    post_json(app, "/api/v1/calculate", body.to_string()).await
}

#[tokio::test]
async fn test_calculate_returns_due_date() {
    let (status, body) = calculate(
        static_app(),
        json!({
            "delivery_date": "2024-03-01",
            "country_codes": ["US"],
            "term_kind": "DDD",
            "days": 5
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["due_date"], "2024-03-08");
    assert_eq!(body["delivery_date"], "2024-03-01");
    assert_eq!(body["term_kind"], "DDD");
    assert_eq!(body["country_codes"], json!(["US"]));
    assert_eq!(body["excluded_weekends"], json!(["2024-03-02", "2024-03-03"]));
    assert_eq!(body["excluded_holidays"], json!([]));
    assert_eq!(body["holiday_names"], json!({}));
    assert_eq!(body["holidays_excluded"], true);
}

#[tokio::test]
async fn test_calculate_reports_holiday_names() {
    let (status, body) = calculate(
        static_app(),
        json!({
            "delivery_date": "2024-12-20",
            "country_codes": ["us", "gb"],
            "term_kind": "ddd",
            "days": 10
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["due_date"], "2025-01-08");
    assert_eq!(body["holiday_names"]["2024-12-26"], "Boxing Day");
    assert_eq!(
        body["holiday_names_by_country"]["2024-12-25"],
        json!({"GB": "Christmas Day", "US": "Christmas Day"})
    );
}

#[tokio::test]
async fn test_cash_on_delivery_needs_no_days() {
    let (status, body) = calculate(
        static_app(),
        json!({
            "delivery_date": "2024-03-02",
            "country_codes": ["DE"],
            "term_kind": "COD"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["due_date"], "2024-03-02");
    assert_eq!(body["holidays_excluded"], false);
}

#[tokio::test]
async fn test_invalid_input_is_unprocessable() {
    let cases = [
        (
            json!({"delivery_date": "2024-03-01", "country_codes": ["US"], "term_kind": "DDD"}),
            "validation_error",
        ),
        (
            json!({"delivery_date": "2024-03-01", "country_codes": ["US"], "term_kind": "DDD", "days": 0}),
            "invalid_target",
        ),
        (
            json!({"delivery_date": "03/01/2024", "country_codes": ["US"], "term_kind": "DDD", "days": 5}),
            "validation_error",
        ),
        (
            json!({"delivery_date": "2024-03-01", "country_codes": [], "term_kind": "DDD", "days": 5}),
            "validation_error",
        ),
        (
            json!({"delivery_date": "2024-03-01", "country_codes": ["XX"], "term_kind": "DDD", "days": 5}),
            "validation_error",
        ),
        (
            json!({"delivery_date": "2024-03-01", "country_codes": ["US"], "term_kind": "NET", "days": 5}),
            "validation_error",
        ),
        (
            json!({"delivery_date": "2024-03-01", "country_codes": ["US"], "days": 5}),
            "validation_error",
        ),
    ];

    for (request, kind) in cases {
        let (status, body) = calculate(static_app(), request.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "for {}", request);
        assert_eq!(body["kind"], kind, "for {}", request);
        assert!(body["detail"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, body) =
        post_json(static_app(), "/api/v1/calculate", "{not json".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_source_outage_is_service_unavailable() {
    let source = Arc::new(ScriptedHolidaySource::new().always_failing("US"));
    let app = app_with(source, &test_config());

    let (status, body) = calculate(
        app,
        json!({
            "delivery_date": "2024-03-01",
            "country_codes": ["US"],
            "term_kind": "DDD",
            "days": 5
        }),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "holiday_source_unavailable");
    assert!(body["detail"].as_str().unwrap().contains("US"));
}

#[tokio::test]
async fn test_exhausted_lookahead_is_unprocessable() {
    let source = Arc::new(weekday_holidays(
        ScriptedHolidaySource::new(),
        "US",
        date(2024, 3, 1),
        date(2024, 3, 31),
    ));
    let config = Config {
        max_lookahead_days: 10,
        ..test_config()
    };
    let app = app_with(source, &config);

    let (status, body) = calculate(
        app,
        json!({
            "delivery_date": "2024-03-01",
            "country_codes": ["US"],
            "term_kind": "DDD",
            "days": 5
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "unbounded_search");
}

#[tokio::test]
async fn test_last_representable_date_is_unprocessable() {
    let (status, body) = calculate(
        static_app(),
        json!({
            "delivery_date": chrono::NaiveDate::MAX.format("%Y-%m-%d").to_string(),
            "country_codes": ["US"],
            "term_kind": "DDD",
            "days": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "unbounded_search");
}

#[tokio::test]
async fn test_long_calendar_day_count_succeeds() {
    let (status, body) = calculate(
        static_app(),
        json!({
            "delivery_date": "2024-03-01",
            "country_codes": ["US"],
            "term_kind": "DDD",
            "days": 4000,
            "skip_weekends": false,
            "skip_holidays": false
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["due_date"], "2035-02-12");
}

#[tokio::test]
async fn test_unlisted_country_needs_no_holiday_data_when_not_skipping_holidays() {
    let source = Arc::new(ScriptedHolidaySource::new().unsupported("ZZ"));
    let app = app_with(source.clone(), &test_config());

    let (status, body) = calculate(
        app,
        json!({
            "delivery_date": "2024-03-01",
            "country_codes": ["ZZ"],
            "term_kind": "DDD",
            "days": 5,
            "skip_holidays": false
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["due_date"], "2024-03-08");
    assert_eq!(source.total_calls(), 0);
}

#[tokio::test]
async fn test_korea_is_served_from_static_rules() {
    let (status, body) = calculate(
        static_app(),
        json!({
            "delivery_date": "2024-03-01",
            "country_codes": ["KR"],
            "term_kind": "DDD",
            "days": 5
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // Independence Movement Day falls on the delivery date itself
    assert_eq!(body["due_date"], "2024-03-08");
}

#[tokio::test]
async fn test_health_check() {
    let response = static_app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_custom_prefix_without_leading_slash() {
    let config = Config {
        api_prefix: "ddd/".to_string(),
        ..test_config()
    };
    let app = app_with(Arc::new(StaticRulesSource::new()), &config);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/ddd/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
