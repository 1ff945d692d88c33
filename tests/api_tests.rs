//! HTTP surface tests that never reach the database
//!
//! The pool connects lazily, so any request rejected before the first query
//! can be exercised without PostgreSQL running.

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{header, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use loanbook_server::config::{Config, Environment};
    use loanbook_server::middleware::RateLimiter;
    use loanbook_server::routes::app_router;
    use loanbook_server::state::AppState;

    fn test_config() -> Config {
        Config {
            database_url: "postgresql://localhost/loanbook_unused".to_string(),
            environment: Environment::Development,
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            db_max_connections: 1,
            run_migrations: false,
            rate_limit_rps: 1000,
            cors_allowed_origins: None,
            log_level: "warn".to_string(),
            overdue_sweep_on_startup: false,
        }
    }

    fn app() -> Router {
        app_with_rate(1000)
    }

    fn app_with_rate(rate_limit_rps: u32) -> Router {
        let mut config = test_config();
        config.rate_limit_rps = rate_limit_rps;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        app_router(
            AppState::new(pool),
            &config,
            RateLimiter::new(config.rate_limit_rps),
        )
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_responds() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-request-id").unwrap(), "abc-123");
    }

    #[tokio::test]
    async fn test_component_mismatch_rejected_before_database() {
        let request = post_json(
            "/api/payments",
            json!({
                "loan_id": Uuid::new_v4(),
                "amount": "45.00",
                "capital_amount": 30,
                "interest_amount": 10,
                "late_fee_amount": 0
            }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let request = post_json(
            "/api/payments",
            json!({ "loan_id": Uuid::new_v4(), "amount": 0 }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_amount_above_upper_bound_rejected() {
        let request = post_json(
            "/api/payments",
            json!({ "loan_id": Uuid::new_v4(), "amount": "100000000.00" }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_payment_method_rejected() {
        let request = post_json(
            "/api/payments",
            json!({ "loan_id": Uuid::new_v4(), "amount": 10, "method": "bitcoin" }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_sort_key_rejected() {
        for uri in [
            "/api/loans?sort_by=total_amount;DROP%20TABLE%20loans",
            "/api/payments?sort_by=nope",
            "/api/persons?order=sideways",
        ] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_loan_requires_positive_total() {
        let request = post_json(
            "/api/loans",
            json!({ "person_id": Uuid::new_v4(), "total_amount": "-5" }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_loan_total_rounding_to_zero_rejected() {
        let request = post_json(
            "/api/loans",
            json!({ "person_id": Uuid::new_v4(), "total_amount": "0.004" }),
        );

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_rate_limit_is_per_peer_address() {
        fn from_peer(addr: &str) -> Request<Body> {
            let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
            let addr: SocketAddr = addr.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
            request
        }

        // 1 rps allows a burst of two
        let app = app_with_rate(1);
        for _ in 0..2 {
            let response = app.clone().oneshot(from_peer("198.51.100.1:5000")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(from_peer("198.51.100.1:5001")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(response).await["error"]["code"], "TOO_MANY_REQUESTS");

        let response = app.oneshot(from_peer("198.51.100.2:5000")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_collections_months_out_of_range() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/stats/collections?months=25")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_loan_id_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/loans/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
