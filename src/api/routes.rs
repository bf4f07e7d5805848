//! API Routes
//!
//! Configures the Axum router with the dashboard endpoints and the asset
//! fallback.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    asset_handler, cache_stats_handler, color_handler, health_handler, login_handler,
    login_status_handler, logout_handler, palette_handler, saint_handler, theme_handler,
    theme_toggle_handler,
    update_ack_handler, update_handler, weather_handler, weather_online_handler,
    weather_position_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `POST /api/login`, `GET /api/login/status`, `POST /api/logout` - Login gate
/// - `GET /api/theme`, `POST /api/theme/toggle` - Theme toggle
/// - `GET /api/saint` - Saint of the day
/// - `GET /api/weather`, `POST /api/weather/online`, `POST /api/weather/position` - Weather
/// - `GET /api/update`, `POST /api/update/ack` - Release notes
/// - `GET /api/colors` - Default palette
/// - `GET /api/colors/:hex` - Colour lookup
/// - `GET /api/cache/stats` - Service worker statistics
/// - Anything else - Site assets through the service worker
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/login", post(login_handler))
        .route("/login/status", get(login_status_handler))
        .route("/logout", post(logout_handler))
        .route("/theme", get(theme_handler))
        .route("/theme/toggle", post(theme_toggle_handler))
        .route("/saint", get(saint_handler))
        .route("/weather", get(weather_handler))
        .route("/weather/online", post(weather_online_handler))
        .route("/weather/position", post(weather_position_handler))
        .route("/update", get(update_handler))
        .route("/update/ack", post(update_ack_handler))
        .route("/colors", get(palette_handler))
        .route("/colors/:hex", get(color_handler))
        .route("/cache/stats", get(cache_stats_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .fallback(asset_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::Config;
    use crate::net::testing::StubFetcher;
    use crate::net::Response as NetResponse;
    use crate::storage::MemoryStore;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let origin = StubFetcher::new()
            .with_route("index.html", NetResponse::new(200, "<html>suite</html>"))
            .with_route("/", NetResponse::new(200, "<html>suite</html>"));
        let state = AppState::new(
            &Config::default(),
            Arc::new(origin),
            Arc::new(StubFetcher::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        );
        create_router(state)
    }

    async fn send(app: Router, method: &str, uri: &str) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(send(create_test_app(), "GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cache_stats_endpoint() {
        assert_eq!(
            send(create_test_app(), "GET", "/api/cache/stats").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_theme_toggle_endpoint() {
        assert_eq!(
            send(create_test_app(), "POST", "/api/theme/toggle").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_weather_unavailable_without_key() {
        assert_eq!(
            send(create_test_app(), "GET", "/api/weather").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":"","password":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_asset_not_found() {
        assert_eq!(
            send(create_test_app(), "GET", "/missing.js").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_asset_fallback_rejects_post() {
        assert_eq!(
            send(create_test_app(), "POST", "/index.html").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
