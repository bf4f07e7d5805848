//! API Handlers
//!
//! HTTP request handlers for the dashboard endpoints and the asset fallback
//! that routes every other GET through the service worker.

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::ServiceWorker;
use crate::clock::Clock;
use crate::colors::{normalize_hex, ColorSystem, PaletteEntry};
use crate::config::Config;
use crate::error::{Result, SuiteError};
use crate::login::{LockoutPolicy, LoginGate, LoginOutcome};
use crate::models::{
    AckResponse, ColorResponse, HealthResponse, LoginRequest, LoginStatusResponse, OnlineRequest,
    PositionRequest, StatsResponse, UpdateQuery, UpdateResponse,
};
use crate::net::{self, Fetcher, Request};
use crate::storage::KeyValueStore;
use crate::theme::{ThemeState, ThemeToggle};
use crate::update::{LaunchContext, UpdateNotifier};
use crate::view::{DashboardSnapshot, SaintPanel, WeatherPanel};
use crate::widgets::{SaintWidget, WeatherClient, WeatherOutcome, WeatherWidget};

/// Application state shared across all handlers.
///
/// Every component renders into the same `DashboardSnapshot`, which is what
/// the read endpoints serve.
#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<ServiceWorker>,
    pub snapshot: Arc<DashboardSnapshot>,
    pub login: Arc<LoginGate>,
    pub theme: Arc<ThemeToggle>,
    pub saint: Arc<SaintWidget>,
    /// None when no weather API key is configured
    pub weather: Option<Arc<WeatherWidget>>,
    pub notifier: Arc<UpdateNotifier>,
    pub colors: Arc<ColorSystem>,
    countdown: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppState {
    /// Wires every component from configuration.
    ///
    /// # Arguments
    /// * `config` - Loaded configuration
    /// * `origin` - Fetcher for the static site, wrapped by the service worker
    /// * `network` - Fetcher for third-party APIs
    /// * `store` - Persistent key-value state
    /// * `clock` - Wall clock
    pub fn new(
        config: &Config,
        origin: Arc<dyn Fetcher>,
        network: Arc<dyn Fetcher>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let snapshot = Arc::new(DashboardSnapshot::new());
        let worker = Arc::new(ServiceWorker::with_default_manifest(
            config.cache_name(),
            config.fetch_strategy,
            origin.clone(),
        ));
        // Site files are fetched the way the page would, through the worker.
        let site: Arc<dyn Fetcher> = worker.clone();

        let login = Arc::new(LoginGate::new(
            site.clone(),
            store.clone(),
            clock.clone(),
            snapshot.clone(),
            LockoutPolicy {
                max_failures: config.login_max_failures,
                lockout: std::time::Duration::from_secs(config.login_lockout_secs),
            },
        ));
        let theme = Arc::new(ThemeToggle::new(store.clone(), snapshot.clone()));
        let saint = Arc::new(SaintWidget::new(
            site.clone(),
            clock.clone(),
            snapshot.clone(),
            config.utc_offset_minutes,
        ));
        let weather = config.weather_api_key.as_ref().map(|key| {
            Arc::new(WeatherWidget::new(
                WeatherClient::new(network, key.as_str(), config.weather_lang.as_str()),
                store.clone(),
                clock.clone(),
                snapshot.clone(),
                config.weather_location.as_str(),
                config.geo_max_accuracy_m,
            ))
        });
        // The version check is cache-busted and must not land in the cache.
        let notifier = Arc::new(UpdateNotifier::new(
            origin,
            store,
            clock,
            snapshot.clone(),
            config.app_version.as_str(),
        ));
        let colors = Arc::new(ColorSystem::new(site));

        Self {
            worker,
            snapshot,
            login,
            theme,
            saint,
            weather,
            notifier,
            colors,
            countdown: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts the lockout countdown unless one is already running.
    pub fn start_countdown(&self) {
        let Ok(mut current) = self.countdown.lock() else {
            return;
        };
        if current.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *current = self.login.spawn_countdown();
    }

    /// Aborts the lockout countdown, if any.
    pub fn stop_countdown(&self) {
        if let Ok(mut current) = self.countdown.lock() {
            if let Some(handle) = current.take() {
                handle.abort();
            }
        }
    }

    fn weather(&self) -> Result<&Arc<WeatherWidget>> {
        self.weather
            .as_ref()
            .ok_or_else(|| SuiteError::Unavailable("weather API key not configured".to_string()))
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.notifier.current_version()))
}

// == Login ==
/// Handler for POST /api/login
///
/// Rejections are reported with the gate's message; a lockout also starts
/// the countdown.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginOutcome>)> {
    if let Some(error_msg) = req.validate() {
        return Err(SuiteError::InvalidRequest(error_msg));
    }

    let outcome = state.login.submit(&req.username, &req.password).await?;
    let status = match &outcome {
        LoginOutcome::Success { .. } => StatusCode::OK,
        LoginOutcome::Rejected { .. } => StatusCode::UNAUTHORIZED,
        LoginOutcome::LockedOut { .. } => {
            state.start_countdown();
            StatusCode::TOO_MANY_REQUESTS
        }
        LoginOutcome::Blocked { .. } => StatusCode::TOO_MANY_REQUESTS,
        LoginOutcome::MissingFields { .. } => StatusCode::BAD_REQUEST,
        LoginOutcome::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    Ok((status, Json(outcome)))
}

/// Handler for GET /api/login/status
pub async fn login_status_handler(State(state): State<AppState>) -> Json<LoginStatusResponse> {
    Json(LoginStatusResponse::new(
        state.login.status(),
        state.login.current_user(),
    ))
}

/// Handler for POST /api/logout
pub async fn logout_handler(State(state): State<AppState>) -> Result<StatusCode> {
    state.login.logout()?;
    Ok(StatusCode::NO_CONTENT)
}

// == Theme ==
/// Handler for GET /api/theme
pub async fn theme_handler(State(state): State<AppState>) -> Json<ThemeState> {
    Json(state.theme.state())
}

/// Handler for POST /api/theme/toggle
pub async fn theme_toggle_handler(State(state): State<AppState>) -> Result<Json<ThemeState>> {
    Ok(Json(state.theme.toggle()?))
}

// == Widgets ==
/// Handler for GET /api/saint
///
/// Refreshes first; the refresh is a no-op when the day is already shown.
pub async fn saint_handler(State(state): State<AppState>) -> Json<SaintPanel> {
    state.saint.refresh().await;
    Json(state.snapshot.snapshot().saint)
}

/// Handler for GET /api/weather
pub async fn weather_handler(State(state): State<AppState>) -> Result<Json<WeatherPanel>> {
    let weather = state.weather()?;
    let panel = state.snapshot.snapshot().weather;
    if panel.display.is_none() && panel.error.is_none() {
        weather.refresh().await;
        return Ok(Json(state.snapshot.snapshot().weather));
    }
    Ok(Json(panel))
}

/// Handler for POST /api/weather/online
pub async fn weather_online_handler(
    State(state): State<AppState>,
    Json(req): Json<OnlineRequest>,
) -> Result<Json<WeatherOutcome>> {
    let weather = state.weather()?;
    Ok(Json(weather.set_online(req.online).await))
}

/// Handler for POST /api/weather/position
pub async fn weather_position_handler(
    State(state): State<AppState>,
    Json(req): Json<PositionRequest>,
) -> Result<Json<WeatherOutcome>> {
    if let Some(error_msg) = req.validate() {
        return Err(SuiteError::InvalidRequest(error_msg));
    }
    let weather = state.weather()?;
    let outcome = weather
        .update_position(req.latitude, req.longitude, req.accuracy)
        .await?;
    Ok(Json(outcome))
}

// == Update ==
/// Handler for GET /api/update
///
/// Browser-tab launches are never checked.
pub async fn update_handler(
    State(state): State<AppState>,
    Query(query): Query<UpdateQuery>,
) -> Json<UpdateResponse> {
    let ctx = LaunchContext::from(query);
    let update_state = if ctx.is_standalone() {
        state.notifier.check_version().await
    } else {
        debug!("Update check requested outside standalone mode");
        state.notifier.state()
    };
    Json(UpdateResponse {
        state: update_state,
        modal: state.snapshot.snapshot().modal,
    })
}

/// Handler for POST /api/update/ack
pub async fn update_ack_handler(State(state): State<AppState>) -> Result<Json<AckResponse>> {
    let acknowledged = state.notifier.acknowledge()?;
    Ok(Json(AckResponse { acknowledged }))
}

// == Colours ==
/// Handler for GET /api/colors/:hex
///
/// The leading `#` may be omitted since it cannot appear in a path.
pub async fn color_handler(
    State(state): State<AppState>,
    Path(hex): Path<String>,
) -> Result<Json<ColorResponse>> {
    let raw = if hex.starts_with('#') {
        hex
    } else {
        format!("#{}", hex)
    };
    let hex = normalize_hex(&raw)
        .ok_or_else(|| SuiteError::InvalidRequest(format!("Not a hex colour: {}", raw)))?;
    let rgb = state
        .colors
        .get_rgb(&hex)
        .await
        .ok_or_else(|| SuiteError::NotFound(format!("colour {}", hex)))?;
    Ok(Json(ColorResponse { hex, rgb }))
}

/// Handler for GET /api/colors
pub async fn palette_handler(State(state): State<AppState>) -> Json<Vec<PaletteEntry>> {
    Json(state.colors.default_palette().await)
}

// == Cache ==
/// Handler for GET /api/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.worker.stats().await;
    Json(StatsResponse::new(
        state.worker.cache_name(),
        state.worker.state(),
        &stats,
    ))
}

/// Fallback handler for every other path.
///
/// GET requests are answered by the service worker; a request accepting
/// `text/html` is treated as a page navigation.
pub async fn asset_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response> {
    if method != Method::GET {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    // Site files are static, so the query string never selects content and
    // is kept out of the cache key.
    let url = uri.path().to_string();
    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));
    let request = if accepts_html {
        Request::navigate(url)
    } else {
        Request::get(url)
    };

    let resp = state.worker.handle_fetch(&request).await?;
    Ok(into_http_response(resp))
}

fn into_http_response(resp: net::Response) -> Response {
    let mut builder = axum::http::Response::builder().status(resp.status);
    for (name, value) in &resp.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(resp.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::net::testing::StubFetcher;
    use crate::net::Response as NetResponse;
    use crate::storage::MemoryStore;

    fn create_state(api_key: Option<&str>) -> (AppState, Arc<StubFetcher>) {
        let origin = Arc::new(
            StubFetcher::new()
                .with_route(
                    "login/users.json",
                    NetResponse::json_body(
                        r#"{"users":[{"id":1,"username":"ana","password":"pw","name":"Ana","role":"admin"}]}"#,
                    ),
                )
                .with_route(
                    "database/colors/r_255.json",
                    NetResponse::json_body(r##"{"#FFD700":"rgb(255, 215, 0)"}"##),
                ),
        );
        let config = Config {
            weather_api_key: api_key.map(str::to_string),
            ..Config::default()
        };
        let state = AppState::new(
            &config,
            origin.clone(),
            Arc::new(StubFetcher::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        );
        (state, origin)
    }

    #[tokio::test]
    async fn test_health_handler() {
        let (state, _) = create_state(None);
        let response = health_handler(State(state)).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.version, "2.0.0");
    }

    #[tokio::test]
    async fn test_login_handler_statuses() {
        let (state, _) = create_state(None);

        let bad = LoginRequest {
            username: "ana".to_string(),
            password: "nope".to_string(),
        };
        let (status, _) = login_handler(State(state.clone()), Json(bad.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        login_handler(State(state.clone()), Json(bad.clone())).await.unwrap();
        let (status, Json(outcome)) = login_handler(State(state.clone()), Json(bad))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(matches!(outcome, LoginOutcome::LockedOut { .. }));
        assert!(state.snapshot.snapshot().login.locked);
        state.stop_countdown();
    }

    #[tokio::test]
    async fn test_login_success_and_logout() {
        let (state, _) = create_state(None);
        let req = LoginRequest {
            username: "ANA".to_string(),
            password: "pw".to_string(),
        };
        let (status, _) = login_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(status, StatusCode::OK);

        let Json(body) = login_status_handler(State(state.clone())).await;
        assert_eq!(body.user.unwrap().name, "Ana");

        let status = logout_handler(State(state.clone())).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(login_status_handler(State(state)).await.user.is_none());
    }

    #[tokio::test]
    async fn test_weather_disabled_without_key() {
        let (state, _) = create_state(None);
        let result = weather_handler(State(state)).await;
        assert!(matches!(result, Err(SuiteError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_color_handler_accepts_bare_hex() {
        let (state, _) = create_state(None);
        let Json(body) = color_handler(State(state.clone()), Path("ffd700".to_string()))
            .await
            .unwrap();
        assert_eq!(body.hex, "#FFD700");
        assert_eq!(body.rgb, "rgb(255, 215, 0)");

        let missing = color_handler(State(state.clone()), Path("FFD701".to_string())).await;
        assert!(matches!(missing, Err(SuiteError::NotFound(_))));

        let invalid = color_handler(State(state), Path("zzz".to_string())).await;
        assert!(matches!(invalid, Err(SuiteError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_palette_handler_lists_known_colours() {
        let (state, _) = create_state(None);
        let Json(palette) = palette_handler(State(state)).await;

        assert_eq!(palette.len(), 1);
        assert_eq!(palette[0].variable, "--accent-gold");
        assert_eq!(palette[0].rgb, "rgb(255, 215, 0)");
    }

    #[tokio::test]
    async fn test_theme_toggle_handler() {
        let (state, _) = create_state(None);
        let Json(toggled) = theme_toggle_handler(State(state.clone())).await.unwrap();
        assert!(!toggled.dark_mode);
        assert!(!theme_handler(State(state)).await.dark_mode);
    }

    #[tokio::test]
    async fn test_update_handler_skips_browser_tabs() {
        let (state, origin) = create_state(None);
        let calls = origin.calls();
        let Json(body) = update_handler(State(state), Query(UpdateQuery::default())).await;
        assert!(body.modal.is_none());
        assert_eq!(origin.calls(), calls);
    }

    async fn activated_state() -> (AppState, Arc<StubFetcher>) {
        let (state, origin) = create_state(None);
        for asset in crate::cache::ASSET_MANIFEST {
            origin.route(asset, NetResponse::new(200, format!("asset {}", asset)));
        }
        origin.route(
            crate::update::VERSION_CHECK_URL,
            NetResponse::json_body(r#"{"version":"1.0.0","notes":""}"#),
        );
        state.worker.install().await.unwrap();
        state.worker.activate().await.unwrap();
        (state, origin)
    }

    #[tokio::test]
    async fn test_update_checks_do_not_grow_cache() {
        let (state, _) = activated_state().await;
        let before = state.worker.stats().await.total_entries;

        for _ in 0..5 {
            let query = UpdateQuery {
                standalone: true,
                referrer: None,
            };
            let Json(body) = update_handler(State(state.clone()), Query(query)).await;
            assert_eq!(body.state, crate::update::UpdateState::NoUpdate);
        }

        assert_eq!(state.worker.stats().await.total_entries, before);
    }

    #[tokio::test]
    async fn test_asset_query_string_shares_cache_entry() {
        let (state, origin) = activated_state().await;
        origin.route("/extra.js", NetResponse::new(200, "extra"));
        let before = state.worker.stats().await.total_entries;

        for uri in ["/extra.js?v=1", "/extra.js?v=2", "/index.html?ref=https://x.dev"] {
            let response = asset_handler(
                State(state.clone()),
                Method::GET,
                uri.parse().unwrap(),
                HeaderMap::new(),
            )
            .await
            .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(state.worker.stats().await.total_entries, before + 1);
    }
}
