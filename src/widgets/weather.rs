//! Weather footer backed by WeatherAPI.com.
//!
//! The last good payload is kept in the key-value store and rendered with an
//! offline banner whenever the API cannot be reached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Result, SuiteError};
use crate::net::{Fetcher, Request};
use crate::storage::{KeyValueStore, WEATHER_CACHE};
use crate::view::WeatherView;

/// Current conditions plus a one-day forecast.
pub const WEATHER_FORECAST_URL: &str = "https://api.weatherapi.com/v1/forecast.json";

/// Shown when nothing can be rendered.
pub const WEATHER_ERROR: &str = "Error fetching weather";

const ICON_DIR: &str = "./database/Weather/icon";
const TEMPLATE_DIR: &str = "./database/Weather/templates";

// == API Payload ==
/// The parts of the forecast response the footer uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: Location,
    pub current: Current,
    pub forecast: Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub temp_c: f64,
    pub feelslike_c: f64,
    #[serde(default)]
    pub humidity: u32,
    #[serde(default)]
    pub cloud: u32,
    #[serde(default)]
    pub precip_mm: f64,
    /// 1 by day, 0 by night
    #[serde(default)]
    pub is_day: u8,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub text: String,
    pub code: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: DaySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
}

/// Stored copy of the last good report.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedReport {
    cached_at: i64,
    report: WeatherReport,
}

// == Display ==
/// Icon and background template for a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherAssets {
    pub icon_path: String,
    pub template_path: String,
}

/// Picks artwork from the WeatherAPI condition code and time of day.
pub fn assets_for(code: u32, is_day: bool) -> WeatherAssets {
    let moment = if is_day { "Day" } else { "Night" };
    let day_night = |day: &'static str, night: &'static str| if is_day { day } else { night };

    let (icon, weather) = match code {
        1000 => (day_night("Sun.svg", "Moon.svg"), "Clear"),
        1003 => (day_night("sun clouds.svg", "Moon clouds.svg"), "Few Clouds"),
        1006 | 1009 => (
            day_night("sun clouds-1.svg", "Moon,stars and cloud.svg"),
            "Cloudy",
        ),
        1030 | 1135 | 1147 => ("Group 5.svg", "Cloudy"),
        1063 | 1150 | 1153 | 1180 | 1183 | 1240 => (
            day_night("sun rain.svg", "rain.svg"),
            day_night("Few Clouds", "Rain"),
        ),
        1186 | 1189 | 1192 | 1195 | 1243 | 1246 => ("rain.svg", "Rain"),
        1087 | 1273 | 1276 => ("Group 6.svg", "Storm"),
        1066 | 1114 | 1210 | 1213 => ("Group 7.svg", "Cloudy"),
        _ => (day_night("Sun.svg", "Moon.svg"), "Clear"),
    };

    WeatherAssets {
        icon_path: format!("{}/{}", ICON_DIR, icon),
        template_path: format!("{}/Weather={}, Moment={}.svg", TEMPLATE_DIR, weather, moment),
    }
}

/// Rounds halves towards positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Values shown in the footer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherDisplay {
    /// `"{name}, {country}"`
    pub location: String,
    pub condition_text: String,
    pub icon_path: String,
    pub template_path: String,
    pub temp_c: i64,
    pub feels_like_c: i64,
    pub max_c: i64,
    pub min_c: i64,
    pub humidity_pct: u32,
    pub cloud_pct: u32,
    pub precip_mm: f64,
    pub is_day: bool,
}

impl WeatherDisplay {
    pub fn from_report(report: &WeatherReport) -> Result<Self> {
        let today = report
            .forecast
            .forecastday
            .first()
            .ok_or_else(|| SuiteError::NotFound("forecast day".to_string()))?;
        let current = &report.current;
        let is_day = current.is_day == 1;
        let assets = assets_for(current.condition.code, is_day);

        Ok(Self {
            location: format!("{}, {}", report.location.name, report.location.country),
            condition_text: current.condition.text.clone(),
            icon_path: assets.icon_path,
            template_path: assets.template_path,
            temp_c: round_half_up(current.temp_c),
            feels_like_c: round_half_up(current.feelslike_c),
            max_c: round_half_up(today.day.maxtemp_c),
            min_c: round_half_up(today.day.mintemp_c),
            humidity_pct: current.humidity,
            cloud_pct: current.cloud,
            precip_mm: current.precip_mm,
            is_day,
        })
    }
}

// == Client ==
pub struct WeatherClient {
    fetcher: Arc<dyn Fetcher>,
    api_key: String,
    lang: String,
    endpoint: String,
}

impl WeatherClient {
    /// # Arguments
    /// * `fetcher` - Network fetcher; weather requests never go through the asset cache
    /// * `api_key` - WeatherAPI.com key
    /// * `lang` - Language of the condition text
    pub fn new(fetcher: Arc<dyn Fetcher>, api_key: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_key: api_key.into(),
            lang: lang.into(),
            endpoint: WEATHER_FORECAST_URL.to_string(),
        }
    }

    /// Forecast URL for `query` (a place name or `"lat,lon"`).
    pub fn url(&self, query: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("key", self.api_key.as_str()),
                ("q", query),
                ("days", "1"),
                ("lang", self.lang.as_str()),
            ],
        )
        .map_err(|e| SuiteError::InvalidRequest(format!("weather url: {}", e)))?;
        Ok(url.into())
    }

    pub async fn fetch(&self, query: &str) -> Result<WeatherReport> {
        let url = self.url(query)?;
        let resp = self
            .fetcher
            .fetch(&Request::get(url))
            .await?
            .error_for_status(&self.endpoint)?;
        resp.json()
    }
}

// == Widget ==
/// Where the rendered weather came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum WeatherOutcome {
    Live { weather: WeatherDisplay },
    Cached { weather: WeatherDisplay, cached_at: i64 },
    Failed { message: String },
}

pub struct WeatherWidget {
    client: WeatherClient,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    view: Arc<dyn WeatherView>,
    query: Mutex<String>,
    online: AtomicBool,
    max_accuracy_m: f64,
}

impl WeatherWidget {
    pub fn new(
        client: WeatherClient,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        view: Arc<dyn WeatherView>,
        location: impl Into<String>,
        max_accuracy_m: f64,
    ) -> Self {
        Self {
            client,
            store,
            clock,
            view,
            query: Mutex::new(location.into()),
            online: AtomicBool::new(true),
            max_accuracy_m,
        }
    }

    pub fn query(&self) -> String {
        self.query.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Fetches and renders current conditions, falling back to the stored
    /// report when offline or when the request fails.
    pub async fn refresh(&self) -> WeatherOutcome {
        if !self.is_online() {
            debug!("Offline, rendering stored weather");
            return self.render_cached();
        }

        let query = self.query();
        let display = match self.client.fetch(&query).await {
            Ok(report) => WeatherDisplay::from_report(&report).map(|display| (report, display)),
            Err(err) => Err(err),
        };

        match display {
            Ok((report, display)) => {
                self.store_report(report);
                self.view.set_offline(false);
                self.view.render_weather(&display);
                info!("Weather updated for {}", query);
                WeatherOutcome::Live { weather: display }
            }
            Err(err) => {
                warn!("Weather request failed: {}", err);
                self.render_cached()
            }
        }
    }

    fn store_report(&self, report: WeatherReport) {
        let cached = CachedReport {
            cached_at: self.clock.now_ms(),
            report,
        };
        let stored = serde_json::to_string(&cached)
            .map_err(SuiteError::from)
            .and_then(|raw| self.store.set(WEATHER_CACHE, &raw));
        if let Err(err) = stored {
            warn!("Failed to store weather report: {}", err);
        }
    }

    fn render_cached(&self) -> WeatherOutcome {
        let cached = self
            .store
            .get(WEATHER_CACHE)
            .and_then(|raw| serde_json::from_str::<CachedReport>(&raw).ok())
            .and_then(|cached| {
                WeatherDisplay::from_report(&cached.report)
                    .ok()
                    .map(|display| (display, cached.cached_at))
            });

        match cached {
            Some((display, cached_at)) => {
                self.view.render_weather(&display);
                self.view.set_offline(true);
                WeatherOutcome::Cached {
                    weather: display,
                    cached_at,
                }
            }
            None => {
                self.view.render_error(WEATHER_ERROR);
                WeatherOutcome::Failed {
                    message: WEATHER_ERROR.to_string(),
                }
            }
        }
    }

    /// Connectivity change: going offline shows the stored report, coming
    /// back online refreshes.
    pub async fn set_online(&self, online: bool) -> WeatherOutcome {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online != online {
            info!("Weather widget is now {}", if online { "online" } else { "offline" });
        }
        self.refresh().await
    }

    /// Switches the query to a device position and refreshes.
    ///
    /// Fixes coarser than the configured accuracy (typically IP-based) are
    /// rejected and the current query is kept.
    pub async fn update_position(&self, lat: f64, lon: f64, accuracy_m: f64) -> Result<WeatherOutcome> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(SuiteError::InvalidRequest(format!(
                "coordinates out of range: {},{}",
                lat, lon
            )));
        }
        if !accuracy_m.is_finite() || accuracy_m > self.max_accuracy_m {
            return Err(SuiteError::InvalidRequest(format!(
                "position accuracy {}m exceeds {}m",
                accuracy_m, self.max_accuracy_m
            )));
        }

        if let Ok(mut query) = self.query.lock() {
            *query = format!("{},{}", lat, lon);
        }
        Ok(self.refresh().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::net::testing::StubFetcher;
    use crate::net::Response;
    use crate::storage::MemoryStore;
    use crate::view::DashboardSnapshot;
    use chrono::{TimeZone, Utc};

    const REPORT: &str = r#"{
        "location": {"name": "Jacinto Machado", "country": "Brazil", "region": "SC"},
        "current": {
            "temp_c": 22.5, "feelslike_c": 23.4, "humidity": 81, "cloud": 50,
            "precip_mm": 0.3, "is_day": 0,
            "condition": {"text": "Chuva leve", "code": 1183}
        },
        "forecast": {"forecastday": [{"day": {"maxtemp_c": 27.6, "mintemp_c": 17.5}}]}
    }"#;

    struct Fixture {
        widget: WeatherWidget,
        fetcher: Arc<StubFetcher>,
        store: Arc<MemoryStore>,
        view: Arc<DashboardSnapshot>,
    }

    fn fixture() -> Fixture {
        let fetcher = Arc::new(
            StubFetcher::new().with_route(WEATHER_FORECAST_URL, Response::json_body(REPORT)),
        );
        let store = Arc::new(MemoryStore::new());
        let view = Arc::new(DashboardSnapshot::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let widget = WeatherWidget::new(
            WeatherClient::new(fetcher.clone(), "k3y", "pt"),
            store.clone(),
            clock,
            view.clone(),
            "Jacinto Machado",
            1000.0,
        );
        Fixture {
            widget,
            fetcher,
            store,
            view,
        }
    }

    #[test]
    fn test_url_encodes_query() {
        let client = WeatherClient::new(Arc::new(StubFetcher::new()), "k3y", "pt");
        assert_eq!(
            client.url("Jacinto Machado").unwrap(),
            "https://api.weatherapi.com/v1/forecast.json?key=k3y&q=Jacinto+Machado&days=1&lang=pt"
        );
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(22.5), 23);
        assert_eq!(round_half_up(22.49), 22);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.51), -3);
    }

    #[test]
    fn test_asset_table() {
        let clear_night = assets_for(1000, false);
        assert_eq!(clear_night.icon_path, "./database/Weather/icon/Moon.svg");
        assert_eq!(
            clear_night.template_path,
            "./database/Weather/templates/Weather=Clear, Moment=Night.svg"
        );

        let drizzle_day = assets_for(1153, true);
        assert_eq!(drizzle_day.icon_path, "./database/Weather/icon/sun rain.svg");
        assert!(drizzle_day.template_path.ends_with("Weather=Few Clouds, Moment=Day.svg"));

        let storm = assets_for(1276, true);
        assert_eq!(storm.icon_path, "./database/Weather/icon/Group 6.svg");

        let unknown = assets_for(4242, true);
        assert_eq!(unknown.icon_path, "./database/Weather/icon/Sun.svg");
    }

    #[tokio::test]
    async fn test_refresh_renders_live_report() {
        let f = fixture();
        let outcome = f.widget.refresh().await;

        let weather = match outcome {
            WeatherOutcome::Live { weather } => weather,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(weather.location, "Jacinto Machado, Brazil");
        assert_eq!(weather.temp_c, 23);
        assert_eq!(weather.feels_like_c, 23);
        assert_eq!(weather.max_c, 28);
        assert_eq!(weather.min_c, 18);
        assert_eq!(weather.icon_path, "./database/Weather/icon/rain.svg");
        assert!(!weather.is_day);

        let panel = f.view.snapshot().weather;
        assert!(!panel.offline);
        assert!(panel.display.is_some());
        assert!(f.store.get(WEATHER_CACHE).is_some());
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_stored_report() {
        let f = fixture();
        f.widget.refresh().await;

        f.fetcher.set_offline(true);
        let outcome = f.widget.refresh().await;
        assert!(matches!(outcome, WeatherOutcome::Cached { .. }));

        let panel = f.view.snapshot().weather;
        assert!(panel.offline);
        assert_eq!(panel.display.unwrap().temp_c, 23);
    }

    #[tokio::test]
    async fn test_failure_without_cache_shows_error() {
        let f = fixture();
        f.fetcher.set_offline(true);

        let outcome = f.widget.refresh().await;
        assert_eq!(
            outcome,
            WeatherOutcome::Failed {
                message: WEATHER_ERROR.to_string()
            }
        );
        assert_eq!(f.view.snapshot().weather.error.as_deref(), Some(WEATHER_ERROR));
    }

    #[tokio::test]
    async fn test_offline_transition_skips_network() {
        let f = fixture();
        f.widget.refresh().await;
        let calls = f.fetcher.calls();

        let outcome = f.widget.set_online(false).await;
        assert!(matches!(outcome, WeatherOutcome::Cached { .. }));
        assert_eq!(f.fetcher.calls(), calls);

        let outcome = f.widget.set_online(true).await;
        assert!(matches!(outcome, WeatherOutcome::Live { .. }));
        assert!(!f.view.snapshot().weather.offline);
    }

    #[tokio::test]
    async fn test_position_accuracy_threshold() {
        let f = fixture();

        let coarse = f.widget.update_position(-29.0, -49.76, 25_000.0).await;
        assert!(matches!(coarse, Err(SuiteError::InvalidRequest(_))));
        assert_eq!(f.widget.query(), "Jacinto Machado");

        let fine = f.widget.update_position(-29.0, -49.76, 30.0).await.unwrap();
        assert!(matches!(fine, WeatherOutcome::Live { .. }));
        assert_eq!(f.widget.query(), "-29,-49.76");
    }
}
