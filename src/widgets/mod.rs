//! Widgets Module
//!
//! Periodically refreshed dashboard panels: the saint of the liturgical day
//! and the current weather.

mod saint;
mod weather;

pub use saint::{
    escape_html, format_saint_names, liturgical_date, CalendarEntry, SaintDisplay, SaintRecord,
    SaintRefresh, SaintWidget, CALENDAR_URL,
};
pub use weather::{
    assets_for, round_half_up, Condition, Current, DaySummary, Forecast, ForecastDay, Location,
    WeatherAssets, WeatherClient, WeatherDisplay, WeatherOutcome, WeatherReport, WeatherWidget,
    WEATHER_ERROR, WEATHER_FORECAST_URL,
};
