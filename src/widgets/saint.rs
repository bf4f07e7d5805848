//! Saint of the liturgical day.

use std::sync::{Arc, Mutex};

use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, Offset, TimeZone, Timelike, Utc, Weekday,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::net::{Fetcher, Request};
use crate::view::SaintView;

/// Yearly calendar published with the site.
pub const CALENDAR_URL: &str = "database/calendario.json";

/// Hour on Sunday from which the liturgy belongs to Monday.
const SUNDAY_VESPERS_HOUR: u32 = 15;

const DEFAULT_KIND: &str = "--";
const DEFAULT_DESCRIPTION: &str = "Liturgical celebration";
const DEFAULT_COLOR: &str = "#FFFFFF";

// == Calendar ==
/// `{name, type, description, color}` of one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SaintRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub saint: Option<SaintRecord>,
}

/// Values placed in the saint slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaintDisplay {
    /// Escaped names joined with `<br>`
    pub name_html: String,
    pub kind: String,
    pub description: String,
    /// Ribbon colour
    pub color: String,
}

impl SaintDisplay {
    pub fn from_record(record: &SaintRecord) -> Self {
        fn or_default(value: &Option<String>, default: &str) -> String {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        }

        Self {
            name_html: format_saint_names(record.name.as_deref().unwrap_or_default()),
            kind: or_default(&record.kind, DEFAULT_KIND),
            description: or_default(&record.description, DEFAULT_DESCRIPTION),
            color: or_default(&record.color, DEFAULT_COLOR),
        }
    }

    /// Shown when the day is missing or the calendar cannot be read.
    pub fn not_found() -> Self {
        Self {
            name_html: "Today not found in the database".to_string(),
            kind: DEFAULT_KIND.to_string(),
            description: "Check the liturgical calendar".to_string(),
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

/// Escapes text for insertion into HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Splits `"A / B"` into one escaped line per saint.
pub fn format_saint_names(raw: &str) -> String {
    if raw.is_empty() {
        return "Unknown".to_string();
    }
    raw.split(" / ")
        .map(|name| escape_html(name.trim()))
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Date whose liturgy is celebrated at `now`.
///
/// On Sunday from 15:00 (vespers) the celebration is already Monday's.
pub fn liturgical_date<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    let date = now.date_naive();
    if now.weekday() == Weekday::Sun && now.hour() >= SUNDAY_VESPERS_HOUR {
        date.checked_add_days(Days::new(1)).unwrap_or(date)
    } else {
        date
    }
}

// == Widget ==
/// What a refresh did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SaintRefresh {
    /// Day already rendered
    Unchanged { date: NaiveDate },
    Rendered { date: NaiveDate, saint: SaintDisplay },
    NotFound { date: NaiveDate },
}

pub struct SaintWidget {
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    view: Arc<dyn SaintView>,
    offset: FixedOffset,
    calendar_url: String,
    last_rendered: Mutex<Option<NaiveDate>>,
}

impl SaintWidget {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        view: Arc<dyn SaintView>,
        utc_offset_minutes: i32,
    ) -> Self {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!("Invalid UTC offset {} min, using UTC", utc_offset_minutes);
                Utc.fix()
            });
        Self {
            fetcher,
            clock,
            view,
            offset,
            calendar_url: CALENDAR_URL.to_string(),
            last_rendered: Mutex::new(None),
        }
    }

    /// Liturgical date in the configured offset.
    pub fn today(&self) -> NaiveDate {
        liturgical_date(&self.clock.now().with_timezone(&self.offset))
    }

    pub fn last_rendered(&self) -> Option<NaiveDate> {
        self.last_rendered.lock().ok().and_then(|d| *d)
    }

    /// Renders the saint for the current liturgical date.
    ///
    /// Does nothing when that date is already on screen. The date is only
    /// remembered after a successful render, so misses are retried next tick.
    pub async fn refresh(&self) -> SaintRefresh {
        let date = self.today();
        if self.last_rendered() == Some(date) {
            return SaintRefresh::Unchanged { date };
        }

        match self.lookup(date).await {
            Ok(Some(record)) => {
                let saint = SaintDisplay::from_record(&record);
                self.view.render_saint(&saint);
                if let Ok(mut last) = self.last_rendered.lock() {
                    *last = Some(date);
                }
                info!("Saint calendar updated for {}", date);
                SaintRefresh::Rendered { date, saint }
            }
            Ok(None) => {
                warn!("No calendar entry for {}", date);
                self.view.render_not_found();
                SaintRefresh::NotFound { date }
            }
            Err(err) => {
                error!("Failed to load saint calendar: {}", err);
                self.view.render_not_found();
                SaintRefresh::NotFound { date }
            }
        }
    }

    async fn lookup(&self, date: NaiveDate) -> Result<Option<SaintRecord>> {
        let resp = self
            .fetcher
            .fetch(&Request::get(self.calendar_url.as_str()))
            .await?
            .error_for_status(&self.calendar_url)?;
        let calendar: Vec<CalendarEntry> = resp.json()?;

        let key = date.format("%Y-%m-%d").to_string();
        Ok(calendar
            .into_iter()
            .find(|entry| entry.date == key)
            .and_then(|entry| entry.saint))
    }
}
