//! Colour lookup against the static colour database.
//!
//! The database is split by red channel into `database/colors/r_{red}.json`
//! files, each mapping `#RRGGBB` to an rgb string.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{Result, SuiteError};
use crate::net::{Fetcher, Request};

const COLORS_DIR: &str = "database/colors";

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-F]{6}$").expect("valid regex"));

/// CSS variables resolved on start-up, with their hex values.
pub const DEFAULT_PALETTE: [(&str, &str); 5] = [
    ("--text-primary", "#FFFFFF"),
    ("--text-secondary", "#A0A0A0"),
    ("--bg-dark", "#1A1A1A"),
    ("--accent-gold", "#FFD700"),
    ("--accent-purple", "#9370DB"),
];

/// Uppercases and expands `#RGB`; returns `None` for anything that is not a
/// six-digit hex colour afterwards.
pub fn normalize_hex(input: &str) -> Option<String> {
    let upper = input.trim().to_uppercase();
    let hex = if upper.len() == 4 && upper.starts_with('#') {
        upper
            .chars()
            .skip(1)
            .fold(String::from("#"), |mut acc, c| {
                acc.push(c);
                acc.push(c);
                acc
            })
    } else {
        upper
    };
    HEX_COLOR.is_match(&hex).then_some(hex)
}

/// Segment file holding `hex`, which must already be normalized.
pub fn segment_path(hex: &str) -> Result<String> {
    let red = hex
        .get(1..3)
        .and_then(|r| u8::from_str_radix(r, 16).ok())
        .ok_or_else(|| SuiteError::InvalidRequest(format!("not a hex colour: {}", hex)))?;
    Ok(format!("{}/r_{}.json", COLORS_DIR, red))
}

/// One resolved palette variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteEntry {
    pub variable: String,
    pub hex: String,
    pub rgb: String,
}

pub struct ColorSystem {
    fetcher: Arc<dyn Fetcher>,
}

impl ColorSystem {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Looks `hex` up in its segment. Invalid input, a missing segment or a
    /// missing entry all give `None`.
    pub async fn get_rgb(&self, hex: &str) -> Option<String> {
        let hex = normalize_hex(hex)?;
        match self.lookup(&hex).await {
            Ok(rgb) => rgb,
            Err(err) => {
                error!("Colour lookup for {} failed: {}", hex, err);
                None
            }
        }
    }

    async fn lookup(&self, hex: &str) -> Result<Option<String>> {
        let path = segment_path(hex)?;
        let resp = self
            .fetcher
            .fetch(&Request::get(path.as_str()))
            .await?
            .error_for_status(&path)?;
        let mut segment: HashMap<String, String> = resp.json()?;
        Ok(segment.remove(hex))
    }

    /// Resolves every default palette variable that exists in the database.
    pub async fn default_palette(&self) -> Vec<PaletteEntry> {
        let mut palette = Vec::with_capacity(DEFAULT_PALETTE.len());
        for (variable, hex) in DEFAULT_PALETTE {
            match self.get_rgb(hex).await {
                Some(rgb) => palette.push(PaletteEntry {
                    variable: variable.to_string(),
                    hex: hex.to_string(),
                    rgb,
                }),
                None => debug!("Palette colour {} not in database", hex),
            }
        }
        palette
    }
}
