/*
[INPUT]:  Caller-supplied prediction query parameters
[OUTPUT]: Validated query-string pairs for prediction endpoints
[POS]:    Data layer - argument validation before any network call
[UPDATE]: When prediction endpoint limits change
*/

use chrono::{DateTime, SecondsFormat, Utc};

use crate::http::{PrecogError, Result};

pub const MAX_LIMIT: u32 = 10_000;
pub const MAX_MINER_UID: u16 = 255;
pub const MIN_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 10_000;
pub const HOTKEY_LEN: usize = 48;

pub fn validate_limit(limit: u32) -> Result<()> {
    if limit == 0 || limit > MAX_LIMIT {
        return Err(PrecogError::InvalidArgument(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

pub fn validate_miner_uid(uid: u16) -> Result<()> {
    if uid > MAX_MINER_UID {
        return Err(PrecogError::InvalidArgument(format!(
            "miner uid must be between 0 and {MAX_MINER_UID}, got {uid}"
        )));
    }
    Ok(())
}

/// Hotkeys are 48-character SS58 addresses
pub fn validate_hotkey(hotkey: &str) -> Result<()> {
    if hotkey.chars().count() != HOTKEY_LEN || !hotkey.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PrecogError::InvalidArgument(format!(
            "miner hotkey must be a {HOTKEY_LEN}-character SS58 address"
        )));
    }
    Ok(())
}

/// Date-range query for historical prediction endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl HistoricalQuery {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            start_date,
            end_date,
            page: 1,
            page_size: MIN_PAGE_SIZE,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date >= self.end_date {
            return Err(PrecogError::InvalidArgument(
                "start_date must be before end_date".to_string(),
            ));
        }
        if self.page < 1 {
            return Err(PrecogError::InvalidArgument(
                "page must be a positive integer".to_string(),
            ));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(PrecogError::InvalidArgument(format!(
                "page size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "start_date",
                self.start_date.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "end_date",
                self.end_date.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ]
    }
}
