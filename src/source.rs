//! Where raw fee rows come from: the membership server's `/api/tirada`
//! endpoints, or a JSON export on disk.

use std::path::Path;

use log::debug;
use serde_json::Value;

use crate::error::PrintError;

/// The server takes exactly this many ids per custom request.
pub const IDS_PER_REQUEST: usize = 8;

/// Id sent to fill unused slots of a request.
pub const PADDING_ID: i64 = -1;

pub trait RecordSource {
    /// Raw rows for the given fee ids, in source order.
    fn fetch(&mut self, ids: &[i64]) -> Result<Vec<Value>, PrintError>;
}

// ============================================================================
// Membership API
// ============================================================================

pub struct ApiSource {
    base_url: String,
    api_key: Option<String>,
}

impl ApiSource {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, PrintError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PrintError::InvalidConfiguration(format!(
                "server URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    /// `/api/tirada/custom/{id1}/.../{id8}`, padded with [`PADDING_ID`].
    pub fn custom_url(&self, ids: &[i64]) -> String {
        let mut path = String::new();
        for slot in 0..IDS_PER_REQUEST {
            let id = ids.get(slot).copied().unwrap_or(PADDING_ID);
            path.push('/');
            path.push_str(&id.to_string());
        }
        format!("{}/api/tirada/custom{}", self.base_url, path)
    }

    pub fn range_url(&self, start: i64, end: i64) -> String {
        format!("{}/api/tirada/start/{}/end/{}", self.base_url, start, end)
    }

    /// `/api/tirada/page/{page}`: one server-side page of
    /// [`IDS_PER_REQUEST`] rows.
    pub fn page_url(&self, page: i64) -> String {
        format!("{}/api/tirada/page/{}", self.base_url, page)
    }

    /// Rows of one server-side page. Pages are numbered from 1.
    pub fn fetch_page(&self, page: i64) -> Result<Vec<Value>, PrintError> {
        if page < 1 {
            return Err(PrintError::InvalidConfiguration(format!(
                "page numbers start at 1, got {}",
                page
            )));
        }
        self.get_rows(&self.page_url(page))
    }

    /// Every row whose fee id lies in `start..=end`.
    pub fn fetch_range(&self, start: i64, end: i64) -> Result<Vec<Value>, PrintError> {
        if start > end {
            return Err(PrintError::InvalidConfiguration(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        self.get_rows(&self.range_url(start, end))
    }

    fn get_rows(&self, url: &str) -> Result<Vec<Value>, PrintError> {
        debug!("GET {}", url);
        let mut request = ureq::get(url);
        if let Some(key) = &self.api_key {
            request = request.set("X-API-Key", key);
        }

        let response = request
            .call()
            .map_err(|e| PrintError::SourceError(format!("Failed to fetch {}: {}", url, e)))?;
        let body = response
            .into_string()
            .map_err(|e| PrintError::SourceError(format!("Failed to read response: {}", e)))?;

        parse_rows(&body)
    }
}

impl RecordSource for ApiSource {
    fn fetch(&mut self, ids: &[i64]) -> Result<Vec<Value>, PrintError> {
        if ids.is_empty() {
            return Err(PrintError::InvalidConfiguration("no fee ids given".into()));
        }
        let mut rows = Vec::new();
        for chunk in ids.chunks(IDS_PER_REQUEST) {
            rows.extend(self.get_rows(&self.custom_url(chunk))?);
        }
        Ok(rows)
    }
}

fn parse_rows(body: &str) -> Result<Vec<Value>, PrintError> {
    match serde_json::from_str(body) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(other) => Err(PrintError::SourceError(format!(
            "expected a JSON array of records, got {}",
            other
        ))),
        Err(e) => Err(PrintError::SourceError(format!("Invalid JSON: {}", e))),
    }
}

// ============================================================================
// JSON Export
// ============================================================================

/// Rows read once from a JSON array on disk.
pub struct JsonFileSource {
    rows: Vec<Value>,
}

impl JsonFileSource {
    pub fn load(path: &Path) -> Result<Self, PrintError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PrintError::SourceError(format!("{}: {}", path.display(), e)))?;
        Ok(Self { rows: parse_rows(&content)? })
    }

    pub fn from_rows(rows: Vec<Value>) -> Self {
        Self { rows }
    }
}

impl RecordSource for JsonFileSource {
    /// With no ids, every row; otherwise the rows whose `CC_ID` is listed.
    fn fetch(&mut self, ids: &[i64]) -> Result<Vec<Value>, PrintError> {
        if ids.is_empty() {
            return Ok(self.rows.clone());
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| row.get("CC_ID").and_then(Value::as_i64).is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }
}
