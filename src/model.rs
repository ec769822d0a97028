use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::AppResult;

/// Administrative region the dashboard scopes all data to. Immutable
/// reference data, selected by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub id: i64,
    pub name: String,
}

/// An appeal document picked for upload, held in memory between selection
/// and submission. The bytes are opaque to the client; unification is the
/// backend's job.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> AppResult<Self> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self {
            file_name,
            bytes: fs::read(path)?,
        })
    }
}

/// One row of a unified import result. Produced entirely by the backend;
/// the client treats it as opaque display data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadItem {
    pub source: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub items: Vec<UploadItem>,
    /// Link to the consolidated export artifact, already passed through the
    /// origin resolver by the client.
    #[serde(default)]
    pub export_url: Option<String>,
}

/// One slice of the category-distribution chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySlice {
    pub name: String,
    pub value: u64,
}

/// One point of the appeals-per-date chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateCount {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub address: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub count: u64,
    /// Averaged score; only the sign is meaningful for display.
    pub sentiment: f64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    #[serde(default)]
    pub by_category: Vec<CategorySlice>,
    #[serde(default)]
    pub by_date: Vec<DateCount>,
    #[serde(default)]
    pub per_category: Vec<CategoryBreakdown>,
}

/// A generated action-plan document for one category and municipality.
/// Both document links are passed through the origin resolver by the
/// client before being exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub category: String,
    pub municipality_name: String,
    pub created_at: String,
    pub summary: String,
    pub docx_url: String,
    pub pdf_url: String,
}
