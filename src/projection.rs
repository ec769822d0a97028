//! Pure derivation of renderable structures from a session-state snapshot.
//! Nothing here talks to the network or mutates state.

use serde::Serialize;

use crate::model::{CategoryBreakdown, CategorySlice, DateCount, Hotspot, Plan, UploadItem};
use crate::workflow::SessionState;

const TEXT_PREVIEW_CHARS: usize = 160;
const HOTSPOT_DISPLAY_LIMIT: usize = 5;
const HOTSPOT_PLACEHOLDER: &str = "—";

/// Everything the dashboard surface renders, derived in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub upload_rows: Vec<UploadRow>,
    pub export_url: Option<String>,
    pub category_series: Vec<CategorySlice>,
    pub date_series: Vec<DateCount>,
    pub category_cards: Vec<CategoryCard>,
    pub plans: Vec<Plan>,
}

/// One display row of the unified import table.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRow {
    pub source: String,
    pub date: String,
    pub address: String,
    pub text: String,
    pub category: String,
    pub geotag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Only the sign of the score matters; zero is neutral.
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Sentiment::Positive
        } else if score < 0.0 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Negative => "негативное",
            Sentiment::Neutral => "нейтральное",
            Sentiment::Positive => "позитивное",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCard {
    pub category: String,
    pub count: u64,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    pub topics: Vec<String>,
    /// Capped at the display limit regardless of how many the backend sent.
    pub hotspots: Vec<Hotspot>,
}

pub fn project(state: &SessionState) -> DashboardView {
    let upload_rows = state
        .upload
        .as_ref()
        .map(|result| upload_rows(&result.items))
        .unwrap_or_default();
    let export_url = state.upload.as_ref().and_then(|r| r.export_url.clone());
    let (category_series, date_series, category_cards) = match &state.analytics {
        Some(snapshot) => (
            snapshot.by_category.clone(),
            snapshot.by_date.clone(),
            snapshot.per_category.iter().map(category_card).collect(),
        ),
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    DashboardView {
        upload_rows,
        export_url,
        category_series,
        date_series,
        category_cards,
        plans: state.plans.clone(),
    }
}

pub fn upload_rows(items: &[UploadItem]) -> Vec<UploadRow> {
    items
        .iter()
        .map(|item| UploadRow {
            source: item.source.clone(),
            date: item.date.clone().unwrap_or_default(),
            address: item.address.clone().unwrap_or_default(),
            text: item
                .text
                .as_deref()
                .map(|text| truncate_chars(text, TEXT_PREVIEW_CHARS))
                .unwrap_or_default(),
            category: item.category.clone().unwrap_or_default(),
            geotag: format_geotag(item.lat, item.lng),
        })
        .collect()
}

pub fn category_card(breakdown: &CategoryBreakdown) -> CategoryCard {
    CategoryCard {
        category: breakdown.category.clone(),
        count: breakdown.count,
        sentiment: Sentiment::from_score(breakdown.sentiment),
        sentiment_score: breakdown.sentiment,
        topics: breakdown.topics.clone(),
        hotspots: breakdown
            .hotspots
            .iter()
            .take(HOTSPOT_DISPLAY_LIMIT)
            .cloned()
            .collect(),
    }
}

/// Blank unless both coordinates are present; five decimals otherwise.
fn format_geotag(lat: Option<f64>, lng: Option<f64>) -> String {
    match (lat, lng) {
        (Some(lat), Some(lng)) => format!("{lat:.5},{lng:.5}"),
        _ => String::new(),
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Plain-text table of the unified import rows, columns padded to their
/// widest cell.
pub fn render_upload_table(rows: &[UploadRow]) -> String {
    let headers = ["Источник", "Дата", "Адрес", "Текст", "Категория", "Геометка"];
    let cells: Vec<[&str; 6]> = rows
        .iter()
        .map(|row| {
            [
                row.source.as_str(),
                row.date.as_str(),
                row.address.as_str(),
                row.text.as_str(),
                row.category.as_str(),
                row.geotag.as_str(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&format_row(&headers, &widths));
    for row in &cells {
        out.push_str(&format_row(row, &widths));
    }
    out
}

fn format_row(cells: &[&str; 6], widths: &[usize; 6]) -> String {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        if i > 0 {
            line.push_str(" | ");
        }
        line.push_str(cell);
        for _ in cell.chars().count()..*width {
            line.push(' ');
        }
    }
    line.push('\n');
    line
}

/// Per-category cards as indented text blocks.
pub fn render_category_cards(cards: &[CategoryCard]) -> String {
    let mut out = String::new();
    for card in cards {
        out.push_str(&format!(
            "{} — обращений: {}, настроение: {} ({})\n",
            card.category,
            card.count,
            card.sentiment.label(),
            card.sentiment_score,
        ));
        if !card.topics.is_empty() {
            out.push_str(&format!("  темы: {}\n", card.topics.join(", ")));
        }
        out.push_str("  горячие точки:\n");
        if card.hotspots.is_empty() {
            out.push_str(&format!("    {HOTSPOT_PLACEHOLDER}\n"));
        }
        for hotspot in &card.hotspots {
            out.push_str(&format!("    {} — {}\n", hotspot.address, hotspot.count));
        }
    }
    out
}
