mod api;
mod config;
mod errors;
mod model;
mod origin;
mod projection;
mod workflow;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use api::BackendClient;
pub use config::{default_municipalities, AppConfig, PLAN_CATEGORIES};
pub use errors::{AppError, AppResult};
pub use model::{
    AnalyticsSnapshot, CategoryBreakdown, CategorySlice, DateCount, FileAttachment, Hotspot,
    Municipality, Plan, UploadItem, UploadResult,
};
pub use origin::{backend_origin, resolve_asset_url};
pub use projection::{
    project, render_category_cards, render_upload_table, CategoryCard, DashboardView, Sentiment,
    UploadRow,
};
pub use workflow::{DashboardSession, SessionState, DEFAULT_MUNICIPALITY_ID};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,appeals_triage=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
