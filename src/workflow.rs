use chrono::{DateTime, Utc};
use futures_util::future;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::BackendClient;
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::model::{AnalyticsSnapshot, FileAttachment, Municipality, Plan, UploadResult};

pub const DEFAULT_MUNICIPALITY_ID: i64 = 1;

/// Everything the dashboard renders, as one cloneable aggregate. Consumers
/// get snapshots; mutation happens only inside [`DashboardSession`].
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Exactly one municipality is selected at any time.
    pub municipality_id: i64,
    pub municipalities: Vec<Municipality>,
    pub pending_files: Vec<FileAttachment>,
    pub upload: Option<UploadResult>,
    pub analytics: Option<AnalyticsSnapshot>,
    pub analytics_refreshed_at: Option<DateTime<Utc>>,
    pub plans: Vec<Plan>,
    /// Spans the whole of an upload or plan-generation action.
    pub busy: bool,
    /// Most recent action error only; cleared when the next action starts.
    pub last_error: Option<String>,
}

/// The workflow state machine: coordinates the backend calls triggered by
/// operator actions and merges their results into the session state.
///
/// The three passive fetches (municipalities, analytics, plans) are
/// best-effort: they run concurrently, apply independently, and a failure
/// leaves the previous value in place. Upload and plan generation are
/// guarded actions: one at a time, with the failure kept as the session's
/// current error.
pub struct DashboardSession {
    api: BackendClient,
    state: Mutex<SessionState>,
}

impl DashboardSession {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let api = BackendClient::new(config)?;
        Ok(Self {
            api,
            state: Mutex::new(SessionState {
                municipality_id: DEFAULT_MUNICIPALITY_ID,
                municipalities: config.fallback_municipalities.clone(),
                pending_files: Vec::new(),
                upload: None,
                analytics: None,
                analytics_refreshed_at: None,
                plans: Vec::new(),
                busy: false,
                last_error: None,
            }),
        })
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Replaces the pending file selection. Files are held in memory until
    /// submitted and are not retried after a failed upload.
    pub fn select_files(&self, files: Vec<FileAttachment>) {
        self.state.lock().pending_files = files;
    }

    pub async fn select_municipality(&self, municipality_id: i64) {
        self.state.lock().municipality_id = municipality_id;
        self.refresh().await;
    }

    /// Best-effort refresh of municipalities, analytics and plans for the
    /// current selection. The fetches run concurrently with no completion
    /// ordering; each updates only its own slice of state, and a failure is
    /// swallowed here so the dashboard stays usable on partial outages.
    pub async fn refresh(&self) {
        let municipality_id = self.state.lock().municipality_id;
        let (municipalities, analytics, plans) = future::join3(
            self.api.municipalities(),
            self.api.analytics(municipality_id),
            self.api.plans(municipality_id),
        )
        .await;

        match municipalities {
            Ok(items) => self.state.lock().municipalities = items,
            Err(err) => debug!(?err, "municipality list refresh failed"),
        }
        match analytics {
            Ok(snapshot) => {
                self.apply_analytics(municipality_id, snapshot);
            }
            Err(err) => debug!(?err, municipality_id, "analytics refresh failed"),
        }
        match plans {
            Ok(items) => {
                self.apply_plans(municipality_id, items);
            }
            Err(err) => debug!(?err, municipality_id, "plan list refresh failed"),
        }
    }

    /// Submits the pending files for unification, then refreshes analytics
    /// once so the dashboard reflects the just-ingested data. Rejected
    /// without a request while busy or with nothing selected.
    pub async fn upload(&self) -> AppResult<UploadResult> {
        let (municipality_id, files) = {
            let mut state = self.state.lock();
            if state.busy {
                return Err(AppError::ActionInProgress);
            }
            if state.pending_files.is_empty() {
                return Err(AppError::NoFilesSelected);
            }
            state.busy = true;
            state.last_error = None;
            (state.municipality_id, state.pending_files.clone())
        };

        match self.run_upload(municipality_id, &files).await {
            Ok(result) => {
                self.state.lock().busy = false;
                Ok(result)
            }
            Err(err) => {
                self.fail_action(&err);
                Err(err)
            }
        }
    }

    async fn run_upload(
        &self,
        municipality_id: i64,
        files: &[FileAttachment],
    ) -> AppResult<UploadResult> {
        let result = self.api.upload_appeals(municipality_id, files).await?;
        // committed before the analytics refetch: a failure past this point
        // keeps the upload result but surfaces as the action's error
        self.state.lock().upload = Some(result.clone());
        let snapshot = self.api.analytics(municipality_id).await?;
        self.apply_analytics(municipality_id, snapshot);
        Ok(result)
    }

    /// Requests an action plan for the category, then re-fetches the plan
    /// list wholesale; the fetched list, not the POST response, is the
    /// source of truth.
    pub async fn generate_plan(&self, category: &str) -> AppResult<Vec<Plan>> {
        let municipality_id = self.begin_action()?;
        match self.run_generate_plan(category, municipality_id).await {
            Ok(plans) => {
                self.state.lock().busy = false;
                Ok(plans)
            }
            Err(err) => {
                self.fail_action(&err);
                Err(err)
            }
        }
    }

    async fn run_generate_plan(
        &self,
        category: &str,
        municipality_id: i64,
    ) -> AppResult<Vec<Plan>> {
        self.api.generate_plan(category, municipality_id).await?;
        let plans = self.api.plans(municipality_id).await?;
        self.apply_plans(municipality_id, plans.clone());
        Ok(plans)
    }

    /// Busy guard: checked and set under one lock acquisition, so a second
    /// action is rejected instead of racing the first. The previous error is
    /// cleared here, at action start, never on completion.
    fn begin_action(&self) -> AppResult<i64> {
        let mut state = self.state.lock();
        if state.busy {
            return Err(AppError::ActionInProgress);
        }
        state.busy = true;
        state.last_error = None;
        Ok(state.municipality_id)
    }

    fn fail_action(&self, err: &AppError) {
        warn!(%err, "dashboard action failed");
        let mut state = self.state.lock();
        state.last_error = Some(err.to_string());
        state.busy = false;
    }

    /// Applies a fetched snapshot only if it was requested for the still-
    /// selected municipality; responses for a superseded selection are
    /// discarded rather than overwriting newer data.
    fn apply_analytics(&self, requested_id: i64, snapshot: AnalyticsSnapshot) -> bool {
        let mut state = self.state.lock();
        if state.municipality_id != requested_id {
            debug!(
                requested_id,
                current = state.municipality_id,
                "discarding stale analytics response"
            );
            return false;
        }
        state.analytics = Some(snapshot);
        state.analytics_refreshed_at = Some(Utc::now());
        true
    }

    fn apply_plans(&self, requested_id: i64, plans: Vec<Plan>) -> bool {
        let mut state = self.state.lock();
        if state.municipality_id != requested_id {
            debug!(
                requested_id,
                current = state.municipality_id,
                "discarding stale plan list response"
            );
            return false;
        }
        state.plans = plans;
        true
    }
}
