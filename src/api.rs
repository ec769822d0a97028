use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::model::{AnalyticsSnapshot, FileAttachment, Municipality, Plan, UploadResult};
use crate::origin::resolve_asset_url;

const RAW_BODY_EXCERPT_CHARS: usize = 180;

/// Typed client for the appeals backend. Every response goes through one
/// JSON contract: non-JSON bodies are transport errors carrying a raw-body
/// excerpt, JSON error payloads surface their `detail`/`error` message.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base: String,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("appeals-triage/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub async fn municipalities(&self) -> AppResult<Vec<Municipality>> {
        let url = self.endpoint(&["appeals", "municipalities"])?;
        let envelope: ItemsEnvelope<Municipality> = self.get_json(url).await?;
        Ok(envelope.items)
    }

    pub async fn analytics(&self, municipality_id: i64) -> AppResult<AnalyticsSnapshot> {
        let mut url = self.endpoint(&["appeals", "analytics"])?;
        url.query_pairs_mut()
            .append_pair("municipality_id", &municipality_id.to_string());
        self.get_json(url).await
    }

    pub async fn plans(&self, municipality_id: i64) -> AppResult<Vec<Plan>> {
        let mut url = self.endpoint(&["appeals", "plans"])?;
        url.query_pairs_mut()
            .append_pair("municipality_id", &municipality_id.to_string());
        let envelope: ItemsEnvelope<Plan> = self.get_json(url).await?;
        Ok(envelope
            .items
            .into_iter()
            .map(|mut plan| {
                plan.docx_url = resolve_asset_url(&self.base, &plan.docx_url);
                plan.pdf_url = resolve_asset_url(&self.base, &plan.pdf_url);
                plan
            })
            .collect())
    }

    pub async fn upload_appeals(
        &self,
        municipality_id: i64,
        files: &[FileAttachment],
    ) -> AppResult<UploadResult> {
        let url = self.endpoint(&["appeals", "upload"])?;
        let mut form = Form::new();
        for file in files {
            form = form.part(
                "files",
                Part::bytes(file.bytes.clone()).file_name(file.file_name.clone()),
            );
        }
        form = form.text("municipality_id", municipality_id.to_string());

        let mut result: UploadResult = self.post_multipart(url, form).await?;
        result.export_url = result
            .export_url
            .map(|link| resolve_asset_url(&self.base, &link));
        Ok(result)
    }

    /// Requests plan generation for a category. The response body is checked
    /// against the JSON contract and discarded; callers re-fetch the plan
    /// list as the source of truth.
    pub async fn generate_plan(&self, category: &str, municipality_id: i64) -> AppResult<()> {
        let url = self.endpoint(&["appeals", "generate-plan", category])?;
        let _: serde_json::Value = self
            .post_json(url, &GeneratePlanRequest { municipality_id })
            .await?;
        Ok(())
    }

    /// Joins path segments onto the configured base. Segments are
    /// percent-encoded by `Url`, which is what keeps Cyrillic category
    /// labels legal in the generate-plan path.
    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(&self.base).map_err(|err| {
            AppError::Config(format!(
                "API base `{}` is not an absolute URL: {err}",
                self.base
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("API base `{}` cannot carry paths", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> AppResult<T> {
        let response = self.http.post(url).json(body).send().await?;
        read_json(response).await
    }

    async fn post_multipart<T: DeserializeOwned>(&self, url: Url, form: Form) -> AppResult<T> {
        // no explicit content-type: the transport supplies the boundary
        let response = self.http.post(url).multipart(form).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false);

    if !is_json {
        // an HTML error page from a misconfigured proxy is an infrastructure
        // problem, not an API error, whatever the status says
        let body = response.text().await?;
        let excerpt: String = body.chars().take(RAW_BODY_EXCERPT_CHARS).collect();
        return Err(AppError::UnexpectedPayload(excerpt));
    }

    let bytes = response.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.detail.or(body.error))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        return Err(AppError::Api(message));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[derive(Serialize)]
struct GeneratePlanRequest {
    municipality_id: i64,
}

#[derive(Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}
