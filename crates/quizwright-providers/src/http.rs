//! HTTP curriculum service: outcome generation plus subject and chapter listings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use quizwright_core::traits::{
    ChapterListing, CurriculumBrowser, OutcomeGenerator, OutcomeRequest, OutcomeResponse, Subject,
};

use crate::error::{error_for_status, ProviderError};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Client for a curriculum backend that exposes outcome generation and listings.
pub struct HttpCurriculumService {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ServiceError {
    #[serde(alias = "error")]
    message: String,
}

fn service_message(body: &str) -> Option<String> {
    serde_json::from_str::<ServiceError>(body)
        .ok()
        .map(|e| e.message)
}

impl HttpCurriculumService {
    pub fn new(base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse_with_params(&raw, params)
            .map_err(|e| ProviderError::NetworkError(format!("invalid URL {raw}: {e}")))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, ProviderError> {
        if !response.status().is_success() {
            return Err(error_for_status(response, what, service_message).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("{what}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = self.endpoint(path, params)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, DEFAULT_TIMEOUT_SECS))?;
        Self::read_json(response, path).await
    }
}

#[async_trait]
impl OutcomeGenerator for HttpCurriculumService {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(chapter = %request.chapter_name))]
    async fn generate_outcomes(&self, request: &OutcomeRequest) -> anyhow::Result<OutcomeResponse> {
        let url = self.endpoint("generate-outcomes", &[])?;
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, DEFAULT_TIMEOUT_SECS))?;

        let outcomes: OutcomeResponse = Self::read_json(response, "generate-outcomes").await?;
        debug!(count = outcomes.course_outcomes.len(), "outcomes received");
        Ok(outcomes)
    }
}

#[async_trait]
impl CurriculumBrowser for HttpCurriculumService {
    async fn list_subjects(&self, org: &str, class_id: &str) -> anyhow::Result<Vec<Subject>> {
        let subjects: Vec<Subject> = self
            .get_json("subjects", &[("org", org), ("class_id", class_id)])
            .await?;
        Ok(subjects)
    }

    async fn list_chapters(
        &self,
        org: &str,
        plan_class_id: &str,
    ) -> anyhow::Result<Vec<ChapterListing>> {
        let chapters: Vec<ChapterListing> = self
            .get_json("chapters", &[("org", org), ("plan_class_id", plan_class_id)])
            .await?;
        Ok(chapters)
    }
}
