//! REST binding of the AI Gateway: JSON POSTs to the proxy service.

use crate::error::GatewayError;
use crate::gateway::{AiGateway, ChatReply};
use crate::incident::{
    AnalysisResult, ChatRequest, ChatResponse, ImpactForecast, IncidentDetails, TeamBriefing,
    TeamBriefingRequest, TrainingScenario,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestConfig {
    pub base_url: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
        }
    }
}

impl RestConfig {
    pub fn from_env() -> Self {
        std::env::var("AEGIS_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|base_url| Self { base_url })
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn from_config(config: &RestConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = GatewayError::from_status(path, status.as_u16(), &body);
            tracing::error!(path, status = status.as_u16(), error = %err, "gateway request failed");
            return Err(err);
        }

        response
            .json::<R>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AiGateway for RestGateway {
    async fn analyze_incident(&self, details: &IncidentDetails) -> Result<AnalysisResult, GatewayError> {
        self.post_json("/incident-analysis", details).await
    }

    async fn forecast_impact(&self, details: &IncidentDetails) -> Result<ImpactForecast, GatewayError> {
        self.post_json("/impact-forecast", details).await
    }

    async fn brief_team(&self, analysis: &AnalysisResult) -> Result<TeamBriefing, GatewayError> {
        let body = TeamBriefingRequest {
            analysis: analysis.clone(),
        };
        self.post_json("/team-briefing", &body).await
    }

    async fn build_scenario(&self, details: &IncidentDetails) -> Result<TrainingScenario, GatewayError> {
        self.post_json("/training-scenario", details).await
    }

    async fn chat(&self, session_id: Option<&str>, message: &str) -> Result<ChatReply, GatewayError> {
        let body = ChatRequest {
            session_id: session_id.map(ToString::to_string),
            message: message.to_string(),
        };
        let out: ChatResponse = self.post_json("/preparedness-chat", &body).await?;
        Ok(ChatReply::single(out.session_id, out.response))
    }
}
