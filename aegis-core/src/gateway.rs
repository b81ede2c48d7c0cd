//! The AI Gateway capability.
//!
//! Everything that needs model output goes through [`AiGateway`]. The crate
//! ships two bindings: [`crate::llm::LlmGateway`] talks to the model provider
//! directly and [`crate::rest::RestGateway`] posts to the proxy service. The
//! dashboard flows are generic over the trait and never learn which binding
//! is active.

use crate::error::GatewayError;
use crate::incident::{AnalysisResult, ImpactForecast, IncidentDetails, TeamBriefing, TrainingScenario};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use std::fmt;

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

// Browser futures and clients are not `Send`.
#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

#[cfg(not(target_arch = "wasm32"))]
pub type ReplyChunks = futures::stream::BoxStream<'static, Result<String, GatewayError>>;
#[cfg(target_arch = "wasm32")]
pub type ReplyChunks = futures::stream::LocalBoxStream<'static, Result<String, GatewayError>>;

/// A chat reply: the session handle the gateway assigned plus the reply text,
/// delivered as one or more chunks.
pub struct ChatReply {
    pub session_id: String,
    pub chunks: ReplyChunks,
}

impl ChatReply {
    pub fn single(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::streamed(session_id, stream::iter([Ok::<_, GatewayError>(text)]))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn streamed<S>(session_id: impl Into<String>, chunks: S) -> Self
    where
        S: Stream<Item = Result<String, GatewayError>> + Send + 'static,
    {
        Self {
            session_id: session_id.into(),
            chunks: chunks.boxed(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn streamed<S>(session_id: impl Into<String>, chunks: S) -> Self
    where
        S: Stream<Item = Result<String, GatewayError>> + 'static,
    {
        Self {
            session_id: session_id.into(),
            chunks: chunks.boxed_local(),
        }
    }

    /// Drain the chunks into one string.
    pub async fn collect_text(mut self) -> Result<(String, String), GatewayError> {
        let mut text = String::new();
        while let Some(chunk) = self.chunks.next().await {
            text.push_str(&chunk?);
        }
        Ok((self.session_id, text))
    }
}

impl fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatReply")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait AiGateway: MaybeSendSync {
    async fn analyze_incident(&self, details: &IncidentDetails) -> Result<AnalysisResult, GatewayError>;

    async fn forecast_impact(&self, details: &IncidentDetails) -> Result<ImpactForecast, GatewayError>;

    async fn brief_team(&self, analysis: &AnalysisResult) -> Result<TeamBriefing, GatewayError>;

    async fn build_scenario(&self, details: &IncidentDetails) -> Result<TrainingScenario, GatewayError>;

    /// Send one chat turn. `session_id` is `None` on the first message.
    async fn chat(&self, session_id: Option<&str>, message: &str) -> Result<ChatReply, GatewayError>;
}
