use aegis_core::incident::{
    AnalysisResult, ChatRequest, ChatResponse, ImpactForecast, IncidentDetails, TeamBriefing,
    TrainingScenario,
};
use aegis_core::{AiGateway, GatewayError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

pub type SharedGateway = Arc<dyn AiGateway + Send + Sync>;

/// Error bodies are plain text so clients can show them as-is.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Gateway(GatewayError),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Gateway(err) => {
                tracing::error!(error = %err, "gateway call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

pub fn gateway_router(gateway: SharedGateway) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/incident-analysis", post(handle_incident_analysis))
        .route("/impact-forecast", post(handle_impact_forecast))
        .route("/team-briefing", post(handle_team_briefing))
        .route("/training-scenario", post(handle_training_scenario))
        .route("/preparedness-chat", post(handle_preparedness_chat))
        .with_state(gateway)
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Aegis Emergency Management API",
        "status": "running"
    }))
}

async fn handle_incident_analysis(
    State(gateway): State<SharedGateway>,
    Json(details): Json<IncidentDetails>,
) -> Result<Json<AnalysisResult>, ApiError> {
    Ok(Json(gateway.analyze_incident(&details).await?))
}

async fn handle_impact_forecast(
    State(gateway): State<SharedGateway>,
    Json(details): Json<IncidentDetails>,
) -> Result<Json<ImpactForecast>, ApiError> {
    Ok(Json(gateway.forecast_impact(&details).await?))
}

async fn handle_team_briefing(
    State(gateway): State<SharedGateway>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<TeamBriefing>, ApiError> {
    let analysis = parse_briefing_analysis(&payload)?;
    Ok(Json(gateway.brief_team(&analysis).await?))
}

async fn handle_training_scenario(
    State(gateway): State<SharedGateway>,
    Json(details): Json<IncidentDetails>,
) -> Result<Json<TrainingScenario>, ApiError> {
    Ok(Json(gateway.build_scenario(&details).await?))
}

async fn handle_preparedness_chat(
    State(gateway): State<SharedGateway>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".into()));
    }
    let reply = gateway
        .chat(request.session_id.as_deref(), &request.message)
        .await?;
    let (session_id, response) = reply.collect_text().await?;
    Ok(Json(ChatResponse {
        session_id,
        response,
    }))
}

fn parse_briefing_analysis(payload: &serde_json::Value) -> Result<AnalysisResult, ApiError> {
    let analysis = payload
        .get("analysis")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::BadRequest("Analysis data required".into()))?;
    serde_json::from_value(analysis.clone())
        .map_err(|e| ApiError::BadRequest(format!("invalid analysis: {e}")))
}
