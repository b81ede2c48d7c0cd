//! Direct model-provider binding of the AI Gateway.

use crate::error::GatewayError;
use crate::gateway::{AiGateway, ChatReply, ReplyChunks};
use crate::incident::{AnalysisResult, ImpactForecast, IncidentDetails, TeamBriefing, TrainingScenario};
use async_trait::async_trait;
use futures::lock::{Mutex as TurnLock, OwnedMutexGuard};
use futures::stream::{self, StreamExt};
use regex::Regex;
use rig::agent::{MultiTurnStreamItem, StreamingError, StreamingResult};
use rig::client::completion::CompletionClient;
use rig::completion::{Message, Prompt};
use rig::providers::{gemini, openai};
use rig::streaming::{StreamedAssistantContent, StreamingChat};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

const STRUCTURED_PREAMBLE: &str =
    "You are an emergency management analyst. Respond ONLY with valid JSON matching the given schema.";

const PREPAREDNESS_INSTRUCTION: &str = "You are an expert in emergency preparedness and public safety. \
Your role is to provide clear, concise, and actionable advice to the general public. \
Answer questions about creating emergency kits, evacuation plans, and safety procedures for various disasters. \
Be calm, reassuring, and authoritative. Use lists and simple language.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub chat_model: String,
    pub api_key_env: String,
    pub temperature: f64,
    pub chat_temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_provider("gemini")
    }
}

impl LlmConfig {
    pub fn for_provider(provider: &str) -> Self {
        let provider = provider.to_lowercase();
        let (model, chat_model, api_key_env) = match provider.as_str() {
            "openai" => ("gpt-4o", "gpt-4o-mini", "OPENAI_API_KEY"),
            _ => ("gemini-2.5-pro", "gemini-2.5-flash", "GEMINI_API_KEY"),
        };
        Self {
            provider,
            model: model.into(),
            chat_model: chat_model.into(),
            api_key_env: api_key_env.into(),
            temperature: 0.3,
            chat_temperature: 0.7,
        }
    }

    /// Read the configuration from `LLM_*` variables. `None` when the API key
    /// variable is not set.
    pub fn from_env() -> Option<Self> {
        let provider = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".into());
        let defaults = Self::for_provider(&provider);
        let api_key_env = std::env::var("LLM_API_KEY_ENV").unwrap_or(defaults.api_key_env);
        if std::env::var(&api_key_env).is_err() {
            return None;
        }

        Some(Self {
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            chat_model: std::env::var("LLM_CHAT_MODEL").unwrap_or(defaults.chat_model),
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(defaults.temperature),
            provider: defaults.provider,
            api_key_env,
            chat_temperature: defaults.chat_temperature,
        })
    }
}

enum Backend {
    OpenAi(openai::Client),
    Gemini(gemini::Client),
}

impl Backend {
    fn connect(config: &LlmConfig) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| GatewayError::Config(format!("missing env var {}", config.api_key_env)))?;
        match config.provider.as_str() {
            "openai" => openai::Client::new(&api_key)
                .map(Backend::OpenAi)
                .map_err(|e| GatewayError::Config(format!("openai client error: {e}"))),
            "gemini" => gemini::Client::new(&api_key)
                .map(Backend::Gemini)
                .map_err(|e| GatewayError::Config(format!("gemini client error: {e}"))),
            other => Err(GatewayError::Config(format!("unsupported llm provider '{other}'"))),
        }
    }

    async fn prompt(&self, config: &LlmConfig, prompt: &str) -> Result<String, GatewayError> {
        let out = match self {
            Backend::OpenAi(client) => {
                let agent = client
                    .agent(&config.model)
                    .preamble(STRUCTURED_PREAMBLE)
                    .temperature(config.temperature)
                    .build();
                agent.prompt(prompt).await
            }
            Backend::Gemini(client) => {
                let agent = client
                    .agent(&config.model)
                    .preamble(STRUCTURED_PREAMBLE)
                    .temperature(config.temperature)
                    .build();
                agent.prompt(prompt).await
            }
        };
        out.map_err(|e| GatewayError::Provider(format!("llm prompt failed: {e}")))
    }

    async fn stream_chat(&self, config: &LlmConfig, message: &str, history: Vec<Message>) -> ReplyChunks {
        match self {
            Backend::OpenAi(client) => {
                let agent = client
                    .agent(&config.chat_model)
                    .preamble(PREPAREDNESS_INSTRUCTION)
                    .temperature(config.chat_temperature)
                    .build();
                text_chunks(agent.stream_chat(message.to_string(), history).await)
            }
            Backend::Gemini(client) => {
                let agent = client
                    .agent(&config.chat_model)
                    .preamble(PREPAREDNESS_INSTRUCTION)
                    .temperature(config.chat_temperature)
                    .build();
                text_chunks(agent.stream_chat(message.to_string(), history).await)
            }
        }
    }
}

/// Keep only the assistant's text deltas from a rig chat stream.
fn text_chunks<R>(stream: StreamingResult<R>) -> ReplyChunks
where
    R: Send + 'static,
{
    stream
        .filter_map(|item| async move { assistant_text(item) })
        .boxed()
}

fn assistant_text<R>(
    item: Result<MultiTurnStreamItem<R>, StreamingError>,
) -> Option<Result<String, GatewayError>> {
    match item {
        Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(text))) => {
            Some(Ok(text.text))
        }
        Ok(_) => None,
        Err(e) => Some(Err(GatewayError::Provider(format!("Error in chat: {e}")))),
    }
}

const MAX_SESSIONS: usize = 256;
const MAX_HISTORY_MESSAGES: usize = 40;

struct Session {
    history: Vec<Message>,
    turn: Arc<TurnLock<()>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            turn: Arc::new(TurnLock::new(())),
        }
    }
}

/// Chat histories keyed by session handle.
///
/// At most `MAX_SESSIONS` are kept; the least recently used is evicted first.
/// Each history keeps its last `MAX_HISTORY_MESSAGES` messages. Turns on one
/// session run one at a time, so every turn sees the previous turn's answer.
#[derive(Default)]
struct SessionStore {
    sessions: HashMap<String, Session>,
    recency: VecDeque<String>,
}

impl SessionStore {
    fn touch(&mut self, session_id: &str) -> &mut Session {
        if let Some(pos) = self.recency.iter().position(|id| id == session_id) {
            self.recency.remove(pos);
        }
        self.recency.push_back(session_id.to_string());
        while self.recency.len() > MAX_SESSIONS {
            if let Some(evicted) = self.recency.pop_front() {
                tracing::debug!(session_id = %evicted, "evicting chat session");
                self.sessions.remove(&evicted);
            }
        }
        self.sessions.entry(session_id.to_string()).or_default()
    }

    fn turn_lock(&mut self, session_id: &str) -> Arc<TurnLock<()>> {
        Arc::clone(&self.touch(session_id).turn)
    }

    fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    fn commit(&mut self, session_id: &str, message: &str, reply: &str) {
        let history = &mut self.touch(session_id).history;
        history.push(Message::user(message));
        history.push(Message::assistant(reply));
        let excess = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
        history.drain(..excess);
    }
}

type SharedSessions = Arc<Mutex<SessionStore>>;

/// A turn whose history is written once its reply stream ends cleanly.
struct PendingTurn {
    sessions: SharedSessions,
    session_id: String,
    message: String,
    _turn: OwnedMutexGuard<()>,
}

impl PendingTurn {
    fn commit(self, reply: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commit(&self.session_id, &self.message, reply);
    }
}

/// Pass the chunks through, committing the turn when the stream is exhausted
/// without an error. An error or an early drop leaves history untouched.
fn commit_on_success(chunks: ReplyChunks, turn: PendingTurn) -> ReplyChunks {
    stream::unfold(
        (chunks, String::new(), Some(turn)),
        |(mut chunks, mut reply, mut turn)| async move {
            match chunks.next().await {
                Some(Ok(text)) => {
                    reply.push_str(&text);
                    Some((Ok(text), (chunks, reply, turn)))
                }
                Some(Err(err)) => {
                    turn = None;
                    Some((Err(err), (chunks, reply, turn)))
                }
                None => {
                    if let Some(turn) = turn.take() {
                        turn.commit(&reply);
                    }
                    None
                }
            }
        },
    )
    .boxed()
}

/// Talks to the model provider directly. Chat history is kept in memory per
/// session handle.
pub struct LlmGateway {
    backend: Backend,
    config: LlmConfig,
    sessions: SharedSessions,
}

impl LlmGateway {
    pub fn new(config: LlmConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            backend: Backend::connect(&config)?,
            config,
            sessions: SharedSessions::default(),
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn generate<T>(&self, prompt: String) -> Result<T, GatewayError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let prompt = format!("{prompt}\n\nSchema:\n{}", schema_text::<T>()?);
        let raw = self.backend.prompt(&self.config, &prompt).await?;
        decode_model_json(&raw).inspect_err(|e| {
            tracing::error!(model = %self.config.model, error = %e, "model returned malformed json");
        })
    }
}

#[async_trait]
impl AiGateway for LlmGateway {
    async fn analyze_incident(&self, details: &IncidentDetails) -> Result<AnalysisResult, GatewayError> {
        self.generate(analysis_prompt(details)).await
    }

    async fn forecast_impact(&self, details: &IncidentDetails) -> Result<ImpactForecast, GatewayError> {
        self.generate(forecast_prompt(details)).await
    }

    async fn brief_team(&self, analysis: &AnalysisResult) -> Result<TeamBriefing, GatewayError> {
        self.generate(briefing_prompt(analysis)?).await
    }

    async fn build_scenario(&self, details: &IncidentDetails) -> Result<TrainingScenario, GatewayError> {
        self.generate(scenario_prompt(details)).await
    }

    async fn chat(&self, session_id: Option<&str>, message: &str) -> Result<ChatReply, GatewayError> {
        let session_id = session_id
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));
        let turn_lock = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .turn_lock(&session_id);
        let turn = turn_lock.lock_owned().await;
        let history = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history(&session_id);

        let chunks = self.backend.stream_chat(&self.config, message, history).await;
        let turn = PendingTurn {
            sessions: Arc::clone(&self.sessions),
            session_id: session_id.clone(),
            message: message.to_string(),
            _turn: turn,
        };
        Ok(ChatReply::streamed(session_id, commit_on_success(chunks, turn)))
    }
}

fn schema_text<T: JsonSchema>() -> Result<String, GatewayError> {
    serde_json::to_string_pretty(&schemars::schema_for!(T))
        .map_err(|e| GatewayError::Config(format!("schema generation failed: {e}")))
}

fn incident_fields(details: &IncidentDetails) -> String {
    format!(
        "Incident Type: {}\nLocation: {}\nSeverity: {}\nDescription: {}",
        details.incident_type, details.location, details.severity, details.description
    )
}

fn analysis_prompt(details: &IncidentDetails) -> String {
    format!(
        "Analyze the following emergency incident report and provide a structured response.\n\n{}",
        incident_fields(details)
    )
}

fn forecast_prompt(details: &IncidentDetails) -> String {
    format!(
        "Generate a detailed impact forecast for this incident:\n\n{}\n\n\
         Focus on short-term, long-term, and community lifeline impacts.",
        incident_fields(details)
    )
}

fn briefing_prompt(analysis: &AnalysisResult) -> Result<String, GatewayError> {
    Ok(format!(
        "Based on the following incident analysis, create a standardized operational team briefing (ICS style).\n\n\
         Analysis: {}\n\n\
         The briefing must be clear, concise, and actionable for first responders.",
        serde_json::to_string(analysis)?
    ))
}

fn scenario_prompt(details: &IncidentDetails) -> String {
    format!(
        "Create a tabletop training scenario based on this incident:\n\n\
         Incident Type: {}\nLocation: {}\nDescription: {}\n\n\
         Include learning objectives and a timeline of events (injects) to test decision-making.",
        details.incident_type, details.location, details.description
    )
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json)?").expect("fence regex"));
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//.*$").expect("comment regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex"));

/// Strip what models like to wrap JSON in: code fences, whole-line `//`
/// comments and trailing commas.
pub fn clean_model_json(raw: &str) -> String {
    let text = FENCE.replace_all(raw, "");
    let text = LINE_COMMENT.replace_all(&text, "");
    let text = TRAILING_COMMA.replace_all(&text, "$1");
    text.trim().to_string()
}

pub fn decode_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, GatewayError> {
    serde_json::from_str(&clean_model_json(raw)).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{IncidentType, Severity};
    use rig::agent::FinalResponse;
    use rig::message::Text;

    fn text_item(text: &str) -> Result<MultiTurnStreamItem<()>, StreamingError> {
        Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(
            Text { text: text.into() },
        )))
    }

    fn shared_sessions() -> SharedSessions {
        SharedSessions::default()
    }

    async fn pending_turn(sessions: &SharedSessions, session_id: &str, message: &str) -> PendingTurn {
        let lock = sessions.lock().expect("sessions").turn_lock(session_id);
        PendingTurn {
            sessions: Arc::clone(sessions),
            session_id: session_id.into(),
            message: message.into(),
            _turn: lock.lock_owned().await,
        }
    }

    #[tokio::test]
    async fn streamed_reply_arrives_in_chunks_and_commits_history() {
        let items = vec![
            text_item("Water, "),
            text_item("food, "),
            Ok(MultiTurnStreamItem::FinalResponse(FinalResponse::empty())),
            text_item("a flashlight."),
        ];
        let chunks = stream::iter(items).filter_map(|item| async move { assistant_text(item) }).boxed();
        let sessions = shared_sessions();
        let turn = pending_turn(&sessions, "session-1", "Kit?").await;
        let reply = ChatReply::streamed("session-1", commit_on_success(chunks, turn));

        let received: Vec<String> = reply
            .chunks
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;
        assert_eq!(received, vec!["Water, ", "food, ", "a flashlight."]);

        let history = sessions.lock().expect("sessions").history("session-1");
        assert_eq!(
            history,
            vec![
                Message::user("Kit?"),
                Message::assistant("Water, food, a flashlight.")
            ]
        );
    }

    #[tokio::test]
    async fn failed_stream_leaves_history_untouched() {
        let chunks = stream::iter(vec![
            Ok("partial".to_string()),
            Err(GatewayError::Provider("Error in chat: overloaded".into())),
        ])
        .boxed();
        let sessions = shared_sessions();
        let turn = pending_turn(&sessions, "session-1", "Kit?").await;

        let reply = ChatReply::streamed("session-1", commit_on_success(chunks, turn));
        let err = reply.collect_text().await.expect_err("stream fails");
        assert_eq!(err, GatewayError::Provider("Error in chat: overloaded".into()));
        assert!(sessions.lock().expect("sessions").history("session-1").is_empty());
    }

    #[tokio::test]
    async fn turns_on_one_session_run_one_at_a_time() {
        let sessions = shared_sessions();
        let first = pending_turn(&sessions, "session-1", "first").await;

        let lock = sessions.lock().expect("sessions").turn_lock("session-1");
        assert!(lock.try_lock().is_none());
        let other = sessions.lock().expect("sessions").turn_lock("session-2");
        assert!(other.try_lock().is_some());

        first.commit("one");
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn history_keeps_only_recent_messages() {
        let mut store = SessionStore::default();
        for i in 0..MAX_HISTORY_MESSAGES {
            store.commit("s", &format!("q{i}"), &format!("a{i}"));
        }
        let history = store.history("s");
        assert_eq!(history.len(), MAX_HISTORY_MESSAGES);
        assert_eq!(history[0], Message::user(format!("q{}", MAX_HISTORY_MESSAGES / 2)));
    }

    #[test]
    fn least_recently_used_session_is_evicted() {
        let mut store = SessionStore::default();
        for i in 0..MAX_SESSIONS {
            store.commit(&format!("s{i}"), "q", "a");
        }
        store.commit("s0", "q", "a");
        store.commit("overflow", "q", "a");

        assert_eq!(store.sessions.len(), MAX_SESSIONS);
        assert_eq!(store.history("s0").len(), 4);
        assert!(store.history("s1").is_empty());
    }

    #[test]
    fn decodes_fenced_json_with_comments_and_trailing_commas() {
        let raw = r#"```json
        {
          // model commentary
          "summary": "Flooding in Sector 7G",
          "recommendedActions": ["Evacuate", "Open shelters",],
          "potentialRisks": ["Power loss"],
          "resourceSuggestions": ["Boats"],
        }
        ```"#;
        let parsed: AnalysisResult = decode_model_json(raw).expect("decode");
        assert_eq!(parsed.recommended_actions, vec!["Evacuate", "Open shelters"]);
    }

    #[test]
    fn keeps_urls_inside_strings() {
        let raw = r#"{"missionStatement": "See https://ready.gov", "keyObjectives": [], "knownRisks": [], "commsPlan": "ch 3"}"#;
        let parsed: TeamBriefing = decode_model_json(raw).expect("decode");
        assert_eq!(parsed.mission_statement, "See https://ready.gov");
    }

    #[test]
    fn malformed_output_is_a_decode_error() {
        let err = decode_model_json::<ImpactForecast>("I cannot help with that.")
            .expect_err("should fail");
        assert!(matches!(err, GatewayError::Decode(_)));
        assert!(err.to_string().starts_with("Failed to get a valid response from the AI"));
    }

    #[test]
    fn prompts_embed_incident_fields() {
        let details = IncidentDetails {
            incident_type: IncidentType::TechnologicalAccident,
            location: "Plant 4".into(),
            severity: Severity::Severe,
            description: "Chlorine leak".into(),
        };
        let forecast = forecast_prompt(&details);
        assert!(forecast.contains("Incident Type: Technological Accident"));
        assert!(forecast.contains("Severity: Severe"));

        // The scenario template leaves severity out.
        let scenario = scenario_prompt(&details);
        assert!(scenario.contains("Location: Plant 4"));
        assert!(!scenario.contains("Severity"));
    }

    #[test]
    fn schema_names_camel_case_fields() {
        let schema = schema_text::<TrainingScenario>().expect("schema");
        assert!(schema.contains("timelineInjects"));
        assert!(schema.contains("expectedAction"));
    }

    #[test]
    fn provider_defaults_follow_provider() {
        let openai = LlmConfig::for_provider("OpenAI");
        assert_eq!(openai.provider, "openai");
        assert_eq!(openai.api_key_env, "OPENAI_API_KEY");
        let gemini = LlmConfig::default();
        assert_eq!(gemini.chat_model, "gemini-2.5-flash");
        assert_eq!(gemini.temperature, 0.3);
        assert_eq!(gemini.chat_temperature, 0.7);
    }
}
