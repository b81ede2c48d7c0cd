//! Recording gateway and fixtures for the flow tests.

use crate::error::GatewayError;
use crate::gateway::{AiGateway, ChatReply};
use crate::incident::{
    AnalysisResult, CommunityLifeline, ImpactForecast, IncidentDetails, IncidentType, Severity,
    TeamBriefing, TimelineInject, TrainingScenario,
};
use async_trait::async_trait;
use futures::stream;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Analyze(IncidentDetails),
    Forecast(IncidentDetails),
    Brief(AnalysisResult),
    Scenario(IncidentDetails),
    Chat {
        session_id: Option<String>,
        message: String,
    },
}

pub(crate) struct FakeGateway {
    pub calls: Mutex<Vec<Call>>,
    pub fail_analysis: Option<GatewayError>,
    pub fail_forecast: Option<GatewayError>,
    pub fail_briefing: Option<GatewayError>,
    pub fail_scenario: Option<GatewayError>,
    pub fail_chat: Option<GatewayError>,
    /// Chunks of every chat reply; an `Err` entry breaks the stream there.
    pub chat_chunks: Vec<Result<String, GatewayError>>,
    pub assigned_session: String,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_analysis: None,
            fail_forecast: None,
            fail_briefing: None,
            fail_scenario: None,
            fail_chat: None,
            chat_chunks: vec![Ok("Water, food and a radio.".into())],
            assigned_session: "abc".into(),
        }
    }
}

impl FakeGateway {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl AiGateway for FakeGateway {
    async fn analyze_incident(&self, details: &IncidentDetails) -> Result<AnalysisResult, GatewayError> {
        self.record(Call::Analyze(details.clone()));
        match &self.fail_analysis {
            Some(err) => Err(err.clone()),
            None => Ok(sample_analysis()),
        }
    }

    async fn forecast_impact(&self, details: &IncidentDetails) -> Result<ImpactForecast, GatewayError> {
        self.record(Call::Forecast(details.clone()));
        match &self.fail_forecast {
            Some(err) => Err(err.clone()),
            None => Ok(sample_forecast()),
        }
    }

    async fn brief_team(&self, analysis: &AnalysisResult) -> Result<TeamBriefing, GatewayError> {
        self.record(Call::Brief(analysis.clone()));
        match &self.fail_briefing {
            Some(err) => Err(err.clone()),
            None => Ok(sample_briefing()),
        }
    }

    async fn build_scenario(&self, details: &IncidentDetails) -> Result<TrainingScenario, GatewayError> {
        self.record(Call::Scenario(details.clone()));
        match &self.fail_scenario {
            Some(err) => Err(err.clone()),
            None => Ok(sample_scenario()),
        }
    }

    async fn chat(&self, session_id: Option<&str>, message: &str) -> Result<ChatReply, GatewayError> {
        self.record(Call::Chat {
            session_id: session_id.map(ToString::to_string),
            message: message.to_string(),
        });
        if let Some(err) = &self.fail_chat {
            return Err(err.clone());
        }
        let session = session_id.unwrap_or(&self.assigned_session).to_string();
        Ok(ChatReply::streamed(session, stream::iter(self.chat_chunks.clone())))
    }
}

pub(crate) fn sample_details() -> IncidentDetails {
    IncidentDetails {
        incident_type: IncidentType::NaturalDisaster,
        location: "Sector 7G".into(),
        severity: Severity::High,
        description: "Flooding".into(),
    }
}

pub(crate) fn sample_analysis() -> AnalysisResult {
    AnalysisResult {
        summary: "River flooding in Sector 7G".into(),
        recommended_actions: vec!["Evacuate low-lying blocks".into()],
        potential_risks: vec!["Power outage".into()],
        resource_suggestions: vec!["Swift-water rescue team".into()],
    }
}

pub(crate) fn sample_forecast() -> ImpactForecast {
    ImpactForecast {
        short_term_impacts: vec!["Road closures".into()],
        long_term_impacts: vec!["Water contamination".into()],
        community_lifelines: vec![CommunityLifeline {
            lifeline: "Energy".into(),
            impact: "Substation flooded".into(),
            mitigation: "Deploy generators".into(),
        }],
    }
}

pub(crate) fn sample_briefing() -> TeamBriefing {
    TeamBriefing {
        mission_statement: "Protect life in Sector 7G".into(),
        key_objectives: vec!["Complete evacuation".into()],
        known_risks: vec!["Fast-moving water".into()],
        comms_plan: "Command on channel 3".into(),
    }
}

pub(crate) fn sample_scenario() -> TrainingScenario {
    TrainingScenario {
        scenario_title: "Sector 7G flood drill".into(),
        learning_objectives: vec!["Shelter activation".into()],
        initial_briefing: "Heavy rain for 48 hours.".into(),
        timeline_injects: vec![TimelineInject {
            time: "T+01:00".into(),
            event: "Levee overtopped".into(),
            expected_action: "Order evacuation".into(),
        }],
    }
}
