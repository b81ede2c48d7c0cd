use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum IncidentType {
    #[default]
    #[serde(rename = "Natural Disaster")]
    NaturalDisaster,
    #[serde(rename = "Technological Accident")]
    TechnologicalAccident,
    Terrorism,
    #[serde(rename = "Public Health Emergency")]
    PublicHealthEmergency,
    Other,
}

impl IncidentType {
    pub const ALL: [IncidentType; 5] = [
        IncidentType::NaturalDisaster,
        IncidentType::TechnologicalAccident,
        IncidentType::Terrorism,
        IncidentType::PublicHealthEmergency,
        IncidentType::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IncidentType::NaturalDisaster => "Natural Disaster",
            IncidentType::TechnologicalAccident => "Technological Accident",
            IncidentType::Terrorism => "Terrorism",
            IncidentType::PublicHealthEmergency => "Public Health Emergency",
            IncidentType::Other => "Other",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IncidentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncidentType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown incident type '{s}'"))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Severity {
    Low,
    Moderate,
    #[default]
    High,
    Severe,
    Catastrophic,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Low,
        Severity::Moderate,
        Severity::High,
        Severity::Severe,
        Severity::Catastrophic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Severe => "Severe",
            Severity::Catastrophic => "Catastrophic",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid severity '{s}'"))
    }
}

/// An incident report as submitted by the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentDetails {
    pub incident_type: IncidentType,
    pub location: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// A brief, concise summary of the incident.
    pub summary: String,
    /// Immediate, actionable steps for emergency responders.
    pub recommended_actions: Vec<String>,
    /// Potential secondary risks or cascading effects.
    pub potential_risks: Vec<String>,
    /// Suggested resources (personnel, equipment) to allocate.
    pub resource_suggestions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactForecast {
    /// Immediate potential impacts within the next 0-12 hours.
    pub short_term_impacts: Vec<String>,
    /// Potential cascading impacts over the next 12-72 hours.
    pub long_term_impacts: Vec<String>,
    pub community_lifelines: Vec<CommunityLifeline>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommunityLifeline {
    /// The community lifeline affected (e.g. Energy, Water, Communications, Transportation).
    pub lifeline: String,
    /// Specific impact on this lifeline.
    pub impact: String,
    /// A brief suggestion to mitigate this impact.
    pub mitigation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamBriefing {
    /// A clear, concise mission statement for the response team.
    pub mission_statement: String,
    /// 3-5 primary objectives for the initial operational period.
    pub key_objectives: Vec<String>,
    /// Key risks for responder safety and mission success.
    pub known_risks: Vec<String>,
    /// A brief communications plan, including key frequencies or channels.
    pub comms_plan: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingScenario {
    /// A descriptive title for the training scenario.
    pub scenario_title: String,
    /// Specific learning objectives for the training participants.
    pub learning_objectives: Vec<String>,
    /// The initial situation briefing to be read to participants.
    pub initial_briefing: String,
    pub timeline_injects: Vec<TimelineInject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInject {
    /// Simulation time for the event (e.g. T+01:00).
    pub time: String,
    /// The event or information to inject into the scenario.
    pub event: String,
    /// The expected action or decision from the participants.
    pub expected_action: String,
}

/// Body of `POST /team-briefing`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamBriefingRequest {
    pub analysis: AnalysisResult,
}

/// Body of `POST /preparedness-chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
}
