use crate::error::{GatewayError, ReportError, ValidationError};
use crate::gateway::AiGateway;
use crate::incident::{AnalysisResult, IncidentDetails, IncidentType, Severity};
use crate::navigation::{Dashboard, View};

/// Incident report form state: the operator's inputs plus the outcome of the
/// latest analysis request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncidentReport {
    pub incident_type: IncidentType,
    pub location: String,
    pub severity: Severity,
    pub description: String,
    analysis: Option<AnalysisResult>,
    loading: bool,
    error: Option<String>,
    last_request: u64,
    in_flight: Option<u64>,
}

/// An issued analysis request. Carries the exact details that were sent so
/// the stored pair always matches what the gateway analyzed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisTicket {
    request_id: u64,
    details: IncidentDetails,
}

impl AnalysisTicket {
    pub fn details(&self) -> &IncidentDetails {
        &self.details
    }
}

impl IncidentReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A form pre-filled with `details` and no analysis yet.
    pub fn from_details(details: IncidentDetails) -> Self {
        Self {
            incident_type: details.incident_type,
            location: details.location,
            severity: details.severity,
            description: details.description,
            ..Self::default()
        }
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn details(&self) -> Result<IncidentDetails, ValidationError> {
        if self.location.trim().is_empty() || self.description.trim().is_empty() {
            return Err(ValidationError::MissingRequiredFields);
        }
        Ok(IncidentDetails {
            incident_type: self.incident_type,
            location: self.location.clone(),
            severity: self.severity,
            description: self.description.clone(),
        })
    }

    /// Validate and start an analysis request.
    ///
    /// On a validation error nothing but the form's error text changes. On
    /// success the dashboard's pair is cleared before the request is issued.
    pub fn begin_submit(&mut self, dashboard: &mut Dashboard) -> Result<AnalysisTicket, ValidationError> {
        let details = match self.details() {
            Ok(details) => details,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        self.loading = true;
        self.error = None;
        self.analysis = None;
        dashboard.clear_analysis();

        self.last_request += 1;
        self.in_flight = Some(self.last_request);
        tracing::debug!(
            request_id = self.last_request,
            incident_type = %details.incident_type,
            "issuing incident analysis"
        );
        Ok(AnalysisTicket {
            request_id: self.last_request,
            details,
        })
    }

    /// Apply the gateway's answer for `ticket`. Returns `false` when the
    /// ticket was superseded by a later submit and the outcome was dropped.
    pub fn finish_submit(
        &mut self,
        dashboard: &mut Dashboard,
        ticket: AnalysisTicket,
        outcome: Result<AnalysisResult, GatewayError>,
    ) -> bool {
        if self.in_flight != Some(ticket.request_id) {
            tracing::debug!(request_id = ticket.request_id, "discarding superseded analysis");
            return false;
        }
        self.in_flight = None;
        self.loading = false;

        match outcome {
            Ok(analysis) => {
                dashboard.store_analysis(ticket.details, analysis.clone());
                self.analysis = Some(analysis);
            }
            Err(err) => {
                tracing::error!(error = %err, "incident analysis failed");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub async fn submit<G>(&mut self, dashboard: &mut Dashboard, gateway: &G) -> Result<(), ReportError>
    where
        G: AiGateway + ?Sized,
    {
        let ticket = self.begin_submit(dashboard)?;
        let outcome = gateway.analyze_incident(ticket.details()).await;
        let result = match &outcome {
            Ok(_) => Ok(()),
            Err(err) => Err(ReportError::Gateway(err.clone())),
        };
        self.finish_submit(dashboard, ticket, outcome);
        result
    }

    /// The "Go to Operations Hub" control.
    pub fn open_operations(&self, dashboard: &mut Dashboard) -> bool {
        dashboard.request_view_change(View::Operations)
    }
}
