use crate::incident::{AnalysisResult, IncidentDetails};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Awareness,
    Preparedness,
    Operations,
}

impl View {
    pub const ALL: [View; 3] = [View::Awareness, View::Operations, View::Preparedness];

    pub fn label(self) -> &'static str {
        match self {
            View::Awareness => "Situational Awareness",
            View::Preparedness => "Public Preparedness",
            View::Operations => "Operations Hub",
        }
    }
}

/// The submitted report and the analysis produced for it. Held together so
/// operations never sees one without the other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncidentPair {
    pub details: IncidentDetails,
    pub analysis: AnalysisResult,
}

/// Application state shared by the dashboard views.
///
/// The selected view can only be changed through [`Dashboard::request_view_change`],
/// which refuses the operations view while no analysis is held. The incident
/// pair itself is written only by the incident report flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dashboard {
    current_view: View,
    pair: Option<IncidentPair>,
    epoch: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_view(&self) -> View {
        self.current_view
    }

    /// Returns `true` when the view changed.
    pub fn request_view_change(&mut self, view: View) -> bool {
        if view == View::Operations && self.pair.is_none() {
            tracing::warn!("navigation to operations blocked: no analysis is available");
            return false;
        }
        self.current_view = view;
        true
    }

    pub fn has_analysis(&self) -> bool {
        self.pair.is_some()
    }

    pub fn incident_pair(&self) -> Option<&IncidentPair> {
        self.pair.as_ref()
    }

    /// Identifies the currently held pair; bumps on every store or clear.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn clear_analysis(&mut self) {
        self.pair = None;
        self.epoch += 1;
        if self.current_view == View::Operations {
            self.current_view = View::Awareness;
        }
    }

    pub(crate) fn store_analysis(&mut self, details: IncidentDetails, analysis: AnalysisResult) {
        self.pair = Some(IncidentPair { details, analysis });
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{IncidentType, Severity};

    fn pair() -> (IncidentDetails, AnalysisResult) {
        (
            IncidentDetails {
                incident_type: IncidentType::Other,
                location: "Harbor".into(),
                severity: Severity::Low,
                description: "Fuel spill".into(),
            },
            AnalysisResult {
                summary: "Minor spill".into(),
                recommended_actions: vec!["Deploy booms".into()],
                potential_risks: vec![],
                resource_suggestions: vec![],
            },
        )
    }

    #[test]
    fn starts_on_awareness() {
        assert_eq!(Dashboard::new().current_view(), View::Awareness);
    }

    #[test]
    fn operations_blocked_without_analysis() {
        let mut d = Dashboard::new();
        assert!(!d.request_view_change(View::Operations));
        assert_eq!(d.current_view(), View::Awareness);

        assert!(d.request_view_change(View::Preparedness));
        assert!(!d.request_view_change(View::Operations));
        assert_eq!(d.current_view(), View::Preparedness);
    }

    #[test]
    fn operations_reachable_once_pair_stored() {
        let mut d = Dashboard::new();
        let (details, analysis) = pair();
        d.store_analysis(details.clone(), analysis.clone());

        assert!(d.request_view_change(View::Operations));
        assert_eq!(d.current_view(), View::Operations);
        let held = d.incident_pair().expect("pair");
        assert_eq!(held.details, details);
        assert_eq!(held.analysis, analysis);
    }

    #[test]
    fn clearing_pair_leaves_operations_view() {
        let mut d = Dashboard::new();
        let (details, analysis) = pair();
        d.store_analysis(details, analysis);
        d.request_view_change(View::Operations);

        d.clear_analysis();
        assert!(!d.has_analysis());
        assert_eq!(d.current_view(), View::Awareness);
    }

    #[test]
    fn view_is_operations_only_while_pair_held() {
        // Interleave every navigation request with pair stores/clears.
        let mut d = Dashboard::new();
        let (details, analysis) = pair();
        let script: Vec<Box<dyn Fn(&mut Dashboard)>> = vec![
            Box::new(|d| {
                d.request_view_change(View::Operations);
            }),
            Box::new(move |d| d.store_analysis(details.clone(), analysis.clone())),
            Box::new(|d| {
                d.request_view_change(View::Operations);
            }),
            Box::new(|d| {
                d.request_view_change(View::Preparedness);
            }),
            Box::new(|d| d.clear_analysis()),
            Box::new(|d| {
                d.request_view_change(View::Operations);
            }),
        ];
        for step in script {
            step(&mut d);
            if d.current_view() == View::Operations {
                assert!(d.has_analysis());
            }
        }
    }

    #[test]
    fn epoch_advances_on_store_and_clear() {
        let mut d = Dashboard::new();
        let start = d.epoch();
        let (details, analysis) = pair();
        d.store_analysis(details, analysis);
        d.clear_analysis();
        assert_eq!(d.epoch(), start + 2);
    }
}
