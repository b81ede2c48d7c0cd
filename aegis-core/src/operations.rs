use crate::error::GatewayError;
use crate::gateway::AiGateway;
use crate::incident::{AnalysisResult, ImpactForecast, IncidentDetails, TeamBriefing, TrainingScenario};
use crate::navigation::Dashboard;

/// The three operational artifacts, only ever held all together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationsBundle {
    pub forecast: ImpactForecast,
    pub briefing: TeamBriefing,
    pub scenario: TrainingScenario,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OperationsState {
    /// No analysis pair yet; render the placeholder.
    #[default]
    Unavailable,
    Loading,
    Ready(OperationsBundle),
    Failed(String),
}

/// Request the forecast, briefing and scenario concurrently.
///
/// Fails fast: the first error wins and the remaining requests are dropped,
/// so no partial bundle ever escapes.
pub async fn fetch_operations<G>(
    gateway: &G,
    details: &IncidentDetails,
    analysis: &AnalysisResult,
) -> Result<OperationsBundle, GatewayError>
where
    G: AiGateway + ?Sized,
{
    let (forecast, briefing, scenario) = futures::try_join!(
        gateway.forecast_impact(details),
        gateway.brief_team(analysis),
        gateway.build_scenario(details),
    )?;
    Ok(OperationsBundle {
        forecast,
        briefing,
        scenario,
    })
}

/// A fetch cycle issued for one incident pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationsTicket {
    epoch: u64,
    pub details: IncidentDetails,
    pub analysis: AnalysisResult,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationsHub {
    state: OperationsState,
    loaded_epoch: Option<u64>,
}

impl OperationsHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OperationsState {
        &self.state
    }

    /// True when the dashboard's pair differs from the one last fetched for.
    pub fn needs_refresh(&self, dashboard: &Dashboard) -> bool {
        self.loaded_epoch != Some(dashboard.epoch())
    }

    /// Start a fetch cycle for the dashboard's current pair. Prior results are
    /// dropped. Returns `None` and shows the placeholder when no pair is held.
    pub fn begin(&mut self, dashboard: &Dashboard) -> Option<OperationsTicket> {
        self.loaded_epoch = Some(dashboard.epoch());
        let Some(pair) = dashboard.incident_pair() else {
            self.state = OperationsState::Unavailable;
            return None;
        };
        self.state = OperationsState::Loading;
        tracing::debug!(epoch = dashboard.epoch(), "fetching operational data");
        Some(OperationsTicket {
            epoch: dashboard.epoch(),
            details: pair.details.clone(),
            analysis: pair.analysis.clone(),
        })
    }

    /// Apply a fetch outcome. Returns `false` when the pair changed while the
    /// requests were in flight and the outcome was dropped.
    pub fn finish(
        &mut self,
        dashboard: &Dashboard,
        ticket: OperationsTicket,
        outcome: Result<OperationsBundle, GatewayError>,
    ) -> bool {
        if ticket.epoch != dashboard.epoch() || self.loaded_epoch != Some(ticket.epoch) {
            tracing::debug!(epoch = ticket.epoch, "discarding operational data for a stale pair");
            return false;
        }
        self.state = match outcome {
            Ok(bundle) => OperationsState::Ready(bundle),
            Err(err) => {
                tracing::error!(error = %err, "failed to load operational data");
                OperationsState::Failed(err.to_string())
            }
        };
        true
    }

    pub async fn refresh<G>(&mut self, dashboard: &Dashboard, gateway: &G)
    where
        G: AiGateway + ?Sized,
    {
        let Some(ticket) = self.begin(dashboard) else {
            return;
        };
        let outcome = fetch_operations(gateway, &ticket.details, &ticket.analysis).await;
        self.finish(dashboard, ticket, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::IncidentReport;
    use crate::testing::{
        sample_analysis, sample_briefing, sample_details, sample_forecast, sample_scenario, Call,
        FakeGateway,
    };

    async fn analyzed_dashboard() -> Dashboard {
        let mut report = IncidentReport::from_details(sample_details());
        let mut dashboard = Dashboard::new();
        report
            .submit(&mut dashboard, &FakeGateway::default())
            .await
            .expect("analysis");
        dashboard
    }

    #[tokio::test]
    async fn placeholder_without_pair_issues_no_requests() {
        let gateway = FakeGateway::default();
        let mut hub = OperationsHub::new();
        hub.refresh(&Dashboard::new(), &gateway).await;

        assert_eq!(hub.state(), &OperationsState::Unavailable);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn fans_out_three_requests_with_matching_payloads() {
        let dashboard = analyzed_dashboard().await;
        let gateway = FakeGateway::default();
        let mut hub = OperationsHub::new();
        hub.refresh(&dashboard, &gateway).await;

        let mut calls = gateway.calls();
        calls.sort_by_key(|c| format!("{c:?}"));
        let mut expected = vec![
            Call::Forecast(sample_details()),
            Call::Brief(sample_analysis()),
            Call::Scenario(sample_details()),
        ];
        expected.sort_by_key(|c| format!("{c:?}"));
        assert_eq!(calls, expected);

        assert_eq!(
            hub.state(),
            &OperationsState::Ready(OperationsBundle {
                forecast: sample_forecast(),
                briefing: sample_briefing(),
                scenario: sample_scenario(),
            })
        );
        assert!(!hub.needs_refresh(&dashboard));
    }

    #[tokio::test]
    async fn any_failure_discards_every_result() {
        let dashboard = analyzed_dashboard().await;
        let failures = [
            ("forecast", 0usize),
            ("briefing", 1),
            ("scenario", 2),
        ];
        for (name, which) in failures {
            let mut gateway = FakeGateway::default();
            let err = GatewayError::Provider(format!("{name} unavailable"));
            match which {
                0 => gateway.fail_forecast = Some(err.clone()),
                1 => gateway.fail_briefing = Some(err.clone()),
                _ => gateway.fail_scenario = Some(err.clone()),
            }
            let mut hub = OperationsHub::new();
            hub.refresh(&dashboard, &gateway).await;
            assert_eq!(hub.state(), &OperationsState::Failed(err.to_string()));
        }
    }

    #[tokio::test]
    async fn new_pair_requires_refresh_and_drops_stale_outcome() {
        let mut dashboard = analyzed_dashboard().await;
        let mut hub = OperationsHub::new();
        let ticket = hub.begin(&dashboard).expect("ticket");
        assert_eq!(hub.state(), &OperationsState::Loading);

        // A new submission lands while the first fetch is still in flight.
        dashboard.store_analysis(sample_details(), sample_analysis());
        assert!(hub.needs_refresh(&dashboard));

        let bundle = OperationsBundle {
            forecast: sample_forecast(),
            briefing: sample_briefing(),
            scenario: sample_scenario(),
        };
        assert!(!hub.finish(&dashboard, ticket, Ok(bundle)));
        assert_eq!(hub.state(), &OperationsState::Loading);
    }

    #[tokio::test]
    async fn refetch_replaces_previous_results() {
        let dashboard = analyzed_dashboard().await;
        let mut hub = OperationsHub::new();
        hub.refresh(&dashboard, &FakeGateway::default()).await;
        assert!(matches!(hub.state(), OperationsState::Ready(_)));

        let ticket = hub.begin(&dashboard).expect("ticket");
        assert_eq!(hub.state(), &OperationsState::Loading);
        hub.finish(&dashboard, ticket, Err(GatewayError::Transport("offline".into())));
        assert_eq!(hub.state(), &OperationsState::Failed("offline".into()));
    }
}
