use crate::bridge::{self, LocalStorageStore, SharedGateway};
use aegis_core::chat::{run_turn, ChatSession, Sender, SUGGESTED_QUESTIONS};
use aegis_core::incident::{IncidentType, Severity};
use aegis_core::operations::{fetch_operations, OperationsHub, OperationsState};
use aegis_core::report::IncidentReport;
use aegis_core::theme::{load_theme, save_theme, ThemeMode};
use aegis_core::{AiGateway, Dashboard, View};
use leptos::*;
use wasm_bindgen_futures::spawn_local;

fn wants_dark(mode: ThemeMode, system_dark: bool) -> bool {
    mode.effective(system_dark) == ThemeMode::Dark
}

fn bullet_list(items: Vec<String>) -> impl IntoView {
    view! {
      <ul>
        {items.into_iter().map(|item| view! { <li>{item}</li> }).collect_view()}
      </ul>
    }
}

#[component]
pub fn App() -> impl IntoView {
    let gateway = store_value(bridge::gateway());
    let dashboard = create_rw_signal(Dashboard::new());
    let report = create_rw_signal(IncidentReport::new());
    let hub = create_rw_signal(OperationsHub::new());
    let chat = create_rw_signal(ChatSession::new());

    let store = store_value(LocalStorageStore::open());
    let theme = create_rw_signal(store.with_value(load_theme));
    let system_dark = create_rw_signal(bridge::system_prefers_dark());
    bridge::watch_system_scheme(move |dark| system_dark.set(dark));
    create_effect(move |_| {
        let mode = theme.get();
        store.update_value(|s| save_theme(s, mode));
    });
    create_effect(move |_| bridge::apply_dark_class(wants_dark(theme.get(), system_dark.get())));

    // Fetch operational data whenever the operations view shows a pair it
    // has not loaded yet.
    create_effect(move |_| {
        let current = dashboard.get();
        if current.current_view() != View::Operations || !hub.with_untracked(|h| h.needs_refresh(&current)) {
            return;
        }
        let mut next = hub.get_untracked();
        let ticket = next.begin(&current);
        hub.set(next);
        let Some(ticket) = ticket else {
            return;
        };
        let gateway: SharedGateway = gateway.get_value();
        spawn_local(async move {
            let outcome = fetch_operations(&*gateway, &ticket.details, &ticket.analysis).await;
            let current = dashboard.get_untracked();
            hub.update(|h| {
                h.finish(&current, ticket, outcome);
            });
        });
    });

    view! {
      <div class="layout">
        <Sidebar dashboard=dashboard theme=theme/>
        <main class="panel">
          {move || match dashboard.with(Dashboard::current_view) {
            View::Awareness => view! { <AwarenessView dashboard=dashboard report=report gateway=gateway/> }.into_view(),
            View::Operations => view! { <OperationsView hub=hub/> }.into_view(),
            View::Preparedness => view! { <PreparednessView chat=chat gateway=gateway/> }.into_view(),
          }}
        </main>
      </div>
    }
}

#[component]
fn Sidebar(dashboard: RwSignal<Dashboard>, theme: RwSignal<ThemeMode>) -> impl IntoView {
    view! {
      <nav class="sidebar">
        <h1>"Aegis"</h1>
        {View::ALL
          .into_iter()
          .map(|target| {
            let locked = move || target == View::Operations && !dashboard.with(Dashboard::has_analysis);
            view! {
              <button
                class:active=move || dashboard.with(|d| d.current_view() == target)
                disabled=locked
                title=move || if locked() { "Analyze an incident first" } else { "" }
                on:click=move |_| dashboard.update(|d| {
                  d.request_view_change(target);
                })
              >
                {target.label()}
              </button>
            }
          })
          .collect_view()}
        <button class="theme" on:click=move |_| theme.update(|t| *t = t.toggle())>
          {move || format!("Theme: {}", theme.get().as_str())}
        </button>
      </nav>
    }
}

#[component]
fn AwarenessView(
    dashboard: RwSignal<Dashboard>,
    report: RwSignal<IncidentReport>,
    gateway: StoredValue<SharedGateway>,
) -> impl IntoView {
    let submit = move || {
        let mut current_dashboard = dashboard.get_untracked();
        let mut current_report = report.get_untracked();
        let ticket = current_report.begin_submit(&mut current_dashboard);
        batch(|| {
            dashboard.set(current_dashboard);
            report.set(current_report);
        });
        let Ok(ticket) = ticket else {
            return;
        };
        let gateway = gateway.get_value();
        spawn_local(async move {
            let outcome = gateway.analyze_incident(ticket.details()).await;
            let mut current_dashboard = dashboard.get_untracked();
            let mut current_report = report.get_untracked();
            if current_report.finish_submit(&mut current_dashboard, ticket, outcome) {
                batch(|| {
                    dashboard.set(current_dashboard);
                    report.set(current_report);
                });
            }
        });
    };

    view! {
      <h2>"Incident Report"</h2>
      <form class="stack" on:submit=move |ev| {
        ev.prevent_default();
        submit();
      }>
        <label>"Incident type"
          <select
            prop:value=move || report.with(|r| r.incident_type.label())
            on:change=move |ev| {
              if let Ok(kind) = event_target_value(&ev).parse::<IncidentType>() {
                report.update(|r| r.incident_type = kind);
              }
            }
          >
            {IncidentType::ALL.into_iter().map(|kind| view! { <option value=kind.label()>{kind.label()}</option> }).collect_view()}
          </select>
        </label>
        <label>"Location"
          <input
            prop:value=move || report.with(|r| r.location.clone())
            on:input=move |ev| report.update(|r| r.location = event_target_value(&ev))
            placeholder="e.g. Sector 7G"
          />
        </label>
        <label>"Severity"
          <select
            prop:value=move || report.with(|r| r.severity.label())
            on:change=move |ev| {
              if let Ok(severity) = event_target_value(&ev).parse::<Severity>() {
                report.update(|r| r.severity = severity);
              }
            }
          >
            {Severity::ALL.into_iter().map(|severity| view! { <option value=severity.label()>{severity.label()}</option> }).collect_view()}
          </select>
        </label>
        <label>"Description"
          <textarea
            prop:value=move || report.with(|r| r.description.clone())
            on:input=move |ev| report.update(|r| r.description = event_target_value(&ev))
          />
        </label>
        <button type="submit" disabled=move || report.with(IncidentReport::is_loading)>
          {move || if report.with(IncidentReport::is_loading) { "Analyzing..." } else { "Analyze Incident" }}
        </button>
      </form>

      <Show when=move || report.with(|r| r.error().is_some())>
        <pre class="error">{move || report.with(|r| r.error().unwrap_or_default().to_string())}</pre>
      </Show>

      {move || report.with(|r| r.analysis().cloned()).map(|analysis| view! {
        <section class="analysis">
          <h3>"AI Analysis"</h3>
          <p>{analysis.summary}</p>
          <h4>"Recommended Actions"</h4>
          {bullet_list(analysis.recommended_actions)}
          <h4>"Potential Risks"</h4>
          {bullet_list(analysis.potential_risks)}
          <h4>"Resource Suggestions"</h4>
          {bullet_list(analysis.resource_suggestions)}
          <button on:click=move |_| {
            let current_report = report.get_untracked();
            dashboard.update(|d| {
              current_report.open_operations(d);
            });
          }>"Go to Operations Hub"</button>
        </section>
      })}
    }
}

#[component]
fn OperationsView(hub: RwSignal<OperationsHub>) -> impl IntoView {
    move || match hub.with(|h| h.state().clone()) {
        OperationsState::Unavailable => view! {
          <p class="meta">"Submit an incident report to unlock the Operations Hub."</p>
        }
        .into_view(),
        OperationsState::Loading => view! { <p class="meta">"Loading operational data..."</p> }.into_view(),
        OperationsState::Failed(message) => view! { <pre class="error">{message}</pre> }.into_view(),
        OperationsState::Ready(bundle) => view! {
          <section>
            <h2>"Impact Forecast"</h2>
            <h4>"Short-term (0-12h)"</h4>
            {bullet_list(bundle.forecast.short_term_impacts)}
            <h4>"Long-term (12-72h)"</h4>
            {bullet_list(bundle.forecast.long_term_impacts)}
            <h4>"Community Lifelines"</h4>
            <ul>
              {bundle.forecast.community_lifelines.into_iter().map(|l| view! {
                <li><b>{l.lifeline}</b>": "{l.impact}<div class="meta">{l.mitigation}</div></li>
              }).collect_view()}
            </ul>
          </section>
          <section>
            <h2>"Team Briefing"</h2>
            <p>{bundle.briefing.mission_statement}</p>
            <h4>"Key Objectives"</h4>
            {bullet_list(bundle.briefing.key_objectives)}
            <h4>"Known Risks"</h4>
            {bullet_list(bundle.briefing.known_risks)}
            <h4>"Comms Plan"</h4>
            <p>{bundle.briefing.comms_plan}</p>
          </section>
          <section>
            <h2>{bundle.scenario.scenario_title}</h2>
            <h4>"Learning Objectives"</h4>
            {bullet_list(bundle.scenario.learning_objectives)}
            <h4>"Initial Briefing"</h4>
            <p>{bundle.scenario.initial_briefing}</p>
            <h4>"Timeline Injects"</h4>
            <ul>
              {bundle.scenario.timeline_injects.into_iter().map(|inject| view! {
                <li><b>{inject.time}</b>" "{inject.event}<div class="meta">{inject.expected_action}</div></li>
              }).collect_view()}
            </ul>
          </section>
        }
        .into_view(),
    }
}

#[component]
fn PreparednessView(chat: RwSignal<ChatSession>, gateway: StoredValue<SharedGateway>) -> impl IntoView {
    let input = create_rw_signal(String::new());

    let send = move |text: String| {
        let mut session = chat.get_untracked();
        let Ok(ticket) = session.begin_send(&text) else {
            return;
        };
        let session_id = session.session_id().map(str::to_string);
        batch(|| {
            chat.set(session);
            input.set(String::new());
        });
        let gateway = gateway.get_value();
        spawn_local(async move {
            let result = run_turn(&*gateway, session_id, &ticket, |event| {
                chat.update(|c| {
                    c.apply(&ticket, event);
                });
            })
            .await;
            if let Err(err) = result {
                tracing::debug!(error = %err, "chat turn ended with an error");
            }
        });
    };

    view! {
      <h2>"Preparedness Assistant"</h2>
      <div class="chat">
        <For
          each=move || chat.with(|c| c.messages().iter().cloned().enumerate().collect::<Vec<_>>())
          key=|(index, message)| (*index, message.text.len())
          children=move |(_, message)| {
            let class = match message.sender {
              Sender::User => "bubble user",
              Sender::Model => "bubble model",
            };
            view! { <div class=class>{message.text}</div> }
          }
        />
        <Show when=move || chat.with(ChatSession::is_awaiting_reply)>
          <div class="bubble model meta">"..."</div>
        </Show>
      </div>

      <Show when=move || chat.with(|c| c.messages().is_empty())>
        <div class="row">
          {SUGGESTED_QUESTIONS.into_iter().map(|question| view! {
            <button on:click=move |_| send(question.to_string())>{question}</button>
          }).collect_view()}
        </div>
      </Show>

      <Show when=move || chat.with(|c| c.error().is_some())>
        <pre class="error">{move || chat.with(|c| c.error().unwrap_or_default().to_string())}</pre>
      </Show>

      <form class="row" on:submit=move |ev| {
        ev.prevent_default();
        send(input.get_untracked());
      }>
        <input
          prop:value=move || input.get()
          on:input=move |ev| input.set(event_target_value(&ev))
          placeholder="Ask about emergency preparedness"
        />
        <button type="submit" disabled=move || chat.with(ChatSession::is_pending)>"Send"</button>
      </form>
    }
}
