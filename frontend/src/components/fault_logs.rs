use crate::api::use_services;
use battwatch::telemetry::unique_ids;
use battwatch_shared::FILTER_ALL;
use battwatch_shared::FaultLog;
use battwatch_shared::protocol::FaultLogQuery;
use leptos::prelude::*;
use leptos::task::spawn_local;

const FAULT_TYPES: [&str; 3] = ["Overheating", "Low Voltage", "High Current"];

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

#[component]
pub fn FaultLogsPage() -> impl IntoView {
    let services = use_services();
    let csv_url = services.api.fault_logs_csv_url();

    let (start, set_start) = signal(String::new());
    let (end, set_end) = signal(String::new());
    let (battery, set_battery) = signal(FILTER_ALL.to_string());
    let (fault_type, set_fault_type) = signal(FILTER_ALL.to_string());
    let (batteries, set_batteries) = signal(Vec::<String>::new());
    let (logs, set_logs) = signal(Vec::<FaultLog>::new());
    let (loading, set_loading) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let load = move || {
        let query = FaultLogQuery {
            start: non_empty(start.get_untracked()),
            end: non_empty(end.get_untracked()),
            battery_id: Some(battery.get_untracked()),
            fault_type: Some(fault_type.get_untracked()),
        };
        let services = services.clone();
        set_loading.set(true);
        spawn_local(async move {
            match services.api.fault_logs(&query).await {
                Ok(rows) => {
                    if batteries.get_untracked().is_empty() {
                        set_batteries.set(unique_ids(rows.iter().map(|l| l.battery_id.as_deref())));
                    }
                    set_logs.set(rows);
                    set_error_msg.set(None);
                }
                // 失败时保留上一次的结果
                Err(e) => {
                    battwatch::log_error!("[FaultLogs] Failed to load fault logs: {}", e);
                    set_error_msg.set(Some(e.user_message()));
                }
            }
            set_loading.set(false);
        });
    };
    load();

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h2 class="card-title text-2xl">"Fault Logs"</h2>

                <div class="flex flex-col md:flex-row items-end gap-4">
                    <input
                        type="date"
                        class="input input-bordered input-sm"
                        prop:value=move || start.get()
                        on:input=move |ev| set_start.set(event_target_value(&ev))
                    />
                    <input
                        type="date"
                        class="input input-bordered input-sm"
                        prop:value=move || end.get()
                        on:input=move |ev| set_end.set(event_target_value(&ev))
                    />
                    <select
                        class="select select-bordered select-sm"
                        on:change=move |ev| set_battery.set(event_target_value(&ev))
                    >
                        <option value=FILTER_ALL>"All Batteries"</option>
                        <For
                            each=move || batteries.get()
                            key=|id| id.clone()
                            children=move |id| {
                                let selected = id.clone();
                                view! {
                                    <option value=id.clone() selected=move || battery.get() == selected>
                                        {format!("Battery {}", id)}
                                    </option>
                                }
                            }
                        />
                    </select>
                    <select
                        class="select select-bordered select-sm"
                        on:change=move |ev| set_fault_type.set(event_target_value(&ev))
                    >
                        <option value=FILTER_ALL>"All Fault Types"</option>
                        {FAULT_TYPES
                            .into_iter()
                            .map(|t| view! { <option value=t>{t}</option> })
                            .collect_view()}
                    </select>
                    <div class="flex gap-2 items-center">
                        <button class="btn btn-primary btn-sm" on:click=move |_| load()>"Filter"</button>
                        // 导出由后端生成，不带筛选条件
                        <a class="btn btn-success btn-sm" href=csv_url>"Download CSV"</a>
                        <Show when=move || loading.get()>
                            <span class="loading loading-spinner loading-sm"></span>
                        </Show>
                    </div>
                </div>

                <Show when=move || error_msg.get().is_some()>
                    <div role="alert" class="alert alert-error text-sm py-2">
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>

                <div class="overflow-x-auto">
                    <table class="table table-zebra table-sm">
                        <thead>
                            <tr>
                                <th>"Detected At"</th>
                                <th>"Battery ID"</th>
                                <th>"Fault Type"</th>
                                <th>"Severity"</th>
                                <th>"Predicted By"</th>
                                <th>"Note"</th>
                                <th>"Resolve Text"</th>
                            </tr>
                        </thead>
                        <tbody>
                            {move || {
                                logs.get()
                                    .into_iter()
                                    .map(|log| view! {
                                        <tr>
                                            <td>{log.detected_at}</td>
                                            <td>{log.battery_id.unwrap_or_default()}</td>
                                            <td>{log.fault_type}</td>
                                            <td>{log.severity.unwrap_or_default()}</td>
                                            <td>{log.predicted_by.unwrap_or_default()}</td>
                                            <td>{log.note.unwrap_or_default()}</td>
                                            <td>{log.resolve_text.unwrap_or_default()}</td>
                                        </tr>
                                    })
                                    .collect_view()
                            }}
                        </tbody>
                    </table>
                    <Show when=move || logs.with(|l| l.is_empty()) && !loading.get()>
                        <p class="text-center text-base-content/60 py-6">"No fault logs found."</p>
                    </Show>
                </div>
            </div>
        </div>
    }
}
