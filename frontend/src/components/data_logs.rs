use crate::api::use_services;
use crate::web::download_text;
use battwatch::telemetry::{TelemetryPoint, battery_ids, datalogs_csv, normalize, paginate};
use battwatch_shared::FILTER_ALL;
use battwatch_shared::protocol::DataLogQuery;
use leptos::prelude::*;
use leptos::task::spawn_local;

const CSV_FILENAME: &str = "datalogs.csv";

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn fmt_cell(v: f64) -> String {
    format!("{v:.2}")
}

#[component]
pub fn DataLogsPage() -> impl IntoView {
    let services = use_services();
    let page_size = services.config.page_size;

    let (start, set_start) = signal(String::new());
    let (end, set_end) = signal(String::new());
    let (battery, set_battery) = signal(FILTER_ALL.to_string());
    let (batteries, set_batteries) = signal(Vec::<String>::new());
    let (rows, set_rows) = signal(Vec::<TelemetryPoint>::new());
    let (page, set_page) = signal(1usize);
    let (loading, set_loading) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let load = {
        let services = services.clone();
        move || {
            let query = DataLogQuery {
                start: non_empty(start.get_untracked()),
                end: non_empty(end.get_untracked()),
                battery_id: Some(battery.get_untracked()),
            };
            let services = services.clone();
            set_loading.set(true);
            spawn_local(async move {
                match services.api.datalogs(&query).await {
                    Ok(logs) => {
                        let points = normalize(&logs);
                        // 下拉框只在首次（未过滤）加载时填充，避免选项越筛越少
                        if batteries.get_untracked().is_empty() {
                            set_batteries.set(battery_ids(&points));
                        }
                        set_rows.set(points);
                        set_error_msg.set(None);
                    }
                    Err(e) => {
                        battwatch::log_error!("[DataLogs] Failed to load datalogs: {}", e);
                        set_rows.set(Vec::new());
                        set_error_msg.set(Some(e.user_message()));
                    }
                }
                set_page.set(1);
                set_loading.set(false);
            });
        }
    };
    load();

    let on_filter = move |_| load();

    let on_download = move |_| {
        let csv = rows.with(|r| datalogs_csv(r));
        if let Err(e) = download_text(CSV_FILENAME, &csv, "text/csv;charset=utf-8;") {
            battwatch::log_error!("[DataLogs] CSV export failed: {:?}", e);
        }
    };

    let page_rows = move || {
        rows.with(|r| {
            let p = paginate(r, page.get(), page_size);
            p.items.to_vec()
        })
    };
    let page_info = move || {
        rows.with(|r| {
            let p = paginate(r, page.get(), page_size);
            (p.number, p.total_pages, p.has_prev(), p.has_next())
        })
    };

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h2 class="card-title text-2xl">"Datalogs"</h2>

                <div class="flex flex-col md:flex-row items-end gap-4">
                    <label class="form-control">
                        <span class="label-text">"Start Date"</span>
                        <input
                            type="date"
                            class="input input-bordered input-sm"
                            prop:value=move || start.get()
                            on:input=move |ev| set_start.set(event_target_value(&ev))
                        />
                    </label>
                    <label class="form-control">
                        <span class="label-text">"End Date"</span>
                        <input
                            type="date"
                            class="input input-bordered input-sm"
                            prop:value=move || end.get()
                            on:input=move |ev| set_end.set(event_target_value(&ev))
                        />
                    </label>
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
                    <div class="flex gap-2">
                        <button class="btn btn-primary btn-sm" on:click=on_filter>"Filter"</button>
                        <button
                            class="btn btn-success btn-sm"
                            on:click=on_download
                            disabled=move || rows.with(|r| r.is_empty())
                        >
                            "Download CSV"
                        </button>
                    </div>
                </div>

                <Show when=move || error_msg.get().is_some()>
                    <div role="alert" class="alert alert-error text-sm py-2">
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>

                <Show
                    when=move || !loading.get()
                    fallback=|| view! {
                        <div class="flex justify-center py-12">
                            <span class="loading loading-spinner loading-lg"></span>
                        </div>
                    }
                >
                    <div class="overflow-x-auto">
                        <table class="table table-zebra table-sm">
                            <thead>
                                <tr>
                                    <th>"Timestamp"</th>
                                    <th>"Current (A)"</th>
                                    <th>"Temperature (°C)"</th>
                                    <th>"Voltage (V)"</th>
                                    <th>"Battery ID"</th>
                                </tr>
                            </thead>
                            <tbody>
                                {move || {
                                    page_rows()
                                        .into_iter()
                                        .map(|p| view! {
                                            <tr>
                                                <td>{p.timestamp}</td>
                                                <td>{fmt_cell(p.current)}</td>
                                                <td>{fmt_cell(p.temperature)}</td>
                                                <td>{fmt_cell(p.voltage)}</td>
                                                <td>{p.battery_id.unwrap_or_default()}</td>
                                            </tr>
                                        })
                                        .collect_view()
                                }}
                            </tbody>
                        </table>
                        <Show when=move || rows.with(|r| r.is_empty())>
                            <p class="text-center text-base-content/60 py-6">"No datalogs found."</p>
                        </Show>
                    </div>

                    <div class="flex items-center justify-between">
                        <span class="text-sm text-base-content/60">
                            {move || rows.with(|r| format!("{} records", r.len()))}
                        </span>
                        <div class="join">
                            <button
                                class="join-item btn btn-sm"
                                disabled=move || !page_info().2
                                on:click=move |_| set_page.update(|p| *p = p.saturating_sub(1).max(1))
                            >
                                "«"
                            </button>
                            <button class="join-item btn btn-sm btn-disabled">
                                {move || {
                                    let (number, total, _, _) = page_info();
                                    format!("Page {number} / {total}")
                                }}
                            </button>
                            <button
                                class="join-item btn btn-sm"
                                disabled=move || !page_info().3
                                on:click=move |_| set_page.update(|p| *p += 1)
                            >
                                "»"
                            </button>
                        </div>
                    </div>
                </Show>
            </div>
        </div>
    }
}
