use crate::api::use_services;
use crate::components::chart::LineChart;
use crate::web::Interval;
use battwatch::telemetry::{
    ChartSeries, Metric, TelemetryPoint, TimeRange, battery_ids, filter_window, latest, normalize,
};
use battwatch_shared::FILTER_ALL;
use battwatch_shared::date::Timestamp;
use battwatch_shared::protocol::DataLogQuery;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 面板顶部的实时读数
#[derive(Clone, Default, PartialEq)]
struct Snapshot {
    voltage: f64,
    current: f64,
    temperature: f64,
    timestamp: String,
}

impl From<&TelemetryPoint> for Snapshot {
    fn from(p: &TelemetryPoint) -> Self {
        Self {
            voltage: p.voltage,
            current: p.current,
            temperature: p.temperature,
            timestamp: p.timestamp.clone(),
        }
    }
}

impl Snapshot {
    fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Voltage => self.voltage,
            Metric::Current => self.current,
            Metric::Temperature => self.temperature,
        }
    }
}

#[component]
fn StatCard(metric: Metric, snapshot: ReadSignal<Option<Snapshot>>) -> impl IntoView {
    let value = move || {
        snapshot
            .get()
            .map(|s| format!("{:.2}", s.value(metric)))
            .unwrap_or_else(|| "--".to_string())
    };
    view! {
        <div class="stat">
            <div class="stat-title">{metric.label()}</div>
            <div class="stat-value" style=format!("color: {}", metric.color())>
                {value} <span class="text-lg">{metric.unit()}</span>
            </div>
            <div class="stat-desc">{format!("Real-time {}", metric.label())}</div>
        </div>
    }
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let services = use_services();

    let (battery, set_battery) = signal(FILTER_ALL.to_string());
    let (range, set_range) = signal(TimeRange::default());
    let (batteries, set_batteries) = signal(Vec::<String>::new());
    let (series, set_series) = signal(ChartSeries::default());
    let (snapshot, set_snapshot) = signal(Option::<Snapshot>::None);
    let (loading, set_loading) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    // 筛选条件变化时重新加载
    Effect::new({
        let services = services.clone();
        move |_| {
            let battery = battery.get();
            let range = range.get();
            let services = services.clone();
            set_loading.set(true);
            spawn_local(async move {
                let query = DataLogQuery {
                    battery_id: Some(battery),
                    ..Default::default()
                };
                match services.api.datalogs(&query).await {
                    Ok(rows) => {
                        let points = normalize(&rows);
                        let window = filter_window(&points, range, Timestamp::now());
                        set_batteries.set(battery_ids(&points));
                        set_snapshot.set(latest(&window).map(Snapshot::from));
                        set_series.set(ChartSeries::from_points(&window));
                        set_error_msg.set(None);
                    }
                    Err(e) => {
                        battwatch::log_error!("[Dashboard] Failed to load datalogs: {}", e);
                        set_series.set(ChartSeries::default());
                        set_error_msg.set(Some(e.user_message()));
                    }
                }
                set_loading.set(false);
            });
        }
    });

    // 定时刷新实时读数；定时器不是 Send，放进本地存储，页面卸载时清除
    let poll = StoredValue::new_local(Interval::new(services.config.sensor_poll_interval, move || {
        let services = services.clone();
        spawn_local(async move {
            match services.api.sensor().await {
                Ok(s) => set_snapshot.set(Some(Snapshot {
                    voltage: s.voltage.unwrap_or(0.0),
                    current: s.current.unwrap_or(0.0),
                    temperature: s.temperature.unwrap_or(0.0),
                    timestamp: s.timestamp,
                })),
                Err(e) => battwatch::log_warn!("[Dashboard] Sensor poll failed: {}", e),
            }
        });
    }));
    on_cleanup(move || poll.dispose());

    let series_signal = Signal::from(series);

    view! {
        <Show when=move || error_msg.get().is_some()>
            <div role="alert" class="alert alert-error text-sm">
                <span>{move || error_msg.get().unwrap_or_default()}</span>
            </div>
        </Show>

        <div class="stats shadow w-full stats-vertical md:stats-horizontal bg-base-100">
            {Metric::ALL
                .into_iter()
                .map(|metric| view! { <StatCard metric=metric snapshot=snapshot /> })
                .collect_view()}
        </div>
        <p class="text-xs text-base-content/60 -mt-6">
            {move || snapshot.get().map(|s| format!("Last reading: {}", s.timestamp)).unwrap_or_default()}
        </p>

        <div class="card bg-base-100 shadow-xl">
            <div class="card-body flex-col md:flex-row items-center justify-between gap-4">
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

                <div class="join">
                    {TimeRange::CHOICES
                        .into_iter()
                        .map(|r| {
                            view! {
                                <button
                                    class=move || if range.get() == r { "join-item btn btn-sm btn-primary" } else { "join-item btn btn-sm" }
                                    on:click=move |_| set_range.set(r)
                                >
                                    {r.as_str()}
                                </button>
                            }
                        })
                        .collect_view()}
                </div>

                <Show when=move || loading.get()>
                    <span class="loading loading-spinner loading-sm"></span>
                </Show>
            </div>
        </div>

        <div class="grid grid-cols-1 lg:grid-cols-3 gap-6">
            {Metric::ALL
                .into_iter()
                .map(|metric| view! { <LineChart metric=metric series=series_signal /> })
                .collect_view()}
        </div>
    }
}
