use battwatch::telemetry::{ChartSeries, Metric, plot_points};
use leptos::prelude::*;

const WIDTH: f64 = 600.0;
const HEIGHT: f64 = 200.0;

/// 单指标折线图（SVG）
#[component]
pub fn LineChart(metric: Metric, #[prop(into)] series: Signal<ChartSeries>) -> impl IntoView {
    let points = move || {
        series.with(|s| {
            plot_points(s.values(metric), WIDTH, HEIGHT)
                .into_iter()
                .map(|(x, y)| format!("{x:.1},{y:.1}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
    };
    let range_label = move || {
        series.with(|s| {
            let values = s.values(metric);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if values.is_empty() {
                String::new()
            } else {
                format!("{min:.2} ~ {max:.2} {}", metric.unit())
            }
        })
    };
    let first_label = move || series.with(|s| s.labels.first().cloned().unwrap_or_default());
    let last_label = move || series.with(|s| s.labels.last().cloned().unwrap_or_default());

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <div class="flex items-center justify-between">
                    <h3 class="card-title">{metric.title()}</h3>
                    <span class="text-xs text-base-content/60">{range_label}</span>
                </div>
                <Show
                    when=move || series.with(|s| !s.is_empty())
                    fallback=|| view! {
                        <div class="h-48 flex items-center justify-center text-base-content/50">
                            "No data in the selected range"
                        </div>
                    }
                >
                    <svg
                        viewBox=format!("0 0 {WIDTH} {HEIGHT}")
                        preserveAspectRatio="none"
                        class="w-full h-48"
                    >
                        <polyline
                            fill="none"
                            stroke=metric.color()
                            stroke-width="2"
                            points=points
                        />
                    </svg>
                    <div class="flex justify-between text-xs text-base-content/60">
                        <span>{first_label}</span>
                        <span>{last_label}</span>
                    </div>
                </Show>
            </div>
        </div>
    }
}
