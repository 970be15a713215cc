use crate::api::use_services;
use crate::auth::{logout, use_auth};
use crate::web::router::{Link, use_router};
use battwatch::AppRoute;
use leptos::prelude::*;

const NAV_ITEMS: [(AppRoute, &str); 4] = [
    (AppRoute::Dashboard, "Dashboard"),
    (AppRoute::DataLogs, "Data Logs"),
    (AppRoute::FaultLogs, "Fault Logs"),
    (AppRoute::Profile, "Profile"),
];

/// 受保护页面的外壳：顶栏 + 侧边导航
#[component]
pub fn AppShell(children: Children) -> impl IntoView {
    let auth = use_auth();
    let services = use_services();
    let router = use_router();
    // 每次路由变化外壳都会重建，这里取一次即可
    let current_route = router.current_route().get_untracked();

    let display_name = move || {
        auth.state
            .get()
            .user
            .map(|u| if u.username.is_empty() { u.email } else { u.username })
            .unwrap_or_default()
    };
    let role_badge = move || auth.state.get().role.map(|r| r.as_str());

    let on_logout = move |_| logout(&auth, &services);

    view! {
        <div class="min-h-screen bg-base-200 font-sans">
            <div class="navbar bg-base-100 shadow-xl px-4">
                <div class="flex-1 gap-2">
                    <span class="text-xl font-bold text-primary">"BattWatch"</span>
                    <span class="badge badge-neutral hidden md:inline-flex">"Battery Telemetry"</span>
                </div>
                <div class="flex-none gap-3">
                    <span class="hidden md:inline text-sm">{display_name}</span>
                    {move || role_badge().map(|r| view! { <span class="badge badge-outline">{r}</span> })}
                    <button on:click=on_logout class="btn btn-outline btn-error btn-sm">
                        "Logout"
                    </button>
                </div>
            </div>

            <div class="flex">
                <aside class="w-56 min-h-[calc(100vh-4rem)] bg-base-100 hidden md:block">
                    <ul class="menu p-4 gap-1">
                        {NAV_ITEMS
                            .into_iter()
                            .map(|(route, label)| {
                                let class = if current_route == route { "active" } else { "" };
                                view! {
                                    <li>
                                        <Link to=route.to_path() class=class>{label}</Link>
                                    </li>
                                }
                            })
                            .collect_view()}
                    </ul>
                </aside>
                <main class="flex-1 p-4 md:p-8">
                    <div class="max-w-7xl mx-auto space-y-8">{children()}</div>
                </main>
            </div>
        </div>
    }
}
