use crate::api::use_services;
use crate::auth::{cache_user, use_auth};
use battwatch_shared::UserProfile;
use leptos::prelude::*;
use leptos::task::spawn_local;

fn or_na(value: Option<String>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| "N/A".to_string())
}

#[component]
pub fn ProfilePage() -> impl IntoView {
    let auth = use_auth();
    let services = use_services();

    // 先展示缓存，再用 /auth/me 刷新
    let (user, set_user) = signal(auth.state.get_untracked().user);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);
    let (loading, set_loading) = signal(true);

    match services.session.token() {
        Some(token) => {
            spawn_local(async move {
                match services.api.me(&token).await {
                    Ok(profile) => {
                        cache_user(&auth, &services, &profile);
                        set_user.set(Some(profile));
                    }
                    Err(e) => {
                        battwatch::log_warn!("[Profile] refresh failed: {}", e);
                        set_error_msg.set(Some(e.user_message()));
                    }
                }
                set_loading.set(false);
            });
        }
        None => set_loading.set(false),
    }

    let row = |label: &'static str, value: String| {
        view! {
            <div>
                <div class="text-sm text-base-content/60">{label}</div>
                <div class="font-medium">{value}</div>
            </div>
        }
    };

    let details = move |u: UserProfile| {
        let company = u.company.clone().unwrap_or_default();
        let active = company.is_active;
        view! {
            <div class="grid md:grid-cols-2 gap-6">
                <div class="space-y-4">
                    {row("Username", u.username.clone())}
                    {row("Email", u.email.clone())}
                    {row("Phone", or_na(u.ph_no.clone()))}
                    {row("Role", or_na(u.role.clone()))}
                </div>
                <div class="space-y-4">
                    {row("Security Question", or_na(u.security_qn.clone()))}
                    {row("IP", or_na(u.ip.clone()))}
                    {row("Company", or_na(company.company_name))}
                    {row("Company Email", or_na(company.email))}
                    <div>
                        <div class="text-sm text-base-content/60">"Company Status"</div>
                        <span class=if active { "badge badge-success" } else { "badge badge-error" }>
                            {if active { "Active" } else { "Inactive" }}
                        </span>
                    </div>
                </div>
            </div>
        }
    };

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <div class="flex items-center justify-between border-b border-base-300 pb-4 mb-4">
                    <h2 class="card-title text-2xl">"User Profile"</h2>
                    <Show when=move || loading.get()>
                        <span class="loading loading-spinner loading-sm"></span>
                    </Show>
                </div>
                <Show when=move || error_msg.get().is_some()>
                    <div role="alert" class="alert alert-warning text-sm py-2 mb-4">
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>
                {move || match user.get() {
                    Some(u) => details(u).into_any(),
                    None => view! {
                        <p class="text-base-content/60">"No profile information available."</p>
                    }
                    .into_any(),
                }}
            </div>
        </div>
    }
}
