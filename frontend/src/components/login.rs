use crate::api::use_services;
use crate::auth::{login, use_auth};
use crate::web::router::{Link, redirect_external, use_router};
use battwatch::route::{QUERY_EMAIL, QUERY_ERROR, QUERY_NOTICE};
use battwatch_shared::Role;
use battwatch_shared::protocol::LoginRequest;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn LoginPage() -> impl IntoView {
    let auth = use_auth();
    let services = use_services();
    let router = use_router();

    // 回调或守卫带过来的提示信息
    let location = router.current().get_untracked();
    let initial_email = location.query_value(QUERY_EMAIL).unwrap_or_default().to_string();
    let notice = location.query_value(QUERY_NOTICE).map(str::to_string);

    let (email, set_email) = signal(initial_email);
    let (password, set_password) = signal(String::new());
    let (role, set_role) = signal(Role::User);
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) =
        signal(location.query_value(QUERY_ERROR).map(str::to_string));

    let on_submit = {
        let services = services.clone();
        move |ev: leptos::web_sys::SubmitEvent| {
            ev.prevent_default();
            if email.get().is_empty() || password.get().is_empty() {
                set_error_msg.set(Some("Please fill in all fields".to_string()));
                return;
            }

            set_is_submitting.set(true);
            set_error_msg.set(None);

            let req = LoginRequest {
                email: email.get(),
                password: password.get(),
                role: role.get().as_str().to_string(),
            };
            let services = services.clone();
            spawn_local(async move {
                // 成功后由路由服务监听认证状态并跳转
                if let Err(e) = login(&auth, &services, req).await {
                    battwatch::log_warn!("[Login] {}", e);
                    set_error_msg.set(Some(e.user_message()));
                }
                set_is_submitting.set(false);
            });
        }
    };

    let google_url = services.api.google_start_url();
    let on_google = move |_| redirect_external(&google_url);

    view! {
        <div class="hero min-h-screen bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <div class="text-center mb-4">
                    <h1 class="text-3xl font-bold">"BattWatch"</h1>
                    <p class="text-base-content/70">"Sign in to monitor your batteries"</p>
                </div>

                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <form class="card-body" on:submit=on_submit>
                        {notice.map(|n| view! {
                            <div role="alert" class="alert alert-info text-sm py-2">
                                <span>{n}</span>
                            </div>
                        })}
                        <Show when=move || error_msg.get().is_some()>
                            <div role="alert" class="alert alert-error text-sm py-2">
                                <span>{move || error_msg.get().unwrap_or_default()}</span>
                            </div>
                        </Show>

                        <div class="form-control">
                            <label class="label" for="email">
                                <span class="label-text">"Email"</span>
                            </label>
                            <input
                                id="email"
                                type="email"
                                placeholder="you@company.com"
                                on:input=move |ev| set_email.set(event_target_value(&ev))
                                prop:value=email
                                class="input input-bordered"
                                required
                            />
                        </div>
                        <div class="form-control">
                            <label class="label" for="password">
                                <span class="label-text">"Password"</span>
                            </label>
                            <input
                                id="password"
                                type="password"
                                placeholder="••••••••"
                                on:input=move |ev| set_password.set(event_target_value(&ev))
                                prop:value=password
                                class="input input-bordered"
                                required
                            />
                        </div>
                        <div class="form-control">
                            <label class="label" for="role">
                                <span class="label-text">"Role"</span>
                            </label>
                            <select
                                id="role"
                                class="select select-bordered"
                                on:change=move |ev| {
                                    set_role.set(Role::parse(&event_target_value(&ev)).unwrap_or(Role::User))
                                }
                            >
                                <option value="user" selected=move || role.get() == Role::User>"User"</option>
                                <option value="admin" selected=move || role.get() == Role::Admin>"Admin"</option>
                            </select>
                        </div>
                        <div class="text-right text-sm">
                            <Link to="/forgot-password" class="link link-primary">"Forgot Password?"</Link>
                        </div>
                        <div class="form-control mt-4">
                            <button class="btn btn-primary" disabled=move || is_submitting.get()>
                                {move || if is_submitting.get() {
                                    view! { <span class="loading loading-spinner"></span> "Signing in..." }.into_any()
                                } else {
                                    "Login".into_any()
                                }}
                            </button>
                        </div>
                        <button type="button" class="btn btn-outline btn-error" on:click=on_google>
                            "Continue with Google"
                        </button>
                        <p class="text-center text-sm mt-2">
                            "Don't have an account? "
                            <Link to="/register" class="link link-primary">"Register"</Link>
                        </p>
                    </form>
                </div>
            </div>
        </div>
    }
}
