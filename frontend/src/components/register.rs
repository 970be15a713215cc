use crate::api::use_services;
use crate::auth::{register, use_auth};
use crate::web::router::{Link, use_router};
use battwatch::route::{QUERY_EMAIL, QUERY_NAME};
use battwatch_shared::Role;
use battwatch_shared::protocol::RegisterRequest;
use leptos::prelude::*;
use leptos::task::spawn_local;

type Getter = fn(&RegisterRequest) -> String;
type Setter = fn(&mut RegisterRequest, String);

/// 表单中的一个输入框
fn field(
    form: RwSignal<RegisterRequest>,
    label: &'static str,
    kind: &'static str,
    required: bool,
    get: Getter,
    set: Setter,
) -> impl IntoView {
    view! {
        <div class="form-control">
            <label class="label">
                <span class="label-text">{label}</span>
            </label>
            <input
                type=kind
                class="input input-bordered input-sm"
                required=required
                prop:value=move || form.with(get)
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    form.update(|f| set(f, value));
                }
            />
        </div>
    }
}

#[component]
pub fn RegisterPage() -> impl IntoView {
    let auth = use_auth();
    let services = use_services();
    let router = use_router();

    // OAuth 回调转过来时预填邮箱和姓名
    let location = router.current().get_untracked();
    let form = RwSignal::new(RegisterRequest {
        email: location.query_value(QUERY_EMAIL).unwrap_or_default().to_string(),
        username: location.query_value(QUERY_NAME).unwrap_or_default().to_string(),
        role: Role::User.as_str().to_string(),
        ..Default::default()
    });
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);

        let req = form.get();
        let services = services.clone();
        spawn_local(async move {
            if let Err(e) = register(&auth, &services, req).await {
                battwatch::log_warn!("[Register] {}", e);
                set_error_msg.set(Some(e.user_message()));
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="hero min-h-screen bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <h1 class="text-3xl font-bold">"Create account"</h1>
                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <form class="card-body gap-1" on:submit=on_submit>
                        <Show when=move || error_msg.get().is_some()>
                            <div role="alert" class="alert alert-error text-sm py-2">
                                <span>{move || error_msg.get().unwrap_or_default()}</span>
                            </div>
                        </Show>

                        {field(form, "Username", "text", true, |f| f.username.clone(), |f, v| f.username = v)}
                        {field(form, "Email", "email", true, |f| f.email.clone(), |f, v| f.email = v)}
                        {field(form, "Password", "password", true, |f| f.password.clone(), |f, v| f.password = v)}
                        {field(form, "Company ID (leave empty for default)", "text", false, |f| f.company_id.clone(), |f, v| f.company_id = v)}
                        {field(form, "Phone Number", "tel", false, |f| f.ph_no.clone(), |f, v| f.ph_no = v)}
                        {field(form, "Security Question", "text", false, |f| f.security_qn.clone(), |f, v| f.security_qn = v)}
                        {field(form, "Security Answer", "text", false, |f| f.security_ans.clone(), |f, v| f.security_ans = v)}

                        <div class="form-control">
                            <label class="label">
                                <span class="label-text">"Role"</span>
                            </label>
                            <select
                                class="select select-bordered select-sm"
                                on:change=move |ev| {
                                    let value = event_target_value(&ev);
                                    form.update(|f| f.role = value);
                                }
                            >
                                <option value="user">"User"</option>
                                <option value="admin">"Admin"</option>
                            </select>
                        </div>

                        <button class="btn btn-success mt-4" disabled=move || is_submitting.get()>
                            {move || if is_submitting.get() { "Registering..." } else { "Register" }}
                        </button>
                        <p class="text-center text-sm mt-2">
                            "Already have an account? "
                            <Link to="/login" class="link link-primary">"Login"</Link>
                        </p>
                    </form>
                </div>
            </div>
        </div>
    }
}
