use std::time::Duration;

use crate::api::use_services;
use crate::web::router::{Link, use_router};
use battwatch::AppRoute;
use battwatch_shared::protocol::ResetPasswordRequest;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 重置成功后停留多久再回到登录页
const REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, PartialEq)]
enum Step {
    Email,
    Reset,
    Done,
}

#[component]
pub fn ForgotPasswordPage() -> impl IntoView {
    let services = use_services();
    let router = use_router();

    let (step, set_step) = signal(Step::Email);
    let (email, set_email) = signal(String::new());
    let (question, set_question) = signal(String::new());
    let (answer, set_answer) = signal(String::new());
    let (new_password, set_new_password) = signal(String::new());
    let (message, set_message) = signal(Option::<String>::None);
    let (busy, set_busy) = signal(false);

    let on_email = {
        let services = services.clone();
        move |ev: leptos::web_sys::SubmitEvent| {
            ev.prevent_default();
            set_message.set(None);
            set_busy.set(true);
            let services = services.clone();
            spawn_local(async move {
                match services.api.forgot_password(&email.get_untracked()).await {
                    Ok(q) => {
                        set_question.set(q);
                        set_step.set(Step::Reset);
                    }
                    Err(e) => set_message.set(Some(e.user_message())),
                }
                set_busy.set(false);
            });
        }
    };

    let on_reset = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_message.set(None);
        set_busy.set(true);
        let req = ResetPasswordRequest {
            email: email.get_untracked(),
            security_ans: answer.get_untracked(),
            new_password: new_password.get_untracked(),
        };
        let services = services.clone();
        spawn_local(async move {
            match services.api.reset_password(&req).await {
                Ok(_) => {
                    set_step.set(Step::Done);
                    set_timeout(
                        move || router.replace(AppRoute::Login.into()),
                        REDIRECT_DELAY,
                    );
                }
                Err(e) => set_message.set(Some(e.user_message())),
            }
            set_busy.set(false);
        });
    };

    view! {
        <div class="hero min-h-screen bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <h1 class="text-3xl font-bold">"Forgot Password"</h1>
                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <div class="card-body">
                        <Show when=move || step.get() == Step::Email>
                            <form class="space-y-3" on:submit=on_email.clone()>
                                <input
                                    type="email"
                                    placeholder="Enter your email"
                                    class="input input-bordered w-full"
                                    prop:value=email
                                    on:input=move |ev| set_email.set(event_target_value(&ev))
                                    required
                                />
                                <button class="btn btn-primary w-full" disabled=move || busy.get()>"Next"</button>
                            </form>
                        </Show>

                        <Show when=move || step.get() == Step::Reset>
                            <form class="space-y-3" on:submit=on_reset.clone()>
                                <p>
                                    <span class="font-semibold">"Security Question: "</span>
                                    {move || question.get()}
                                </p>
                                <input
                                    type="text"
                                    placeholder="Your Answer"
                                    class="input input-bordered w-full"
                                    prop:value=answer
                                    on:input=move |ev| set_answer.set(event_target_value(&ev))
                                    required
                                />
                                <input
                                    type="password"
                                    placeholder="New Password"
                                    class="input input-bordered w-full"
                                    prop:value=new_password
                                    on:input=move |ev| set_new_password.set(event_target_value(&ev))
                                    required
                                />
                                <button class="btn btn-success w-full" disabled=move || busy.get()>
                                    "Reset Password"
                                </button>
                            </form>
                        </Show>

                        <Show when=move || step.get() == Step::Done>
                            <div role="alert" class="alert alert-success text-sm">
                                "Password reset successful. Redirecting to login..."
                            </div>
                        </Show>

                        <Show when=move || message.get().is_some()>
                            <div role="alert" class="alert alert-error text-sm py-2">
                                <span>{move || message.get().unwrap_or_default()}</span>
                            </div>
                        </Show>

                        <p class="text-center text-sm mt-2">
                            <Link to="/login" class="link link-primary">"Back to login"</Link>
                        </p>
                    </div>
                </div>
            </div>
        </div>
    }
}
