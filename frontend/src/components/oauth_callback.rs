use crate::api::use_services;
use crate::auth::use_auth;
use crate::web::router::{schedule_external_redirect, use_router};
use battwatch::oauth::{Outcome, RedirectParams};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// OAuth 回调页
///
/// 挂载时处理一次回调参数，之后要么应用内跳转，要么延迟后重新发起授权。
#[component]
pub fn OAuthCallbackPage() -> impl IntoView {
    let auth = use_auth();
    let services = use_services();
    let router = use_router();

    let (status, set_status) = signal("Signing you in...".to_string());

    let location = router.current().get_untracked();
    let params = RedirectParams::from_pairs(location.query.iter().map(|(k, v)| (k, v)));

    spawn_local(async move {
        let outcome = services.run_oauth(&params).await;
        // 会话已经写好，先同步认证信号再导航，守卫才能放行
        auth.refresh(&services);

        match outcome {
            Outcome::Navigate(target) => router.replace(target),
            Outcome::ProviderRedirect { url, delay } => {
                set_status.set("Sign-in interrupted. Retrying...".to_string());
                schedule_external_redirect(url, delay);
            }
        }
    });

    view! {
        <div class="flex items-center justify-center min-h-screen bg-base-200">
            <div class="text-center space-y-4">
                <span class="loading loading-spinner loading-lg text-primary"></span>
                <p class="text-base-content/70">{move || status.get()}</p>
            </div>
        </div>
    }
}
