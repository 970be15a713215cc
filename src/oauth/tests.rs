use super::*;
use crate::claims::{JwtClaimsDecoder, NoClaims, make_jwt};
use crate::config::BackendConfig;
use crate::request::MockHttpClient;
use crate::route::{AppRoute, GuardDecision, QUERY_EMAIL, QUERY_ERROR, QUERY_NAME, QUERY_NOTICE, guard};
use crate::session::{KEY_ROLE, KEY_USER, MemoryStorage};
use serde_json::json;

const BASE: &str = "http://backend.test/api";

// =========================================================
// 辅助函数
// =========================================================

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 1,
        delay: Duration::from_millis(1500),
    }
}

fn session() -> SessionStore<MemoryStorage> {
    SessionStore::new(MemoryStorage::new(), 1)
}

fn api() -> BatteryApi<MockHttpClient> {
    BatteryApi::new(BackendConfig::new("http://backend.test"), MockHttpClient::new())
}

fn params(query: &str) -> RedirectParams {
    RedirectParams::from_query(query)
}

fn expect_navigate(outcome: Outcome) -> AppLocation {
    match outcome {
        Outcome::Navigate(loc) => loc,
        other => panic!("expected navigation, got {other:?}"),
    }
}

// =========================================================
// 参数解析
// =========================================================

#[test]
fn test_params_treat_placeholders_as_absent() {
    let p = params("?token=null&error=undefined&message=&email=a%40b.com&name=Amy+Lee");
    assert_eq!(p.token, None);
    assert_eq!(p.error, None);
    assert_eq!(p.message, None);
    assert_eq!(p.email.as_deref(), Some("a@b.com"));
    assert_eq!(p.name.as_deref(), Some("Amy Lee"));
}

#[test]
fn test_params_ignore_unknown_and_keep_first() {
    let p = RedirectParams::from_pairs([("state", "x"), ("token", "t1"), ("token", "t2")]);
    assert_eq!(p.token.as_deref(), Some("t1"));
    assert_eq!(p.error, None);
}

// =========================================================
// plan
// =========================================================

#[test]
fn test_token_takes_precedence() {
    for stored in [0, 1] {
        for error in [None, Some("auth_failed"), Some("access_denied")] {
            for email in [None, Some("a@b.com")] {
                let p = RedirectParams {
                    token: Some("tok".into()),
                    error: error.map(str::to_string),
                    email: email.map(str::to_string),
                    ..Default::default()
                };
                assert_eq!(
                    plan(&p, stored, &policy()),
                    Step::Finalize {
                        token: "tok".into()
                    },
                    "stored={stored} error={error:?} email={email:?}"
                );
            }
        }
    }
}

#[test]
fn test_recoverable_error_retries_once() {
    for error in RECOVERABLE_ERRORS {
        let p = params(&format!("error={error}"));
        assert_eq!(plan(&p, 0, &policy()), Step::Retry { next_count: 1 });
        assert_eq!(
            plan(&p, 1, &policy()),
            Step::GiveUp {
                message: MSG_GIVE_UP.into()
            }
        );
    }
}

#[test]
fn test_unrecoverable_error_gives_up_with_message() {
    let p = params("error=access_denied&message=User+cancelled");
    assert_eq!(
        plan(&p, 0, &policy()),
        Step::GiveUp {
            message: "User cancelled".into()
        }
    );
}

#[test]
fn test_error_beats_email() {
    let p = params("error=access_denied&email=a%40b.com");
    assert!(matches!(plan(&p, 0, &policy()), Step::GiveUp { .. }));
}

#[test]
fn test_zero_budget_never_retries() {
    let p = params("error=auth_failed");
    let no_retry = RetryPolicy {
        max_retries: 0,
        ..policy()
    };
    assert!(matches!(plan(&p, 0, &no_retry), Step::GiveUp { .. }));
}

#[test]
fn test_empty_params_are_unexpected() {
    assert_eq!(plan(&params(""), 0, &policy()), Step::Unexpected);
    assert_eq!(
        plan(&params("token=undefined&email=null"), 0, &policy()),
        Step::Unexpected
    );
}

// =========================================================
// run: Finalize
// =========================================================

#[tokio::test]
async fn test_finalize_persists_session_and_clears_counter() {
    let session = session();
    let api = api();
    session.set_retry_count(1);

    let token = make_jwt(&json!({"u_id": 3, "username": "amy", "email": "a@b.com"}));
    let seq = OAuthSequencer::new(&session, &api, JwtClaimsDecoder, policy());
    let loc = expect_navigate(seq.run(&params(&format!("token={token}&error=auth_failed"))).await);

    assert_eq!(loc, AppLocation::dashboard());
    assert!(session.is_authenticated());
    assert_eq!(session.token().as_deref(), Some(token.as_str()));
    assert_eq!(session.user().unwrap().username, "amy");
    assert!(session.storage().get(KEY_OAUTH_RETRY_COUNT).is_none());
    assert_eq!(api_request_count(&api), 0);
}

#[tokio::test]
async fn test_finalize_with_opaque_token_skips_user_cache() {
    let session = session();
    let api = api();

    let seq = OAuthSequencer::new(&session, &api, JwtClaimsDecoder, policy());
    let loc = expect_navigate(seq.run(&params("token=opaque-credential")).await);

    assert_eq!(loc.route, AppRoute::Dashboard);
    assert!(session.is_authenticated());
    assert!(session.storage().get(KEY_USER).is_none());
}

#[tokio::test]
async fn test_finalize_without_decoder() {
    let session = session();
    let api = api();
    let token = make_jwt(&json!({"username": "amy"}));

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    seq.run(&params(&format!("token={token}"))).await;

    assert!(session.is_authenticated());
    assert!(session.user().is_none());
}

// =========================================================
// run: Retry / Give Up
// =========================================================

#[tokio::test]
async fn test_first_recoverable_error_schedules_provider_redirect() {
    let session = session();
    let api = api();
    session.set_session("stale", None);
    session.set_role(battwatch_shared::Role::Admin);
    session.storage().set("unrelated", "x");

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let outcome = seq.run(&params("error=oauth_state_mismatch")).await;

    assert_eq!(
        outcome,
        Outcome::ProviderRedirect {
            url: format!("{BASE}/auth/google"),
            delay: Duration::from_millis(1500),
        }
    );
    // 只剩计数
    assert_eq!(
        session.storage().keys(),
        vec![KEY_OAUTH_RETRY_COUNT.to_string()]
    );
    assert_eq!(session.retry_count(), 1);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_exhausted_budget_returns_to_login() {
    let session = session();
    let api = api();
    session.set_retry_count(1);

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("error=auth_failed")).await);

    assert_eq!(loc.route, AppRoute::Login);
    assert_eq!(loc.query_value(QUERY_ERROR), Some(MSG_GIVE_UP));
    assert!(session.storage().get(KEY_OAUTH_RETRY_COUNT).is_none());
}

#[tokio::test]
async fn test_retry_then_give_up_sequence() {
    let session = session();
    let api = api();
    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let p = params("error=auth_failed&message=Login+expired");

    // 第一次：重试
    assert!(matches!(seq.run(&p).await, Outcome::ProviderRedirect { .. }));
    // 第二次回调：放弃
    let loc = expect_navigate(seq.run(&p).await);
    assert_eq!(loc.query_value(QUERY_ERROR), Some("Login expired"));
    assert!(session.storage().keys().is_empty());
}

#[tokio::test]
async fn test_corrupt_counter_is_clamped() {
    let session = session();
    let api = api();
    session.storage().set(KEY_OAUTH_RETRY_COUNT, "99");

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("error=auth_failed")).await);
    assert_eq!(loc.route, AppRoute::Login);
}

#[tokio::test]
async fn test_give_up_discards_previous_session() {
    let session = session();
    let api = api();
    session.set_session("expired", None);
    session.storage().set(KEY_ROLE, "user");

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("error=access_denied&message=Denied")).await);

    assert!(session.storage().keys().is_empty());
    // 旧会话不能让守卫把登录页改写成仪表盘
    let decision = guard(loc.clone(), session.is_authenticated());
    assert_eq!(decision, GuardDecision::Render(loc));
    assert_eq!(decision.location().route, AppRoute::Login);
    assert_eq!(decision.location().query_value(QUERY_ERROR), Some("Denied"));
}

// =========================================================
// run: Email Disambiguation
// =========================================================

#[tokio::test]
async fn test_existing_email_goes_to_login_with_notice() {
    let session = session();
    let api = api();
    api_mock_check_email(&api, 200, json!({"exists": true}));

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com&name=Amy")).await);

    assert_eq!(loc.route, AppRoute::Login);
    assert_eq!(loc.query_value(QUERY_NOTICE), Some(MSG_EXISTING_ACCOUNT));
    assert_eq!(loc.query_value(QUERY_EMAIL), Some("a@b.com"));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_new_email_goes_to_register() {
    let session = session();
    let api = api();
    api_mock_check_email(&api, 200, json!({"exists": false}));

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com&name=Amy+Lee")).await);

    assert_eq!(loc.route, AppRoute::Register);
    assert_eq!(loc.query_value(QUERY_EMAIL), Some("a@b.com"));
    assert_eq!(loc.query_value(QUERY_NAME), Some("Amy Lee"));
}

#[tokio::test]
async fn test_new_email_without_name() {
    let session = session();
    let api = api();
    api_mock_check_email(&api, 200, json!({"exists": false}));

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com&name=null")).await);

    assert_eq!(loc.query_value(QUERY_NAME), None);
}

#[tokio::test]
async fn test_email_check_failures_return_to_login() {
    let session = session();

    // 网络失败
    let api = api();
    api.client()
        .mock_network_failure(&format!("{BASE}/auth/check-email?email=a%40b.com"));
    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com")).await);
    assert_eq!(loc.query_value(QUERY_ERROR), Some(MSG_CHECK_EMAIL_FAILED));

    // 响应格式不对
    let api = self::api();
    api_mock_check_email(&api, 200, json!({"unexpected": 1}));
    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com")).await);
    assert_eq!(loc.query_value(QUERY_ERROR), Some(MSG_CHECK_EMAIL_FAILED));

    // 服务端错误
    let api = self::api();
    api_mock_check_email(&api, 500, json!({"error": "db down"}));
    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com")).await);
    assert_eq!(loc.query_value(QUERY_ERROR), Some(MSG_CHECK_EMAIL_FAILED));
}

#[tokio::test]
async fn test_existing_email_with_previous_session_lands_on_login() {
    let session = session();
    let api = api();
    session.set_session("expired", None);
    session.set_retry_count(1);
    api_mock_check_email(&api, 200, json!({"exists": true}));

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com")).await);

    assert!(!session.is_authenticated());
    assert_eq!(session.retry_count(), 1);
    match guard(loc, session.is_authenticated()) {
        GuardDecision::Render(loc) => {
            assert_eq!(loc.route, AppRoute::Login);
            assert_eq!(loc.query_value(QUERY_NOTICE), Some(MSG_EXISTING_ACCOUNT));
        }
        other => panic!("expected login to render, got {other:?}"),
    }
}

#[tokio::test]
async fn test_new_email_with_previous_session_reaches_register() {
    let session = session();
    let api = api();
    session.set_session("expired", None);
    api_mock_check_email(&api, 200, json!({"exists": false}));

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("email=a%40b.com")).await);

    let decision = guard(loc, session.is_authenticated());
    assert!(!decision.is_redirect());
    assert_eq!(decision.location().route, AppRoute::Register);
}

// =========================================================
// run: Unexpected / 幂等
// =========================================================

#[tokio::test]
async fn test_unexpected_callback() {
    let session = session();
    let api = api();
    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("state=abc")).await);

    assert_eq!(loc, AppLocation::login_with_error(MSG_UNEXPECTED));
    assert_eq!(api_request_count(&api), 0);
}

#[tokio::test]
async fn test_unexpected_callback_with_previous_session() {
    let session = session();
    let api = api();
    session.set_session("expired", None);

    let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
    let loc = expect_navigate(seq.run(&params("")).await);

    assert_eq!(
        guard(loc, session.is_authenticated()),
        GuardDecision::Render(AppLocation::login_with_error(MSG_UNEXPECTED))
    );
}

#[tokio::test]
async fn test_same_inputs_same_outcome() {
    let cases = [
        "token=tok",
        "error=auth_failed",
        "error=access_denied",
        "email=a%40b.com",
        "",
    ];
    for query in cases {
        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let session = session();
            let api = api();
            api_mock_check_email(&api, 200, json!({"exists": true}));
            let seq = OAuthSequencer::new(&session, &api, NoClaims, policy());
            outcomes.push((seq.run(&params(query)).await, session.storage().keys()));
        }
        assert_eq!(outcomes[0], outcomes[1], "query = {query:?}");
    }
}

// =========================================================
// Mock 访问
// =========================================================

fn api_mock_check_email(api: &BatteryApi<MockHttpClient>, status: u16, body: serde_json::Value) {
    api.client().mock_response(
        &format!("{BASE}/auth/check-email?email=a%40b.com"),
        status,
        body,
    );
}

fn api_request_count(api: &BatteryApi<MockHttpClient>) -> usize {
    api.client().request_count()
}
