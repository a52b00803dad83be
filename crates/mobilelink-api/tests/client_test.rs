#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` fetching and session recovery, using
// wiremock. The short-login helper serves a sign-in page that already
// carries the final form, so credential logins complete in two requests
// and the tests can count them precisely.

use mobilelink_api::models::property_codes;
use mobilelink_api::{Account, ApiClient, Credentials, Error};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

async fn server_and_client(credentials: Credentials) -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::from_reqwest(
        credentials,
        reqwest::Client::new(),
        &server.uri(),
        &server.uri(),
    )
    .unwrap();
    (server, client)
}

fn token_credentials() -> Credentials {
    Credentials::Token("jwt-token".to_string().into())
}

fn account() -> Account {
    Account::new("owner@example.com", "hunter2".to_string())
}

fn final_form_page(action: &str) -> String {
    format!(
        r#"<html><body>
        <form method="post" action="{action}">
            <input type="hidden" name="state" value="st"/>
            <input type="hidden" name="code" value="co"/>
        </form>
        </body></html>"#
    )
}

/// Mount a sign-in flow that short-circuits on the first page (the page
/// already carries the final form) and expect exactly `logins` passes.
async fn mount_short_login(server: &MockServer, logins: u64) {
    let action = format!("{}/signin-oidc", server.uri());
    Mock::given(method("GET"))
        .and(path("/Auth/SignIn"))
        .respond_with(ResponseTemplate::new(200).set_body_string(final_form_page(&action)))
        .expect(logins)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/signin-oidc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(logins)
        .mount(server)
        .await;
}

// ── Versioned fallback ──────────────────────────────────────────────

#[tokio::test]
async fn test_list_falls_back_to_older_generation() {
    let (server, mut client) = server_and_client(token_credentials()).await;

    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/Apparatus/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "apparatusId": 101, "type": 0, "name": "House" },
            { "apparatusId": 102, "type": 7, "name": "Tank monitor" },
            { "apparatusId": 103, "type": 0, "name": "Barn" },
        ])))
        .mount(&server)
        .await;
    for id in [101, 103] {
        Mock::given(method("GET"))
            .and(path(format!("/v5/Apparatus/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apparatusStatus": 1,
                "statusLabel": "Ready",
                "properties": [{ "type": 71, "value": 12.0 }],
            })))
            .mount(&server)
            .await;
    }

    let data = client.fetch_device_data().await.unwrap().unwrap();

    assert_eq!(data.len(), 2);
    assert!(data.contains_key("101"));
    assert!(data.contains_key("103"));
    assert_eq!(data["101"].apparatus.name.as_deref(), Some("House"));
}

#[tokio::test]
async fn test_detail_falls_back_to_oldest_generation() {
    let (server, mut client) = server_and_client(token_credentials()).await;

    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "apparatusId": 55, "type": 0, "name": "House", "serialNumber": "SN-55" },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/55"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/Apparatus/details/55"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apparatusStatus": 2,
            "statusLabel": "Running",
            "properties": [{ "type": 70, "value": "45.5" }],
        })))
        .mount(&server)
        .await;

    let data = client.fetch_device_data().await.unwrap().unwrap();
    let item = &data["55"];

    assert_eq!(item.apparatus_detail.apparatus_status, Some(2));
    assert_eq!(item.apparatus_detail.status_label.as_deref(), Some("Running"));
    let hours = item.apparatus_detail.property(property_codes::ENGINE_HOURS);
    assert_eq!(hours.and_then(|v| v.as_f64()), Some(45.5));
}

#[tokio::test]
async fn test_both_list_generations_empty_is_no_data() {
    let (server, mut client) = server_and_client(token_credentials()).await;

    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/Apparatus/list"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let data = client.fetch_device_data().await.unwrap();
    assert!(data.is_none());
}

#[tokio::test]
async fn test_non_generator_apparatus_is_skipped_without_detail_fetch() {
    let (server, mut client) = server_and_client(token_credentials()).await;

    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "apparatusId": 1, "type": 3, "name": "Propane tank" },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let data = client.fetch_device_data().await.unwrap().unwrap();
    assert!(data.is_empty());
}

// ── Session-expiry retry ────────────────────────────────────────────

#[tokio::test]
async fn test_expiry_retries_exactly_once_after_fresh_login() {
    let (server, mut client) = server_and_client(Credentials::Account(account())).await;
    mount_short_login(&server, 2).await;

    // First list attempt signals expiry; every later one succeeds.
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "apparatusId": 7, "type": 0 },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "apparatusStatus": 2 })))
        .mount(&server)
        .await;

    let data = client.fetch_device_data().await.unwrap().unwrap();

    // Second attempt's data, one login per pass (asserted by the mock
    // expectations when the server drops).
    assert_eq!(data.len(), 1);
    assert!(data.contains_key("7"));
}

#[tokio::test]
async fn test_double_expiry_is_a_hard_failure() {
    let (server, mut client) = server_and_client(Credentials::Account(account())).await;
    mount_short_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = client.fetch_device_data().await.unwrap_err();
    assert!(
        matches!(err, Error::SessionExpired { status: 401 }),
        "expected SessionExpired, got: {err:?}"
    );
}

#[tokio::test]
async fn test_malformed_list_payload_is_not_retried_as_expiry() {
    let (server, mut client) = server_and_client(token_credentials()).await;

    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway error</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.fetch_device_data().await.unwrap_err();
    assert!(
        matches!(err, Error::Deserialization { .. }),
        "expected Deserialization, got: {err:?}"
    );
}

// ── Cookie-mode probe ───────────────────────────────────────────────

#[tokio::test]
async fn test_valid_cookie_probe_skips_login() {
    let credentials = Credentials::Cookies {
        header: "sid=abc; device=xyz".into(),
        fallback: None,
    };
    let (server, mut client) = server_and_client(credentials).await;

    // Probe plus enumeration, both carrying the raw cookie header. No
    // sign-in mocks are mounted, so any login attempt would fail loudly.
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .and(header("Cookie", "sid=abc; device=xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "apparatusId": 9, "type": 0 },
        ])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "apparatusStatus": 1 })))
        .mount(&server)
        .await;

    let data = client.fetch_device_data().await.unwrap().unwrap();
    assert_eq!(data.len(), 1);
}

#[tokio::test]
async fn test_expired_cookies_without_fallback_is_invalid_credentials() {
    let credentials = Credentials::Cookies {
        header: "sid=stale".into(),
        fallback: None,
    };
    let (server, mut client) = server_and_client(credentials).await;

    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client.fetch_device_data().await.unwrap_err();
    assert!(
        matches!(err, Error::InvalidCredentials { .. }),
        "expected InvalidCredentials, got: {err:?}"
    );
}

#[tokio::test]
async fn test_expired_cookies_fall_back_to_full_sign_in() {
    let credentials = Credentials::Cookies {
        header: "sid=stale".into(),
        fallback: Some(account()),
    };
    let (server, mut client) = server_and_client(credentials).await;

    // Stale cookie: the probe's list call signals expiry once.
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "apparatusId": 12, "type": 0 },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v5/Apparatus/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "apparatusStatus": 1 })))
        .mount(&server)
        .await;

    // Full five-step flow this time: settings blob, Self-Asserted,
    // confirmation page, final form.
    let settings_page = "<html><body><script>\nvar SETTINGS = {\"csrf\":\"csrf-1\",\"transId\":\"tx-1\"};\n</script></body></html>";
    Mock::given(method("GET"))
        .and(path("/Auth/SignIn"))
        .respond_with(ResponseTemplate::new(200).set_body_string(settings_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/SelfAsserted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "200" })))
        .expect(1)
        .mount(&server)
        .await;
    let action = format!("{}/signin-oidc", server.uri());
    Mock::given(method("GET"))
        .and(path("/api/CombinedSigninAndSignup/confirmed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(final_form_page(&action)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/signin-oidc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let data = client.fetch_device_data().await.unwrap().unwrap();
    assert_eq!(data.len(), 1);
    assert!(data.contains_key("12"));
}
