//! End-to-end submission tests against a live listener.

use contact_relay::audit::email_hash;
use contact_relay::config::RelayConfig;
use contact_relay::security::RateLimiter;
use reqwest::header::{CACHE_CONTROL, LOCATION, ORIGIN, REFERER, X_CONTENT_TYPE_OPTIONS};
use reqwest::StatusCode;

mod common;

use common::{client, valid_form, RecordingTransport, TestRelay};

#[tokio::test]
async fn test_valid_submission_redirects_and_delivers() {
    let relay = TestRelay::start().await;

    let res = client()
        .post(relay.url())
        .header(ORIGIN, "https://example.com")
        .form(&valid_form())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[LOCATION], "/thanks.html");
    let rid = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(rid.len(), 32);

    let sent = relay.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "info@example.com");
    assert!(sent[0].body.contains("Teszt Elek"));
    assert!(sent[0].body.contains(&rid));

    assert_eq!(relay.audit_kinds(), vec!["validated", "mail_sent"]);
    let events = relay.audit_events();
    assert_eq!(events[0]["rid"], rid.as_str());
    assert_eq!(events[0]["ip"], "127.0.0.1");
    assert_eq!(events[0]["email_hash"], email_hash("teszt@example.com"));
    assert!(events[0].get("email").is_none());
    assert_eq!(events[1]["to"], "info@example.com");
}

#[tokio::test]
async fn test_honeypot_returns_ok_without_delivery() {
    let relay = TestRelay::start().await;
    let mut form = valid_form();
    form.retain(|(k, _)| *k != "website");
    form.push(("website", "http://spam.example".to_string()));

    let res = client().post(relay.url()).form(&form).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "OK");
    assert!(relay.sent().is_empty());
    assert_eq!(relay.audit_kinds(), vec!["honeypot_hit"]);
}

#[tokio::test]
async fn test_sixth_request_in_window_is_rate_limited() {
    let relay = TestRelay::start().await;
    let client = client();

    for i in 0..5 {
        let res = client.post(relay.url()).form(&valid_form()).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "request {i}");
    }

    let res = client.post(relay.url()).form(&valid_form()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("Too many requests"));
    assert!(!body.contains("Error ID"));

    assert_eq!(relay.sent().len(), 5);
    assert_eq!(relay.audit_kinds().last().unwrap(), "rate_limited");
}

#[tokio::test]
async fn test_foreign_origin_is_forbidden() {
    let relay = TestRelay::start().await;

    let res = client()
        .post(relay.url())
        .header(ORIGIN, "https://evil.example")
        .form(&valid_form())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "Forbidden origin.");
    assert!(relay.sent().is_empty());

    let events = relay.audit_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "runtime_error");
    assert_eq!(events[0]["reason"], "forbidden_origin");
}

#[tokio::test]
async fn test_referer_is_checked_when_origin_is_absent() {
    let relay = TestRelay::start().await;

    let res = client()
        .post(relay.url())
        .header(REFERER, "https://www.example.com/kapcsolat.html")
        .form(&valid_form())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = client()
        .post(relay.url())
        .header(REFERER, "https://example.org/")
        .form(&valid_form())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_too_many_links_is_rejected() {
    let relay = TestRelay::start().await;
    let mut form = valid_form();
    form.retain(|(k, _)| *k != "message");
    form.push(("message", "http://a ".repeat(6)));

    let res = client().post(relay.url()).form(&form).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "The message contains too many links.");
    assert!(relay.sent().is_empty());

    let events = relay.audit_events();
    assert_eq!(events[0]["reason"], "too_many_links");
    assert_eq!(events[0]["url_count"], 6);
}

#[tokio::test]
async fn test_missing_required_field() {
    let relay = TestRelay::start().await;
    let form = [("name", "Teszt"), ("email", "teszt@example.com")];

    let res = client().post(relay.url()).form(&form).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "Missing required field.");
}

#[tokio::test]
async fn test_invalid_email() {
    let relay = TestRelay::start().await;
    let mut form = valid_form();
    form.retain(|(k, _)| *k != "email");
    form.push(("email", "not-an-address".to_string()));

    let res = client().post(relay.url()).form(&form).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "Invalid e-mail format.");
}

#[tokio::test]
async fn test_delivery_failure_reports_error_id() {
    let transport = RecordingTransport {
        fail: true,
        ..Default::default()
    };
    let relay = TestRelay::start_with(RelayConfig::default(), transport).await;

    let res = client().post(relay.url()).form(&valid_form()).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let rid = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = res.text().await.unwrap();
    assert!(body.ends_with(&format!("(Error ID: {rid})")));
    assert!(!body.contains("queue unavailable"));

    assert_eq!(relay.audit_kinds(), vec!["validated", "mail_failed"]);
    let events = relay.audit_events();
    assert_eq!(events[1]["to"], "info@example.com");
    assert!(events[1]["warning"].as_str().unwrap().contains("queue unavailable"));
}

#[tokio::test]
async fn test_rate_limit_storage_failure_reports_error_id() {
    let relay = TestRelay::start().await;
    let limiter = RateLimiter::new(relay.dirs.rate_limit_dir());
    std::fs::create_dir_all(limiter.record_path("ip:127.0.0.1")).unwrap();

    let res = client().post(relay.url()).form(&valid_form()).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let rid = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = res.text().await.unwrap();
    assert_eq!(body, format!("A server error occurred. (Error ID: {rid})"));
    assert!(relay.sent().is_empty());

    let events = relay.audit_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "runtime_error");
    assert_eq!(events[0]["reason"], "unexpected_internal");
    assert_eq!(events[0]["rid"], rid.as_str());
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let relay = TestRelay::start().await;

    let res = client().get(relay.url()).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "POST");
    assert!(relay.audit_events().is_empty());
}

#[tokio::test]
async fn test_hardening_headers_on_every_response() {
    let relay = TestRelay::start().await;

    let ok = client().post(relay.url()).form(&valid_form()).send().await.unwrap();
    let rejected = client()
        .post(relay.url())
        .header(ORIGIN, "https://evil.example")
        .form(&valid_form())
        .send()
        .await
        .unwrap();

    for res in [ok, rejected] {
        assert_eq!(res.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(res.headers()[CACHE_CONTROL], "no-store, max-age=0");
        assert!(res.headers().contains_key("x-request-id"));
    }
}

#[tokio::test]
async fn test_audit_pii_opt_in() {
    let mut config = RelayConfig::default();
    config.audit.log_pii = true;
    let relay = TestRelay::start_with(config, RecordingTransport::default()).await;

    let res = client().post(relay.url()).form(&valid_form()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let events = relay.audit_events();
    assert_eq!(events[0]["email"], "teszt@example.com");
    assert_eq!(events[0]["name"], "Teszt Elek");
}

#[tokio::test]
async fn test_audit_disabled_writes_nothing() {
    let mut config = RelayConfig::default();
    config.audit.enabled = false;
    let relay = TestRelay::start_with(config, RecordingTransport::default()).await;

    let res = client().post(relay.url()).form(&valid_form()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(!relay.audit_file().exists());
}
