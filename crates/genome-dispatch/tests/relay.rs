//! Relay mailer against a wiremock relay.

use chrono::Utc;
use genome_core::{BrandContext, Report};
use genome_dispatch::{DeliveryError, RelayMailer, ReportMailer, Sender};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sender() -> Sender {
    Sender {
        email: "reports@market-genome.local".to_string(),
        name: "Market Genome".to_string(),
    }
}

fn mailer(server: &MockServer) -> RelayMailer {
    RelayMailer::new(
        &format!("{}/send", server.uri()),
        Some("relay-token".to_string()),
        sender(),
        5,
    )
    .expect("client builds")
}

fn report() -> Report {
    Report::assemble(BrandContext::new("acme").unwrap(), Vec::new(), Utc::now())
}

#[tokio::test]
async fn report_is_posted_with_auth_and_receipt_is_read() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("authorization", "Bearer relay-token"))
        .and(body_partial_json(json!({
            "from": "Market Genome <reports@market-genome.local>",
            "to": "owner@acme.com",
            "subject": "Your Marketing Genome Report is Ready - acme",
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"message_id": "msg-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let report = report();
    let receipt = mailer(&server)
        .send_report(&report, "owner@acme.com")
        .await
        .unwrap();

    assert_eq!(receipt.message_id, "msg-1");
    assert_eq!(receipt.report_id, Some(report.id));
}

#[tokio::test]
async fn report_body_carries_the_serialized_report() {
    let server = MockServer::start().await;
    let report = report();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"report": {"id": report.id}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message_id": "msg-2"})))
        .expect(1)
        .mount(&server)
        .await;

    mailer(&server)
        .send_report(&report, "owner@acme.com")
        .await
        .unwrap();
}

#[tokio::test]
async fn relay_rejection_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("relay overloaded"))
        .mount(&server)
        .await;

    let err = mailer(&server)
        .send_report(&report(), "owner@acme.com")
        .await
        .unwrap_err();
    match err {
        DeliveryError::Rejected { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "relay overloaded");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_message_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queued": true})))
        .mount(&server)
        .await;

    let err = mailer(&server)
        .send_failure_notice("owner@acme.com", "acme", "provider unavailable")
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Malformed(_)));
}

#[tokio::test]
async fn failure_notice_has_no_report_attached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "subject": "Issue Processing Your Marketing Genome Report",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message_id": "msg-3"})))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = mailer(&server)
        .send_failure_notice("owner@acme.com", "acme", "invalid credentials")
        .await
        .unwrap();
    assert_eq!(receipt.report_id, None);
}
