use std::time::Duration;

use hnnp_devkit::{PresenceContract, TestHarness};
use hnnp_receiver::transport::StatusCode;
use hnnp_receiver::{DeliveryError, PresenceSink, PresenceTransport};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(base_url: &str) -> PresenceTransport {
    PresenceTransport::new(base_url, Duration::from_secs(5)).expect("client builds")
}

#[tokio::test]
async fn posts_report_as_json_to_presence_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/presence"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = TestHarness::sample_report(1_700_000_007);
    transport(&server.uri())
        .deliver_presence(&report)
        .await
        .expect("2xx is success");

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    PresenceContract::strict().check(&body).unwrap();
    assert_eq!(body["org_id"], report.org_id.as_str());
    assert_eq!(body["receiver_id"], report.receiver_id.as_str());
    assert_eq!(body["timestamp"], 1_700_000_007);
    assert_eq!(body["time_slot"], 113_333_333);
    assert_eq!(body["version"], 2);
    assert_eq!(body["flags"], 0);
}

#[tokio::test]
async fn trailing_slash_variants_hit_same_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/presence"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&server)
        .await;

    let report = TestHarness::sample_report(60);
    for base in [
        server.uri(),
        format!("{}/", server.uri()),
        format!("{}///", server.uri()),
    ] {
        let transport = transport(&base);
        assert_eq!(transport.endpoint(), format!("{}/v2/presence", server.uri()));
        transport.deliver(&report).await.expect("delivered");
    }
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cloud/v2/presence"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    transport(&format!("{}/cloud/", server.uri()))
        .deliver_presence(&TestHarness::sample_report(15))
        .await
        .expect("delivered under prefix");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/presence"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport(&server.uri())
        .deliver_presence(&TestHarness::sample_report(15))
        .await
        .unwrap_err();

    match &err {
        DeliveryError::Status { url, status } => {
            assert_eq!(*status, StatusCode::SERVICE_UNAVAILABLE);
            assert!(url.ends_with("/v2/presence"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn client_errors_are_not_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = transport(&server.uri())
        .deliver_presence(&TestHarness::sample_report(15))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let transport = PresenceTransport::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = transport
        .deliver_presence(&TestHarness::sample_report(15))
        .await
        .unwrap_err();

    match err {
        DeliveryError::Network { source, .. } => assert!(source.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    // Grab a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = transport(&format!("http://{addr}"))
        .deliver_presence(&TestHarness::sample_report(15))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Network { .. }), "got {err:?}");
}

#[tokio::test]
async fn malformed_base_url_is_invalid_url() {
    let err = transport("not a url")
        .deliver_presence(&TestHarness::sample_report(15))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::InvalidUrl { .. }), "got {err:?}");
}
