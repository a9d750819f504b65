use std::time::Duration;

use chrono::Utc;
use hnnp_receiver::config::HealthEndpoint;
use hnnp_receiver::health::{serve, DEGRADED_AFTER_FAILURES};
use hnnp_receiver::{DeliveryError, HealthTracker, ReceiverHealth, ShutdownSignal};
use hnnp_receiver::transport::StatusCode;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn get_health(url: &str) -> ReceiverHealth {
    // The server task may still be binding on the first attempt.
    for _ in 0..50 {
        if let Ok(response) = reqwest::get(url).await {
            assert!(response.status().is_success());
            return response.json().await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("health endpoint never came up at {url}");
}

#[tokio::test]
async fn health_endpoint_reports_tracker_and_stops_on_shutdown() {
    let endpoint = HealthEndpoint {
        host: "127.0.0.1".into(),
        port: free_port(),
    };
    let url = format!("http://{endpoint}/health");
    let tracker = HealthTracker::new();
    let shutdown = ShutdownSignal::new();

    let server = tokio::spawn({
        let endpoint = endpoint.clone();
        let tracker = tracker.clone();
        let shutdown = shutdown.clone();
        async move { serve(&endpoint, tracker, shutdown).await }
    });

    let health = get_health(&url).await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.total_attempts, 0);

    let error = DeliveryError::Status {
        url: "http://backend/v2/presence".into(),
        status: StatusCode::BAD_GATEWAY,
    };
    for _ in 0..DEGRADED_AFTER_FAILURES {
        tracker.record_attempt(Utc::now());
        tracker.record_failure(&error);
    }

    let health = get_health(&url).await;
    assert_eq!(health.status, "degraded");
    assert_eq!(health.total_failures, DEGRADED_AFTER_FAILURES);
    assert!(health.last_error.unwrap().contains("502"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn occupied_port_is_a_startup_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = HealthEndpoint {
        host: "127.0.0.1".into(),
        port: listener.local_addr().unwrap().port(),
    };

    let err = serve(&endpoint, HealthTracker::new(), ShutdownSignal::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("health endpoint"));
}
