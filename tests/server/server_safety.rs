use reqwest::Method;

use crate::helpers::{start_server, ServerPorts};

#[tokio::test]
async fn should_handle_no_body_passed_to_control_plane() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .post(&format!(
            "http://localhost:{}/",
            dsl.server_ports.control_plane
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(400, response.status());
}

#[tokio::test]
async fn should_describe_malformed_command() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .post(&format!(
            "http://localhost:{}/",
            dsl.server_ports.control_plane
        ))
        .body(r#"{"Unknown":{}}"#)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body: serde_json::Value = response.json().await.expect("Body is not JSON");

    assert_eq!(400, status);
    assert!(body.get("MalformedCommand").is_some());
}

#[tokio::test]
async fn should_reject_non_post_on_control_plane() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .get(&format!(
            "http://localhost:{}/",
            dsl.server_ports.control_plane
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(405, response.status());
}

#[tokio::test]
async fn should_report_unknown_instance() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .post(&format!(
            "http://localhost:{}/",
            dsl.server_ports.control_plane
        ))
        .body(r#"{"ResetAllScenarios":{"instance":"missing"}}"#)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body: serde_json::Value = response.json().await.expect("Body is not JSON");

    assert_eq!(404, status);
    assert_eq!(body, serde_json::json!("InstanceNotFound"));
}

#[tokio::test]
async fn should_not_serve_mocks_for_unknown_instance() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .get(&format!(
            "http://localhost:{}/instances/missing/scenarios/any/things",
            dsl.server_ports.mock
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(404, response.status());
}

#[tokio::test]
async fn should_answer_mock_requests_before_any_instance_exists() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .get(&format!("http://localhost:{}/anything", dsl.server_ports.mock))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(404, response.status());
}

#[tokio::test]
async fn should_handle_cors_for_control_port() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .request(
            Method::OPTIONS,
            &format!("http://localhost:{}/", dsl.server_ports.control_plane),
        )
        .send()
        .await
        .expect("Failed to send request");
    let headers = response.headers();

    assert_eq!(200, response.status());
    assert_eq!("*", headers.get("access-control-allow-origin").unwrap());
}

#[tokio::test]
async fn should_handle_cors_for_mock_port() {
    let dsl = setup_server().await;

    let response = dsl
        .client
        .request(
            Method::OPTIONS,
            &format!("http://localhost:{}/", dsl.server_ports.mock),
        )
        .send()
        .await
        .expect("Failed to send request");
    let headers = response.headers();

    assert_eq!(200, response.status());
    assert_eq!("*", headers.get("access-control-allow-origin").unwrap());
}

struct Dsl {
    client: reqwest::Client,
    server_ports: ServerPorts,
}

async fn setup_server() -> Dsl {
    let server_ports = start_server().await;
    let client = reqwest::Client::new();
    Dsl {
        client,
        server_ports,
    }
}
