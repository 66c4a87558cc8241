//! Alert action scenarios: in-memory platform, wiremock Puppet Enterprise.

mod common;

use common::{FakeConnector, FakePlatform};
use itsi_bridge::action::build_pe_client;
use itsi_bridge::{ActionError, ActionOutcome, AlertAction, AlertSettings};
use pe_sdk::PeClient;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PE_PATH: &str = "/orchestrator/v1/command/task";

fn settings(endpoint_url: &str, configuration: Value) -> AlertSettings {
    let mut config = json!({ "endpoint_url": endpoint_url });
    if let (Some(base), Value::Object(extra)) = (config.as_object_mut(), configuration) {
        base.extend(extra);
    }
    let input = json!({
        "session_key": "session-key",
        "server_uri": "https://127.0.0.1:8089",
        "result": {
            "event_id": "corr-1",
            "itsi_group_id": "group-7",
            "severity": "5",
            "title": "Disk full",
            "ignored_field": "x",
        },
        "configuration": config,
    });
    AlertSettings::from_json(&input.to_string()).unwrap()
}

fn action(settings: AlertSettings, platform: &Arc<FakePlatform>) -> AlertAction {
    AlertAction::new(
        settings,
        platform.clone(),
        PeClient::new().with_force_https(false),
    )
}

async fn mount_pe(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(PE_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_event_without_id_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PE_PATH))
        .and(body_partial_json(json!({
            "properties": {
                "event_id": "corr-1",
                "title": "Disk full",
                "event_count": 1,
                "events_by_id": { "e1": { "event_id": "e1", "severity": "6", "host": "db01" } },
                "event_ids_by_severity": {
                    "critical": ["e1"],
                    "high": [],
                    "other": [],
                },
                "pe_should_update_correlation": true,
                "pe_should_update_children": false,
            },
            "recipients": [{ "targetName": "ops" }, { "targetName": "dba" }],
            "priority": "HIGH",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "requestId": "req-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let platform = Arc::new(FakePlatform::default().with_children(vec![
        json!({ "event_id": "e1", "severity": "6", "host": "db01" }),
        json!({ "severity": "4", "host": "web01" }),
    ]));
    let settings = settings(
        &format!("{}{PE_PATH}", server.uri()),
        json!({ "recipients": "ops;dba;", "priority": "high" }),
    );

    let outcome = action(settings, &platform).execute().await.unwrap();

    assert_eq!(
        outcome,
        ActionOutcome::Sent {
            request_id: "req-1".to_string(),
            event_count: 1,
        }
    );
    assert_eq!(*platform.requested_groups.lock().unwrap(), ["group-7"]);
    assert_eq!(
        platform.comments(),
        [(
            "corr-1".to_string(),
            "Successfully sent request to Puppet Enterprise: [req-1]".to_string()
        )]
    );
}

#[tokio::test]
async fn test_correlation_properties_exclude_unlisted_keys() {
    let server = MockServer::start().await;
    mount_pe(&server, 200, json!({ "requestId": "req-2" })).await;

    let platform = Arc::new(FakePlatform::default());
    let action = action(
        settings(&format!("{}{PE_PATH}", server.uri()), json!({})),
        &platform,
    );
    action.execute().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["properties"].get("ignored_field").is_none());
    assert!(body["properties"].get("itsi_group_id").is_none());
    assert_eq!(body["properties"]["event_count"], 0);
    assert!(body.get("recipients").is_none());
    assert!(body.get("priority").is_none());
}

#[tokio::test]
async fn test_send_failure_comments_and_fails() {
    let server = MockServer::start().await;
    mount_pe(&server, 500, json!({ "error": "boom" })).await;

    let platform = Arc::new(
        FakePlatform::default().with_children(vec![json!({ "event_id": "e1", "severity": "3" })]),
    );
    let action = action(
        settings(&format!("{}{PE_PATH}", server.uri()), json!({})),
        &platform,
    );

    let err = action.execute().await.unwrap_err();

    assert!(matches!(err, ActionError::SendFailed));
    assert_eq!(
        err.to_string(),
        "Failed to execute one or more send event actions."
    );
    assert_eq!(
        platform.comments(),
        [(
            "corr-1".to_string(),
            "An error occurred while sending request to puppetenterprise. See puppetenterprise_itsi.log for details."
                .to_string()
        )]
    );
}

#[tokio::test]
async fn test_invalid_priority_is_abandoned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "requestId": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let platform = Arc::new(FakePlatform::default());
    let action = action(
        settings(
            &format!("{}{PE_PATH}", server.uri()),
            json!({ "priority": "urgent" }),
        ),
        &platform,
    );

    let outcome = action.execute().await.unwrap();

    let ActionOutcome::Abandoned { reason } = outcome else {
        panic!("expected abandoned outcome, got {outcome:?}");
    };
    assert!(reason.contains("PUPPETENTERPRISE_INVALID_PRIORITY"));
    assert!(platform.comments().is_empty());
}

#[tokio::test]
async fn test_update_children_comments_each_child_once() {
    let server = MockServer::start().await;
    mount_pe(&server, 200, json!({ "requestId": "req-3" })).await;

    let platform = Arc::new(FakePlatform::default().with_children(vec![
        json!({ "event_id": "corr-1", "severity": "5" }),
        json!({ "event_id": "e2", "severity": "2" }),
    ]));
    let action = action(
        settings(
            &format!("{}{PE_PATH}", server.uri()),
            json!({ "update_children": "1" }),
        ),
        &platform,
    );

    action.execute().await.unwrap();

    let commented: Vec<String> = platform.comments().into_iter().map(|(id, _)| id).collect();
    assert_eq!(commented, ["corr-1", "e2"]);
}

#[tokio::test]
async fn test_children_only_when_correlation_update_disabled() {
    let server = MockServer::start().await;
    mount_pe(&server, 200, json!({ "requestId": "req-4" })).await;

    let platform = Arc::new(FakePlatform::default().with_children(vec![
        json!({ "event_id": "corr-1" }),
        json!({ "event_id": "e2" }),
    ]));
    let action = action(
        settings(
            &format!("{}{PE_PATH}", server.uri()),
            json!({ "update_children": true, "update_correlation": false }),
        ),
        &platform,
    );

    action.execute().await.unwrap();

    let commented: Vec<String> = platform.comments().into_iter().map(|(id, _)| id).collect();
    assert_eq!(commented, ["corr-1", "e2"]);
}

#[tokio::test]
async fn test_failed_child_aborts_before_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut platform = FakePlatform::default().with_children(vec![json!({ "event_id": "e1" })]);
    platform.children.push(Err("not an object".to_string()));
    let platform = Arc::new(platform);

    let action = action(
        settings(&format!("{}{PE_PATH}", server.uri()), json!({})),
        &platform,
    );

    let err = action.execute().await.unwrap_err();
    assert!(matches!(err, ActionError::EventSource(_)));
    assert!(platform.comments().is_empty());
}

#[tokio::test]
async fn test_missing_correlation_event_id() {
    let platform = Arc::new(FakePlatform::default());
    let mut settings = settings("https://pe.example.com", json!({}));
    settings.result.remove("event_id");

    let err = action(settings, &platform).execute().await.unwrap_err();
    assert!(matches!(err, ActionError::MissingCorrelationId));
}

#[tokio::test]
async fn test_connect_requires_stored_password_for_username() {
    let platform = Arc::new(FakePlatform::default());
    let connector = FakeConnector(platform);

    let result = AlertAction::connect(
        settings("https://pe.example.com", json!({ "username": "admin" })),
        &connector,
    )
    .await;

    assert!(matches!(result, Err(ActionError::Password { .. })));
}

#[tokio::test]
async fn test_pe_client_credentials() {
    let platform = FakePlatform {
        password: Some("rbac-token".to_string()),
        ..FakePlatform::default()
    };

    let token = settings("https://pe", json!({ "username": "admin" }));
    let client = build_pe_client(&token.configuration, &platform).await.unwrap();
    assert_eq!(client.headers()["x-authentication"], "rbac-token");

    let basic = settings(
        "https://pe",
        json!({ "username": "admin", "auth_scheme": "basic" }),
    );
    let client = build_pe_client(&basic.configuration, &platform).await.unwrap();
    assert!(client.headers()["authorization"]
        .to_str()
        .unwrap()
        .starts_with("Basic "));

    let anonymous = settings("https://pe", json!({}));
    let client = build_pe_client(&anonymous.configuration, &FakePlatform::default())
        .await
        .unwrap();
    assert!(client.headers().get("x-authentication").is_none());
}
