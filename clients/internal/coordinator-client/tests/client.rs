// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

// Allow expect/unwrap in tests - they provide clear panic messages on failure
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Request/response behaviour of the transport client against a mock
//! coordinator.

use std::time::Duration;

use coordinator_client::types::routes;
use coordinator_client::types::{Task, TaskStatus};
use coordinator_client::{ClientConfig, ClientError, CoordinatorClient, Request, ensure_success};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(server.uri());
    config.token = Some("s3cret".to_string());
    config
}

fn client(server: &MockServer) -> CoordinatorClient {
    CoordinatorClient::new(config(server)).expect("client builds")
}

/// Query-encoded routes carry options in the URL and the token in the
/// Authorization header.
#[tokio::test]
async fn test_query_options_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/42"))
        .and(query_param("verbose", "1"))
        .and(header("authorization", "token s3cret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "42", "status": "running"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let task: Task = client(&server)
        .execute(
            Request::new(&routes::TASK_SHOW)
                .interpolate("id", "42")
                .option("verbose", 1),
        )
        .await
        .unwrap();

    assert_eq!(task.id, "42");
    assert_eq!(task.status, TaskStatus::Running);
}

/// Form-encoded routes send options as the request body
#[tokio::test]
async fn test_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/update/field"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("name=build-42&priority=3.5&tags=x&tags=y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client(&server)
        .execute_for_envelope(
            Request::new(&routes::TASK_UPDATE_FIELD)
                .option("name", "build-42")
                .option("tags", vec!["x", "y"])
                .option("priority", 3.5),
        )
        .await
        .unwrap();

    assert_eq!(envelope.status, "ok");
    assert!(!envelope.is_error());
}

/// An application-level failure inside a 200 is returned, not raised
#[tokio::test]
async fn test_envelope_error_is_visible() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/nodes/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "unknown key",
            "payload": {"key": "abc"}
        })))
        .mount(&server)
        .await;

    let envelope = client(&server).register_node("abc", "builder-1").await.unwrap();

    assert!(envelope.is_error());
    assert_eq!(envelope.message, "unknown key");
    assert_eq!(envelope.payload["key"], "abc");
}

#[tokio::test]
async fn test_non_2xx_reaches_handler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/7"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let client = client(&server);
    let status = client
        .execute_raw(
            Request::new(&routes::TASK_SHOW).interpolate("id", "7"),
            |response| async move { Ok(response.status().as_u16()) },
        )
        .await
        .unwrap();
    assert_eq!(status, 503);

    let err = client
        .execute_raw(
            Request::new(&routes::TASK_SHOW).interpolate("id", "7"),
            |response| async move { ensure_success(response).map(|_| ()) },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 503 }));
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let res: Result<Task, _> = client(&server)
        .execute(Request::new(&routes::TASK_SHOW).interpolate("id", "1"))
        .await;
    assert!(matches!(res, Err(ClientError::Decode(_))));
}

/// Encoding failures are reported before anything is sent
#[tokio::test]
async fn test_encoding_errors_send_nothing() {
    let server = MockServer::start().await;
    let client = client(&server);

    let missing = client
        .execute_for_envelope(Request::new(&routes::TASK_SHOW))
        .await;
    assert!(matches!(missing, Err(ClientError::Encoding(_))));

    let nan = client
        .execute_for_envelope(Request::new(&routes::TASK_UPDATE).option("n", f64::NAN))
        .await;
    assert!(matches!(nan, Err(ClientError::Encoding(_))));

    let form_with_body = client
        .execute_for_envelope(Request::new(&routes::TASK_UPDATE).body("raw"))
        .await;
    assert!(matches!(form_with_body, Err(ClientError::Encoding(_))));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_token_no_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nodes/tasks/agent-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = CoordinatorClient::new(ClientConfig::new(server.uri())).unwrap();
    let tasks = client.node_tasks("agent-1").await.unwrap();
    assert!(tasks.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "slow"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.timeout = Some(Duration::from_millis(200));
    let client = CoordinatorClient::new(config).unwrap();

    let res = client.fetch_task("slow").await;
    assert!(matches!(res, Err(ClientError::Timeout(_))), "{:?}", res);
}

#[tokio::test]
async fn test_connection_error() {
    // Nothing listens on the discard port of the loopback address
    let client = CoordinatorClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
    let res = client.fetch_task("1").await;
    assert!(matches!(res, Err(ClientError::Connection(_))), "{:?}", res);
}

/// 404 and empty-id answers both mean the coordinator does not know the task
#[tokio::test]
async fn test_fetch_task_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": ""})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(client.fetch_task("gone").await.unwrap(), None);
    assert_eq!(client.fetch_task("blank").await.unwrap(), None);
    assert!(matches!(
        client.fetch_task("broken").await,
        Err(ClientError::Server { status: 500 })
    ));
}

#[tokio::test]
async fn test_task_scoped_helpers_need_active_doc() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/append"))
        .and(body_string("id=99&output=hello+world"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server);
    assert!(matches!(
        client.append_task_output("hello world").await,
        Err(ClientError::Encoding(_))
    ));

    client.set_doc("99");
    let envelope = client.append_task_output("hello world").await.unwrap();
    assert_eq!(envelope.status, "ok");
}

#[tokio::test]
async fn test_set_task_status_and_artefacts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/update"))
        .and(body_string("id=5&status=running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/5/artefacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["build.log", "out.tar"])))
        .mount(&server)
        .await;

    let mut client = client(&server);
    client.set_doc("5");
    client.set_task_status(TaskStatus::Running).await.unwrap();
    assert_eq!(
        client.task_artefacts("5").await.unwrap(),
        vec!["build.log".to_string(), "out.tar".to_string()]
    );
}

#[tokio::test]
async fn test_set_task_field_and_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/update/field"))
        .and(body_string("field=log&id=5&value=a+b%3Dc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/update"))
        .and(body_string("exit_status=0&id=5&result=success"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server);
    client.set_doc("5");
    let envelope = client.set_task_field("log", "a b=c").await.unwrap();
    assert_eq!(envelope.status, "ok");
    client.set_task_result("success", "0").await.unwrap();
}

#[tokio::test]
async fn test_fetch_current_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "5", "status": "done"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server);
    let err = client.fetch_current_task().await.unwrap_err();
    assert!(matches!(err, ClientError::Encoding(_)), "{:?}", err);

    client.set_doc("5");
    let task = client.fetch_current_task().await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
}

/// Cookies set by one response are replayed on later requests of the same
/// client, and only when the jar is enabled.
#[tokio::test]
async fn test_cookie_jar() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc; Path=/")
                .set_body_json(json!({"id": "login"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/private"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "private"})))
        .mount(&server)
        .await;

    let with_jar = CoordinatorClient::new(config(&server).with_cookie_jar()).unwrap();
    assert!(with_jar.has_cookie_jar());
    with_jar.fetch_task("login").await.unwrap();
    let task = with_jar.fetch_task("private").await.unwrap();
    assert_eq!(task.map(|t| t.id), Some("private".to_string()));

    let without = client(&server);
    assert!(!without.has_cookie_jar());
    without.fetch_task("login").await.unwrap();
    // No cookie, so no mock matches and wiremock answers 404
    assert_eq!(without.fetch_task("private").await.unwrap(), None);
}

#[tokio::test]
async fn test_base_url_with_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coordinator/api/tasks/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "3"})))
        .mount(&server)
        .await;

    let mut client = client(&server);
    client.set_base_url(format!("{}/coordinator/", server.uri()));
    let task = client.fetch_task("3").await.unwrap();
    assert_eq!(task.map(|t| t.id), Some("3".to_string()));
}
