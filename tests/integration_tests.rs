use std::time::Duration;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinichat::context::PREAMBLE;
use clinichat::request::{MALFORMED_REPLY, UNRECOGNIZED_REPLY};
use clinichat::session::APOLOGY;
use clinichat::{
  ChatBackend, ChatConfig, ChatSession, CompletionRequest, Error,
  GenieClient, Role, TurnStatus,
};

const ENDPOINT: &str = "/api/2.0/genie/completions";

/// Config pointing at a mock workspace
fn test_config(workspace_url: &str) -> ChatConfig
{   ChatConfig
    {   api_key: "test_key".to_string()
      , workspace_url: workspace_url.to_string()
      , ..ChatConfig::default()
    }
}

async fn mount_reply(server: &MockServer, body: serde_json::Value)
{   Mock::given(method("POST"))
      .and(path(ENDPOINT))
      .respond_with(ResponseTemplate::new(200).set_body_json(body))
      .mount(server)
      .await;
}

/// Bodies of every completion request the server saw
async fn sent_requests(server: &MockServer) -> Vec<CompletionRequest>
{   server.received_requests().await
      .unwrap_or_default()
      .iter()
      .map(|r| serde_json::from_slice(&r.body).unwrap())
      .collect()
}

#[test]
fn test_client_requires_api_key()
{   let config = ChatConfig::default();
    let err = assert_err!(GenieClient::new(&config));
    assert_eq!(err, Error::MissingApiKey);
    assert!(err.is_configuration());

    let blank = ChatConfig
    {   api_key: "   ".to_string()
      , ..ChatConfig::default()
    };
    assert_eq!(
      GenieClient::new(&blank).unwrap_err(),
      Error::MissingApiKey
    );
}

#[test]
fn test_client_rejects_out_of_range_settings()
{   let config = ChatConfig
    {   temperature: 2.5
      , ..test_config("http://localhost")
    };
    let err = assert_err!(GenieClient::new(&config));
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn test_client_with_api_key()
{   let config = test_config("https://example.databricks.com/");
    let client = assert_ok!(GenieClient::new(&config));
    assert_eq!(client.authorization(), "Bearer test_key");
    assert_eq!(
      client.url(),
      "https://example.databricks.com/api/2.0/genie/completions"
    );
    assert!(!format!("{:?}", client).contains("test_key"));
}

#[test]
fn test_build_request_uses_defaults_and_overrides()
{   let client = GenieClient::new(&test_config("http://localhost"))
      .unwrap();

    let defaults = client.build_request("Hi", None, None, None).unwrap();
    assert_eq!(defaults.model, "genie-1-mistral");
    assert_eq!(defaults.max_tokens, 2000);
    assert_eq!(defaults.temperature, 0.3);
    assert!(defaults.prompt.contains("QUESTION: Hi\n\nANSWER:\n"));

    let custom = client
      .build_request("Hi", Some("other"), Some(64), Some(0.0))
      .unwrap();
    assert_eq!(custom.model, "other");
    assert_eq!(custom.max_tokens, 64);
    assert_eq!(custom.temperature, 0.0);

    assert!(client.build_request("Hi", None, Some(0), None).is_err());
}

#[tokio::test]
async fn test_generate_completion_success()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(ENDPOINT))
      .and(header("Authorization", "Bearer test_key"))
      .and(header("Content-Type", "application/json"))
      .and(body_partial_json(json!({
        "model": "genie-1-mistral",
        "max_tokens": 2000
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "text": "This is a test response" }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let client = GenieClient::new(&test_config(&server.uri())).unwrap();
    let result = assert_ok!(
      client.generate_completion("Test prompt", None, None, None).await
    );
    assert_eq!(result["choices"][0]["text"], "This is a test response");

    let sent = sent_requests(&server).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].prompt.contains("QUESTION: Test prompt"));
    assert!(sent[0].prompt.contains("consulting healthcare professionals"));
}

#[tokio::test]
async fn test_generate_completion_http_error()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(ENDPOINT))
      .respond_with(
        ResponseTemplate::new(500).set_body_string("upstream exploded")
      )
      .mount(&server)
      .await;

    let client = GenieClient::new(&test_config(&server.uri())).unwrap();
    let err = assert_err!(
      client.generate_completion("Test prompt", None, None, None).await
    );
    assert_eq!(
      err,
      Error::ApiError
      {   status: 500
        , body: "upstream exploded".to_string()
      }
    );
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_generate_completion_unreachable_host()
{   let client = GenieClient::new(&test_config("http://127.0.0.1:1"))
      .unwrap();
    let err = assert_err!(
      client.generate_completion("Test prompt", None, None, None).await
    );
    assert!(err.is_transport(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_generate_completion_non_json_body()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(ENDPOINT))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
      .mount(&server)
      .await;

    let client = GenieClient::new(&test_config(&server.uri())).unwrap();
    let err = assert_err!(
      client.generate_completion("Test prompt", None, None, None).await
    );
    assert!(matches!(err, Error::ParseError(_)));
}

#[tokio::test]
async fn test_generate_completion_timeout()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(ENDPOINT))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({ "result": "late" }))
          .set_delay(Duration::from_secs(3))
      )
      .mount(&server)
      .await;

    let config = ChatConfig
    {   timeout_secs: 1
      , ..test_config(&server.uri())
    };
    let client = GenieClient::new(&config).unwrap();
    let err = assert_err!(
      client.generate_completion("Test prompt", None, None, None).await
    );
    assert_eq!(err, Error::Timeout);
}

#[tokio::test]
async fn test_respond_success()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({
      "choices": [{ "text": "  Test response  " }]
    })).await;

    let mut session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    let reply = session.respond("Test question").await;

    assert_eq!(reply, "Test response");
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role(), Role::User);
    assert_eq!(history[0].content(), "Test question");
    assert_eq!(history[1].role(), Role::Assistant);
    assert_eq!(history[1].content(), "Test response");
}

#[tokio::test]
async fn test_respond_transport_failure_apologizes()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(ENDPOINT))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let mut session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    let turn = session.respond_with_status("Test question").await;

    assert_eq!(turn.reply, APOLOGY);
    assert!(matches!(
      turn.status,
      TurnStatus::Failed(Error::ApiError { status: 503, .. })
    ));
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].content(), APOLOGY);
}

#[tokio::test]
async fn test_respond_unreachable_host_apologizes()
{   let mut session
      = ChatSession::from_config(&test_config("http://127.0.0.1:1"))
        .unwrap();

    for n in 1..=3
    {   let reply = session.respond("Anyone there?").await;
        assert!(!reply.is_empty());
        assert_eq!(reply, APOLOGY);
        assert_eq!(session.history().len(), n * 2);
    }
}

#[tokio::test]
async fn test_respond_unknown_shape_falls_back()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({ "unknown_key": "value" })).await;

    let mut session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    let turn = session.respond_with_status("Test question").await;

    assert_eq!(turn.reply, UNRECOGNIZED_REPLY);
    assert_eq!(
      turn.status,
      TurnStatus::Unreadable(Error::UnrecognizedResponse)
    );
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn test_respond_empty_text_falls_back()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({ "result": "   " })).await;

    let mut session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    let turn = session.respond_with_status("Test question").await;

    assert_eq!(turn.reply, MALFORMED_REPLY);
    assert!(!turn.is_answered());
}

#[tokio::test]
async fn test_respond_sends_conversation_window()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({ "result": "Answer" })).await;

    let mut session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    session.respond("Question 1").await;
    session.respond("Question 2").await;

    let sent = sent_requests(&server).await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0].prompt.contains(&format!(
      "QUESTION: {}User: Question 1\n\n\n\nANSWER:",
      PREAMBLE
    )));
    assert!(sent[1].prompt.contains(
      "User: Question 1\n\nAssistant: Answer\n\nUser: Question 2\n\n"
    ));
    assert!(!sent[1].prompt.contains("User: \n"));
}

#[tokio::test]
async fn test_reset_clears_history()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({ "result": "Response" })).await;

    let mut session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    session.respond("Test").await;
    assert!(session.context().ends_with("User: "));

    session.reset();
    assert!(session.history().is_empty());
    assert_eq!(session.context(), PREAMBLE);
}

#[tokio::test]
async fn test_backend_round_trip()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({
      "choices": [{ "text": "Drink water." }]
    })).await;

    let session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    let backend = ChatBackend::new(session);

    let mut rx = backend
      .send_message("What helps a headache?".to_string())
      .await
      .unwrap();
    let turn = assert_ok!(rx.recv().await.unwrap());
    assert_eq!(turn.reply, "Drink water.");
    assert!(turn.is_answered());

    let mut rx = backend.get_history().await.unwrap();
    let history = rx.recv().await.unwrap().unwrap();
    assert_eq!(history.len(), 2);

    let mut rx = backend.clear_history().await.unwrap();
    assert_ok!(rx.recv().await.unwrap());

    let mut rx = backend.get_history().await.unwrap();
    assert!(rx.recv().await.unwrap().unwrap().is_empty());

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_backend_serializes_messages()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({ "result": "ok" })).await;

    let session
      = ChatSession::from_config(&test_config(&server.uri())).unwrap();
    let backend = ChatBackend::new(session);

    let mut receivers = Vec::new();
    for i in 0..4
    {   receivers.push(
          backend.send_message(format!("message {}", i)).await.unwrap()
        );
    }
    for mut rx in receivers
    {   assert_eq!(rx.recv().await.unwrap().unwrap().reply, "ok");
    }

    let mut rx = backend.get_history().await.unwrap();
    let history = rx.recv().await.unwrap().unwrap();
    assert_eq!(history.len(), 8);
    for pair in history.chunks(2)
    {   assert_eq!(pair[0].role(), Role::User);
        assert_eq!(pair[1].role(), Role::Assistant);
    }

    let _ = backend.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_backend_keeps_command_order()
{   let server = MockServer::start().await;
    mount_reply(&server, json!({ "result": "ok" })).await;
    let config = test_config(&server.uri());

    for _ in 0..20
    {   let backend
          = ChatBackend::new(ChatSession::from_config(&config).unwrap());

        let first = backend.send_message("first".to_string()).await.unwrap();
        let cleared = backend.clear_history().await.unwrap();
        let second = backend.send_message("second".to_string()).await.unwrap();
        let mut history_rx = backend.get_history().await.unwrap();

        let contents: Vec<String> = history_rx.recv().await.unwrap()
          .unwrap()
          .iter()
          .map(|m| m.content().to_string())
          .collect();
        assert_eq!(contents, vec!["second", "ok"]);

        drop((first, cleared, second));
        assert_ok!(backend.shutdown().await);
    }
}

#[test]
fn test_session_settings_follow_config()
{   let config = ChatConfig
    {   model: "genie-2".to_string()
      , window_size: 3
      , ..test_config("http://localhost")
    };
    let session = ChatSession::from_config(&config).unwrap();
    assert_eq!(session.window_size(), 3);

    let client = GenieClient::new(&config).unwrap();
    assert_eq!(client.model(), "genie-2");
    let session = ChatSession::new(client);
    assert_eq!(session.window_size(), 5);
}
