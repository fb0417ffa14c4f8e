//! Agent and user administration endpoints.

mod common;

use kbchat::client::{ChatClient, ClientError};
use kbchat::models::Agent;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::test_token;

fn authed_client(server: &MockServer) -> ChatClient {
    ChatClient::with_url(&server.uri()).with_auth(&test_token())
}

fn coder() -> Agent {
    Agent {
        name: "coder".to_string(),
        description: "Writes code".to_string(),
        model_name: "gemini".to_string(),
        system_prompt: "You write Rust.".to_string(),
    }
}

#[tokio::test]
async fn test_agent_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/agents/coder"))
        .and(header("Authorization", format!("Bearer {}", test_token())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "coder",
            "description": "Writes code",
            "model_name": "gemini",
            "system_prompt": "You write Rust."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let agent = authed_client(&mock_server).agent_get("coder").await.unwrap();
    assert_eq!(agent, coder());
}

#[tokio::test]
async fn test_agent_create_posts_definition() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/agents"))
        .and(body_json(json!({
            "name": "coder",
            "description": "Writes code",
            "model_name": "gemini",
            "system_prompt": "You write Rust."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "coder",
            "description": "Writes code",
            "model_name": "gemini",
            "system_prompt": "You write Rust."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let created = authed_client(&mock_server)
        .agent_create(&coder())
        .await
        .unwrap();
    assert_eq!(created.name, "coder");
}

#[tokio::test]
async fn test_agent_update_can_rename() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/agents/coder"))
        .and(body_json(json!({
            "name": "reviewer",
            "description": "Writes code",
            "model_name": "gemini",
            "system_prompt": "You write Rust."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "reviewer",
            "description": "Writes code",
            "model_name": "gemini",
            "system_prompt": "You write Rust."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let renamed = Agent {
        name: "reviewer".to_string(),
        ..coder()
    };
    let updated = authed_client(&mock_server)
        .agent_update("coder", &renamed)
        .await
        .unwrap();
    assert_eq!(updated.name, "reviewer");
}

#[tokio::test]
async fn test_agent_delete_and_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/agents/coder"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/agents/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Agent not found"))
        .mount(&mock_server)
        .await;

    let client = authed_client(&mock_server);
    client.agent_delete("coder").await.unwrap();

    let err = client.agent_delete("ghost").await.unwrap_err();
    assert!(matches!(err, ClientError::ServerError { status: 404, .. }));
}

#[tokio::test]
async fn test_users_list_and_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"user_id": "u1", "email": "jan@example.com", "given_name": "Jan", "family_name": "Kos", "roles": ["admin"]},
            {"user_id": "u2", "email": "ola@example.com", "given_name": null, "family_name": null, "roles": null}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/jan@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": "u1",
            "email": "jan@example.com",
            "given_name": "Jan",
            "family_name": "Kos",
            "roles": ["admin"],
            "terms_accepted": true,
            "disabled": false
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = authed_client(&mock_server);
    let users = client.users_list().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].display_name(), "Jan Kos");
    assert_eq!(users[1].display_name(), "ola@example.com");
    assert!(users[1].roles.is_empty());

    let user = client.user_get("jan@example.com").await.unwrap();
    assert!(user.terms_accepted);
    assert_eq!(user.extra.get("disabled"), Some(&json!(false)));
}

#[tokio::test]
async fn test_user_update_sends_back_unknown_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/users/jan@example.com"))
        .and(body_json(json!({
            "user_id": "u1",
            "email": "jan@example.com",
            "given_name": "Janek",
            "family_name": "Kos",
            "roles": ["admin", "editor"],
            "terms_accepted": true,
            "disabled": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": "u1",
            "email": "jan@example.com",
            "given_name": "Janek",
            "roles": ["admin", "editor"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut user: kbchat::models::User = serde_json::from_value(json!({
        "user_id": "u1",
        "email": "jan@example.com",
        "given_name": "Jan",
        "family_name": "Kos",
        "roles": ["admin"],
        "terms_accepted": true,
        "disabled": false
    }))
    .unwrap();
    user.given_name = Some("Janek".to_string());
    user.roles.push("editor".to_string());

    let updated = authed_client(&mock_server)
        .user_update("jan@example.com", &user)
        .await
        .unwrap();
    assert_eq!(updated.given_name.as_deref(), Some("Janek"));
}

#[tokio::test]
async fn test_user_delete_verdicts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/users/a@x.io"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/b@x.io"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/c@x.io"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let client = authed_client(&mock_server);
    assert!(client.user_delete("a@x.io").await.unwrap());
    assert!(!client.user_delete("b@x.io").await.unwrap());

    let err = client.user_delete("c@x.io").await.unwrap_err();
    assert_eq!(err.status(), Some(403));
}
