//! REST client for the chat backend.
//!
//! Wraps the `/api` endpoints: login and passwords, chats, message
//! streaming, models, agents, users, session files and the knowledge base.
//! Answers to a message come back as an [`EventStream`] decoded from the
//! comma-prefixed JSON lines body.
//!
//! A request answered with 401 is sent again once, after the tokens were
//! renewed with the refresh token.

mod agents;
mod auth;
mod files;
mod keepalive;
mod knowledge_base;
mod users;

pub use keepalive::{spawn_keepalive, KeepAlive};

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, DEFAULT_BASE_URL};
use crate::error::{ErrorCategory, StreamError};
use crate::models::{
    AgentListing, ChatMessage, ChatSession, ChatSessionHeader, Tokens, NEW_CHAT_ID,
};
use crate::stream::{decode_response, DecoderConfig, EventStream};

/// Error type for [`ChatClient`] operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The message stream broke off
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// JSON deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error status
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Configured base URL cannot be used
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// A local file to upload could not be read
    #[error("Cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Broad category, used to pick a recovery hint.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Http(_) | ClientError::Stream(_) => ErrorCategory::Network,
            ClientError::Json(_) => ErrorCategory::Client,
            ClientError::ServerError { status, .. } => match status {
                401 | 403 => ErrorCategory::Auth,
                400..=499 => ErrorCategory::Client,
                _ => ErrorCategory::Server,
            },
            ClientError::InvalidUrl(_) | ClientError::File { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns true if repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Stream(e) => e.is_retryable(),
            other => other.category().is_retryable(),
        }
    }

    /// HTTP status for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::ServerError { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Credentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Client for the chat backend API.
///
/// Cheap to clone; clones share the connection pool and the tokens, so a
/// refresh done by one clone is seen by all of them.
#[derive(Debug, Clone)]
pub struct ChatClient {
    /// Backend root, without `/api`
    pub base_url: String,
    credentials: Arc<RwLock<Credentials>>,
    refresh_lock: Arc<Mutex<()>>,
    decoder: DecoderConfig,
    client: Client,
}

impl ChatClient {
    /// Create a client for the default local backend.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_BASE_URL)
    }

    /// Create a client for a custom backend URL.
    ///
    /// The URL is validated lazily; requests fail with [`ClientError::InvalidUrl`].
    pub fn with_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Arc::default(),
            refresh_lock: Arc::default(),
            decoder: DecoderConfig::default(),
            client: Client::new(),
        }
    }

    /// Create a client from resolved configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut client = Self::with_url(&config.base_url).with_decoder_config(config.decoder);
        if let Some(token) = &config.access_token {
            client = client.with_auth(token);
        }
        if let Some(token) = &config.refresh_token {
            client = client.with_refresh_token(token);
        }
        client
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_auth(self, token: &str) -> Self {
        self.with_credentials(|c| c.access_token = Some(token.to_string()))
    }

    /// Refresh the access token with this token when the backend answers 401.
    pub fn with_refresh_token(self, token: &str) -> Self {
        self.with_credentials(|c| c.refresh_token = Some(token.to_string()))
    }

    /// Use a different wire format for streamed answers.
    pub fn with_decoder_config(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    /// Bearer token in use, if any.
    pub fn access_token(&self) -> Option<String> {
        self.read_credentials().access_token.clone()
    }

    /// Replace both tokens, e.g. after a login.
    pub fn set_tokens(&self, tokens: &Tokens) {
        let mut credentials = self.write_credentials();
        credentials.access_token = Some(tokens.access_token.clone());
        credentials.refresh_token = Some(tokens.refresh_token.clone());
    }

    fn with_credentials(mut self, edit: impl FnOnce(&mut Credentials)) -> Self {
        let mut credentials = self.read_credentials().clone();
        edit(&mut credentials);
        self.credentials = Arc::new(RwLock::new(credentials));
        self
    }

    fn read_credentials(&self) -> RwLockReadGuard<'_, Credentials> {
        self.credentials.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_credentials(&self) -> RwLockWriteGuard<'_, Credentials> {
        self.credentials.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exchange credentials for a token pair.
    ///
    /// Sent as an HTML form, without any configured bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<Tokens, ClientError> {
        let url = self.endpoint(&["login"])?;
        debug!(%url, username, "Logging in");
        let request = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)]);
        let response = send_checked(request).await?;
        read_json(response).await
    }

    /// Trade a refresh token for a new token pair.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens, ClientError> {
        let url = self.endpoint(&["token-refresh"])?;
        debug!(%url, "Refreshing access token");
        let request = self
            .client
            .post(url)
            .bearer_auth(refresh_token)
            .json(&serde_json::json!({}));
        let response = send_checked(request).await?;
        read_json(response).await
    }

    /// Touch the backend so it keeps the session alive.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["ping"])?;
        self.send(self.request(Method::GET, url)).await?;
        Ok(())
    }

    /// Names of the models an answer can be generated with.
    pub async fn models(&self) -> Result<Vec<String>, ClientError> {
        self.get_json(&["models"]).await
    }

    /// Configured agents.
    pub async fn agents(&self) -> Result<Vec<AgentListing>, ClientError> {
        self.get_json(&["agents"]).await
    }

    /// All chats of the current user, headers only.
    pub async fn list_chats(&self) -> Result<Vec<ChatSessionHeader>, ClientError> {
        self.get_json(&["chats"]).await
    }

    /// A chat with its full history.
    pub async fn get_chat(&self, chat_session_id: &str) -> Result<ChatSession, ClientError> {
        self.get_json(&["chats", chat_session_id]).await
    }

    /// Ask the backend for a fresh, empty chat.
    pub async fn new_chat(&self) -> Result<ChatSession, ClientError> {
        self.get_chat(NEW_CHAT_ID).await
    }

    /// Replace the stored history of a chat.
    pub async fn put_chat(&self, session: &ChatSession) -> Result<(), ClientError> {
        let url = self.endpoint(&["chats", session.id()])?;
        debug!(%url, messages = session.history.len(), "Saving chat session");
        self.send(self.request(Method::PUT, url).json(session)).await?;
        Ok(())
    }

    /// Delete a chat.
    pub async fn delete_chat(&self, chat_session_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["chats", chat_session_id])?;
        debug!(%url, "Deleting chat session");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    /// Post a message and stream the answer.
    ///
    /// The status is checked before any body is read; a non-2xx response is
    /// returned as [`ClientError::ServerError`]. Dropping the returned stream
    /// cancels the request.
    pub async fn send_message(
        &self,
        chat_session_id: &str,
        agent: &str,
        message: &ChatMessage,
    ) -> Result<EventStream, ClientError> {
        let mut url = self.endpoint(&["chats", chat_session_id, "messages"])?;
        url.query_pairs_mut().append_pair("agent", agent);
        debug!(%url, agent, "Sending chat message");

        let request = self
            .request(Method::POST, url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(message);
        let response = self.send(request).await?;

        Ok(decode_response(response.bytes_stream(), self.decoder))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.send(self.request(Method::GET, url)).await?;
        read_json(response).await
    }

    /// Build `<base_url>/api/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let invalid = || ClientError::InvalidUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send with the current bearer token.
    ///
    /// A 401 answer is retried once after refreshing the tokens, if a refresh
    /// token is known and the request body can be replayed.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let retry = request.try_clone();
        let sent_with = self.access_token();
        let result = send_checked(authorize(request, sent_with.as_deref())).await;

        match (result, retry) {
            (Err(ClientError::ServerError { status: 401, message }), Some(retry)) => {
                if !self.renew_session(sent_with.as_deref()).await? {
                    return Err(ClientError::ServerError {
                        status: 401,
                        message,
                    });
                }
                let token = self.access_token();
                send_checked(authorize(retry, token.as_deref())).await
            }
            (result, _) => result,
        }
    }

    /// Refresh the tokens after `rejected` was refused.
    ///
    /// Returns false when no refresh token is known. When another request
    /// already replaced the rejected token, nothing is refreshed.
    async fn renew_session(&self, rejected: Option<&str>) -> Result<bool, ClientError> {
        let _guard = self.refresh_lock.lock().await;
        let (current, refresh) = {
            let credentials = self.read_credentials();
            (
                credentials.access_token.clone(),
                credentials.refresh_token.clone(),
            )
        };
        if current.as_deref() != rejected {
            debug!("Access token was renewed concurrently");
            return Ok(true);
        }
        let Some(refresh) = refresh else {
            return Ok(false);
        };

        info!("Access token rejected; refreshing");
        let tokens = self.refresh_token(&refresh).await?;
        self.set_tokens(&tokens);
        Ok(true)
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Send a request and turn non-2xx statuses into [`ClientError::ServerError`].
async fn send_checked(request: RequestBuilder) -> Result<Response, ClientError> {
    let response = request.send().await?;
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let url = response.url().to_string();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    warn!(status, %url, %message, "Backend returned an error status");
    Err(ClientError::ServerError { status, message })
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Read a delete verdict. An empty or `null` body counts as success.
async fn read_verdict(response: Response) -> Result<bool, ClientError> {
    let body = response.text().await?;
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Ok(true);
    }
    Ok(serde_json::from_str(body)?)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
