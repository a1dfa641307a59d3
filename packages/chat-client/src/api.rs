//! The seam between the session and the server.
//!
//! `ChatSession` only talks to `ChatApi`; `HttpChatApi` is the REST + SSE
//! implementation, tests substitute an in-memory one.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::feed::{ChatFeed, FeedStream};
use crate::types::*;

/// Chat operations available to an authenticated user.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_conversations(&self, filter: ConversationFilter) -> Result<Vec<ConversationSummary>>;

    async fn create_conversation(
        &self,
        title: Option<&str>,
        target_user_id: Option<UserId>,
    ) -> Result<Conversation>;

    async fn rename_conversation(&self, id: ConversationId, title: &str) -> Result<Conversation>;

    async fn delete_conversation(&self, id: ConversationId) -> Result<()>;

    /// Page of a conversation; `offset == 0` marks it read server-side.
    async fn list_messages(&self, id: ConversationId, limit: i64, offset: i64) -> Result<MessagePage>;

    async fn send_message(&self, id: ConversationId, content: &str) -> Result<Message>;

    async fn delete_message(&self, id: MessageId) -> Result<()>;

    async fn unread_count(&self) -> Result<i64>;

    /// Open the change feed for the authenticated user.
    async fn subscribe(&self) -> Result<FeedStream>;
}

/// REST client for `/api/chat`.
#[derive(Clone)]
pub struct HttpChatApi {
    http_client: Client,
    base_url: String,
    token: String,
}

impl HttpChatApi {
    /// `base_url` points at the chat mount, e.g. `http://localhost:8080/api/chat`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Replace the bearer token (after a refresh).
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Chat API request failed");
            ClientError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        warn!(status = %status, error = %message, "Chat API error");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self, filter: ConversationFilter) -> Result<Vec<ConversationSummary>> {
        self.json(
            self.request(Method::GET, "/conversations")
                .query(&[("filter", filter.as_str())]),
        )
        .await
    }

    async fn create_conversation(
        &self,
        title: Option<&str>,
        target_user_id: Option<UserId>,
    ) -> Result<Conversation> {
        self.json(
            self.request(Method::POST, "/conversations")
                .json(&CreateConversationBody { title, target_user_id }),
        )
        .await
    }

    async fn rename_conversation(&self, id: ConversationId, title: &str) -> Result<Conversation> {
        self.json(
            self.request(Method::PUT, &format!("/conversations/{}", id))
                .json(&RenameConversationBody { title }),
        )
        .await
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/conversations/{}", id)))
            .await?;
        Ok(())
    }

    async fn list_messages(&self, id: ConversationId, limit: i64, offset: i64) -> Result<MessagePage> {
        let start = std::time::Instant::now();
        let page: MessagePage = self
            .json(
                self.request(Method::GET, &format!("/conversations/{}/messages", id))
                    .query(&[("limit", limit), ("offset", offset)]),
            )
            .await?;

        debug!(
            conversation_id = %id,
            offset,
            received = page.messages.len(),
            duration_ms = start.elapsed().as_millis(),
            "Fetched message page"
        );
        Ok(page)
    }

    async fn send_message(&self, id: ConversationId, content: &str) -> Result<Message> {
        self.json(
            self.request(Method::POST, &format!("/conversations/{}/messages", id))
                .json(&SendMessageBody { content }),
        )
        .await
    }

    async fn delete_message(&self, id: MessageId) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/messages/{}", id)))
            .await?;
        Ok(())
    }

    async fn unread_count(&self) -> Result<i64> {
        let response: UnreadCountResponse =
            self.json(self.request(Method::GET, "/unread-count")).await?;
        Ok(response.count)
    }

    async fn subscribe(&self) -> Result<FeedStream> {
        let response = self
            .send(
                self.request(Method::GET, "/stream")
                    .header(header::ACCEPT, "text/event-stream"),
            )
            .await?;

        Ok(Box::pin(ChatFeed::new(response.bytes_stream())))
    }
}
