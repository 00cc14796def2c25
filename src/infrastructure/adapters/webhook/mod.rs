//! Generic chat platform webhook
//!
//! The platform calls `GET` on the webhook path once to verify ownership
//! and then `POST`s every user message. Replies go back in the response
//! body and, when an API base is configured, are also pushed to the
//! platform's `/messages` endpoint.

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::services::{ConnectorCredentials, WebhookSettings};
use crate::domain::entities::{BotReply, UserMessage};
use crate::domain::traits::{InputChannel, MessageHandler};

pub const WEBHOOK_CHANNEL: &str = "webhook";
pub const WEBHOOK_PATH: &str = "/webhooks/platform/webhook";
pub const CLIENT_TOKEN_HEADER: &str = "x-client-token";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IncomingMessage {
    pub sender: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutgoingReplies {
    pub replies: Vec<String>,
}

/// Pushes replies to the platform API
pub struct ReplyPusher {
    client: Client,
    api_base: String,
    developer_token: String,
}

impl ReplyPusher {
    pub fn new(api_base: impl Into<String>, developer_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            developer_token: developer_token.into(),
        }
    }

    pub async fn push(&self, reply: &BotReply) -> Result<(), BotError> {
        let url = format!("{}/messages", self.api_base.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.developer_token)
            .json(reply)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!("Platform API error: {}", response.status())));
        }
        Ok(())
    }
}

#[derive(Clone)]
struct WebhookState {
    handler: Arc<dyn MessageHandler>,
    credentials: Arc<ConnectorCredentials>,
    pusher: Option<Arc<ReplyPusher>>,
}

/// Webhook input channel served with axum
pub struct WebhookChannel {
    credentials: ConnectorCredentials,
    settings: WebhookSettings,
}

impl WebhookChannel {
    pub fn new(credentials: ConnectorCredentials, settings: WebhookSettings) -> Self {
        Self { credentials, settings }
    }

    pub fn router(&self, handler: Arc<dyn MessageHandler>) -> Router {
        let pusher = self.settings.api_base.as_ref().map(|base| {
            Arc::new(ReplyPusher::new(base.clone(), self.credentials.developer_token.clone()))
        });
        let state = WebhookState {
            handler,
            credentials: Arc::new(self.credentials.clone()),
            pusher,
        };

        Router::new()
            .route("/", get(health))
            .route(WEBHOOK_PATH, get(verify).post(receive))
            .with_state(state)
    }
}

#[async_trait]
impl InputChannel for WebhookChannel {
    fn name(&self) -> &str {
        WEBHOOK_CHANNEL
    }

    async fn start(&self, handler: Arc<dyn MessageHandler>) -> Result<(), BotError> {
        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| BotError::Channel(format!("Failed to bind {}: {}", addr, e)))?;
        tracing::info!("Webhook listening on {}{}", addr, WEBHOOK_PATH);

        axum::serve(listener, self.router(handler))
            .await
            .map_err(|e| BotError::Channel(e.to_string()))
    }
}

async fn health() -> &'static str {
    "dynamo-bot webhook is running"
}

async fn verify(State(state): State<WebhookState>, Query(params): Query<VerifyParams>) -> Response {
    if params.verify_token.as_deref() == Some(state.credentials.verification_token.as_str()) {
        tracing::info!("Webhook verified (mode {:?})", params.mode);
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        tracing::warn!("Webhook verification failed");
        (StatusCode::FORBIDDEN, "Verification token mismatch").into_response()
    }
}

async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(incoming): Json<IncomingMessage>,
) -> Response {
    let token = headers.get(CLIENT_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if token != Some(state.credentials.client_token.as_str()) {
        tracing::warn!("Rejected webhook call with missing or wrong client token");
        return (StatusCode::UNAUTHORIZED, "Invalid client token").into_response();
    }

    let message = UserMessage::new(incoming.sender, incoming.message).with_channel(WEBHOOK_CHANNEL);
    let replies = match state.handler.handle(message).await {
        Ok(replies) => replies,
        Err(e) => {
            tracing::error!("Failed to handle message: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    if let Some(pusher) = &state.pusher {
        for reply in &replies {
            if let Err(e) = pusher.push(reply).await {
                tracing::error!("Failed to push reply to {}: {}", reply.recipient_id, e);
            }
        }
    }

    Json(OutgoingReplies {
        replies: replies.into_iter().map(|r| r.text).collect(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::routing::post;
    use std::sync::Mutex;

    struct EchoHandler;

    #[async_trait]
    impl MessageHandler for EchoHandler {
        async fn handle(&self, message: UserMessage) -> Result<Vec<BotReply>, BotError> {
            assert_eq!(message.channel, WEBHOOK_CHANNEL);
            Ok(vec![BotReply::new(message.sender_id, format!("Echo: {}", message.text))])
        }
    }

    fn credentials() -> ConnectorCredentials {
        ConnectorCredentials {
            developer_token: "dev".to_string(),
            client_token: "client".to_string(),
            verification_token: "verify".to_string(),
        }
    }

    fn state(pusher: Option<Arc<ReplyPusher>>) -> WebhookState {
        WebhookState {
            handler: Arc::new(EchoHandler),
            credentials: Arc::new(credentials()),
            pusher,
        }
    }

    fn client_headers(token: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_TOKEN_HEADER, HeaderValue::from_static(token));
        headers
    }

    fn incoming(text: &str) -> Json<IncomingMessage> {
        Json(IncomingMessage { sender: "u1".to_string(), message: text.to_string() })
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_verify_echoes_challenge() {
        let params = VerifyParams {
            mode: Some("subscribe".to_string()),
            verify_token: Some("verify".to_string()),
            challenge: Some("12345".to_string()),
        };
        let response = verify(State(state(None)), Query(params)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "12345");
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_token() {
        let params = VerifyParams { verify_token: Some("nope".to_string()), ..Default::default() };
        let response = verify(State(state(None)), Query(params)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_receive_requires_client_token() {
        let response = receive(State(state(None)), HeaderMap::new(), incoming("hi")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = receive(State(state(None)), client_headers("wrong"), incoming("hi")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_receive_returns_replies() {
        let response = receive(State(state(None)), client_headers("client"), incoming("hi")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: OutgoingReplies = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.replies, vec!["Echo: hi"]);
    }

    #[tokio::test]
    async fn test_replies_are_pushed_with_developer_token() {
        let pushed: Arc<Mutex<Vec<(String, BotReply)>>> = Arc::default();
        let recorded = pushed.clone();
        let platform = Router::new().route(
            "/messages",
            post(move |headers: HeaderMap, Json(reply): Json<BotReply>| {
                let recorded = recorded.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    recorded.lock().unwrap().push((auth, reply));
                    StatusCode::OK
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, platform).await });

        let pusher = Arc::new(ReplyPusher::new(format!("http://{}/", addr), "dev"));
        let response = receive(State(state(Some(pusher))), client_headers("client"), incoming("hi")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let pushed = pushed.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].0, "Bearer dev");
        assert_eq!(pushed[0].1, BotReply::new("u1", "Echo: hi"));
    }

    #[tokio::test]
    async fn test_router_serves_over_http() {
        let settings = WebhookSettings { host: "127.0.0.1".to_string(), port: 0, api_base: None };
        let channel = WebhookChannel::new(credentials(), settings);
        assert_eq!(channel.name(), WEBHOOK_CHANNEL);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = channel.router(Arc::new(EchoHandler));
        tokio::spawn(async move { axum::serve(listener, router).await });

        let client = Client::new();
        let health = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert!(health.status().is_success());

        let replies: OutgoingReplies = client
            .post(format!("http://{}{}", addr, WEBHOOK_PATH))
            .header(CLIENT_TOKEN_HEADER, "client")
            .json(&IncomingMessage { sender: "u2".to_string(), message: "yo".to_string() })
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(replies.replies, vec!["Echo: yo"]);
    }
}
