// src/models/chat.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Semantic role of a bot message. Governs rendering on the dashboard and
/// which decision actions attach to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    News,
    Linkedin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
    System,
}

/// Decline annotation. Populated in place on the original message when the
/// user rejects it; the original content itself is never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFeedback {
    pub is_declined: bool,
    pub text: String,
    pub refined_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<MessageFeedback>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::User,
            content: content.into(),
            content_type: None,
            feedback: None,
        }
    }

    pub fn bot(content: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::Bot,
            content: content.into(),
            content_type: Some(content_type),
            feedback: None,
        }
    }

}

/// One research conversation thread. Stored as a single row with the
/// message list as a JSONB document, so each handler mutation is one write.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub is_processing: bool,
    pub messages: Json<Vec<Message>>,
    pub created_at: DateTime<Utc>,
}

/// Projection returned by the history listing: summary fields plus the full
/// message list, matching what the dashboard sidebar renders.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub is_processing: bool,
    pub messages: Json<Vec<Message>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

// Request bodies for the chat lifecycle endpoints. Session ids arrive as
// strings and are validated before any store access.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub keywords: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    pub session_id: String,
    pub last_message_content: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclinedMessage {
    pub content: String,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequest {
    pub session_id: String,
    pub feedback: String,
    pub last_message: DeclinedMessage,
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}
