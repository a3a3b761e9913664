// src/store.rs - CRUD over the chat_sessions collection.
//
// Each function is a single statement against the session row; "not found"
// surfaces as Ok(None) so handlers decide the response shape.
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::chat::{ChatSession, Message, SessionSummary};

/// Sessions returned per user by the history listing.
const HISTORY_LIMIT: i64 = 50;

pub async fn create_session(
    pool: &PgPool,
    user_id: &str,
    title: &str,
    messages: Vec<Message>,
) -> Result<ChatSession, sqlx::Error> {
    sqlx::query_as::<_, ChatSession>(
        "INSERT INTO chat_sessions (user_id, title, is_processing, messages)
         VALUES ($1, $2, TRUE, $3)
         RETURNING *",
    )
    .bind(user_id)
    .bind(title)
    .bind(Json(messages))
    .fetch_one(pool)
    .await
}

pub async fn get_session(pool: &PgPool, id: Uuid) -> Result<Option<ChatSession>, sqlx::Error> {
    sqlx::query_as::<_, ChatSession>("SELECT * FROM chat_sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Newest-first summaries for a user, capped at the history limit.
pub async fn list_sessions(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<SessionSummary>, sqlx::Error> {
    sqlx::query_as::<_, SessionSummary>(
        "SELECT id, title, is_processing, messages, created_at
         FROM chat_sessions
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await
}

/// Append one message and set the processing flag in a single write.
pub async fn append_message(
    pool: &PgPool,
    id: Uuid,
    message: &Message,
    is_processing: bool,
) -> Result<Option<ChatSession>, sqlx::Error> {
    sqlx::query_as::<_, ChatSession>(
        "UPDATE chat_sessions
         SET messages = messages || $2::jsonb, is_processing = $3
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(Json(vec![message.clone()]))
    .bind(is_processing)
    .fetch_optional(pool)
    .await
}

/// Replace the whole message document. Used by decline, where the original
/// message is annotated in place and the refinement appended before one save.
pub async fn save_messages(
    pool: &PgPool,
    id: Uuid,
    messages: &[Message],
    is_processing: bool,
) -> Result<Option<ChatSession>, sqlx::Error> {
    sqlx::query_as::<_, ChatSession>(
        "UPDATE chat_sessions
         SET messages = $2, is_processing = $3
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(Json(messages.to_vec()))
    .bind(is_processing)
    .fetch_optional(pool)
    .await
}

pub async fn set_processing(
    pool: &PgPool,
    id: Uuid,
    is_processing: bool,
) -> Result<Option<ChatSession>, sqlx::Error> {
    sqlx::query_as::<_, ChatSession>(
        "UPDATE chat_sessions SET is_processing = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(is_processing)
    .fetch_optional(pool)
    .await
}

pub async fn update_title(
    pool: &PgPool,
    id: Uuid,
    title: &str,
) -> Result<Option<ChatSession>, sqlx::Error> {
    sqlx::query_as::<_, ChatSession>(
        "UPDATE chat_sessions SET title = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(title)
    .fetch_optional(pool)
    .await
}

/// Delete a session. Returns the deleted id, or None when nothing matched,
/// so callers can report missing sessions instead of claiming success.
pub async fn delete_session(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("DELETE FROM chat_sessions WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(pool)
        .await
}
