// src/handlers/chat.rs
//
// Session lifecycle handlers. Each request advances a session through the
// conversation states: initiate -> decision on news -> accept (draft a post)
// or decline (refine) -> decision on the draft -> terminal accept. Webhook
// calls always precede store writes so a failed integration leaves the
// session exactly as it was.
use crate::error::ApiError;
use crate::models::chat::{
    AcceptRequest, ChatSession, ContentType, DeclineRequest, InitiateRequest, Message,
    MessageFeedback, MessageRole, RenameRequest, SessionSummary,
};
use crate::store;
use crate::AppState;
use axum::extract::{Extension, Path};
use axum::response::Json;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/chat/history/:user_id", get(get_history))
        .route("/api/chat/session/:session_id", get(get_session))
        .route("/api/chat/initiate", post(initiate))
        .route("/api/chat/accept", post(accept))
        .route("/api/chat/decline", post(decline))
        .route("/api/chat/rename/:session_id", put(rename_session))
        .route("/api/chat/delete/:session_id", delete(delete_session))
}

async fn get_history(
    Path(user_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let sessions = store::list_sessions(&state.db_pool, &user_id).await?;
    Ok(Json(sessions))
}

async fn get_session(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<ChatSession>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    store::get_session(&state.db_pool, session_id)
        .await?
        .map(Json)
        .ok_or_else(session_not_found)
}

async fn initiate(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<InitiateRequest>,
) -> Result<Json<ChatSession>, ApiError> {
    // A comma-separated submission is processed one keyword per cycle; the
    // client queues the rest and re-initiates after each completed cycle.
    let keyword = first_keyword(&payload.keywords)
        .ok_or_else(|| ApiError::Validation("Keywords are required".to_string()))?;

    tracing::info!("💬 Starting research session for keyword: {}", keyword);
    let insights = state.webhooks.fetch_news_insights(&keyword).await;

    let messages = vec![
        Message::user(keyword.clone()),
        Message::bot(insights, ContentType::News),
    ];
    let session = store::create_session(
        &state.db_pool,
        &payload.user_id,
        &session_title(&keyword),
        messages,
    )
    .await?;

    tracing::info!("Created chat session {}", session.id);
    Ok(Json(session))
}

async fn accept(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<ChatSession>, ApiError> {
    let session_id = parse_session_id(&payload.session_id)?;

    let session = match payload.content_type {
        ContentType::News => {
            let post = state
                .webhooks
                .create_content(&payload.last_message_content)
                .await?;
            let message = Message::bot(post, ContentType::Linkedin);
            store::append_message(&state.db_pool, session_id, &message, false).await?
        }
        // Accepting the drafted post is terminal; the dashboard offers the
        // copy action on its own.
        ContentType::Linkedin => store::set_processing(&state.db_pool, session_id, false).await?,
    };

    session.map(Json).ok_or_else(session_not_found)
}

async fn decline(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<DeclineRequest>,
) -> Result<Json<ChatSession>, ApiError> {
    let session_id = parse_session_id(&payload.session_id)?;
    let message_id = Uuid::parse_str(&payload.message_id)
        .map_err(|_| ApiError::Validation("Invalid message id".to_string()))?;

    let feedback = payload.feedback.trim();
    if feedback.is_empty() {
        return Err(ApiError::Validation("Feedback cannot be empty".to_string()));
    }

    let refined = match payload.last_message.content_type {
        Some(ContentType::News) => {
            state
                .webhooks
                .reject_news(&payload.last_message.content, feedback)
                .await?
        }
        _ => {
            state
                .webhooks
                .remake_post(&payload.last_message.content, feedback)
                .await?
        }
    };

    let session = store::get_session(&state.db_pool, session_id)
        .await?
        .ok_or_else(session_not_found)?;
    let mut messages = session.messages.0;
    apply_decline(
        &mut messages,
        message_id,
        feedback,
        refined,
        payload.last_message.content_type,
    );

    store::save_messages(&state.db_pool, session_id, &messages, true)
        .await?
        .map(Json)
        .ok_or_else(session_not_found)
}

async fn rename_session(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<Value>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title cannot be empty".to_string()));
    }

    let session = store::update_title(&state.db_pool, session_id, title)
        .await?
        .ok_or_else(session_not_found)?;

    Ok(Json(json!({
        "success": true,
        "message": "Chat renamed successfully",
        "session": session,
    })))
}

async fn delete_session(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    store::delete_session(&state.db_pool, session_id)
        .await?
        .ok_or_else(session_not_found)?;

    tracing::info!("Deleted chat session {}", session_id);
    Ok(Json(json!({
        "success": true,
        "message": "Chat deleted successfully",
    })))
}

// The declined message stays in the transcript: it is annotated in place
// and the refinement appended after it as a new message of the same type.
fn apply_decline(
    messages: &mut Vec<Message>,
    message_id: Uuid,
    feedback: &str,
    refined: String,
    content_type: Option<ContentType>,
) {
    if let Some(original) = messages.iter_mut().find(|m| m.id == message_id) {
        original.feedback = Some(MessageFeedback {
            is_declined: true,
            text: feedback.to_string(),
            refined_content: refined.clone(),
        });
    } else {
        tracing::warn!("Declined message {} not found in session", message_id);
    }

    messages.push(Message {
        id: Uuid::new_v4(),
        role: MessageRole::Bot,
        content: refined,
        content_type,
        feedback: None,
    });
}

fn session_title(keyword: &str) -> String {
    format!("Research on: {}", keyword)
}

fn first_keyword(keywords: &str) -> Option<String> {
    keywords
        .split(',')
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string)
}

fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::warn!("Rejected malformed session id: {}", raw);
        ApiError::Validation("Invalid session id".to_string())
    })
}

fn session_not_found() -> ApiError {
    ApiError::NotFound("Chat session not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_keyword_is_processed() {
        assert_eq!(first_keyword("solar, wind, hydro"), Some("solar".to_string()));
    }

    #[test]
    fn blank_keyword_entries_are_skipped() {
        assert_eq!(first_keyword(" , wind"), Some("wind".to_string()));
        assert_eq!(first_keyword("  ,  "), None);
        assert_eq!(first_keyword(""), None);
    }

    #[test]
    fn session_titles_name_the_keyword() {
        assert_eq!(session_title("solar"), "Research on: solar");
    }

    #[test]
    fn malformed_session_ids_are_rejected_before_any_query() {
        assert!(parse_session_id("not-a-uuid").is_err());
        assert!(parse_session_id("6889aefc-1a52-4efb-bd3d-0a0b2a2b2c2d").is_ok());
    }

    #[test]
    fn decline_annotates_in_place_and_appends_exactly_one_message() {
        let mut messages = vec![
            Message::user("solar"),
            Message::bot("draft insights", ContentType::News),
        ];
        let original_id = messages[1].id;

        apply_decline(
            &mut messages,
            original_id,
            "too vague",
            "sharper insights".to_string(),
            Some(ContentType::News),
        );

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "draft insights");
        let feedback = messages[1].feedback.as_ref().unwrap();
        assert!(feedback.is_declined);
        assert_eq!(feedback.text, "too vague");
        assert_eq!(feedback.refined_content, "sharper insights");
        assert_eq!(messages[2].content, "sharper insights");
        assert_eq!(messages[2].content_type, Some(ContentType::News));
    }

    #[test]
    fn decline_with_an_unknown_message_id_still_appends_the_refinement() {
        let mut messages = vec![Message::bot("draft", ContentType::Linkedin)];

        apply_decline(
            &mut messages,
            Uuid::new_v4(),
            "rework it",
            "new draft".to_string(),
            Some(ContentType::Linkedin),
        );

        assert_eq!(messages.len(), 2);
        assert!(messages[0].feedback.is_none());
    }
}
