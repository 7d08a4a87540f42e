use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use warbler_db::models::{MessageRow, UserRow};
use warbler_types::api::MessageForm;
use warbler_types::models::MESSAGE_MAX_LEN;

use crate::auth::{AppState, AppStateInner};
use crate::error::AppError;
use crate::extract::IdPath;
use crate::found;
use crate::middleware::{CurrentUser, load_viewer, unauthorized};
use crate::session::Session;
use crate::templates::{Layout, MessageShowTemplate, NewMessageTemplate, render};
use crate::views::{liked_ids, message_view};

pub async fn new_message_form(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Result<impl IntoResponse, AppError> {
    let page = NewMessageTemplate {
        layout: Layout::new(&mut session, Some(&user)),
        text: String::new(),
        error: None,
    };
    Ok((session, render(&page)?))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let text = form.text.trim();

    let error = if text.is_empty() {
        Some("Message can't be empty.".to_string())
    } else if text.chars().count() > MESSAGE_MAX_LEN {
        Some(format!("Messages are limited to {} characters.", MESSAGE_MAX_LEN))
    } else {
        None
    };

    if let Some(error) = error {
        let page = NewMessageTemplate {
            layout: Layout::new(&mut session, Some(&user)),
            text: text.to_string(),
            error: Some(error),
        };
        return Ok((session, render(&page)?).into_response());
    }

    let message = state.db.insert_message(user.id, text)?;
    info!("User {} posted message {}", user.username, message.id);

    Ok(found(format!("/users/{}", user.id)))
}

pub async fn show_message(
    State(state): State<AppState>,
    session: Session,
    IdPath(message_id): IdPath,
) -> Result<Response, AppError> {
    let message = state.db.get_message(message_id)?.ok_or(AppError::NotFound)?;
    let viewer = load_viewer(&state, &session)?;

    render_message(&state, session, viewer.as_ref(), message)
}

/// Only the author may delete; anyone else is bounced like an anonymous
/// visitor and the message stays.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    IdPath(message_id): IdPath,
) -> Result<Response, AppError> {
    let message = state.db.get_message(message_id)?.ok_or(AppError::NotFound)?;

    if message.user_id != user.id {
        warn!("User {} tried to delete message {} they don't own", user.username, message.id);
        return Ok(unauthorized(session));
    }

    state.db.delete_message(message.id)?;
    info!("User {} deleted message {}", user.username, message.id);

    Ok(found(format!("/users/{}", user.id)))
}

/// Message detail page as seen by `viewer`.
pub(crate) fn render_message(
    state: &AppStateInner,
    mut session: Session,
    viewer: Option<&UserRow>,
    message: MessageRow,
) -> Result<Response, AppError> {
    let liked = liked_ids(&state.db, viewer)?;
    let is_owner = viewer.is_some_and(|v| v.id == message.user_id);

    let page = MessageShowTemplate {
        layout: Layout::new(&mut session, viewer),
        can_like: viewer.is_some() && !is_owner,
        is_owner,
        message: message_view(message, &liked),
    };
    Ok((session, render(&page)?).into_response())
}
