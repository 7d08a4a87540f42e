use axum::{
    Extension,
    extract::State,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::AppState;
use crate::error::AppError;
use crate::extract::IdPath;
use crate::messages::render_message;
use crate::middleware::CurrentUser;
use crate::session::Session;

/// Toggle the current user's like on a message and show it again.
/// Liking your own message is forbidden.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
    IdPath(message_id): IdPath,
) -> Result<Response, AppError> {
    let message = state.db.get_message(message_id)?.ok_or(AppError::NotFound)?;

    if message.user_id == user.id {
        warn!("User {} tried to like their own message {}", user.username, message.id);
        return Err(AppError::Forbidden);
    }

    let liked = state.db.toggle_like(user.id, message.id)?;
    debug!(
        "User {} {} message {}",
        user.username,
        if liked { "liked" } else { "unliked" },
        message.id
    );

    render_message(&state, session, Some(&user), message)
}
