use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use warbler_db::models::UserRow;
use warbler_types::flash::FlashLevel;

use crate::auth::{AppState, AppStateInner};
use crate::error::AppError;
use crate::found;
use crate::session::Session;

/// The logged-in user, inserted by [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRow);

/// Resolve the session's user. A session naming a deleted user counts as
/// anonymous.
pub fn load_viewer(state: &AppStateInner, session: &Session) -> anyhow::Result<Option<UserRow>> {
    match session.user_id() {
        Some(id) => state.db.get_user(id),
        None => Ok(None),
    }
}

/// Gate for routes that need a logged-in user. Anonymous requests are
/// redirected home with a flash instead of being answered with an error.
pub async fn require_login(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match load_viewer(&state, &session)? {
        Some(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(req).await)
        }
        None => {
            debug!("Anonymous request to {} redirected", req.uri().path());
            Ok(unauthorized(session))
        }
    }
}

pub fn unauthorized(mut session: Session) -> Response {
    session.flash(FlashLevel::Danger, "Access unauthorized.");
    (session, found("/")).into_response()
}
