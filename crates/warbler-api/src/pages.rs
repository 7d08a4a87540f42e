use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use crate::auth::AppState;
use crate::error::AppError;
use crate::middleware::load_viewer;
use crate::session::Session;
use crate::templates::{HomeAnonTemplate, HomeTemplate, Layout, render};
use crate::views::{message_views, profile_stats, user_view};

const TIMELINE_LIMIT: u32 = 100;

/// Landing page for visitors, timeline for logged-in users.
pub async fn homepage(State(state): State<AppState>, mut session: Session) -> Result<Response, AppError> {
    let Some(user) = load_viewer(&state, &session)? else {
        let page = HomeAnonTemplate {
            layout: Layout::new(&mut session, None),
        };
        return Ok((session, render(&page)?).into_response());
    };

    // Timeline + like lookups run off the async runtime
    let db = state.clone();
    let user_id = user.id;
    let (rows, liked, stats) = tokio::task::spawn_blocking(move || {
        let rows = db.db.timeline(user_id, TIMELINE_LIMIT)?;
        let liked = db.db.liked_message_ids(user_id)?;
        let stats = profile_stats(&db.db, user_id)?;
        Ok::<_, anyhow::Error>((rows, liked, stats))
    })
    .await??;

    let page = HomeTemplate {
        layout: Layout::new(&mut session, Some(&user)),
        user: user_view(&user),
        stats,
        messages: message_views(rows, &liked),
    };
    Ok((session, render(&page)?).into_response())
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

