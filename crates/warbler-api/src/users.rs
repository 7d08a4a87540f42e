use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use tracing::info;

use warbler_db::models::{ProfileUpdate, UserConflict, UserRow};
use warbler_types::api::{ProfileForm, UserSearch, non_blank};
use warbler_types::flash::FlashLevel;
use warbler_types::models::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, User};

use crate::auth::{AppState, USERNAME_MAX_LEN, authenticate};
use crate::error::AppError;
use crate::extract::IdPath;
use crate::found;
use crate::middleware::{CurrentUser, load_viewer};
use crate::session::Session;
use crate::templates::{
    EditProfileTemplate, FollowsTemplate, Layout, LikesTemplate, UserShowTemplate, UsersIndexTemplate, render,
};
use crate::views::{follow_controls, liked_ids, message_views, profile_stats, user_cards, user_view};

pub async fn list_users(
    State(state): State<AppState>,
    mut session: Session,
    Query(search): Query<UserSearch>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = load_viewer(&state, &session)?;
    let query = non_blank(search.q);

    let rows = match &query {
        Some(q) => state.db.search_users(q)?,
        None => state.db.list_users()?,
    };

    let page = UsersIndexTemplate {
        layout: Layout::new(&mut session, viewer.as_ref()),
        query: query.unwrap_or_default(),
        users: user_cards(&state.db, &rows, viewer.as_ref())?,
    };
    Ok((session, render(&page)?))
}

pub async fn show_user(
    State(state): State<AppState>,
    mut session: Session,
    IdPath(user_id): IdPath,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.db.get_user(user_id)?.ok_or(AppError::NotFound)?;
    let viewer = load_viewer(&state, &session)?;
    let liked = liked_ids(&state.db, viewer.as_ref())?;

    let page = UserShowTemplate {
        layout: Layout::new(&mut session, viewer.as_ref()),
        stats: profile_stats(&state.db, profile.id)?,
        controls: follow_controls(&state.db, &profile, viewer.as_ref())?,
        messages: message_views(state.db.messages_for_user(profile.id)?, &liked),
        profile: user_view(&profile),
    };
    Ok((session, render(&page)?))
}

pub async fn show_following(
    State(state): State<AppState>,
    Extension(CurrentUser(viewer)): Extension<CurrentUser>,
    session: Session,
    IdPath(user_id): IdPath,
) -> Result<Response, AppError> {
    let profile = state.db.get_user(user_id)?.ok_or(AppError::NotFound)?;
    let rows = state.db.following(profile.id)?;
    render_follows(&state, session, &viewer, &profile, "Following", &rows)
}

pub async fn show_followers(
    State(state): State<AppState>,
    Extension(CurrentUser(viewer)): Extension<CurrentUser>,
    session: Session,
    IdPath(user_id): IdPath,
) -> Result<Response, AppError> {
    let profile = state.db.get_user(user_id)?.ok_or(AppError::NotFound)?;
    let rows = state.db.followers(profile.id)?;
    render_follows(&state, session, &viewer, &profile, "Followers", &rows)
}

fn render_follows(
    state: &AppState,
    mut session: Session,
    viewer: &UserRow,
    profile: &UserRow,
    heading: &'static str,
    rows: &[UserRow],
) -> Result<Response, AppError> {
    let page = FollowsTemplate {
        layout: Layout::new(&mut session, Some(viewer)),
        profile: user_view(profile),
        stats: profile_stats(&state.db, profile.id)?,
        controls: follow_controls(&state.db, profile, Some(viewer))?,
        heading,
        users: user_cards(&state.db, rows, Some(viewer))?,
    };
    Ok((session, render(&page)?).into_response())
}

pub async fn show_likes(
    State(state): State<AppState>,
    Extension(CurrentUser(viewer)): Extension<CurrentUser>,
    mut session: Session,
    IdPath(user_id): IdPath,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.db.get_user(user_id)?.ok_or(AppError::NotFound)?;
    let liked = liked_ids(&state.db, Some(&viewer))?;

    let page = LikesTemplate {
        layout: Layout::new(&mut session, Some(&viewer)),
        stats: profile_stats(&state.db, profile.id)?,
        controls: follow_controls(&state.db, &profile, Some(&viewer))?,
        messages: message_views(state.db.liked_messages(profile.id)?, &liked),
        profile: user_view(&profile),
    };
    Ok((session, render(&page)?))
}

pub async fn follow(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
    IdPath(user_id): IdPath,
) -> Result<Response, AppError> {
    let target = state.db.get_user(user_id)?.ok_or(AppError::NotFound)?;

    if target.id == user.id {
        session.flash(FlashLevel::Danger, "You can't follow yourself.");
        return Ok((session, found(format!("/users/{}", user.id))).into_response());
    }

    if state.db.follow(user.id, target.id)? {
        info!("{} now follows {}", user.username, target.username);
    }

    Ok(found(format!("/users/{}/following", user.id)))
}

pub async fn stop_following(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    IdPath(user_id): IdPath,
) -> Result<Response, AppError> {
    let target = state.db.get_user(user_id)?.ok_or(AppError::NotFound)?;

    if state.db.unfollow(user.id, target.id)? {
        info!("{} stopped following {}", user.username, target.username);
    }

    Ok(found(format!("/users/{}/following", user.id)))
}

pub async fn edit_profile_form(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Result<impl IntoResponse, AppError> {
    let page = EditProfileTemplate {
        layout: Layout::new(&mut session, Some(&user)),
        user: user_view(&user),
        error: None,
    };
    Ok((session, render(&page)?))
}

/// Apply a profile edit. The submitted password must match the current one.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    if authenticate(&state.db, &user.username, &form.password)?.is_none() {
        session.flash(FlashLevel::Danger, "Wrong password, please try again.");
        return Ok((session, found("/")).into_response());
    }

    let username = form.username.trim();
    let email = form.email.trim();

    let error = if username.is_empty() || username.chars().count() > USERNAME_MAX_LEN {
        Some("Username must be 1 to 32 characters")
    } else if !email.contains('@') {
        Some("Invalid email address")
    } else if taken_by_other(state.db.get_user_by_username(username)?, &user) {
        Some("Username already taken")
    } else if taken_by_other(state.db.get_user_by_email(email)?, &user) {
        Some("Email already taken")
    } else {
        None
    };

    if let Some(error) = error {
        return edit_profile_retry(session, &user, form, error);
    }

    let image_url = non_blank(form.image_url.clone());
    let header_image_url = non_blank(form.header_image_url.clone());
    let bio = non_blank(form.bio.clone());
    let location = non_blank(form.location.clone());

    let result = state.db.update_user(
        user.id,
        &ProfileUpdate {
            username,
            email,
            image_url: image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
            header_image_url: header_image_url.as_deref().unwrap_or(DEFAULT_HEADER_IMAGE_URL),
            bio: bio.as_deref(),
            location: location.as_deref(),
        },
    );

    let updated = match result {
        Ok(updated) => updated,
        Err(e) => {
            // Another request claimed the name between the lookup and the update
            let error = match UserConflict::from_error(&e) {
                Some(UserConflict::Username) => "Username already taken",
                Some(UserConflict::Email) => "Email already taken",
                None => return Err(e.into()),
            };
            return edit_profile_retry(session, &user, form, error);
        }
    };
    info!("User {} updated their profile", updated.username);

    session.flash(FlashLevel::Success, "Profile updated successfully");
    Ok((session, found(format!("/users/{}", updated.id))).into_response())
}

/// The edit form again, holding what was submitted (minus the password).
fn edit_profile_retry(
    mut session: Session,
    user: &UserRow,
    form: ProfileForm,
    error: &str,
) -> Result<Response, AppError> {
    let page = EditProfileTemplate {
        layout: Layout::new(&mut session, Some(user)),
        user: User {
            id: user.id,
            username: form.username,
            email: form.email,
            image_url: form.image_url.unwrap_or_default(),
            header_image_url: form.header_image_url.unwrap_or_default(),
            bio: form.bio,
            location: form.location,
        },
        error: Some(error.to_string()),
    };
    Ok((session, render(&page)?).into_response())
}

fn taken_by_other(existing: Option<UserRow>, user: &UserRow) -> bool {
    existing.is_some_and(|other| other.id != user.id)
}

/// Delete the account; messages, follows and likes go with it.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut session: Session,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_user(user.id)?;
    info!("User {} deleted their account", user.username);

    session.logout();
    session.flash(FlashLevel::Success, "Account deleted successfully");
    Ok((session, found("/signup")))
}
