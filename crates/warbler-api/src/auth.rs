use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{info, warn};

use warbler_db::Database;
use warbler_db::models::{NewUser, UserConflict, UserRow};
use warbler_types::api::{LoginForm, SignupForm, non_blank};
use warbler_types::flash::FlashLevel;

use crate::error::AppError;
use crate::found;
use crate::session::Session;
use crate::templates::{Layout, LoginTemplate, SignupTemplate, render};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_secret: String,
}

const MIN_PASSWORD_LEN: usize = 6;
pub(crate) const USERNAME_MAX_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email already taken")]
    EmailTaken,

    #[error("{0}")]
    Invalid(&'static str),

    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),

    #[error(transparent)]
    Database(anyhow::Error),
}

/// A UNIQUE violation on `users` is the same answer as the lookup that
/// raced it.
impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        match UserConflict::from_error(&err) {
            Some(UserConflict::Username) => Self::UsernameTaken,
            Some(UserConflict::Email) => Self::EmailTaken,
            None => Self::Database(err),
        }
    }
}

/// Create a user with an Argon2id-hashed password.
pub fn signup(db: &Database, form: &SignupForm) -> Result<UserRow, AuthError> {
    let username = form.username.trim();
    let email = form.email.trim();

    // Validate input
    if username.is_empty() || username.chars().count() > USERNAME_MAX_LEN {
        return Err(AuthError::Invalid("Username must be 1 to 32 characters"));
    }
    if !email.contains('@') {
        return Err(AuthError::Invalid("Invalid email address"));
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Invalid("Password must be at least 6 characters"));
    }

    if db.get_user_by_username(username)?.is_some() {
        return Err(AuthError::UsernameTaken);
    }
    if db.get_user_by_email(email)?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    let password_hash = hash_password(&form.password).map_err(AuthError::Hash)?;
    let image_url = non_blank(form.image_url.clone());

    let user = db.create_user(&NewUser {
        username,
        email,
        password_hash: &password_hash,
        image_url: image_url.as_deref(),
    })?;

    info!("New user signed up: {}", user.username);
    Ok(user)
}

/// The user named `username`, if `password` matches their stored hash.
pub fn authenticate(db: &Database, username: &str, password: &str) -> anyhow::Result<Option<UserRow>> {
    let Some(user) = db.get_user_by_username(username)? else {
        return Ok(None);
    };

    if verify_password(password, &user.password) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// -- Handlers --

pub async fn signup_page(mut session: Session) -> Result<impl IntoResponse, AppError> {
    let page = SignupTemplate {
        layout: Layout::new(&mut session, None),
        username: String::new(),
        email: String::new(),
        image_url: String::new(),
        error: None,
    };
    Ok((session, render(&page)?))
}

pub async fn signup_submit(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    match signup(&state.db, &form) {
        Ok(user) => {
            session.login(user.id);
            Ok((session, found("/")).into_response())
        }
        Err(AuthError::Hash(e)) => Err(anyhow::anyhow!("Password hashing failed: {}", e).into()),
        Err(AuthError::Database(e)) => Err(e.into()),
        Err(e) => {
            let page = SignupTemplate {
                layout: Layout::new(&mut session, None),
                username: form.username,
                email: form.email,
                image_url: form.image_url.unwrap_or_default(),
                error: Some(e.to_string()),
            };
            Ok((session, render(&page)?).into_response())
        }
    }
}

pub async fn login_page(mut session: Session) -> Result<impl IntoResponse, AppError> {
    let page = LoginTemplate {
        layout: Layout::new(&mut session, None),
        username: String::new(),
        error: None,
    };
    Ok((session, render(&page)?))
}

pub async fn login_submit(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match authenticate(&state.db, &form.username, &form.password)? {
        Some(user) => {
            info!("User logged in: {}", user.username);
            session.login(user.id);
            session.flash(FlashLevel::Success, format!("Hello, {}!", user.username));
            Ok((session, found("/")).into_response())
        }
        None => {
            warn!("Failed login for {}", form.username);
            let page = LoginTemplate {
                layout: Layout::new(&mut session, None),
                username: form.username,
                error: Some("Invalid credentials.".into()),
            };
            Ok((session, render(&page)?).into_response())
        }
    }
}

pub async fn logout(mut session: Session) -> impl IntoResponse {
    session.logout();
    session.flash(FlashLevel::Success, "You have successfully logged out.");
    (session, found("/login"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, email: &str) -> SignupForm {
        SignupForm {
            username: username.into(),
            email: email.into(),
            password: "testpassword".into(),
            image_url: Some("/static/images/test-pic.png".into()),
        }
    }

    #[test]
    fn signup_hashes_password_and_authenticates() {
        let db = Database::open_in_memory().unwrap();
        let user = signup(&db, &form("testuser", "test@example.com")).unwrap();

        assert_ne!(user.password, "testpassword");
        assert!(user.password.starts_with("$argon2"));
        assert_eq!(user.image_url, "/static/images/test-pic.png");

        let found = authenticate(&db, "testuser", "testpassword").unwrap();
        assert_eq!(found.map(|u| u.username), Some("testuser".to_string()));

        assert!(authenticate(&db, "testuser", "wrongpassword").unwrap().is_none());
        assert!(authenticate(&db, "nobody", "testpassword").unwrap().is_none());
    }

    #[test]
    fn signup_rejects_taken_username_and_email() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &form("testuser", "test@example.com")).unwrap();

        assert!(matches!(
            signup(&db, &form("testuser", "other@example.com")),
            Err(AuthError::UsernameTaken)
        ));
        assert!(matches!(
            signup(&db, &form("other", "test@example.com")),
            Err(AuthError::EmailTaken)
        ));
    }

    #[test]
    fn signup_validates_input() {
        let db = Database::open_in_memory().unwrap();
        let mut short = form("testuser", "test@example.com");
        short.password = "abc".into();
        assert!(matches!(signup(&db, &short), Err(AuthError::Invalid(_))));
        assert!(matches!(
            signup(&db, &form("  ", "test@example.com")),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            signup(&db, &form("testuser", "not-an-email")),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn username_limit_counts_characters() {
        let db = Database::open_in_memory().unwrap();
        let cyrillic = "абвгдежзийклмнопр";
        assert_eq!(cyrillic.chars().count(), 17);
        assert!(cyrillic.len() > USERNAME_MAX_LEN);

        let user = signup(&db, &form(cyrillic, "cyrillic@example.com")).unwrap();
        assert_eq!(user.username, cyrillic);

        let too_long = "я".repeat(USERNAME_MAX_LEN + 1);
        assert!(matches!(
            signup(&db, &form(&too_long, "long@example.com")),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn unique_violation_reads_as_taken() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, &form("testuser", "test@example.com")).unwrap();

        // Insert straight into the store, as a request that passed the
        // lookup before the first insert committed would.
        let dup_name = db.create_user(&NewUser {
            username: "testuser",
            email: "fresh@example.com",
            password_hash: "HASHED_PASSWORD",
            image_url: None,
        });
        assert!(matches!(AuthError::from(dup_name.unwrap_err()), AuthError::UsernameTaken));

        let dup_email = db.create_user(&NewUser {
            username: "fresh",
            email: "test@example.com",
            password_hash: "HASHED_PASSWORD",
            image_url: None,
        });
        assert!(matches!(AuthError::from(dup_email.unwrap_err()), AuthError::EmailTaken));

        let other = anyhow::anyhow!("disk on fire");
        assert!(matches!(AuthError::from(other), AuthError::Database(_)));
    }

    #[test]
    fn blank_image_falls_back_to_default() {
        let db = Database::open_in_memory().unwrap();
        let mut f = form("testuser", "test@example.com");
        f.image_url = Some(String::new());
        let user = signup(&db, &f).unwrap();
        assert_eq!(user.image_url, warbler_types::models::DEFAULT_IMAGE_URL);
    }
}
