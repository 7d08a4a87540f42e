//! Database row types — these map directly to SQLite rows.
//! Distinct from warbler-types view models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use rusqlite::ErrorCode;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl PartialEq for UserRow {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A message joined with its author's display fields.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    pub username: String,
    pub image_url: String,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    /// `None` keeps the column default.
    pub image_url: Option<&'a str>,
}

pub struct ProfileUpdate<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub image_url: &'a str,
    pub header_image_url: &'a str,
    pub bio: Option<&'a str>,
    pub location: Option<&'a str>,
}

/// The unique `users` column a write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserConflict {
    Username,
    Email,
}

impl UserConflict {
    /// Classify a store error raised by a UNIQUE constraint on `users`.
    pub fn from_error(err: &anyhow::Error) -> Option<Self> {
        match err.downcast_ref::<rusqlite::Error>()? {
            rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == ErrorCode::ConstraintViolation => {
                if msg.contains("users.username") {
                    Some(Self::Username)
                } else if msg.contains("users.email") {
                    Some(Self::Email)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
