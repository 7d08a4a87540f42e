use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Longest message body accepted, in characters.
pub const MESSAGE_MAX_LEN: usize = 140;

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// A user as listed on index, following and followers pages.
#[derive(Debug, Clone)]
pub struct UserCard {
    pub user: User,
    /// Whether the viewing user follows this one.
    pub followed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileStats {
    pub messages: usize,
    pub following: usize,
    pub followers: usize,
    pub likes: usize,
}

/// A message joined with its author, as rendered in lists and detail pages.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    pub username: String,
    pub image_url: String,
    /// Whether the viewing user likes this message.
    pub liked: bool,
}

impl Message {
    pub fn display_time(&self) -> String {
        self.timestamp.format("%d %B %Y").to_string()
    }
}
