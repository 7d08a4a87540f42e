use askama::Template;
use axum::response::Html;

use warbler_db::models::UserRow;
use warbler_types::flash::FlashMessage;
use warbler_types::models::{Message, ProfileStats, User, UserCard};

use crate::error::AppError;
use crate::session::Session;
use crate::views::user_view;

/// Fields every page shares through `base.html`: the navbar user and the
/// flashes queued by the previous request.
#[derive(Debug, Default)]
pub struct Layout {
    pub user: Option<User>,
    pub flashes: Vec<FlashMessage>,
}

impl Layout {
    pub fn new(session: &mut Session, viewer: Option<&UserRow>) -> Self {
        Self {
            user: viewer.map(user_view),
            flashes: session.take_flashes(),
        }
    }
}

pub fn render<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    Ok(Html(page.render()?))
}

#[derive(Template)]
#[template(path = "home-anon.html")]
pub struct HomeAnonTemplate {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub user: User,
    pub stats: ProfileStats,
    pub messages: Vec<Message>,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub layout: Layout,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub username: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub layout: Layout,
    pub query: String,
    pub users: Vec<UserCard>,
}

#[derive(Template)]
#[template(path = "users/show.html")]
pub struct UserShowTemplate {
    pub layout: Layout,
    pub profile: User,
    pub stats: ProfileStats,
    pub controls: FollowControls,
    pub messages: Vec<Message>,
}

#[derive(Template)]
#[template(path = "users/follows.html")]
pub struct FollowsTemplate {
    pub layout: Layout,
    pub profile: User,
    pub stats: ProfileStats,
    pub controls: FollowControls,
    pub heading: &'static str,
    pub users: Vec<UserCard>,
}

#[derive(Template)]
#[template(path = "users/likes.html")]
pub struct LikesTemplate {
    pub layout: Layout,
    pub profile: User,
    pub stats: ProfileStats,
    pub controls: FollowControls,
    pub messages: Vec<Message>,
}

#[derive(Template)]
#[template(path = "users/edit.html")]
pub struct EditProfileTemplate {
    pub layout: Layout,
    pub user: User,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "messages/new.html")]
pub struct NewMessageTemplate {
    pub layout: Layout,
    pub text: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "messages/show.html")]
pub struct MessageShowTemplate {
    pub layout: Layout,
    pub message: Message,
    pub is_owner: bool,
    pub can_like: bool,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub layout: Layout,
    pub status: u16,
    pub title: &'static str,
}

/// What the profile header offers the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowControls {
    Anonymous,
    OwnProfile,
    Follow,
    Unfollow,
}

impl FollowControls {
    pub fn is_own(&self) -> bool {
        *self == Self::OwnProfile
    }

    pub fn can_follow(&self) -> bool {
        *self == Self::Follow
    }

    pub fn can_unfollow(&self) -> bool {
        *self == Self::Unfollow
    }
}
