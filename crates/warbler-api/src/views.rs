//! Conversions from DB rows to the view models the templates render.

use std::collections::HashSet;

use uuid::Uuid;

use warbler_db::Database;
use warbler_db::models::{MessageRow, UserRow};
use warbler_types::models::{Message, ProfileStats, User, UserCard};

use crate::templates::FollowControls;

pub fn user_view(row: &UserRow) -> User {
    User {
        id: row.id,
        username: row.username.clone(),
        email: row.email.clone(),
        image_url: row.image_url.clone(),
        header_image_url: row.header_image_url.clone(),
        bio: row.bio.clone(),
        location: row.location.clone(),
    }
}

pub fn message_views(rows: Vec<MessageRow>, liked: &HashSet<Uuid>) -> Vec<Message> {
    rows.into_iter().map(|row| message_view(row, liked)).collect()
}

pub fn message_view(row: MessageRow, liked: &HashSet<Uuid>) -> Message {
    Message {
        liked: liked.contains(&row.id),
        id: row.id,
        text: row.text,
        timestamp: row.timestamp,
        user_id: row.user_id,
        username: row.username,
        image_url: row.image_url,
    }
}

/// Cards for `rows`, each marked with whether the viewer follows that user.
pub fn user_cards(db: &Database, rows: &[UserRow], viewer: Option<&UserRow>) -> anyhow::Result<Vec<UserCard>> {
    let followed = match viewer {
        Some(v) => db.following_ids(v.id)?,
        None => HashSet::new(),
    };

    Ok(rows
        .iter()
        .map(|row| UserCard {
            user: user_view(row),
            followed: followed.contains(&row.id),
        })
        .collect())
}

/// Ids of the messages the viewer likes; empty for anonymous visitors.
pub fn liked_ids(db: &Database, viewer: Option<&UserRow>) -> anyhow::Result<HashSet<Uuid>> {
    match viewer {
        Some(v) => db.liked_message_ids(v.id),
        None => Ok(HashSet::new()),
    }
}

pub fn profile_stats(db: &Database, user_id: Uuid) -> anyhow::Result<ProfileStats> {
    Ok(ProfileStats {
        messages: db.count_messages(user_id)?,
        following: db.count_following(user_id)?,
        followers: db.count_followers(user_id)?,
        likes: db.count_likes(user_id)?,
    })
}

pub fn follow_controls(db: &Database, profile: &UserRow, viewer: Option<&UserRow>) -> anyhow::Result<FollowControls> {
    Ok(match viewer {
        None => FollowControls::Anonymous,
        Some(v) if v.id == profile.id => FollowControls::OwnProfile,
        Some(v) if db.is_following(v.id, profile.id)? => FollowControls::Unfollow,
        Some(_) => FollowControls::Follow,
    })
}
