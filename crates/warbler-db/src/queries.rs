use std::collections::HashSet;

use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, Params, Row, params, types::ToSql};
use uuid::Uuid;

use crate::Database;
use crate::models::{MessageRow, NewUser, ProfileUpdate, UserRow};

const USER_COLUMNS: &str =
    "u.id, u.username, u.email, u.password, u.image_url, u.header_image_url, u.bio, u.location";

const MESSAGE_COLUMNS: &str = "m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url";

impl Database {
    // -- Users --

    pub fn create_user(&self, new: &NewUser<'_>) -> Result<UserRow> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            match new.image_url {
                Some(image_url) => conn.execute(
                    "INSERT INTO users (id, username, email, password, image_url) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, new.username, new.email, new.password_hash, image_url],
                )?,
                None => conn.execute(
                    "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                    params![id, new.username, new.email, new.password_hash],
                )?,
            };
            query_user(conn, "u.id = ?1", &id)?
                .ok_or_else(|| anyhow!("User missing after insert: {}", id))
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.id = ?1", &id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.username = ?1", &username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.email = ?1", &email))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| query_users(conn, "ORDER BY u.username", []))
    }

    /// Case-insensitive substring match on username.
    pub fn search_users(&self, query: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "WHERE instr(lower(u.username), lower(?1)) > 0 ORDER BY u.username",
                [query],
            )
        })
    }

    pub fn update_user(&self, id: Uuid, update: &ProfileUpdate<'_>) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET username = ?2, email = ?3, image_url = ?4, header_image_url = ?5, bio = ?6, location = ?7
                 WHERE id = ?1",
                params![
                    id,
                    update.username,
                    update.email,
                    update.image_url,
                    update.header_image_url,
                    update.bio,
                    update.location
                ],
            )?;
            query_user(conn, "u.id = ?1", &id)?.ok_or_else(|| anyhow!("User not found: {}", id))
        })
    }

    /// Deletes the user; messages, follows and likes go with it.
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0))
    }

    // -- Messages --

    /// Stores a message stamped with the current UTC time.
    pub fn insert_message(&self, user_id: Uuid, text: &str) -> Result<MessageRow> {
        let id = Uuid::new_v4();
        let timestamp = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, timestamp, user_id) VALUES (?1, ?2, ?3, ?4)",
                params![id, text, timestamp, user_id],
            )?;
            query_messages(conn, "WHERE m.id = ?1", [id])?
                .pop()
                .ok_or_else(|| anyhow!("Message missing after insert: {}", id))
        })
    }

    pub fn get_message(&self, id: Uuid) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| Ok(query_messages(conn, "WHERE m.id = ?1", [id])?.pop()))
    }

    pub fn delete_message(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0))
    }

    /// A user's messages, newest first.
    pub fn messages_for_user(&self, user_id: Uuid) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(conn, "WHERE m.user_id = ?1 ORDER BY m.timestamp DESC", [user_id])
        })
    }

    pub fn count_messages(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM messages WHERE user_id = ?1", [user_id]))
    }

    /// Home feed: the user's own messages plus those of everyone they follow.
    pub fn timeline(&self, user_id: Uuid, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "WHERE m.user_id = ?1
                    OR m.user_id IN (SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1)
                 ORDER BY m.timestamp DESC
                 LIMIT ?2",
                params![user_id, limit],
            )
        })
    }

    // -- Follows --

    /// Adds the edge `follower -> followed`. Returns false if it already existed.
    pub fn follow(&self, follower: Uuid, followed: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
                params![followed, follower],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn unfollow(&self, follower: Uuid, followed: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                params![followed, follower],
            )?;
            Ok(removed > 0)
        })
    }

    /// Users following `user_id`.
    pub fn followers(&self, user_id: Uuid) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "JOIN follows f ON f.user_following_id = u.id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.username",
                [user_id],
            )
        })
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: Uuid) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "JOIN follows f ON f.user_being_followed_id = u.id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.username",
                [user_id],
            )
        })
    }

    pub fn following_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        self.with_conn(|conn| {
            query_ids(
                conn,
                "SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1",
                user_id,
            )
        })
    }

    /// Does `user_id` follow `other`?
    pub fn is_following(&self, user_id: Uuid, other: Uuid) -> Result<bool> {
        self.with_conn(|conn| follow_exists(conn, user_id, other))
    }

    /// Is `user_id` followed by `other`?
    pub fn is_followed_by(&self, user_id: Uuid, other: Uuid) -> Result<bool> {
        self.with_conn(|conn| follow_exists(conn, other, user_id))
    }

    pub fn count_followers(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            count(
                conn,
                "SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1",
                [user_id],
            )
        })
    }

    pub fn count_following(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM follows WHERE user_following_id = ?1", [user_id])
        })
    }

    // -- Likes --

    /// Toggle a like: removes it if present, inserts it if not.
    /// Returns true when the message is liked afterwards.
    pub fn toggle_like(&self, user_id: Uuid, message_id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                params![user_id, message_id],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                    params![user_id, message_id],
                )?;
            }
            tx.commit()?;
            Ok(removed == 0)
        })
    }

    pub fn is_liked(&self, user_id: Uuid, message_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let liked = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = ?1 AND message_id = ?2)",
                params![user_id, message_id],
                |row| row.get(0),
            )?;
            Ok(liked)
        })
    }

    /// Messages the user liked, newest first.
    pub fn liked_messages(&self, user_id: Uuid) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "JOIN likes l ON l.message_id = m.id
                 WHERE l.user_id = ?1
                 ORDER BY m.timestamp DESC",
                [user_id],
            )
        })
    }

    pub fn liked_message_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        self.with_conn(|conn| {
            query_ids(conn, "SELECT message_id FROM likes WHERE user_id = ?1", user_id)
        })
    }

    pub fn count_likes(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM likes WHERE user_id = ?1", [user_id]))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
        image_url: row.get(5)?,
    })
}

fn query_user(conn: &Connection, filter: &str, value: &dyn ToSql) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE {filter}");
    let row = conn.query_row(&sql, [value], user_from_row).optional()?;
    Ok(row)
}

fn query_users<P: Params>(conn: &Connection, tail: &str, params: P) -> Result<Vec<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u {tail}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_messages<P: Params>(conn: &Connection, tail: &str, params: P) -> Result<Vec<MessageRow>> {
    // JOIN users to fetch the author's display fields in the same query
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages m JOIN users u ON u.id = m.user_id {tail}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_ids(conn: &Connection, sql: &str, id: Uuid) -> Result<HashSet<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<std::result::Result<HashSet<Uuid>, _>>()?;
    Ok(ids)
}

fn follow_exists(conn: &Connection, follower: Uuid, followed: Uuid) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM follows WHERE user_following_id = ?1 AND user_being_followed_id = ?2
         )",
        params![follower, followed],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn count<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<usize> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n as usize)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
