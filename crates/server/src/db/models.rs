use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Replacement content for a soft-deleted comment.
pub const COMMENT_TOMBSTONE: &str = "Comment has been deleted";

pub const DEFAULT_CATEGORY: &str = "General";

/// Username snapshot used when a commenter cannot be resolved.
pub const UNKNOWN_USERNAME: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: String,
    pub avatar_url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Game,
    Movie,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Game => "Game",
            MediaType::Movie => "Movie",
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "game" => Ok(MediaType::Game),
            "movie" => Ok(MediaType::Movie),
            other => Err(other.to_string()),
        }
    }
}

/// Which of a user's two media lists an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Library,
    Wishlist,
}

impl CollectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Library => "library",
            CollectionKind::Wishlist => "wishlist",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a media item stored in a library or wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaRef {
    #[sqlx(rename = "media_id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub year: String,
    #[serde(rename = "coverUrl")]
    pub cover_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar_url: String,
    pub wishlist: Vec<MediaRef>,
    pub library: Vec<MediaRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: String,
    pub user_id: String,
    pub media_id: String,
    pub title: String,
    pub cover_url: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub year: String,
    pub stars: i64,
    pub review_text: String,
    pub date_created: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ThreadRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub user_id: String,
    pub username: String,
    pub date_created: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub user_id: String,
    pub username: String,
    pub date_created: String,
    pub comments: Vec<String>,
}

impl Thread {
    pub fn from_row(row: ThreadRow, comments: Vec<String>) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            user_id: row.user_id,
            username: row.username,
            date_created: row.date_created,
            comments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub thread_id: String,
    pub user_id: String,
    pub username: String,
    pub date_created: String,
    pub deleted: bool,
}
