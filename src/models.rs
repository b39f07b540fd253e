use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub image: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub tweet_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Tweet {
    /// Position of this tweet in every feed.
    pub fn feed_key(&self) -> Cursor {
        Cursor {
            tweet_id: self.tweet_id,
            created_at: self.created_at,
        }
    }
}

/// Newest first, ties broken by the larger id.
pub fn feed_order(a: &Tweet, b: &Tweet) -> Ordering {
    b.feed_key().cmp(&a.feed_key())
}

/// Pagination token naming the first tweet of the next page.
///
/// On the wire the cursor is a single opaque string; callers must hand back exactly what
/// a previous page returned. A cursor that was not produced by this service resumes at an
/// unspecified position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor {
    pub tweet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.tweet_id.cmp(&other.tweet_id))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            self.created_at.timestamp_millis(),
            self.tweet_id.simple()
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed cursor")]
pub struct InvalidCursor;

impl FromStr for Cursor {
    type Err = InvalidCursor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, id) = s.split_once('.').ok_or(InvalidCursor)?;
        let millis: i64 = millis.parse().map_err(|_| InvalidCursor)?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or(InvalidCursor)?;
        let tweet_id = Uuid::parse_str(id).map_err(|_| InvalidCursor)?;
        Ok(Cursor {
            tweet_id,
            created_at,
        })
    }
}

impl TryFrom<String> for Cursor {
    type Error = InvalidCursor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.to_string()
    }
}

/// Author summary embedded in every feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub user_id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Author {
            user_id: user.user_id,
            name: user.username.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    pub tweet_id: Uuid,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub liked_by_me: bool,
    pub user: Author,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub tweets: Vec<TweetView>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub tweet_count: u64,
    pub followers_count: u64,
    pub follow_count: u64,
    pub is_following: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFilter {
    All,
    Following,
    Author(Uuid),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTweetRequest {
    pub content: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub only_following: bool,
    pub cursor: Option<Cursor>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub cursor: Option<Cursor>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_survives_the_wire() {
        let cursor = Cursor {
            tweet_id: Uuid::new_v4(),
            created_at: DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap(),
        };
        let json = serde_json::to_string(&cursor).unwrap();
        let back: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!("nope".parse::<Cursor>().is_err());
        assert!("12.not-a-uuid".parse::<Cursor>().is_err());
        assert!(serde_json::from_str::<Cursor>("\"abc.def\"").is_err());
    }

    #[test]
    fn feed_order_breaks_ties_by_id() {
        let at = DateTime::<Utc>::from_timestamp_millis(1_000).unwrap();
        let low = Tweet {
            tweet_id: Uuid::from_u128(1),
            user_id: Uuid::new_v4(),
            content: "a".into(),
            created_at: at,
        };
        let high = Tweet {
            tweet_id: Uuid::from_u128(2),
            ..low.clone()
        };
        let mut tweets = vec![low.clone(), high.clone()];
        tweets.sort_by(feed_order);
        assert_eq!(tweets, vec![high, low]);
    }
}
