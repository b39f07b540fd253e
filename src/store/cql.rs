use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use scylla::batch::Batch;
use scylla::frame::response::result::{CqlValue, Row};
use scylla::frame::value::CqlTimestamp;
use scylla::{QueryResult, Session};
use uuid::Uuid;

use super::{Store, TweetScope};
use crate::error::StoreError;
use crate::models::{Cursor, Tweet, User};

// Every tweet lands in this single timeline partition.
const GLOBAL_BUCKET: &str = "global";

pub struct ScyllaStore {
    session: Arc<Session>,
}

impl ScyllaStore {
    /// The session must already be switched to the application keyspace.
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

fn timestamp(at: DateTime<Utc>) -> CqlTimestamp {
    CqlTimestamp(at.timestamp_millis())
}

fn col_uuid(row: &Row, i: usize) -> Option<Uuid> {
    match row.columns.get(i)?.as_ref()? {
        CqlValue::Uuid(uuid) => Some(*uuid),
        _ => None,
    }
}

fn col_text(row: &Row, i: usize) -> Option<String> {
    match row.columns.get(i)?.as_ref()? {
        CqlValue::Text(text) | CqlValue::Ascii(text) => Some(text.clone()),
        _ => None,
    }
}

fn col_timestamp(row: &Row, i: usize) -> Option<DateTime<Utc>> {
    match row.columns.get(i)?.as_ref()? {
        CqlValue::Timestamp(ts) => DateTime::<Utc>::from_timestamp_millis(ts.0),
        _ => None,
    }
}

fn rows(result: QueryResult) -> Vec<Row> {
    result.rows.unwrap_or_default()
}

/// Reads `[applied]` from a lightweight-transaction result.
fn applied(result: &QueryResult) -> bool {
    result
        .rows
        .as_ref()
        .and_then(|rows| rows.first())
        .and_then(|row| row.columns.first())
        .map_or(false, |col| matches!(col, Some(CqlValue::Boolean(true))))
}

fn count(result: QueryResult, table: &'static str) -> Result<u64, StoreError> {
    let row = rows(result)
        .into_iter()
        .next()
        .ok_or(StoreError::MalformedRow { table })?;
    match row.columns.first() {
        Some(Some(CqlValue::BigInt(n))) => Ok((*n).max(0) as u64),
        _ => Err(StoreError::MalformedRow { table }),
    }
}

// Column order: tweet_id, user_id, content, created_at
fn tweet_from_row(row: &Row, table: &'static str) -> Result<Tweet, StoreError> {
    match (
        col_uuid(row, 0),
        col_uuid(row, 1),
        col_text(row, 2),
        col_timestamp(row, 3),
    ) {
        (Some(tweet_id), Some(user_id), Some(content), Some(created_at)) => Ok(Tweet {
            tweet_id,
            user_id,
            content,
            created_at,
        }),
        _ => Err(StoreError::MalformedRow { table }),
    }
}

#[async_trait]
impl Store for ScyllaStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.session
            .query(
                "INSERT INTO users (user_id, username, email, password_hash, image, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                (
                    user.user_id,
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    &user.image,
                    timestamp(user.created_at),
                    timestamp(user.updated_at),
                ),
            )
            .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT user_id, username, email, password_hash, image, created_at, updated_at FROM users WHERE user_id = ?",
                (user_id,),
            )
            .await?;
        let Some(row) = rows(result).into_iter().next() else {
            return Ok(None);
        };
        match (
            col_uuid(&row, 0),
            col_text(&row, 1),
            col_text(&row, 2),
            col_text(&row, 3),
            col_timestamp(&row, 5),
            col_timestamp(&row, 6),
        ) {
            (
                Some(user_id),
                Some(username),
                Some(email),
                Some(password_hash),
                Some(created_at),
                Some(updated_at),
            ) => Ok(Some(User {
                user_id,
                username,
                email,
                password_hash,
                image: col_text(&row, 4),
                created_at,
                updated_at,
            })),
            _ => Err(StoreError::MalformedRow { table: "users" }),
        }
    }

    async fn insert_tweet(&self, tweet: &Tweet) -> Result<(), StoreError> {
        let created_at = timestamp(tweet.created_at);
        let mut batch = Batch::default();
        batch.append_statement(
            "INSERT INTO tweets (tweet_id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
        );
        batch.append_statement(
            "INSERT INTO tweets_by_user (user_id, created_at, tweet_id, content) VALUES (?, ?, ?, ?)",
        );
        batch.append_statement(
            "INSERT INTO timeline (bucket, created_at, tweet_id, user_id, content) VALUES (?, ?, ?, ?, ?)",
        );
        self.session
            .batch(
                &batch,
                (
                    (tweet.tweet_id, tweet.user_id, &tweet.content, created_at),
                    (tweet.user_id, created_at, tweet.tweet_id, &tweet.content),
                    (
                        GLOBAL_BUCKET,
                        created_at,
                        tweet.tweet_id,
                        tweet.user_id,
                        &tweet.content,
                    ),
                ),
            )
            .await?;
        Ok(())
    }

    async fn tweet_exists(&self, tweet_id: Uuid) -> Result<bool, StoreError> {
        let result = self
            .session
            .query("SELECT tweet_id FROM tweets WHERE tweet_id = ?", (tweet_id,))
            .await?;
        Ok(!rows(result).is_empty())
    }

    async fn tweets_from(
        &self,
        scope: TweetScope,
        from: Option<Cursor>,
        take: usize,
    ) -> Result<Vec<Tweet>, StoreError> {
        let take = i32::try_from(take).unwrap_or(i32::MAX);
        debug!("Scanning {:?} from {:?}, take {}", scope, from, take);

        let result = match (scope, from) {
            (TweetScope::All, None) => {
                self.session
                    .query(
                        "SELECT tweet_id, user_id, content, created_at FROM timeline WHERE bucket = ? LIMIT ?",
                        (GLOBAL_BUCKET, take),
                    )
                    .await?
            }
            (TweetScope::All, Some(from)) => {
                self.session
                    .query(
                        "SELECT tweet_id, user_id, content, created_at FROM timeline WHERE bucket = ? AND (created_at, tweet_id) <= (?, ?) LIMIT ?",
                        (GLOBAL_BUCKET, timestamp(from.created_at), from.tweet_id, take),
                    )
                    .await?
            }
            (TweetScope::Author(user_id), None) => {
                self.session
                    .query(
                        "SELECT tweet_id, user_id, content, created_at FROM tweets_by_user WHERE user_id = ? LIMIT ?",
                        (user_id, take),
                    )
                    .await?
            }
            (TweetScope::Author(user_id), Some(from)) => {
                self.session
                    .query(
                        "SELECT tweet_id, user_id, content, created_at FROM tweets_by_user WHERE user_id = ? AND (created_at, tweet_id) <= (?, ?) LIMIT ?",
                        (user_id, timestamp(from.created_at), from.tweet_id, take),
                    )
                    .await?
            }
        };

        let table = match scope {
            TweetScope::All => "timeline",
            TweetScope::Author(_) => "tweets_by_user",
        };
        rows(result)
            .iter()
            .map(|row| tweet_from_row(row, table))
            .collect()
    }

    async fn count_tweets(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = self
            .session
            .query(
                "SELECT COUNT(*) FROM tweets_by_user WHERE user_id = ?",
                (user_id,),
            )
            .await?;
        count(result, "tweets_by_user")
    }

    async fn insert_like(
        &self,
        user_id: Uuid,
        tweet_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = self
            .session
            .query(
                "INSERT INTO likes (tweet_id, user_id, created_at) VALUES (?, ?, ?) IF NOT EXISTS",
                (tweet_id, user_id, timestamp(at)),
            )
            .await?;
        Ok(applied(&result))
    }

    async fn delete_like(&self, user_id: Uuid, tweet_id: Uuid) -> Result<bool, StoreError> {
        let result = self
            .session
            .query(
                "DELETE FROM likes WHERE tweet_id = ? AND user_id = ? IF EXISTS",
                (tweet_id, user_id),
            )
            .await?;
        Ok(applied(&result))
    }

    async fn count_likes(&self, tweet_id: Uuid) -> Result<u64, StoreError> {
        let result = self
            .session
            .query("SELECT COUNT(*) FROM likes WHERE tweet_id = ?", (tweet_id,))
            .await?;
        count(result, "likes")
    }

    async fn has_liked(&self, user_id: Uuid, tweet_id: Uuid) -> Result<bool, StoreError> {
        let result = self
            .session
            .query(
                "SELECT user_id FROM likes WHERE tweet_id = ? AND user_id = ?",
                (tweet_id, user_id),
            )
            .await?;
        Ok(!rows(result).is_empty())
    }

    async fn insert_follow(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<bool, StoreError> {
        let now = timestamp(Utc::now());
        let result = self
            .session
            .query(
                "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?) IF NOT EXISTS",
                (follower_id, followee_id, now),
            )
            .await?;
        if !applied(&result) {
            return Ok(false);
        }
        self.session
            .query(
                "INSERT INTO followers (followee_id, follower_id, created_at) VALUES (?, ?, ?)",
                (followee_id, follower_id, now),
            )
            .await?;
        Ok(true)
    }

    async fn delete_follow(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = self
            .session
            .query(
                "DELETE FROM follows WHERE follower_id = ? AND followee_id = ? IF EXISTS",
                (follower_id, followee_id),
            )
            .await?;
        if !applied(&result) {
            return Ok(false);
        }
        self.session
            .query(
                "DELETE FROM followers WHERE followee_id = ? AND follower_id = ?",
                (followee_id, follower_id),
            )
            .await?;
        Ok(true)
    }

    async fn is_following(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = self
            .session
            .query(
                "SELECT followee_id FROM follows WHERE follower_id = ? AND followee_id = ?",
                (follower_id, followee_id),
            )
            .await?;
        Ok(!rows(result).is_empty())
    }

    async fn followees(&self, follower_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT followee_id FROM follows WHERE follower_id = ?",
                (follower_id,),
            )
            .await?;
        rows(result)
            .iter()
            .map(|row| col_uuid(row, 0).ok_or(StoreError::MalformedRow { table: "follows" }))
            .collect()
    }

    async fn count_followers(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = self
            .session
            .query(
                "SELECT COUNT(*) FROM followers WHERE followee_id = ?",
                (user_id,),
            )
            .await?;
        count(result, "followers")
    }

    async fn count_follows(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = self
            .session
            .query(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?",
                (user_id,),
            )
            .await?;
        count(result, "follows")
    }
}
