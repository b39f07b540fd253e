//! Persistence boundary.
//!
//! The feed, mutation and profile functions only talk to a [`Store`]. Uniqueness of like
//! and follow edges is the store's job: the conditional insert/delete methods report
//! whether they changed anything so a lost race is a `false`, never an error.

pub mod cql;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Cursor, Tweet, User};

pub use self::cql::ScyllaStore;
pub use self::memory::MemoryStore;

/// Which partition of tweets a scan walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetScope {
    All,
    Author(Uuid),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert_tweet(&self, tweet: &Tweet) -> Result<(), StoreError>;

    async fn tweet_exists(&self, tweet_id: Uuid) -> Result<bool, StoreError>;

    /// Up to `take` tweets in feed order whose key is at or below `from`.
    async fn tweets_from(
        &self,
        scope: TweetScope,
        from: Option<Cursor>,
        take: usize,
    ) -> Result<Vec<Tweet>, StoreError>;

    async fn count_tweets(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Returns `true` if the like row was created by this call.
    async fn insert_like(
        &self,
        user_id: Uuid,
        tweet_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Returns `true` if the like row was removed by this call.
    async fn delete_like(&self, user_id: Uuid, tweet_id: Uuid) -> Result<bool, StoreError>;

    async fn count_likes(&self, tweet_id: Uuid) -> Result<u64, StoreError>;

    async fn has_liked(&self, user_id: Uuid, tweet_id: Uuid) -> Result<bool, StoreError>;

    async fn insert_follow(&self, follower_id: Uuid, followee_id: Uuid)
        -> Result<bool, StoreError>;

    async fn delete_follow(&self, follower_id: Uuid, followee_id: Uuid)
        -> Result<bool, StoreError>;

    async fn is_following(&self, follower_id: Uuid, followee_id: Uuid)
        -> Result<bool, StoreError>;

    async fn followees(&self, follower_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    async fn count_followers(&self, user_id: Uuid) -> Result<u64, StoreError>;

    async fn count_follows(&self, user_id: Uuid) -> Result<u64, StoreError>;
}
