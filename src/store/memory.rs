use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, TweetScope};
use crate::error::StoreError;
use crate::models::{Cursor, Tweet, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tweets: HashMap<Uuid, Tweet>,
    // Keys sorted ascending; scans walk them in reverse.
    timeline: BTreeSet<Cursor>,
    by_user: HashMap<Uuid, BTreeSet<Cursor>>,
    likes: HashSet<(Uuid, Uuid)>,
    like_counts: HashMap<Uuid, u64>,
    follows: HashSet<(Uuid, Uuid)>,
}

/// Process-local store used by tests and `STORAGE=memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .users
            .insert(user.user_id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn insert_tweet(&self, tweet: &Tweet) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let key = tweet.feed_key();
        tables.timeline.insert(key);
        tables.by_user.entry(tweet.user_id).or_default().insert(key);
        tables.tweets.insert(tweet.tweet_id, tweet.clone());
        Ok(())
    }

    async fn tweet_exists(&self, tweet_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.tweets.contains_key(&tweet_id))
    }

    async fn tweets_from(
        &self,
        scope: TweetScope,
        from: Option<Cursor>,
        take: usize,
    ) -> Result<Vec<Tweet>, StoreError> {
        let tables = self.tables.read().await;
        let keys = match scope {
            TweetScope::All => Some(&tables.timeline),
            TweetScope::Author(user_id) => tables.by_user.get(&user_id),
        };
        let Some(keys) = keys else {
            return Ok(Vec::new());
        };
        let tweets = match from {
            Some(from) => keys
                .range(..=from)
                .rev()
                .take(take)
                .filter_map(|key| tables.tweets.get(&key.tweet_id).cloned())
                .collect(),
            None => keys
                .iter()
                .rev()
                .take(take)
                .filter_map(|key| tables.tweets.get(&key.tweet_id).cloned())
                .collect(),
        };
        Ok(tweets)
    }

    async fn count_tweets(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_user
            .get(&user_id)
            .map_or(0, |keys| keys.len() as u64))
    }

    async fn insert_like(
        &self,
        user_id: Uuid,
        tweet_id: Uuid,
        _at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.likes.insert((user_id, tweet_id)) {
            return Ok(false);
        }
        *tables.like_counts.entry(tweet_id).or_default() += 1;
        Ok(true)
    }

    async fn delete_like(&self, user_id: Uuid, tweet_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.likes.remove(&(user_id, tweet_id)) {
            return Ok(false);
        }
        if let Some(count) = tables.like_counts.get_mut(&tweet_id) {
            *count = count.saturating_sub(1);
        }
        Ok(true)
    }

    async fn count_likes(&self, tweet_id: Uuid) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.like_counts.get(&tweet_id).copied().unwrap_or(0))
    }

    async fn has_liked(&self, user_id: Uuid, tweet_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .likes
            .contains(&(user_id, tweet_id)))
    }

    async fn insert_follow(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .follows
            .insert((follower_id, followee_id)))
    }

    async fn delete_follow(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .follows
            .remove(&(follower_id, followee_id)))
    }

    async fn is_following(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .follows
            .contains(&(follower_id, followee_id)))
    }

    async fn followees(&self, follower_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|(follower, _)| *follower == follower_id)
            .map(|(_, followee)| *followee)
            .collect())
    }

    async fn count_followers(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|(_, followee)| *followee == user_id)
            .count() as u64)
    }

    async fn count_follows(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(user_id: Uuid, millis: i64) -> Tweet {
        Tweet {
            tweet_id: Uuid::new_v4(),
            user_id,
            content: format!("at {millis}"),
            created_at: DateTime::<Utc>::from_timestamp_millis(millis).unwrap(),
        }
    }

    #[tokio::test]
    async fn like_edge_is_unique() {
        let store = MemoryStore::new();
        let (user, tweet) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store.insert_like(user, tweet, Utc::now()).await.unwrap());
        assert!(!store.insert_like(user, tweet, Utc::now()).await.unwrap());
        assert_eq!(store.count_likes(tweet).await.unwrap(), 1);

        assert!(store.delete_like(user, tweet).await.unwrap());
        assert!(!store.delete_like(user, tweet).await.unwrap());
        assert_eq!(store.count_likes(tweet).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scan_includes_the_cursor_row() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let tweets: Vec<Tweet> = (1..=5).map(|i| tweet(author, i * 1_000)).collect();
        for t in &tweets {
            store.insert_tweet(t).await.unwrap();
        }

        let from = tweets[2].feed_key();
        let page = store
            .tweets_from(TweetScope::Author(author), Some(from), 10)
            .await
            .unwrap();
        let ids: Vec<Uuid> = page.iter().map(|t| t.tweet_id).collect();
        assert_eq!(
            ids,
            vec![tweets[2].tweet_id, tweets[1].tweet_id, tweets[0].tweet_id]
        );
    }

    #[tokio::test]
    async fn unknown_author_scans_empty() {
        let store = MemoryStore::new();
        let page = store
            .tweets_from(TweetScope::Author(Uuid::new_v4()), None, 10)
            .await
            .unwrap();
        assert!(page.is_empty());
    }
}
