//! Cursor-paginated feeds.
//!
//! Every feed is ordered newest first by `(created_at, tweet_id)`. A page asks the store
//! for one row more than it returns; the extra row becomes the cursor of the next page and
//! is the first row that page yields.

use std::collections::HashMap;

use futures::future::try_join_all;
use log::debug;
use uuid::Uuid;

use crate::config::PageConfig;
use crate::error::AppError;
use crate::models::{feed_order, Author, Cursor, FeedFilter, FeedPage, Tweet, TweetView};
use crate::store::{Store, TweetScope};

/// Resolves a requested page size against the configured default and maximum.
pub fn page_size(requested: Option<usize>, config: &PageConfig) -> Result<usize, AppError> {
    match requested {
        Some(0) => Err(AppError::Validation("limit must be at least 1".into())),
        Some(limit) => Ok(limit.min(config.max_size)),
        None => Ok(config.default_size),
    }
}

pub async fn get_page(
    store: &dyn Store,
    viewer: Option<Uuid>,
    filter: FeedFilter,
    cursor: Option<Cursor>,
    limit: usize,
) -> Result<FeedPage, AppError> {
    if limit == 0 {
        return Err(AppError::Validation("limit must be at least 1".into()));
    }
    let take = limit.saturating_add(1);

    let mut tweets = match filter {
        FeedFilter::All => store.tweets_from(TweetScope::All, cursor, take).await?,
        FeedFilter::Author(user_id) => {
            store
                .tweets_from(TweetScope::Author(user_id), cursor, take)
                .await?
        }
        FeedFilter::Following => match viewer {
            Some(viewer) => following_tweets(store, viewer, cursor, take).await?,
            None => Vec::new(),
        },
    };

    let mut next_cursor = None;
    if tweets.len() > limit {
        next_cursor = tweets.pop().map(|tweet| tweet.feed_key());
    }
    debug!(
        "Feed {:?} page: {} tweets, more: {}",
        filter,
        tweets.len(),
        next_cursor.is_some()
    );

    Ok(FeedPage {
        tweets: hydrate(store, viewer, tweets).await?,
        next_cursor,
    })
}

/// Fans out one scan per followee and merges them in feed order.
async fn following_tweets(
    store: &dyn Store,
    viewer: Uuid,
    cursor: Option<Cursor>,
    take: usize,
) -> Result<Vec<Tweet>, AppError> {
    let followees = store.followees(viewer).await?;
    if followees.is_empty() {
        return Ok(Vec::new());
    }

    let scans = followees
        .into_iter()
        .map(|user_id| store.tweets_from(TweetScope::Author(user_id), cursor, take));
    let mut merged: Vec<Tweet> = try_join_all(scans).await?.into_iter().flatten().collect();
    merged.sort_by(feed_order);
    merged.truncate(take);
    Ok(merged)
}

/// Attaches like counts, the viewer's like state and author summaries.
async fn hydrate(
    store: &dyn Store,
    viewer: Option<Uuid>,
    tweets: Vec<Tweet>,
) -> Result<Vec<TweetView>, AppError> {
    let mut author_ids: Vec<Uuid> = tweets.iter().map(|t| t.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let users = try_join_all(author_ids.iter().map(|id| store.get_user(*id))).await?;
    let authors: HashMap<Uuid, Author> = author_ids
        .iter()
        .zip(users)
        .map(|(id, user)| {
            let author = match user {
                Some(user) => Author::from(&user),
                None => Author {
                    user_id: *id,
                    name: String::new(),
                    image: None,
                },
            };
            (*id, author)
        })
        .collect();

    let stats = try_join_all(tweets.iter().map(|tweet| async move {
        let like_count = store.count_likes(tweet.tweet_id).await?;
        let liked_by_me = match viewer {
            Some(viewer) => store.has_liked(viewer, tweet.tweet_id).await?,
            None => false,
        };
        Ok::<_, AppError>((like_count, liked_by_me))
    }))
    .await?;

    Ok(tweets
        .into_iter()
        .zip(stats)
        .map(|(tweet, (like_count, liked_by_me))| TweetView {
            user: authors
                .get(&tweet.user_id)
                .cloned()
                .unwrap_or_else(|| Author {
                    user_id: tweet.user_id,
                    name: String::new(),
                    image: None,
                }),
            tweet_id: tweet.tweet_id,
            content: tweet.content,
            created_at: tweet.created_at,
            like_count,
            liked_by_me,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::models::User;
    use crate::store::MemoryStore;

    async fn user(store: &MemoryStore, name: &str) -> Uuid {
        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            username: name.into(),
            email: format!("{name}@example.com"),
            password_hash: String::new(),
            image: None,
            created_at: now,
            updated_at: now,
        };
        store.insert_user(&user).await.unwrap();
        user.user_id
    }

    async fn post(store: &MemoryStore, author: Uuid, millis: i64) -> Tweet {
        let tweet = Tweet {
            tweet_id: Uuid::new_v4(),
            user_id: author,
            content: format!("tweet at {millis}"),
            created_at: DateTime::<Utc>::from_timestamp_millis(millis).unwrap(),
        };
        store.insert_tweet(&tweet).await.unwrap();
        tweet
    }

    fn ids(page: &FeedPage) -> Vec<Uuid> {
        page.tweets.iter().map(|t| t.tweet_id).collect()
    }

    #[tokio::test]
    async fn twelve_tweets_split_ten_and_two() {
        let store = MemoryStore::new();
        let author = user(&store, "alice").await;
        let mut tweets = Vec::new();
        for i in 0..12 {
            tweets.push(post(&store, author, 1_000 + i).await);
        }
        tweets.sort_by(feed_order);

        let first = get_page(&store, None, FeedFilter::All, None, 10)
            .await
            .unwrap();
        assert_eq!(first.tweets.len(), 10);
        assert_eq!(first.next_cursor, Some(tweets[10].feed_key()));

        let second = get_page(&store, None, FeedFilter::All, first.next_cursor, 10)
            .await
            .unwrap();
        assert_eq!(
            ids(&second),
            vec![tweets[10].tweet_id, tweets[11].tweet_id]
        );
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn pages_visit_every_tweet_once_in_order() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let mut expected = Vec::new();
        // Shared timestamps force the id tie-break.
        for i in 0..23 {
            let author = if i % 2 == 0 { alice } else { bob };
            expected.push(post(&store, author, 5_000 + i / 3).await);
        }
        expected.sort_by(feed_order);

        let limit = 4;
        let mut seen = Vec::new();
        let mut cursor = None;
        let mut calls = 0;
        loop {
            let page = get_page(&store, None, FeedFilter::All, cursor, limit)
                .await
                .unwrap();
            calls += 1;
            seen.extend(ids(&page));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(calls, expected.len().div_ceil(limit));
        let expected: Vec<Uuid> = expected.iter().map(|t| t.tweet_id).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn following_feed_only_shows_followees() {
        let store = MemoryStore::new();
        let viewer = user(&store, "viewer").await;
        let followed = user(&store, "followed").await;
        let stranger = user(&store, "stranger").await;
        store.insert_follow(viewer, followed).await.unwrap();

        let mine = post(&store, followed, 2_000).await;
        post(&store, stranger, 3_000).await;
        let older = post(&store, followed, 1_000).await;

        let page = get_page(&store, Some(viewer), FeedFilter::Following, None, 10)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![mine.tweet_id, older.tweet_id]);
        assert!(page.tweets.iter().all(|t| t.user.name == "followed"));
    }

    #[tokio::test]
    async fn following_feed_paginates_across_followees() {
        let store = MemoryStore::new();
        let viewer = user(&store, "viewer").await;
        let a = user(&store, "a").await;
        let b = user(&store, "b").await;
        store.insert_follow(viewer, a).await.unwrap();
        store.insert_follow(viewer, b).await.unwrap();

        let mut expected = Vec::new();
        for i in 0..7 {
            expected.push(post(&store, if i % 3 == 0 { a } else { b }, 100 * i).await);
        }
        expected.sort_by(feed_order);

        let first = get_page(&store, Some(viewer), FeedFilter::Following, None, 5)
            .await
            .unwrap();
        let second = get_page(
            &store,
            Some(viewer),
            FeedFilter::Following,
            first.next_cursor,
            5,
        )
        .await
        .unwrap();
        assert!(second.next_cursor.is_none());

        let mut seen = ids(&first);
        seen.extend(ids(&second));
        let expected: Vec<Uuid> = expected.iter().map(|t| t.tweet_id).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn anonymous_following_feed_is_empty() {
        let store = MemoryStore::new();
        let author = user(&store, "alice").await;
        post(&store, author, 1).await;

        let page = get_page(&store, None, FeedFilter::Following, None, 10)
            .await
            .unwrap();
        assert!(page.tweets.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn like_state_follows_the_viewer() {
        let store = MemoryStore::new();
        let author = user(&store, "alice").await;
        let fan = user(&store, "fan").await;
        let tweet = post(&store, author, 1).await;
        store
            .insert_like(fan, tweet.tweet_id, Utc::now())
            .await
            .unwrap();

        let as_fan = get_page(&store, Some(fan), FeedFilter::Author(author), None, 10)
            .await
            .unwrap();
        assert_eq!(as_fan.tweets[0].like_count, 1);
        assert!(as_fan.tweets[0].liked_by_me);

        let anonymous = get_page(&store, None, FeedFilter::Author(author), None, 10)
            .await
            .unwrap();
        assert_eq!(anonymous.tweets[0].like_count, 1);
        assert!(!anonymous.tweets[0].liked_by_me);
    }

    #[tokio::test]
    async fn author_feed_excludes_others() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let hers = post(&store, alice, 1).await;
        post(&store, bob, 2).await;

        let page = get_page(&store, None, FeedFilter::Author(alice), None, 10)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![hers.tweet_id]);
    }

    #[tokio::test]
    async fn huge_limit_returns_everything() {
        let store = MemoryStore::new();
        let author = user(&store, "alice").await;
        post(&store, author, 1).await;
        post(&store, author, 2).await;

        let page = get_page(&store, None, FeedFilter::All, None, usize::MAX)
            .await
            .unwrap();
        assert_eq!(page.tweets.len(), 2);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn page_size_defaults_and_clamps() {
        let config = PageConfig::default();
        assert_eq!(page_size(None, &config).unwrap(), 10);
        assert_eq!(page_size(Some(500), &config).unwrap(), 100);
        assert!(matches!(
            page_size(Some(0), &config),
            Err(AppError::Validation(_))
        ));
    }
}
