//! Consumer side of the HTTP API: a typed client plus drivers that keep a
//! [`FeedCache`]/[`ProfileCache`] in step with optimistic mutations.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{FeedCache, ProfileCache};
use crate::models::{
    Author, CreateTweetRequest, Cursor, FeedFilter, FeedPage, Profile, Tweet, TweetView,
};

pub const VIEWER_HEADER: &str = "x-user-id";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("{0} is not in the cache")]
    NotCached(Uuid),

    #[error("a toggle for {0} is already in flight")]
    Pending(Uuid),
}

#[async_trait]
pub trait FeedBackend: Send + Sync {
    async fn fetch_page(
        &self,
        filter: FeedFilter,
        cursor: Option<Cursor>,
        limit: Option<usize>,
    ) -> Result<FeedPage, ClientError>;

    async fn toggle_like(&self, tweet_id: Uuid) -> Result<bool, ClientError>;

    async fn toggle_follow(&self, user_id: Uuid) -> Result<bool, ClientError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Profile, ClientError>;

    async fn create_tweet(&self, content: &str) -> Result<Tweet, ClientError>;
}

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    viewer: Option<Uuid>,
}

impl HttpBackend {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>, viewer: Option<Uuid>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            viewer,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn with_viewer(&self, request: RequestBuilder) -> RequestBuilder {
        match self.viewer {
            Some(viewer) => request.header(VIEWER_HEADER, viewer.to_string()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.with_viewer(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, message });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl FeedBackend for HttpBackend {
    async fn fetch_page(
        &self,
        filter: FeedFilter,
        cursor: Option<Cursor>,
        limit: Option<usize>,
    ) -> Result<FeedPage, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let path = match filter {
            FeedFilter::All => "/feed".to_string(),
            FeedFilter::Following => {
                query.push(("only_following", "true".to_string()));
                "/feed".to_string()
            }
            FeedFilter::Author(user_id) => format!("/users/{user_id}/tweets"),
        };
        self.send(self.http.get(self.url(&path)).query(&query)).await
    }

    async fn toggle_like(&self, tweet_id: Uuid) -> Result<bool, ClientError> {
        self.send(self.http.post(self.url(&format!("/tweets/{tweet_id}/like"))))
            .await
    }

    async fn toggle_follow(&self, user_id: Uuid) -> Result<bool, ClientError> {
        self.send(self.http.post(self.url(&format!("/users/{user_id}/follow"))))
            .await
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Profile, ClientError> {
        self.send(self.http.get(self.url(&format!("/users/{user_id}/profile"))))
            .await
    }

    async fn create_tweet(&self, content: &str) -> Result<Tweet, ClientError> {
        let body = CreateTweetRequest {
            content: content.to_string(),
        };
        self.send(self.http.post(self.url("/tweets")).json(&body))
            .await
    }
}

/// An infinitely scrolling feed: pages are fetched only when the consumer asks.
pub struct InfiniteFeed<B> {
    backend: B,
    filter: FeedFilter,
    limit: Option<usize>,
    cache: FeedCache,
}

impl<B: FeedBackend> InfiniteFeed<B> {
    pub fn new(backend: B, filter: FeedFilter) -> Self {
        Self {
            backend,
            filter,
            limit: None,
            cache: FeedCache::new(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn has_more(&self) -> bool {
        self.cache.has_more()
    }

    /// Fetches the next page. Returns the number of tweets added, `0` at end of feed.
    pub async fn load_more(&mut self) -> Result<usize, ClientError> {
        if !self.cache.has_more() {
            return Ok(0);
        }
        let page = self
            .backend
            .fetch_page(self.filter, self.cache.next_cursor(), self.limit)
            .await?;
        let before = self.cache.len();
        self.cache.append_page(page);
        debug!("Loaded {} tweets", self.cache.len() - before);
        Ok(self.cache.len() - before)
    }

    /// Flips the like optimistically, then settles it with the server's answer.
    pub async fn toggle_like(&mut self, tweet_id: Uuid) -> Result<bool, ClientError> {
        let patch = match self.cache.apply_like_toggle(tweet_id) {
            Some(patch) => patch,
            None if self.cache.is_pending(tweet_id) => return Err(ClientError::Pending(tweet_id)),
            None => return Err(ClientError::NotCached(tweet_id)),
        };
        match self.backend.toggle_like(tweet_id).await {
            Ok(liked) => {
                self.cache.confirm_like(&patch, liked);
                Ok(liked)
            }
            Err(e) => {
                warn!("Like on {} failed, reverting: {}", tweet_id, e);
                self.cache.rollback_like(&patch);
                Err(e)
            }
        }
    }

    /// Posts a tweet and shows it at the head of this feed when the feed would list it.
    pub async fn post(&mut self, content: &str, author: Author) -> Result<Tweet, ClientError> {
        let tweet = self.backend.create_tweet(content).await?;
        let listed = match self.filter {
            FeedFilter::All => true,
            FeedFilter::Author(user_id) => user_id == author.user_id,
            // Self-follow is rejected, so the viewer's own tweets never show here.
            FeedFilter::Following => false,
        };
        if !listed {
            return Ok(tweet);
        }
        self.cache.prepend(TweetView {
            tweet_id: tweet.tweet_id,
            content: tweet.content.clone(),
            created_at: tweet.created_at,
            like_count: 0,
            liked_by_me: false,
            user: author,
        });
        Ok(tweet)
    }
}

/// A viewed profile with an optimistic follow button.
pub struct ProfileView<B> {
    backend: B,
    cache: ProfileCache,
}

impl<B: FeedBackend> ProfileView<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: ProfileCache::new(),
        }
    }

    pub fn profile(&self, user_id: Uuid) -> Option<&Profile> {
        self.cache.get(user_id)
    }

    pub async fn load(&mut self, user_id: Uuid) -> Result<&Profile, ClientError> {
        let profile = self.backend.get_profile(user_id).await?;
        self.cache.insert(profile);
        self.cache
            .get(user_id)
            .ok_or(ClientError::NotCached(user_id))
    }

    pub async fn toggle_follow(&mut self, user_id: Uuid) -> Result<bool, ClientError> {
        if self.cache.is_pending(user_id) {
            return Err(ClientError::Pending(user_id));
        }
        let added = match self.cache.get(user_id) {
            Some(profile) => !profile.is_following,
            None => return Err(ClientError::NotCached(user_id)),
        };
        let patch = self
            .cache
            .apply_follow_toggle(user_id, added)
            .ok_or(ClientError::NotCached(user_id))?;
        match self.backend.toggle_follow(user_id).await {
            Ok(following) => {
                self.cache.confirm_follow(&patch, following);
                Ok(following)
            }
            Err(e) => {
                warn!("Follow of {} failed, reverting: {}", user_id, e);
                self.cache.rollback_follow(&patch);
                Err(e)
            }
        }
    }
}
