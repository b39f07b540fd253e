use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CreateUserRequest, Tweet, User};
use crate::store::Store;

pub const MAX_TWEET_CHARS: usize = 280;

/// Current time truncated to the millisecond precision the store keeps.
fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn require_viewer(viewer: Option<Uuid>) -> Result<Uuid, AppError> {
    viewer.ok_or(AppError::Unauthorized)
}

pub async fn create_user(
    store: &dyn Store,
    request: CreateUserRequest,
    cost: u32,
) -> Result<User, AppError> {
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation("email is malformed".into()));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }

    let now = now();
    let user = User {
        user_id: Uuid::new_v4(),
        username,
        email: request.email,
        password_hash: hash(request.password.as_bytes(), cost)?,
        image: request.image,
        created_at: now,
        updated_at: now,
    };
    store.insert_user(&user).await?;
    info!("User created: {}", user.user_id);
    Ok(user)
}

/// Registers a user with the production hashing cost.
pub async fn register(store: &dyn Store, request: CreateUserRequest) -> Result<User, AppError> {
    create_user(store, request, DEFAULT_COST).await
}

pub async fn create_tweet(
    store: &dyn Store,
    viewer: Option<Uuid>,
    content: &str,
) -> Result<Tweet, AppError> {
    let user_id = require_viewer(viewer)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("content must not be empty".into()));
    }
    if content.chars().count() > MAX_TWEET_CHARS {
        return Err(AppError::Validation(format!(
            "content exceeds {MAX_TWEET_CHARS} characters"
        )));
    }
    if store.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }

    let tweet = Tweet {
        tweet_id: Uuid::new_v4(),
        user_id,
        content: content.to_string(),
        created_at: now(),
    };
    store.insert_tweet(&tweet).await?;
    info!("Tweet created successfully: {}", tweet.tweet_id);
    Ok(tweet)
}

/// Flips the viewer's like on a tweet. Returns `true` when the tweet is now liked.
pub async fn toggle_like(
    store: &dyn Store,
    viewer: Option<Uuid>,
    tweet_id: Uuid,
) -> Result<bool, AppError> {
    let user_id = require_viewer(viewer)?;
    if !store.tweet_exists(tweet_id).await? {
        return Err(AppError::NotFound("tweet"));
    }

    let liked = if store.insert_like(user_id, tweet_id, now()).await? {
        true
    } else {
        // The edge existed. If a concurrent toggle already removed it, it is gone either way.
        store.delete_like(user_id, tweet_id).await?;
        false
    };
    debug!("User {} like on {}: {}", user_id, tweet_id, liked);
    Ok(liked)
}

/// Flips the viewer's follow edge to `target`. Returns `true` when now following.
pub async fn toggle_follow(
    store: &dyn Store,
    viewer: Option<Uuid>,
    target: Uuid,
) -> Result<bool, AppError> {
    let follower_id = require_viewer(viewer)?;
    if follower_id == target {
        return Err(AppError::Validation("users cannot follow themselves".into()));
    }
    if store.get_user(target).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }

    let following = if store.insert_follow(follower_id, target).await? {
        true
    } else {
        store.delete_follow(follower_id, target).await?;
        false
    };
    debug!("User {} follows {}: {}", follower_id, target, following);
    Ok(following)
}
