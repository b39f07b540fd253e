use std::error::Error;
use std::sync::Arc;

use env_logger::Builder;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use log::{info, LevelFilter};
use rand::seq::SliceRandom;
use uuid::Uuid;

use twitter_feed::config::Config;
use twitter_feed::db;
use twitter_feed::models::CreateUserRequest;
use twitter_feed::mutations;
use twitter_feed::store::{ScyllaStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_secs()
        .init();
    info!("Starting data seeding...");

    let config = Config::load()?;
    let session = db::create_session(&config).await?;
    db::ensure_schema(&session, &config).await?;
    let store = ScyllaStore::new(Arc::new(session));

    let num_users = 100;
    let tweets_per_user = 20;
    let follows_per_user = 10;
    let likes_per_user = 30;

    let users = seed_users(&store, num_users).await?;
    seed_follows(&store, &users, follows_per_user).await?;
    let tweets = seed_tweets(&store, &users, tweets_per_user).await?;
    seed_likes(&store, &users, &tweets, likes_per_user).await?;

    info!("Seeding completed!");
    Ok(())
}

async fn seed_users(store: &dyn Store, count: usize) -> Result<Vec<Uuid>, Box<dyn Error>> {
    info!("Creating {} users...", count);
    let mut users = Vec::with_capacity(count);

    for i in 0..count {
        let username: String = Username().fake();
        let request = CreateUserRequest {
            username: username.clone(),
            email: SafeEmail().fake(),
            password: "password123".to_string(),
            image: Some(format!("https://robohash.org/{username}.png")),
        };
        let user = mutations::register(store, request).await?;
        info!("Created user {}/{}: {} ({})", i + 1, count, username, user.user_id);
        users.push(user.user_id);
    }

    Ok(users)
}

async fn seed_follows(
    store: &dyn Store,
    users: &[Uuid],
    per_user: usize,
) -> Result<(), Box<dyn Error>> {
    info!("Creating up to {} follows per user...", per_user);
    for &follower in users {
        let targets: Vec<Uuid> = users
            .choose_multiple(&mut rand::thread_rng(), per_user + 1)
            .copied()
            .filter(|&target| target != follower)
            .take(per_user)
            .collect();
        for target in targets {
            mutations::toggle_follow(store, Some(follower), target).await?;
        }
    }
    Ok(())
}

async fn seed_tweets(
    store: &dyn Store,
    users: &[Uuid],
    tweets_per_user: usize,
) -> Result<Vec<Uuid>, Box<dyn Error>> {
    info!("Creating {} tweets per user...", tweets_per_user);
    let total_tweets = users.len() * tweets_per_user;
    let mut tweets = Vec::with_capacity(total_tweets);

    for &user_id in users {
        for _ in 0..tweets_per_user {
            let content: String = Sentence(3..10).fake();
            let tweet = mutations::create_tweet(store, Some(user_id), &content).await?;
            tweets.push(tweet.tweet_id);

            if tweets.len() % 100 == 0 {
                info!("Created {}/{} tweets", tweets.len(), total_tweets);
            }
        }
    }

    Ok(tweets)
}

async fn seed_likes(
    store: &dyn Store,
    users: &[Uuid],
    tweets: &[Uuid],
    per_user: usize,
) -> Result<(), Box<dyn Error>> {
    info!("Creating {} likes per user...", per_user);
    for &user_id in users {
        let picks: Vec<Uuid> = tweets
            .choose_multiple(&mut rand::thread_rng(), per_user)
            .copied()
            .collect();
        for tweet_id in picks {
            mutations::toggle_like(store, Some(user_id), tweet_id).await?;
        }
    }
    Ok(())
}
