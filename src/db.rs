use log::info;
use scylla::transport::errors::{NewSessionError, QueryError};
use scylla::{Session, SessionBuilder};

use crate::config::Config;

pub async fn create_session(config: &Config) -> Result<Session, NewSessionError> {
    SessionBuilder::new()
        .known_nodes(&config.scylla_nodes)
        .build()
        .await
}

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        user_id uuid PRIMARY KEY,
        username text,
        email text,
        password_hash text,
        image text,
        created_at timestamp,
        updated_at timestamp)",
    "CREATE TABLE IF NOT EXISTS tweets (
        tweet_id uuid PRIMARY KEY,
        user_id uuid,
        content text,
        created_at timestamp)",
    "CREATE TABLE IF NOT EXISTS tweets_by_user (
        user_id uuid,
        created_at timestamp,
        tweet_id uuid,
        content text,
        PRIMARY KEY ((user_id), created_at, tweet_id))
        WITH CLUSTERING ORDER BY (created_at DESC, tweet_id DESC)",
    "CREATE TABLE IF NOT EXISTS timeline (
        bucket text,
        created_at timestamp,
        tweet_id uuid,
        user_id uuid,
        content text,
        PRIMARY KEY ((bucket), created_at, tweet_id))
        WITH CLUSTERING ORDER BY (created_at DESC, tweet_id DESC)",
    "CREATE TABLE IF NOT EXISTS likes (
        tweet_id uuid,
        user_id uuid,
        created_at timestamp,
        PRIMARY KEY ((tweet_id), user_id))",
    "CREATE TABLE IF NOT EXISTS follows (
        follower_id uuid,
        followee_id uuid,
        created_at timestamp,
        PRIMARY KEY ((follower_id), followee_id))",
    "CREATE TABLE IF NOT EXISTS followers (
        followee_id uuid,
        follower_id uuid,
        created_at timestamp,
        PRIMARY KEY ((followee_id), follower_id))",
];

/// Creates the keyspace and tables if missing and switches the session to the keyspace.
pub async fn ensure_schema(session: &Session, config: &Config) -> Result<(), QueryError> {
    session
        .query(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                config.keyspace, config.replication_factor
            ),
            (),
        )
        .await?;
    session.use_keyspace(&config.keyspace, false).await?;

    for ddl in TABLES {
        session.query(*ddl, ()).await?;
    }
    info!("Schema ready in keyspace {}", config.keyspace);
    Ok(())
}
