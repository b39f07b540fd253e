use futures::try_join;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Profile;
use crate::store::Store;

pub async fn get_profile(
    store: &dyn Store,
    viewer: Option<Uuid>,
    user_id: Uuid,
) -> Result<Profile, AppError> {
    let user = store
        .get_user(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let is_following = async {
        match viewer {
            Some(viewer) => store.is_following(viewer, user_id).await,
            None => Ok(false),
        }
    };
    let (tweet_count, followers_count, follow_count, is_following) = try_join!(
        store.count_tweets(user_id),
        store.count_followers(user_id),
        store.count_follows(user_id),
        is_following
    )?;

    Ok(Profile {
        user_id,
        name: user.username,
        image: user.image,
        tweet_count,
        followers_count,
        follow_count,
        is_following,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateUserRequest;
    use crate::mutations::{create_tweet, create_user, toggle_follow};
    use crate::store::MemoryStore;

    async fn user(store: &MemoryStore, name: &str) -> Uuid {
        let request = CreateUserRequest {
            username: name.into(),
            email: format!("{name}@example.com"),
            password: "pw".into(),
            image: Some(format!("https://img.example.com/{name}.png")),
        };
        create_user(store, request, 4).await.unwrap().user_id
    }

    #[tokio::test]
    async fn counts_and_follow_state() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        create_tweet(&store, Some(alice), "one").await.unwrap();
        create_tweet(&store, Some(alice), "two").await.unwrap();
        toggle_follow(&store, Some(bob), alice).await.unwrap();
        toggle_follow(&store, Some(alice), bob).await.unwrap();

        let profile = get_profile(&store, Some(bob), alice).await.unwrap();
        assert_eq!(profile.name, "alice");
        assert_eq!(profile.tweet_count, 2);
        assert_eq!(profile.followers_count, 1);
        assert_eq!(profile.follow_count, 1);
        assert!(profile.is_following);
    }

    #[tokio::test]
    async fn anonymous_viewer_never_follows() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        toggle_follow(&store, Some(bob), alice).await.unwrap();

        let profile = get_profile(&store, None, alice).await.unwrap();
        assert!(!profile.is_following);
        assert_eq!(profile.followers_count, 1);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            get_profile(&store, None, Uuid::new_v4()).await,
            Err(AppError::NotFound("user"))
        ));
    }
}
