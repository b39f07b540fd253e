use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::json;
use uuid::Uuid;

use twitter_feed::config::PageConfig;
use twitter_feed::handlers::{self, AppState};
use twitter_feed::models::{FeedPage, Profile, Tweet, User};
use twitter_feed::store::MemoryStore;

fn state() -> web::Data<AppState> {
    web::Data::new(AppState {
        store: Arc::new(MemoryStore::new()),
        page: PageConfig::default(),
    })
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(handlers::configure),
        )
        .await
    };
}

macro_rules! register {
    ($app:expr, $name:expr) => {{
        let name: &str = $name;
        let req = test::TestRequest::post()
            .uri("/api/users")
            .set_json(json!({
                "username": name,
                "email": format!("{name}@example.com"),
                "password": "password123",
            }))
            .to_request();
        let user: User = test::call_and_read_body_json(&$app, req).await;
        user
    }};
}

#[actix_web::test]
async fn post_like_and_page_through_feed() {
    let state = state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    for i in 0..12 {
        let req = test::TestRequest::post()
            .uri("/api/tweets")
            .insert_header(("x-user-id", alice.user_id.to_string()))
            .set_json(json!({ "content": format!("tweet number {i}") }))
            .to_request();
        let tweet: Tweet = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tweet.user_id, alice.user_id);
    }

    let req = test::TestRequest::get().uri("/api/feed").to_request();
    let first: FeedPage = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first.tweets.len(), 10);
    let cursor = first.next_cursor.expect("a second page");

    let req = test::TestRequest::get()
        .uri(&format!("/api/feed?cursor={cursor}"))
        .to_request();
    let second: FeedPage = test::call_and_read_body_json(&app, req).await;
    assert_eq!(second.tweets.len(), 2);
    assert!(second.next_cursor.is_none());

    let target = first.tweets[0].tweet_id;
    let like = || {
        test::TestRequest::post()
            .uri(&format!("/api/tweets/{target}/like"))
            .insert_header(("x-user-id", bob.user_id.to_string()))
            .to_request()
    };
    let liked: bool = test::call_and_read_body_json(&app, like()).await;
    assert!(liked);

    let req = test::TestRequest::get()
        .uri("/api/feed?limit=1")
        .insert_header(("x-user-id", bob.user_id.to_string()))
        .to_request();
    let page: FeedPage = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page.tweets[0].tweet_id, target);
    assert_eq!(page.tweets[0].like_count, 1);
    assert!(page.tweets[0].liked_by_me);

    let liked: bool = test::call_and_read_body_json(&app, like()).await;
    assert!(!liked);
}

#[actix_web::test]
async fn follow_and_read_profile() {
    let state = state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let follow = || {
        test::TestRequest::post()
            .uri(&format!("/api/users/{}/follow", alice.user_id))
            .insert_header(("x-user-id", bob.user_id.to_string()))
            .to_request()
    };
    let following: bool = test::call_and_read_body_json(&app, follow()).await;
    assert!(following);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/profile", alice.user_id))
        .insert_header(("x-user-id", bob.user_id.to_string()))
        .to_request();
    let profile: Profile = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile.name, "alice");
    assert_eq!(profile.followers_count, 1);
    assert!(profile.is_following);

    let following: bool = test::call_and_read_body_json(&app, follow()).await;
    assert!(!following);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/profile", alice.user_id))
        .to_request();
    let profile: Profile = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile.followers_count, 0);
    assert!(!profile.is_following);
}

#[actix_web::test]
async fn error_statuses() {
    let state = state();
    let app = app!(state);
    let alice = register!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/tweets")
        .set_json(json!({ "content": "anonymous" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/follow", alice.user_id))
        .insert_header(("x-user-id", alice.user_id.to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/profile", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/feed?limit=0")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/feed")
        .insert_header(("x-user-id", "not-a-uuid"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
