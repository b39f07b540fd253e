use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::{dev::Payload, get, post, web, FromRequest, HttpRequest, HttpResponse};
use log::info;
use uuid::Uuid;

use crate::client::VIEWER_HEADER;
use crate::config::PageConfig;
use crate::error::AppError;
use crate::feed::{get_page, page_size};
use crate::models::{CreateTweetRequest, CreateUserRequest, FeedFilter, FeedQuery, PageQuery};
use crate::mutations;
use crate::profile::get_profile;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub page: PageConfig,
}

/// The authenticated user, as asserted by the session layer in front of this service.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<Uuid>);

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let viewer = match req.headers().get(VIEWER_HEADER) {
            None => Ok(Viewer(None)),
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .map(|id| Viewer(Some(id)))
                .ok_or_else(|| AppError::Validation(format!("malformed {VIEWER_HEADER} header"))),
        };
        ready(viewer)
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("malformed {what} id")))
}

#[post("/users")]
pub async fn create_user(
    state: web::Data<AppState>,
    user_data: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let user = mutations::register(state.store.as_ref(), user_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/tweets")]
pub async fn create_tweet(
    state: web::Data<AppState>,
    viewer: Viewer,
    tweet_data: web::Json<CreateTweetRequest>,
) -> Result<HttpResponse, AppError> {
    let tweet = mutations::create_tweet(state.store.as_ref(), viewer.0, &tweet_data.content).await?;
    Ok(HttpResponse::Ok().json(tweet))
}

#[post("/tweets/{tweet_id}/like")]
pub async fn toggle_like(
    state: web::Data<AppState>,
    viewer: Viewer,
    tweet_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;
    let liked = mutations::toggle_like(state.store.as_ref(), viewer.0, tweet_id).await?;
    Ok(HttpResponse::Ok().json(liked))
}

#[get("/feed")]
pub async fn get_feed(
    state: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = if query.only_following {
        FeedFilter::Following
    } else {
        FeedFilter::All
    };
    let limit = page_size(query.limit, &state.page)?;
    let page = get_page(state.store.as_ref(), viewer.0, filter, query.cursor, limit).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/users/{user_id}/tweets")]
pub async fn get_user_tweets(
    state: web::Data<AppState>,
    viewer: Viewer,
    user_id: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    let query = query.into_inner();
    let limit = page_size(query.limit, &state.page)?;

    info!("Fetching tweets for user: {}", user_id);
    let page = get_page(
        state.store.as_ref(),
        viewer.0,
        FeedFilter::Author(user_id),
        query.cursor,
        limit,
    )
    .await?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/users/{user_id}/profile")]
pub async fn get_user_profile(
    state: web::Data<AppState>,
    viewer: Viewer,
    user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    let profile = get_profile(state.store.as_ref(), viewer.0, user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[post("/users/{user_id}/follow")]
pub async fn toggle_follow(
    state: web::Data<AppState>,
    viewer: Viewer,
    user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    let following = mutations::toggle_follow(state.store.as_ref(), viewer.0, user_id).await?;
    Ok(HttpResponse::Ok().json(following))
}

/// Mounts every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(create_user)
            .service(create_tweet)
            .service(toggle_like)
            .service(get_feed)
            .service(get_user_tweets)
            .service(get_user_profile)
            .service(toggle_follow),
    );
}
