use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, path_segment, validate_uuid};
use crate::core::kv::KvStore;
use crate::core::query_params::{page_param, parse_query_params};
use crate::feed;
use crate::follow;
use crate::models::models::User;
use crate::pagination::paginate;
use crate::store;

/// Public projection of a user record; the password hash never leaves the
/// store layer.
fn build_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "bio": user.bio.as_ref().unwrap_or(&String::new()),
    })
}

pub fn create_user<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let new_user: serde_json::Value = serde_json::from_slice(req.body())?;
    let username = new_user["username"].as_str().unwrap_or("");
    let password = new_user["password"].as_str().unwrap_or("");
    let bio = new_user["bio"].as_str().map(|b| b.to_string());

    if username.is_empty() {
        return Ok(ApiError::BadRequest("Username is required".to_string()).into());
    }
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Ok(ApiError::BadRequest("Username must be 3-50 characters".to_string()).into());
    }
    if password.is_empty() || password.len() < MIN_PASSWORD_LENGTH {
        return Ok(ApiError::BadRequest("Password must be at least 3 characters".to_string()).into());
    }
    if let Some(ref b) = bio {
        if b.len() > MAX_BIO_LENGTH {
            return Ok(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()).into());
        }
    }

    let password_hash = hash_password(password)?;
    let user = match store::insert_user(kv, username, &password_hash, bio) {
        Ok(u) => u,
        Err(err) => return Ok(err.into()),
    };

    log::info!("registered user {}", user.username);
    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&build_user_json(&user))?)
        .build())
}

pub fn get_profile<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    match store::get_user(kv, &user_id) {
        Ok(Some(user)) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&build_user_json(&user))?)
            .build()),
        Ok(None) => Ok(ApiError::NotFound("User not found".to_string()).into()),
        Err(err) => Ok(err.into()),
    }
}

/// Account deletion cascades: posts (with comments) and follow edges in both
/// directions go with the user.
pub fn delete_profile<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if let Err(err) = store::delete_user(kv, &user_id) {
        return Ok(err.into());
    }

    Ok(Response::builder().status(204).build())
}

pub fn get_user_details<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let user_id = path.trim_start_matches("/users/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    match store::get_user(kv, user_id) {
        Ok(Some(user)) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&build_user_json(&user))?)
            .build()),
        Ok(None) => Ok(ApiError::NotFound("User not found".to_string()).into()),
        Err(err) => Ok(err.into()),
    }
}

/// GET /users/{username}/posts — the author's feed, paginated, with the
/// caller's follow state when authenticated (false for anonymous readers).
pub fn profile_posts<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let username = path_segment(&path, 1);

    let author = match store::find_user_by_username(kv, username) {
        Ok(Some(u)) => u,
        Ok(None) => return Ok(ApiError::NotFound("Author not found".to_string()).into()),
        Err(err) => return Ok(err.into()),
    };

    let posts = match feed::profile_feed(kv, username) {
        Ok(p) => p,
        Err(err) => return Ok(err.into()),
    };
    let params = parse_query_params(req.uri());
    let page = paginate(&posts, POSTS_PER_PAGE, page_param(&params));

    let following = match validate_token(kv, &req) {
        Some(uid) => follow::is_following(kv, &uid, &author.id).unwrap_or(false),
        None => false,
    };

    let body = serde_json::json!({
        "author": build_user_json(&author),
        "following": following,
        "posts": page.items,
        "page": page.number,
        "total_pages": page.total_pages,
        "has_next": page.has_next,
        "has_previous": page.has_previous,
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&body)?)
        .build())
}
