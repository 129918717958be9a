//! Social graph: the (user, author) follow edge set. At most one edge per
//! pair; inserts are idempotent, removals of a missing edge are an error.

use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::validate_uuid;
use crate::core::kv::KvStore;
use crate::store;

/// Insert-if-absent. Self-follow is silently ignored; following an author
/// you already follow succeeds without a second edge.
pub fn follow<S: KvStore>(kv: &S, user_id: &str, author_id: &str) -> ApiResult<()> {
    if user_id == author_id {
        return Ok(());
    }
    if store::get_user(kv, author_id)?.is_none() {
        return Err(ApiError::NotFound("Author not found".to_string()));
    }

    let key = followings_key(user_id);
    let mut followings: Vec<String> = kv.get_json(&key)?.unwrap_or_default();
    if !followings.iter().any(|a| a == author_id) {
        followings.push(author_id.to_string());
        kv.set_json(&key, &followings)?;
    }
    Ok(())
}

pub fn unfollow<S: KvStore>(kv: &S, user_id: &str, author_id: &str) -> ApiResult<()> {
    let key = followings_key(user_id);
    let mut followings: Vec<String> = kv.get_json(&key)?.unwrap_or_default();
    let before = followings.len();
    followings.retain(|a| a != author_id);
    if followings.len() == before {
        return Err(ApiError::NotFound("Not following this author".to_string()));
    }
    kv.set_json(&key, &followings)?;
    Ok(())
}

/// False for an absent or anonymous user, never an error.
pub fn is_following<S: KvStore>(kv: &S, user_id: &str, author_id: &str) -> ApiResult<bool> {
    let followings: Vec<String> = kv.get_json(&followings_key(user_id))?.unwrap_or_default();
    Ok(followings.iter().any(|a| a == author_id))
}

pub fn followings<S: KvStore>(kv: &S, user_id: &str) -> ApiResult<Vec<String>> {
    Ok(kv.get_json(&followings_key(user_id))?.unwrap_or_default())
}

pub fn followers<S: KvStore>(kv: &S, user_id: &str) -> ApiResult<Vec<String>> {
    let users: Vec<String> = kv.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut followers = Vec::new();
    for id in users {
        let followings: Vec<String> = kv.get_json(&followings_key(&id))?.unwrap_or_default();
        if followings.iter().any(|a| a == user_id) {
            followers.push(id);
        }
    }
    Ok(followers)
}

// === HTTP Handlers ===

pub fn handle_follow<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let author_id = value["author_id"].as_str().unwrap_or_default();

    if author_id.is_empty() || !validate_uuid(author_id) {
        return Ok(ApiError::BadRequest("Invalid author id".to_string()).into());
    }

    if let Err(err) = follow(kv, &user_id, author_id) {
        return Ok(err.into());
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({"status": "followed"}))?)
        .build())
}

pub fn handle_unfollow<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let author_id = value["author_id"].as_str().unwrap_or_default();

    if author_id.is_empty() || !validate_uuid(author_id) {
        return Ok(ApiError::BadRequest("Invalid author id".to_string()).into());
    }

    if let Err(err) = unfollow(kv, &user_id, author_id) {
        return Ok(err.into());
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({"status": "unfollowed"}))?)
        .build())
}

pub fn followings_list<S: KvStore>(kv: &S, path: &str) -> anyhow::Result<Response> {
    let user_id = path.trim_start_matches("/followings/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let followings = match followings(kv, user_id) {
        Ok(f) => f,
        Err(err) => return Ok(err.into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&followings)?)
        .build())
}

pub fn followers_list<S: KvStore>(kv: &S, path: &str) -> anyhow::Result<Response> {
    let user_id = path.trim_start_matches("/followers/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let followers = match followers(kv, user_id) {
        Ok(f) => f,
        Err(err) => return Ok(err.into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&followers)?)
        .build())
}
