use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::cache::TimelineCache;
use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{now_iso, path_segment, sanitize_rich, validate_uuid};
use crate::core::kv::KvStore;
use crate::core::query_params::{page_param, parse_query_params, query_string};
use crate::feed;
use crate::pagination::paginate;
use crate::store;

fn json_response(status: u16, body: Vec<u8>) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body)
        .build()
}

/// Rendered index page for the given page number. This is the body the
/// timeline cache stores and replays.
pub fn render_index_page<S: KvStore>(kv: &S, page_number: usize) -> ApiResult<Vec<u8>> {
    let posts = feed::index(kv)?;
    let page = paginate(&posts, POSTS_PER_PAGE, page_number);
    let body = serde_json::json!({
        "posts": page.items,
        "page": page.number,
        "total_pages": page.total_pages,
        "has_next": page.has_next,
        "has_previous": page.has_previous,
    });
    serde_json::to_vec(&body).map_err(|e| ApiError::Internal(e.to_string()))
}

/// GET /posts — the public index. Served from the timeline cache when a
/// fresh entry exists; distinct page numbers cache under distinct keys.
pub fn list_posts<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let cache_key = format!("{}?{}", req.path(), query_string(req.uri()));

    if let Some(body) = TimelineCache::global().get(&cache_key) {
        return Ok(json_response(200, body));
    }

    let params = parse_query_params(req.uri());
    let body = match render_index_page(kv, page_param(&params)) {
        Ok(b) => b,
        Err(err) => return Ok(err.into()),
    };

    log::info!("index cache fill for {}", cache_key);
    TimelineCache::global().put(&cache_key, body.clone());
    Ok(json_response(200, body))
}

/// DELETE /cache — explicit clear; the only invalidation besides the TTL.
pub fn clear_index_cache<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    if validate_token(kv, &req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    TimelineCache::global().clear();
    log::info!("index cache cleared");
    Ok(Response::builder().status(204).build())
}

pub fn create_post<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let text = value["text"].as_str().unwrap_or_default();
    let group_slug = value["group"].as_str();
    let image = value["image"].as_str().map(|i| i.to_string());

    // Author is always the caller, whatever the body claims.
    let post = match store::insert_post(kv, &user_id, text, group_slug, image) {
        Ok(p) => p,
        Err(err) => return Ok(err.into()),
    };

    log::info!("created post {} by {}", post.id, user_id);
    Ok(json_response(201, serde_json::to_vec(&post)?))
}

/// GET /posts/{id} — post plus ordered comments plus the author's post
/// count.
pub fn post_detail<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let post_id = path_segment(&path, 1);

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    match feed::post_detail(kv, post_id) {
        Ok(detail) => Ok(json_response(200, serde_json::to_vec(&detail)?)),
        Err(err) => Ok(err.into()),
    }
}

/// PUT /posts/{id} — author-only. A non-author is redirected to the detail
/// view instead of getting an error page.
pub fn edit_post<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let path = req.path().to_string();
    let post_id = path_segment(&path, 1);

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let mut post = match store::get_post(kv, post_id) {
        Ok(Some(p)) => p,
        Ok(None) => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
        Err(err) => return Ok(err.into()),
    };

    if post.author_id != user_id {
        return Ok(Response::builder()
            .status(303)
            .header("Location", format!("/posts/{}", post_id))
            .build());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let text = value["text"].as_str().unwrap_or_default();

    if text.trim().is_empty() || text.len() > MAX_POST_LENGTH {
        return Ok(ApiError::BadRequest("Invalid post text".to_string()).into());
    }

    if let Some(slug) = value["group"].as_str() {
        let group = match store::find_group_by_slug(kv, slug) {
            Ok(Some(g)) => g,
            Ok(None) => return Ok(ApiError::NotFound("Group not found".to_string()).into()),
            Err(err) => return Ok(err.into()),
        };
        post.group_id = Some(group.id);
    }
    if let Some(image) = value["image"].as_str() {
        post.image = Some(image.to_string());
    }

    // Skip the write when nothing changed
    let filtered = sanitize_rich(text);
    if post.text != filtered {
        post.text = filtered;
        post.updated_at = Some(now_iso());
    }

    if let Err(err) = store::update_post(kv, &post) {
        return Ok(err.into());
    }

    Ok(json_response(200, serde_json::to_vec(&post)?))
}

pub fn delete_post<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let path = req.path().to_string();
    let post_id = path_segment(&path, 1);

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    match store::get_post(kv, post_id) {
        Ok(Some(p)) if p.author_id != user_id => Ok(ApiError::Forbidden.into()),
        Ok(Some(_)) => {
            if let Err(err) = store::delete_post(kv, post_id) {
                return Ok(err.into());
            }
            log::info!("deleted post {}", post_id);
            Ok(Response::builder().status(204).build())
        }
        Ok(None) => Ok(ApiError::NotFound("Post not found".to_string()).into()),
        Err(err) => Ok(err.into()),
    }
}

/// POST /posts/{id}/comments — comment author is always the caller.
pub fn add_comment<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let path = req.path().to_string();
    let post_id = path_segment(&path, 1);

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let text = value["text"].as_str().unwrap_or_default();

    let comment = match store::insert_comment(kv, post_id, &user_id, text) {
        Ok(c) => c,
        Err(err) => return Ok(err.into()),
    };

    Ok(json_response(201, serde_json::to_vec(&comment)?))
}

/// GET /feed — posts by authors the caller follows; authentication required.
pub fn follow_feed<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(kv, &req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let posts = match feed::follow_feed(kv, &user_id) {
        Ok(p) => p,
        Err(err) => return Ok(err.into()),
    };
    let params = parse_query_params(req.uri());
    let page = paginate(&posts, POSTS_PER_PAGE, page_param(&params));

    let body = serde_json::json!({
        "posts": page.items,
        "page": page.number,
        "total_pages": page.total_pages,
        "has_next": page.has_next,
        "has_previous": page.has_previous,
    });
    Ok(json_response(200, serde_json::to_vec(&body)?))
}
