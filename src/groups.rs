use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::path_segment;
use crate::core::kv::KvStore;
use crate::core::query_params::{page_param, parse_query_params};
use crate::feed;
use crate::pagination::paginate;
use crate::store;

pub fn list_groups<S: KvStore>(kv: &S, _req: Request) -> anyhow::Result<Response> {
    let groups = match store::list_groups(kv) {
        Ok(g) => g,
        Err(err) => return Ok(err.into()),
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&groups)?)
        .build())
}

pub fn create_group<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    if validate_token(kv, &req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let title = value["title"].as_str().unwrap_or_default();
    let slug = value["slug"].as_str().unwrap_or_default();
    let description = value["description"].as_str().unwrap_or_default();

    let group = match store::insert_group(kv, title, slug, description) {
        Ok(g) => g,
        Err(err) => return Ok(err.into()),
    };

    log::info!("created group {}", group.slug);
    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&group)?)
        .build())
}

pub fn delete_group<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    if validate_token(kv, &req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let path = req.path().to_string();
    let slug = path_segment(&path, 1);

    if slug.is_empty() {
        return Ok(ApiError::BadRequest("Group slug required".to_string()).into());
    }

    if let Err(err) = store::delete_group(kv, slug) {
        return Ok(err.into());
    }

    Ok(Response::builder().status(204).build())
}

/// GET /groups/{slug}/posts — the group's feed, 404 for an unknown slug.
pub fn group_posts<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let slug = path_segment(&path, 1);

    let group = match store::find_group_by_slug(kv, slug) {
        Ok(Some(g)) => g,
        Ok(None) => return Ok(ApiError::NotFound("Group not found".to_string()).into()),
        Err(err) => return Ok(err.into()),
    };

    let posts = match feed::group_feed(kv, slug) {
        Ok(p) => p,
        Err(err) => return Ok(err.into()),
    };
    let params = parse_query_params(req.uri());
    let page = paginate(&posts, POSTS_PER_PAGE, page_param(&params));

    let body = serde_json::json!({
        "group": group,
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
