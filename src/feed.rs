//! Feed query engine: the four post views, each newest-first by creation
//! timestamp, plus the single-post detail query.

use serde::Serialize;

use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::kv::KvStore;
use crate::follow;
use crate::models::models::{Comment, Post};
use crate::store;

/// All posts, unfiltered.
pub fn index<S: KvStore>(kv: &S) -> ApiResult<Vec<Post>> {
    ordered_posts(kv, |_| true)
}

/// Posts in the group. NotFound if the slug does not exist.
pub fn group_feed<S: KvStore>(kv: &S, slug: &str) -> ApiResult<Vec<Post>> {
    let group = store::find_group_by_slug(kv, slug)?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;
    ordered_posts(kv, |p| p.group_id.as_deref() == Some(group.id.as_str()))
}

/// Posts by the author. NotFound if the username does not exist.
pub fn profile_feed<S: KvStore>(kv: &S, username: &str) -> ApiResult<Vec<Post>> {
    let author = store::find_user_by_username(kv, username)?
        .ok_or_else(|| ApiError::NotFound("Author not found".to_string()))?;
    ordered_posts(kv, |p| p.author_id == author.id)
}

/// Posts whose author the user follows. Empty when following no one.
pub fn follow_feed<S: KvStore>(kv: &S, user_id: &str) -> ApiResult<Vec<Post>> {
    let followings = follow::followings(kv, user_id)?;
    ordered_posts(kv, |p| followings.iter().any(|a| a == &p.author_id))
}

fn ordered_posts<S: KvStore, F: Fn(&Post) -> bool>(kv: &S, keep: F) -> ApiResult<Vec<Post>> {
    let feed: Vec<String> = kv.get_json(FEED_KEY)?.unwrap_or_default();
    let mut posts = Vec::new();
    for id in feed.iter() {
        if let Some(p) = kv.get_json::<Post>(&post_key(id))? {
            if keep(&p) {
                posts.push(p);
            }
        }
    }
    // Newest first. The sort is stable, so posts sharing a timestamp keep
    // their feed-list (insertion) order within a query.
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub author_posts_count: usize,
}

/// A single post with its ordered comments and the author's total post
/// count, recomputed on every read.
pub fn post_detail<S: KvStore>(kv: &S, post_id: &str) -> ApiResult<PostDetail> {
    let post = store::get_post(kv, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    let comments = store::comments_for_post(kv, post_id)?;
    let author_posts_count = store::author_post_count(kv, &post.author_id)?;
    Ok(PostDetail {
        post,
        comments,
        author_posts_count,
    })
}
