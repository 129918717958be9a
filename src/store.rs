//! Entity store: CRUD over users, groups, posts, and comments with the
//! referential integrity rules enforced here rather than in handlers.
//!
//! Deletion policies: a deleted group leaves its posts behind with a null
//! group reference; a deleted post takes its comments with it; a deleted
//! user takes their posts and every follow edge touching them.

use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{now_iso, sanitize_plain, sanitize_rich};
use crate::core::kv::KvStore;
use crate::models::models::{Comment, Group, Post, User};

fn slug_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Regex should compile"))
}

// === Users ===

pub fn get_user<S: KvStore>(kv: &S, id: &str) -> ApiResult<Option<User>> {
    Ok(kv.get_json(&user_key(id))?)
}

pub fn find_user_by_username<S: KvStore>(kv: &S, username: &str) -> ApiResult<Option<User>> {
    let ids: Vec<String> = kv.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in ids {
        if let Some(u) = kv.get_json::<User>(&user_key(&id))? {
            if u.username == username {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

pub fn insert_user<S: KvStore>(
    kv: &S,
    username: &str,
    password_hash: &str,
    bio: Option<String>,
) -> ApiResult<User> {
    let username = sanitize_plain(username);
    if find_user_by_username(kv, &username)?.is_some() {
        return Err(ApiError::Conflict("Username exists".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username,
        password: password_hash.to_string(),
        bio,
    };
    kv.set_json(&user_key(&id), &user)?;

    let mut ids: Vec<String> = kv.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    ids.push(id);
    kv.set_json(USERS_LIST_KEY, &ids)?;

    Ok(user)
}

/// Removes the user, their posts (comments included), and every follow edge
/// where they are either endpoint.
pub fn delete_user<S: KvStore>(kv: &S, id: &str) -> ApiResult<()> {
    if kv.get_json::<User>(&user_key(id))?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let feed: Vec<String> = kv.get_json(FEED_KEY)?.unwrap_or_default();
    for post_id in feed {
        if let Some(p) = kv.get_json::<Post>(&post_key(&post_id))? {
            if p.author_id == id {
                delete_post(kv, &post_id)?;
            }
        }
    }

    // Follow edges: outgoing in one key, incoming scattered over followers.
    kv.delete(&followings_key(id))?;
    let ids: Vec<String> = kv.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for other in &ids {
        let key = followings_key(other);
        let mut followings: Vec<String> = kv.get_json(&key)?.unwrap_or_default();
        if followings.iter().any(|a| a == id) {
            followings.retain(|a| a != id);
            kv.set_json(&key, &followings)?;
        }
    }

    kv.delete(&user_key(id))?;
    let remaining: Vec<String> = ids.into_iter().filter(|u| u != id).collect();
    kv.set_json(USERS_LIST_KEY, &remaining)?;

    log::info!("deleted user {}", id);
    Ok(())
}

// === Groups ===

pub fn list_groups<S: KvStore>(kv: &S) -> ApiResult<Vec<Group>> {
    let ids: Vec<String> = kv.get_json(GROUPS_LIST_KEY)?.unwrap_or_default();
    let mut groups = Vec::new();
    for id in ids {
        if let Some(g) = kv.get_json::<Group>(&group_key(&id))? {
            groups.push(g);
        }
    }
    Ok(groups)
}

pub fn find_group_by_slug<S: KvStore>(kv: &S, slug: &str) -> ApiResult<Option<Group>> {
    let ids: Vec<String> = kv.get_json(GROUPS_LIST_KEY)?.unwrap_or_default();
    for id in ids {
        if let Some(g) = kv.get_json::<Group>(&group_key(&id))? {
            if g.slug == slug {
                return Ok(Some(g));
            }
        }
    }
    Ok(None)
}

pub fn insert_group<S: KvStore>(
    kv: &S,
    title: &str,
    slug: &str,
    description: &str,
) -> ApiResult<Group> {
    let title = sanitize_plain(title);
    if title.is_empty() || title.len() > MAX_GROUP_TITLE_LENGTH {
        return Err(ApiError::BadRequest("Invalid group title".to_string()));
    }
    if !slug_regex().is_match(slug) {
        return Err(ApiError::BadRequest("Invalid group slug".to_string()));
    }
    if find_group_by_slug(kv, slug)?.is_some() {
        return Err(ApiError::Conflict("Group slug exists".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let group = Group {
        id: id.clone(),
        title,
        slug: slug.to_string(),
        description: sanitize_plain(description),
    };
    kv.set_json(&group_key(&id), &group)?;

    let mut ids: Vec<String> = kv.get_json(GROUPS_LIST_KEY)?.unwrap_or_default();
    ids.push(id);
    kv.set_json(GROUPS_LIST_KEY, &ids)?;

    Ok(group)
}

/// Set-null semantics: posts referencing the group stay queryable with
/// `group_id = None`.
pub fn delete_group<S: KvStore>(kv: &S, slug: &str) -> ApiResult<()> {
    let group = find_group_by_slug(kv, slug)?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let feed: Vec<String> = kv.get_json(FEED_KEY)?.unwrap_or_default();
    for post_id in feed {
        let key = post_key(&post_id);
        if let Some(mut p) = kv.get_json::<Post>(&key)? {
            if p.group_id.as_deref() == Some(group.id.as_str()) {
                p.group_id = None;
                kv.set_json(&key, &p)?;
            }
        }
    }

    kv.delete(&group_key(&group.id))?;
    let ids: Vec<String> = kv.get_json(GROUPS_LIST_KEY)?.unwrap_or_default();
    let remaining: Vec<String> = ids.into_iter().filter(|g| g != &group.id).collect();
    kv.set_json(GROUPS_LIST_KEY, &remaining)?;

    log::info!("deleted group {} (posts kept, group unset)", slug);
    Ok(())
}

// === Posts ===

pub fn get_post<S: KvStore>(kv: &S, id: &str) -> ApiResult<Option<Post>> {
    Ok(kv.get_json(&post_key(id))?)
}

pub fn insert_post<S: KvStore>(
    kv: &S,
    author_id: &str,
    text: &str,
    group_slug: Option<&str>,
    image: Option<String>,
) -> ApiResult<Post> {
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest("Post text is required".to_string()));
    }
    if text.len() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest("Post text too long".to_string()));
    }

    // The group reference is validated before anything is written.
    let group_id = match group_slug {
        Some(slug) => Some(
            find_group_by_slug(kv, slug)?
                .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?
                .id,
        ),
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let post = Post {
        id: id.clone(),
        author_id: author_id.to_string(),
        group_id,
        text: sanitize_rich(text),
        image,
        created_at: now_iso(),
        updated_at: None,
    };
    kv.set_json(&post_key(&id), &post)?;

    // Global feed list, newest first. Feed position is the tiebreak for
    // posts created within the same microsecond.
    let mut feed: Vec<String> = kv.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, id);
    kv.set_json(FEED_KEY, &feed)?;

    Ok(post)
}

pub fn update_post<S: KvStore>(kv: &S, post: &Post) -> ApiResult<()> {
    kv.set_json(&post_key(&post.id), post)?;
    Ok(())
}

/// Cascade: the post's comments are deleted with it.
pub fn delete_post<S: KvStore>(kv: &S, id: &str) -> ApiResult<()> {
    if kv.get_json::<Post>(&post_key(id))?.is_none() {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let comment_ids: Vec<String> = kv.get_json(&post_comments_key(id))?.unwrap_or_default();
    for cid in comment_ids {
        kv.delete(&comment_key(&cid))?;
    }
    kv.delete(&post_comments_key(id))?;

    kv.delete(&post_key(id))?;
    let mut feed: Vec<String> = kv.get_json(FEED_KEY)?.unwrap_or_default();
    feed.retain(|p| p != id);
    kv.set_json(FEED_KEY, &feed)?;

    Ok(())
}

/// Denormalized per-author post count, recomputed on every read.
/// O(posts) per call; the detail view accepts this cost instead of
/// maintaining a counter.
pub fn author_post_count<S: KvStore>(kv: &S, author_id: &str) -> ApiResult<usize> {
    let feed: Vec<String> = kv.get_json(FEED_KEY)?.unwrap_or_default();
    let mut count = 0;
    for post_id in feed {
        if let Some(p) = kv.get_json::<Post>(&post_key(&post_id))? {
            if p.author_id == author_id {
                count += 1;
            }
        }
    }
    Ok(count)
}

// === Comments ===

pub fn insert_comment<S: KvStore>(
    kv: &S,
    post_id: &str,
    author_id: &str,
    text: &str,
) -> ApiResult<Comment> {
    if kv.get_json::<Post>(&post_key(post_id))?.is_none() {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest("Comment text is required".to_string()));
    }
    if text.len() > MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest("Comment text too long".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let comment = Comment {
        id: id.clone(),
        post_id: post_id.to_string(),
        author_id: author_id.to_string(),
        text: sanitize_rich(text),
        created_at: now_iso(),
    };
    kv.set_json(&comment_key(&id), &comment)?;

    // Appended, so the per-post list stays in insertion order.
    let mut ids: Vec<String> = kv.get_json(&post_comments_key(post_id))?.unwrap_or_default();
    ids.push(id);
    kv.set_json(&post_comments_key(post_id), &ids)?;

    Ok(comment)
}

pub fn comments_for_post<S: KvStore>(kv: &S, post_id: &str) -> ApiResult<Vec<Comment>> {
    let ids: Vec<String> = kv.get_json(&post_comments_key(post_id))?.unwrap_or_default();
    let mut comments = Vec::new();
    for id in ids {
        if let Some(c) = kv.get_json::<Comment>(&comment_key(&id))? {
            comments.push(c);
        }
    }
    Ok(comments)
}
